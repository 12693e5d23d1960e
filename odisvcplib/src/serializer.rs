//! The `serializer` module renders a [`Dataset`] as a VCP `SW-CNT` document.
//!
//! The output has no XML declaration and no indentation; element order is fixed so the
//! same dataset always produces the same bytes. Empty elements are written as `<X />` and
//! text escapes only `&`, `<` and `>`.

use crate::dataset::{ConversionResult, Dataset};
use crate::error::OdisError;
use crate::hexcodec;
use quick_xml::Writer;
use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

/// Data format marker of hex-encoded VCP data regions
pub const DATA_FORMAT_NAME: &str = "DFN_HEX";

mod tag {
    pub const ROOT: &str = "SW-CNT";
    pub const IDENT: &str = "IDENT";
    pub const LOGIN: &str = "LOGIN";
    pub const DATA_ID: &str = "DATAIID";
    pub const CONTENT_VERSION: &str = "VERSION-INHALT";
    pub const REGIONS: &str = "DATENBEREICHE";
    pub const REGION: &str = "DATENBEREICH";
    pub const DATA_NAME: &str = "DATEN-NAME";
    pub const DATA_FORMAT: &str = "DATEN-FORMAT_NAME";
    pub const START_ADDRESS: &str = "START-ADR";
    pub const SIZE: &str = "GROESSE-DEKOMPRIMIERT";
    pub const DATA: &str = "DATEN";
}

/// Serialize one dataset into a VCP document.
///
/// `fallback_name_prefix` (usually the input file stem) names datasets without a
/// `ZDC_NAME`, see [`Dataset::resolved_name`].
///
/// # Errors
/// Returns [`OdisError::Serialize`] if the XML writer fails.
///
/// # Example
/// ```
/// use odisvcplib::{Dataset, serializer};
///
/// let ds = Dataset::new(vec![0x01, 0x02], 0x12, 0x100);
/// let res = serializer::serialize(&ds, "sample").unwrap();
///
/// assert!(res.vcp.contains("<DATAIID>sample-12</DATAIID>"));
/// assert!(res.vcp.contains("<START-ADR>0x100</START-ADR>"));
/// assert!(res.vcp.contains("<DATEN>0x01,0x02</DATEN>"));
/// ```
pub fn serialize(
    dataset: &Dataset,
    fallback_name_prefix: &str,
) -> Result<ConversionResult, OdisError> {
    let name = dataset.resolved_name(fallback_name_prefix);
    let mut writer = Writer::new(Vec::new());

    open(&mut writer, tag::ROOT)?;

    open(&mut writer, tag::IDENT)?;
    text_element(&mut writer, tag::LOGIN, dataset.login().unwrap_or_default())?;
    text_element(&mut writer, tag::DATA_ID, &name)?;
    text_element(&mut writer, tag::CONTENT_VERSION, dataset.version().unwrap_or_default())?;
    close(&mut writer, tag::IDENT)?;

    open(&mut writer, tag::REGIONS)?;
    open(&mut writer, tag::REGION)?;
    text_element(&mut writer, tag::DATA_NAME, &name)?;
    text_element(&mut writer, tag::DATA_FORMAT, DATA_FORMAT_NAME)?;
    text_element(&mut writer, tag::START_ADDRESS, &format!("0x{:x}", dataset.start_address()))?;
    text_element(&mut writer, tag::SIZE, &format!("0x{:x}", dataset.payload().len()))?;
    text_element(&mut writer, tag::DATA, &hexcodec::encode(dataset.payload()))?;
    close(&mut writer, tag::REGION)?;
    close(&mut writer, tag::REGIONS)?;

    close(&mut writer, tag::ROOT)?;

    let vcp = String::from_utf8(writer.into_inner())
        .map_err(|err| OdisError::Serialize(err.to_string()))?;

    Ok(ConversionResult {
        dataset: dataset.clone(),
        vcp,
    })
}

/// Serialize every dataset, keeping their order.
///
/// # Errors
/// Returns the first serialization error encountered.
pub fn serialize_all(
    datasets: &[Dataset],
    fallback_name_prefix: &str,
) -> Result<Vec<ConversionResult>, OdisError> {
    datasets
        .iter()
        .map(|dataset| serialize(dataset, fallback_name_prefix))
        .collect()
}

fn open(writer: &mut Writer<Vec<u8>>, name: &str) -> Result<(), OdisError> {
    write_event(writer, Event::Start(BytesStart::new(name)))
}

fn close(writer: &mut Writer<Vec<u8>>, name: &str) -> Result<(), OdisError> {
    write_event(writer, Event::End(BytesEnd::new(name)))
}

/// Writes `<name>text</name>`, or `<name />` for empty text.
fn text_element(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<(), OdisError> {
    if text.is_empty() {
        let tag = BytesStart::from_content(format!("{name} "), name.len());
        return write_event(writer, Event::Empty(tag));
    }
    open(writer, name)?;
    write_event(writer, Event::Text(BytesText::from_escaped(partial_escape(text))))?;
    close(writer, name)
}

fn write_event(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), OdisError> {
    writer
        .write_event(event)
        .map_err(|err| OdisError::Serialize(err.to_string()))
}
