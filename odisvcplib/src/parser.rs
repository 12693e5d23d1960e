//! The `parser` module extracts [`Dataset`]s from an ODIS XML document.
//!
//! Every `PARAMETER_DATA` element is one dataset entry, regardless of nesting depth.
//! A document that is not well-formed XML fails as a whole, while an entry with a broken
//! address or payload is only skipped and reported in [`ParseOutcome::skipped`].

use crate::dataset::Dataset;
use crate::error::{EntryError, OdisError};
use crate::hexcodec;
use quick_xml::Reader;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesStart, BytesText, Event};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::{debug, warn};

const ENTRY_TAG: &[u8] = b"PARAMETER_DATA";

/// Internal general entity declaration with a quoted literal value.
#[allow(clippy::expect_used)]
static ENTITY_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<!ENTITY\s+([A-Za-z_:][\w.:-]*)\s+(?:"([^"]*)"|'([^']*)')\s*>"#)
        .expect("entity declaration pattern is valid")
});

mod attr {
    pub const DIAGNOSTIC_ADDRESS: &str = "DIAGNOSTIC_ADDRESS";
    pub const START_ADDRESS: &str = "START_ADDRESS";
    pub const NAME: &str = "ZDC_NAME";
    pub const VERSION: &str = "ZDC_VERSION";
    pub const LOGIN: &str = "LOGIN";
}

/// Entry that was found but could not be turned into a [`Dataset`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    /// 1-based position of the entry among all `PARAMETER_DATA` elements
    pub ordinal: usize,
    pub reason: EntryError,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOutcome {
    /// Successfully extracted datasets in document order
    pub datasets: Vec<Dataset>,
    pub skipped: Vec<SkippedEntry>,
}

/// Attribute values of one entry, read when its start tag is seen.
#[derive(Debug, Default)]
struct EntryAttributes {
    diagnostic_address: Option<String>,
    start_address: Option<String>,
    name: Option<String>,
    version: Option<String>,
    login: Option<String>,
}

/// Entry whose end tag has not been reached yet.
struct OpenEntry {
    /// Index into the document-ordered result slots
    slot: usize,
    /// Element depth of the entry itself
    depth: usize,
    attributes: EntryAttributes,
    text: Option<String>,
    /// Set once the first child element starts; later text is not payload
    text_closed: bool,
}

/// General entities usable in text and attribute values.
#[derive(Debug, Default)]
struct Entities {
    declared: HashMap<String, String>,
}

impl Entities {
    /// Collect the entities declared in a DOCTYPE internal subset. The first
    /// declaration of a name is binding.
    fn declare_from(&mut self, doctype: &str) {
        for caps in ENTITY_DECL.captures_iter(doctype) {
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .map_or("", |m| m.as_str());
            self.declared
                .entry(caps[1].to_string())
                .or_insert_with(|| value.to_string());
        }
    }

    fn resolve(&self, name: &str) -> Option<&str> {
        resolve_predefined_entity(name)
            .or_else(|| self.declared.get(name).map(String::as_str))
    }
}

/// Parse an ODIS document and collect all dataset entries.
///
/// # Errors
/// Returns [`OdisError::MalformedDocument`] if the text is not a well-formed XML document.
/// This covers markup anywhere in the document, not only inside `PARAMETER_DATA`.
/// Broken entries are not errors, see [`ParseOutcome::skipped`].
///
/// # Example
/// ```
/// use odisvcplib::parser;
///
/// let xml = r#"<ODIS><PARAMETER_DATA DIAGNOSTIC_ADDRESS="0x12">0x01,0x02</PARAMETER_DATA></ODIS>"#;
/// let outcome = parser::parse(xml).unwrap();
///
/// assert_eq!(outcome.datasets.len(), 1);
/// assert_eq!(outcome.datasets[0].diagnostic_address(), 0x12);
/// assert_eq!(outcome.datasets[0].payload(), &[0x01, 0x02]);
/// ```
pub fn parse(document: &str) -> Result<ParseOutcome, OdisError> {
    let mut reader = Reader::from_str(document);

    let mut entities = Entities::default();
    let mut depth: usize = 0;
    let mut root_seen = false;
    let mut open: Vec<OpenEntry> = Vec::new();
    let mut slots: Vec<Option<Result<Dataset, EntryError>>> = Vec::new();

    loop {
        let event = reader.read_event().map_err(|err| {
            OdisError::MalformedDocument(format!("{err} (at byte {})", reader.error_position()))
        })?;

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                if depth == 0 {
                    if root_seen {
                        return Err(malformed(&reader, "junk after document element"));
                    }
                    root_seen = true;
                }

                // A child element ends the text content of the enclosing entry
                if let Some(entry) = open.last_mut()
                    && entry.depth == depth
                {
                    entry.text_closed = true;
                }

                let attributes = read_attributes(e, &entities)
                    .map_err(|msg| malformed(&reader, &msg))?;
                let is_empty = matches!(event, Event::Empty(_));
                if e.name().as_ref() == ENTRY_TAG {
                    let slot = slots.len();
                    slots.push(None);

                    if is_empty {
                        slots[slot] = Some(build_dataset(attributes, None));
                    } else {
                        open.push(OpenEntry {
                            slot,
                            depth: depth + 1,
                            attributes,
                            text: None,
                            text_closed: false,
                        });
                    }
                }

                if !is_empty {
                    depth += 1;
                }
            }
            Event::End(_) => {
                if depth == 0 {
                    return Err(malformed(&reader, "unexpected closing tag"));
                }

                if open.last().is_some_and(|entry| entry.depth == depth)
                    && let Some(entry) = open.pop()
                {
                    slots[entry.slot] = Some(build_dataset(entry.attributes, entry.text));
                }

                depth -= 1;
            }
            Event::Text(ref t) => {
                if depth == 0 {
                    if !t.iter().all(u8::is_ascii_whitespace) {
                        return Err(malformed(&reader, "text outside of the root element"));
                    }
                    continue;
                }
                let text =
                    unescape_text(t, &entities).map_err(|msg| malformed(&reader, &msg))?;
                if let Some(entry) = innermost_text_target(&mut open, depth) {
                    entry.text.get_or_insert_with(String::new).push_str(&text);
                }
            }
            Event::CData(ref c) => {
                if depth == 0 {
                    return Err(malformed(&reader, "CDATA outside of the root element"));
                }
                if let Some(entry) = innermost_text_target(&mut open, depth) {
                    let text = std::str::from_utf8(c).map_err(|err| {
                        OdisError::MalformedDocument(format!("entry CDATA: {err}"))
                    })?;
                    entry.text.get_or_insert_with(String::new).push_str(text);
                }
            }
            Event::DocType(ref d) => {
                let doctype = std::str::from_utf8(d)
                    .map_err(|err| malformed(&reader, &format!("DOCTYPE: {err}")))?;
                entities.declare_from(doctype);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !root_seen {
        return Err(OdisError::MalformedDocument("no element found".to_string()));
    }
    if depth != 0 {
        return Err(OdisError::MalformedDocument(format!(
            "{depth} element(s) not closed at end of document"
        )));
    }

    let mut outcome = ParseOutcome::default();
    for (i, result) in slots.into_iter().flatten().enumerate() {
        match result {
            Ok(dataset) => {
                debug!(%dataset, "Parsed dataset");
                outcome.datasets.push(dataset);
            }
            Err(reason) => {
                warn!(entry = i + 1, error = %reason, "Skipping dataset entry");
                outcome.skipped.push(SkippedEntry {
                    ordinal: i + 1,
                    reason,
                });
            }
        }
    }

    if outcome.datasets.is_empty() {
        warn!(skipped = outcome.skipped.len(), "No datasets found in ODIS document");
    }

    Ok(outcome)
}

fn malformed(reader: &Reader<&[u8]>, msg: &str) -> OdisError {
    OdisError::MalformedDocument(format!("{msg} (at byte {})", reader.buffer_position()))
}

/// Entry that receives text found at `depth`, if any.
fn innermost_text_target(open: &mut [OpenEntry], depth: usize) -> Option<&mut OpenEntry> {
    open.last_mut().filter(|entry| entry.depth == depth && !entry.text_closed)
}

fn unescape_text(t: &BytesText<'_>, entities: &Entities) -> Result<String, String> {
    t.unescape_with(|name| entities.resolve(name))
        .map(|text| text.into_owned())
        .map_err(|err| format!("invalid text: {err}"))
}

/// Validate every attribute of a start tag and keep the ones an entry uses.
fn read_attributes(e: &BytesStart<'_>, entities: &Entities) -> Result<EntryAttributes, String> {
    let mut attributes = EntryAttributes::default();

    for attribute in e.attributes() {
        let attribute = attribute.map_err(|err| format!("invalid attribute: {err}"))?;
        let value = attribute
            .unescape_value_with(|name| entities.resolve(name))
            .map_err(|err| format!("invalid attribute value: {err}"))?
            .into_owned();

        let target = match attribute.key.as_ref() {
            k if k == attr::DIAGNOSTIC_ADDRESS.as_bytes() => &mut attributes.diagnostic_address,
            k if k == attr::START_ADDRESS.as_bytes() => &mut attributes.start_address,
            k if k == attr::NAME.as_bytes() => &mut attributes.name,
            k if k == attr::VERSION.as_bytes() => &mut attributes.version,
            k if k == attr::LOGIN.as_bytes() => &mut attributes.login,
            _ => continue,
        };
        *target = Some(value);
    }

    Ok(attributes)
}

fn build_dataset(attributes: EntryAttributes, text: Option<String>) -> Result<Dataset, EntryError> {
    let payload = hexcodec::decode(text.as_deref())?;
    let diagnostic_address = parse_address(
        attr::DIAGNOSTIC_ADDRESS,
        attributes.diagnostic_address.as_deref(),
    )?;
    let start_address = parse_address(attr::START_ADDRESS, attributes.start_address.as_deref())?;

    let mut dataset = Dataset::new(payload, diagnostic_address, start_address);
    if let Some(name) = attributes.name {
        dataset = dataset.with_name(name);
    }
    if let Some(version) = attributes.version {
        dataset = dataset.with_version(version);
    }
    if let Some(login) = attributes.login {
        dataset = dataset.with_login(login);
    }
    Ok(dataset)
}

/// Parse a hex address attribute (with optional 0x prefix). Missing means 0.
fn parse_address(attribute: &'static str, value: Option<&str>) -> Result<u64, EntryError> {
    let Some(value) = value else {
        return Ok(0);
    };
    let s = value.trim();
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);

    u64::from_str_radix(digits, 16).map_err(|_| EntryError::InvalidAddress {
        attribute,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;

    #[test]
    fn test_parse_single_entry() {
        // Arrange
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<MESSAGE>
  <DATA>
    <PARAMETER_DATA DIAGNOSTIC_ADDRESS="0x12" START_ADDRESS="0x100"
        ZDC_NAME="ZDC_X" ZDC_VERSION="0001" LOGIN="20103">0x01,0x02,0x03,0x04</PARAMETER_DATA>
  </DATA>
</MESSAGE>"#;

        // Act
        let outcome = parse(xml).unwrap_or_default();

        // Assert
        assert!(outcome.skipped.is_empty());
        assert_eq!(
            outcome.datasets,
            vec![
                Dataset::new(vec![1, 2, 3, 4], 0x12, 0x100)
                    .with_name("ZDC_X")
                    .with_version("0001")
                    .with_login("20103")
            ]
        );
    }

    #[test]
    fn test_parse_missing_attributes_default() {
        // Arrange
        let xml = "<R><PARAMETER_DATA>AABB</PARAMETER_DATA></R>";

        // Act
        let outcome = parse(xml).unwrap_or_default();

        // Assert
        assert_eq!(outcome.datasets, vec![Dataset::new(vec![0xAA, 0xBB], 0, 0)]);
        assert!(outcome.datasets[0].login().is_none());
    }

    #[test]
    fn test_parse_empty_attribute_is_not_absent() {
        // Arrange
        let xml = r#"<R><PARAMETER_DATA LOGIN="" ZDC_NAME="">00</PARAMETER_DATA></R>"#;

        // Act
        let outcome = parse(xml).unwrap_or_default();

        // Assert
        assert_eq!(outcome.datasets[0].login(), Some(""));
        assert_eq!(outcome.datasets[0].name(), Some(""));
        assert!(outcome.datasets[0].version().is_none());
    }

    #[test]
    fn test_parse_empty_entry_has_empty_payload() {
        // Arrange
        let xml = r#"<R><PARAMETER_DATA DIAGNOSTIC_ADDRESS="5"/><PARAMETER_DATA></PARAMETER_DATA></R>"#;

        // Act
        let outcome = parse(xml).unwrap_or_default();

        // Assert
        assert_eq!(outcome.datasets.len(), 2);
        assert!(outcome.datasets.iter().all(|ds| ds.payload().is_empty()));
        assert_eq!(outcome.datasets[0].diagnostic_address(), 5);
    }

    #[test]
    fn test_parse_skips_invalid_entries() {
        // Arrange
        let xml = r#"<R>
            <PARAMETER_DATA DIAGNOSTIC_ADDRESS="0x12">0x01,0x0</PARAMETER_DATA>
            <PARAMETER_DATA DIAGNOSTIC_ADDRESS="zz">0x01</PARAMETER_DATA>
            <PARAMETER_DATA DIAGNOSTIC_ADDRESS="0x13">0x01,0x02</PARAMETER_DATA>
        </R>"#;

        // Act
        let outcome = parse(xml).unwrap_or_default();

        // Assert
        assert_eq!(outcome.datasets, vec![Dataset::new(vec![1, 2], 0x13, 0)]);
        assert_eq!(
            outcome.skipped,
            vec![
                SkippedEntry {
                    ordinal: 1,
                    reason: EntryError::Payload(DecodeError::OddLength { digits: 3 }),
                },
                SkippedEntry {
                    ordinal: 2,
                    reason: EntryError::InvalidAddress {
                        attribute: "DIAGNOSTIC_ADDRESS",
                        value: "zz".to_string(),
                    },
                },
            ]
        );
    }

    #[test]
    fn test_parse_nested_entries_keep_document_order() {
        // Arrange
        let xml = r#"<R>
            <PARAMETER_DATA DIAGNOSTIC_ADDRESS="1">0x0a<PARAMETER_DATA DIAGNOSTIC_ADDRESS="2">0x0b</PARAMETER_DATA>0x0c</PARAMETER_DATA>
            <G><H><PARAMETER_DATA DIAGNOSTIC_ADDRESS="3"><![CDATA[0x0d, 0x0e]]></PARAMETER_DATA></H></G>
        </R>"#;

        // Act
        let outcome = parse(xml).unwrap_or_default();

        // Assert
        let addresses: Vec<u64> = outcome
            .datasets
            .iter()
            .map(Dataset::diagnostic_address)
            .collect();
        assert_eq!(addresses, vec![1, 2, 3]);
        assert_eq!(outcome.datasets[0].payload(), &[0x0A]);
        assert_eq!(outcome.datasets[1].payload(), &[0x0B]);
        assert_eq!(outcome.datasets[2].payload(), &[0x0D, 0x0E]);
    }

    #[test]
    fn test_parse_unescapes_entities() {
        // Arrange
        let xml = r#"<R><PARAMETER_DATA ZDC_NAME="A&amp;B">&#x30;&#x31;</PARAMETER_DATA></R>"#;

        // Act
        let outcome = parse(xml).unwrap_or_default();

        // Assert
        assert_eq!(outcome.datasets[0].name(), Some("A&B"));
        assert_eq!(outcome.datasets[0].payload(), &[0x01]);
    }

    #[test]
    fn test_parse_resolves_declared_entities() {
        // Arrange
        let xml = r#"<!DOCTYPE R [
  <!ENTITY data "0x01,0x02">
  <!ENTITY name 'ZDC_DECL'>
  <!ENTITY data "ignored">
]>
<R><X>&name;</X><PARAMETER_DATA ZDC_NAME="&name;">&data;</PARAMETER_DATA></R>"#;

        // Act
        let outcome = parse(xml);

        // Assert
        assert!(outcome.as_ref().is_ok(), "unexpected error: {outcome:?}");
        let outcome = outcome.unwrap_or_default();
        assert_eq!(outcome.datasets[0].payload(), &[0x01, 0x02]);
        assert_eq!(outcome.datasets[0].name(), Some("ZDC_DECL"));
    }

    #[test]
    fn test_parse_no_entries() {
        // Act
        let outcome = parse("<ODIS><OTHER/></ODIS>");

        // Assert
        assert!(outcome.is_ok_and(|o| o.datasets.is_empty() && o.skipped.is_empty()));
    }

    #[test]
    fn test_parse_malformed_documents() {
        // Arrange
        let documents = [
            "",
            "   ",
            "not xml at all",
            "<R><PARAMETER_DATA>01</R>",
            "<R><PARAMETER_DATA>01</PARAMETER_DATA>",
            "<R/><R/>",
            "<R></R>trailing",
            r#"<R><PARAMETER_DATA A="1" A="2">01</PARAMETER_DATA></R>"#,
            r#"<R a="1" a="2"><PARAMETER_DATA>01</PARAMETER_DATA></R>"#,
            "<R><X>&foo;</X><PARAMETER_DATA>01</PARAMETER_DATA></R>",
            "<R><X a=b/><PARAMETER_DATA>01</PARAMETER_DATA></R>",
            "<R><X>a & b</X><PARAMETER_DATA>01</PARAMETER_DATA></R>",
            "<R><PARAMETER_DATA>01<C>&bad;</C></PARAMETER_DATA></R>",
            "<R><PARAMETER_DATA>01</PARAMETER_DATA>&undeclared;</R>",
            r#"<R><X a="&bad;"/><PARAMETER_DATA>01</PARAMETER_DATA></R>"#,
        ];

        for doc in documents {
            // Act
            let res = parse(doc);

            // Assert
            assert!(
                matches!(res, Err(OdisError::MalformedDocument(_))),
                "expected malformed error for {doc:?}, got {res:?}"
            );
        }
    }

    #[test]
    fn test_parse_address() {
        // Assert
        assert_eq!(parse_address("A", None), Ok(0));
        assert_eq!(parse_address("A", Some("0x1F")), Ok(0x1F));
        assert_eq!(parse_address("A", Some("0X1f")), Ok(0x1F));
        assert_eq!(parse_address("A", Some(" 100 ")), Ok(0x100));
        assert!(parse_address("A", Some("")).is_err());
        assert!(parse_address("A", Some("0x")).is_err());
        assert!(parse_address("A", Some("-1")).is_err());
    }
}
