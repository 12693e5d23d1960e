//! The `pipeline` module chains the conversion stages:
//! parse -> (optional payload update) -> serialize -> emit.
//!
//! Only the first dataset of a document is acted upon: the replacement payload is applied
//! to it and it is the only one written by [`Conversion::emit`]. Further datasets are still
//! parsed and serialized, and stay available via [`Conversion::results`].

use crate::dataset::ConversionResult;
use crate::error::OdisError;
use crate::parser::{self, SkippedEntry};
use crate::serializer;
use crate::updater;
use std::io::Write;
use tracing::{info, warn};

/// Kind of output produced by a conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputMode {
    /// Raw payload bytes of the first dataset
    Raw,
    /// VCP document of the first dataset
    Vcp,
    /// VCP document of the first dataset after its payload was replaced
    VcpModified { modifier_name: String },
}

impl OutputMode {
    /// Select the output mode. Raw output takes precedence over a replacement payload.
    ///
    /// # Example
    /// ```
    /// use odisvcplib::OutputMode;
    ///
    /// assert_eq!(OutputMode::resolve(true, Some("mod")), OutputMode::Raw);
    /// assert_eq!(OutputMode::resolve(false, None), OutputMode::Vcp);
    /// assert_eq!(
    ///     OutputMode::resolve(false, Some("mod")),
    ///     OutputMode::VcpModified { modifier_name: "mod".to_string() }
    /// );
    /// ```
    #[must_use]
    pub fn resolve(raw: bool, modifier_name: Option<&str>) -> Self {
        match (raw, modifier_name) {
            (true, _) => Self::Raw,
            (false, Some(name)) => Self::VcpModified {
                modifier_name: name.to_string(),
            },
            (false, None) => Self::Vcp,
        }
    }

    /// File name used when no explicit output path is given.
    ///
    /// # Example
    /// ```
    /// use odisvcplib::OutputMode;
    ///
    /// assert_eq!(OutputMode::Raw.default_file_name("in"), "RAW_in.bin");
    /// assert_eq!(OutputMode::Vcp.default_file_name("in"), "VCP_converted_in.xml");
    /// ```
    #[must_use]
    pub fn default_file_name(&self, input_name: &str) -> String {
        match self {
            Self::Raw => format!("RAW_{input_name}.bin"),
            Self::Vcp => format!("VCP_converted_{input_name}.xml"),
            Self::VcpModified { modifier_name } => {
                format!("VCP_mod_{input_name}_by_{modifier_name}.xml")
            }
        }
    }
}

/// Payload that replaces the first dataset's payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    /// Base name of the replacement source, used in output file names
    pub name: String,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    /// Base name of the input document, used to name datasets without `ZDC_NAME`
    input_name: String,
    raw: bool,
    replacement: Option<Replacement>,
}

/// Successful conversion, ready to be emitted.
#[derive(Debug, Clone)]
pub struct Conversion {
    mode: OutputMode,
    results: Vec<ConversionResult>,
    skipped: Vec<SkippedEntry>,
    checksum: Option<u32>,
}

#[derive(Debug, Clone)]
pub enum Outcome {
    /// The document contained no usable dataset. Not an error.
    NothingToDo { skipped: Vec<SkippedEntry> },
    Converted(Conversion),
}

impl Pipeline {
    #[must_use]
    pub fn new(input_name: impl Into<String>) -> Self {
        Self {
            input_name: input_name.into(),
            raw: false,
            replacement: None,
        }
    }

    /// Emit the raw payload instead of a VCP document.
    #[must_use]
    pub const fn raw(mut self, raw: bool) -> Self {
        self.raw = raw;
        self
    }

    /// Replace the first dataset's payload and recompute its checksum footer.
    #[must_use]
    pub fn replacement(mut self, replacement: Replacement) -> Self {
        self.replacement = Some(replacement);
        self
    }

    #[must_use]
    pub fn output_mode(&self) -> OutputMode {
        OutputMode::resolve(self.raw, self.replacement.as_ref().map(|r| r.name.as_str()))
    }

    /// Parse `document`, apply the replacement payload and serialize all datasets.
    ///
    /// # Errors
    /// - Returns an error if the document is not well-formed XML
    /// - Returns an error if the replacement payload is shorter than the checksum footer
    ///
    /// # Example
    /// ```
    /// use odisvcplib::{Outcome, Pipeline};
    ///
    /// let xml = r#"<R><PARAMETER_DATA DIAGNOSTIC_ADDRESS="0x12">0x01</PARAMETER_DATA></R>"#;
    /// let outcome = Pipeline::new("sample").convert(xml).unwrap();
    ///
    /// let Outcome::Converted(conversion) = outcome else { panic!("expected a conversion") };
    /// assert!(conversion.results()[0].vcp.contains("sample-12"));
    /// ```
    pub fn convert(&self, document: &str) -> Result<Outcome, OdisError> {
        let parsed = parser::parse(document)?;
        let mut datasets = parsed.datasets;

        let Some(first) = datasets.first_mut() else {
            warn!("No datasets found, nothing to convert");
            return Ok(Outcome::NothingToDo {
                skipped: parsed.skipped,
            });
        };

        let checksum = match &self.replacement {
            Some(replacement) => {
                info!(source = %replacement.name, "Replacing payload of the first dataset");
                let crc = updater::update_payload(first, replacement.payload.clone())?;
                info!(crc = %format!("0x{crc:08x}"), "New CRC");
                Some(crc)
            }
            None => None,
        };

        let results = serializer::serialize_all(&datasets, &self.input_name)?;

        Ok(Outcome::Converted(Conversion {
            mode: self.output_mode(),
            results,
            skipped: parsed.skipped,
            checksum,
        }))
    }

    /// Convert `document` and write the result into `sink`.
    ///
    /// # Errors
    /// Returns conversion errors (see [`Pipeline::convert`]) and I/O errors of the sink.
    pub fn run<W: Write>(&self, document: &str, sink: &mut W) -> Result<Outcome, OdisError> {
        let outcome = self.convert(document)?;
        if let Outcome::Converted(conversion) = &outcome {
            conversion.emit(sink)?;
        }
        Ok(outcome)
    }
}

impl Conversion {
    #[must_use]
    pub const fn mode(&self) -> &OutputMode {
        &self.mode
    }

    /// All serialized datasets in document order.
    #[must_use]
    pub fn results(&self) -> &[ConversionResult] {
        &self.results
    }

    #[must_use]
    pub fn skipped(&self) -> &[SkippedEntry] {
        &self.skipped
    }

    /// Checksum written into the first dataset, if its payload was replaced.
    #[must_use]
    pub const fn checksum(&self) -> Option<u32> {
        self.checksum
    }

    /// Write the first dataset to `sink` according to the output mode.
    /// Returns the number of bytes written.
    ///
    /// # Errors
    /// Returns an error if writing to `sink` fails.
    pub fn emit<W: Write>(&self, sink: &mut W) -> Result<usize, OdisError> {
        let Some(first) = self.results.first() else {
            return Ok(0);
        };

        let bytes: &[u8] = match &self.mode {
            OutputMode::Raw => first.dataset.payload(),
            OutputMode::Vcp | OutputMode::VcpModified { .. } => first.vcp.as_bytes(),
        };
        sink.write_all(bytes)?;
        sink.flush()?;

        Ok(bytes.len())
    }
}
