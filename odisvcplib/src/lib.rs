//! # `odisvcplib`
//!
//! `odisvcplib` is a Rust library for converting ODIS calibration datasets (XML with
//! hex-encoded `PARAMETER_DATA` payloads) into VCP `SW-CNT` documents or raw binaries.
//!
//! The library provides:
//! - Parser for ODIS documents (via [`parser::parse`]), tolerant of broken entries.
//! - Hex text codec (via [`hexcodec`]) and the dataset CRC-32 (via [`checksum`]).
//! - Payload replacement with checksum footer update (via [`updater::update_payload`]).
//! - VCP serialization (via [`serializer::serialize`]).
//! - A [`Pipeline`] chaining all of the above into a single output.
//! - Error handling with [`OdisError`].
//!
//! ## Example
//!
//! ```
//! use odisvcplib::{Pipeline, Replacement};
//!
//! let xml = r#"<ODIS><PARAMETER_DATA DIAGNOSTIC_ADDRESS="0x12">0x01,0x02,0x03,0x04</PARAMETER_DATA></ODIS>"#;
//!
//! let mut out = Vec::new();
//! Pipeline::new("sample")
//!     .replacement(Replacement { name: "patch".into(), payload: vec![0xAA; 8] })
//!     .run(xml, &mut out)
//!     .unwrap();
//!
//! assert!(String::from_utf8(out).unwrap().contains("<DATAIID>sample-12</DATAIID>"));
//! ```

pub mod checksum;
mod dataset;
mod error;
pub mod hexcodec;
pub mod parser;
mod pipeline;
pub mod serializer;
pub mod updater;

// Public APIs
pub use dataset::{ConversionResult, Dataset};
pub use error::{DecodeError, EntryError, OdisError};
pub use parser::{ParseOutcome, SkippedEntry};
pub use pipeline::{Conversion, Outcome, OutputMode, Pipeline, Replacement};
