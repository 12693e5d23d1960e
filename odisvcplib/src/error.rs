//! The `error` module defines the errors that can occur while converting an ODIS document.
//!
//! There are two levels of failure:
//! 1. [`OdisError`] aborts the whole conversion (malformed XML, undersized replacement
//!    payload, I/O failure of the output sink).
//! 2. [`EntryError`] describes why a single `PARAMETER_DATA` entry was skipped. It never
//!    aborts parsing and is only reported via [`SkippedEntry`](crate::SkippedEntry).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OdisError {
    /// Source text is not a well-formed XML document
    #[error("Malformed source document: {0}")]
    MalformedDocument(String),
    /// Hex text could not be decoded
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// Replacement payload cannot hold the 4-byte checksum footer
    #[error(
        "Replacement payload is {length} byte(s) long, at least {} are required for the checksum footer",
        crate::checksum::FOOTER_LEN
    )]
    InvalidPayload { length: usize },
    /// Output sink failure
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Failure while building the VCP document text
    #[error("Failed to serialize VCP document: {0}")]
    Serialize(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Number of hex digits left after cleaning is odd
    #[error("Hex string has an odd number of digits ({digits})")]
    OddLength { digits: usize },
    /// Cleaned hex string contains a non-hex character
    #[error("Invalid hex character {character:?} at position {index}")]
    InvalidCharacter { character: char, index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntryError {
    /// Address attribute is not a hexadecimal unsigned integer
    #[error("Attribute {attribute} has invalid hex address {value:?}")]
    InvalidAddress {
        attribute: &'static str,
        value: String,
    },
    /// Entry text is not valid hex payload
    #[error("Invalid payload: {0}")]
    Payload(#[from] DecodeError),
}
