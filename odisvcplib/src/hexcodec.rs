//! The `hexcodec` module converts between raw bytes and the textual hex form used in both
//! ODIS and VCP documents.
//!
//! Decoding is lenient: the `0x` prefixes, whitespace and comma separators found in real
//! ODIS exports are dropped before the digits are interpreted. Encoding always produces the
//! canonical VCP form, e.g. `0x0a,0xff`.

use crate::error::DecodeError;
use regex::Regex;
use std::fmt::Write;
use std::sync::LazyLock;

/// Matches everything that is formatting noise around the hex digits.
#[allow(clippy::expect_used)]
static HEX_NOISE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"0x|\s|,").expect("hex noise pattern is valid"));

/// Decode hex text into bytes.
///
/// `None` (an element without text) decodes to an empty vector.
///
/// # Errors
/// Returns an error if the cleaned digit string has odd length or contains
/// non-hex characters.
///
/// # Example
/// ```
/// use odisvcplib::hexcodec;
///
/// let bytes = hexcodec::decode(Some("0x0A, 0xff\n0x10")).unwrap();
/// assert_eq!(bytes, vec![0x0A, 0xFF, 0x10]);
///
/// assert!(hexcodec::decode(None).unwrap().is_empty());
/// ```
pub fn decode(text: Option<&str>) -> Result<Vec<u8>, DecodeError> {
    let Some(text) = text else {
        return Ok(Vec::new());
    };

    let digits = HEX_NOISE.replace_all(text, "");

    let count = digits.chars().count();
    if count % 2 != 0 {
        return Err(DecodeError::OddLength { digits: count });
    }
    if let Some((index, character)) = digits
        .chars()
        .enumerate()
        .find(|(_, c)| !c.is_ascii_hexdigit())
    {
        return Err(DecodeError::InvalidCharacter { character, index });
    }

    // Only ASCII hex digits are left, so positions and lengths agree with `hex`
    hex::decode(digits.as_bytes()).map_err(|err| match err {
        hex::FromHexError::InvalidHexCharacter { c, index } => DecodeError::InvalidCharacter {
            character: c,
            index,
        },
        _ => DecodeError::OddLength { digits: count },
    })
}

/// Encode bytes as comma-separated, `0x`-prefixed lowercase byte values.
///
/// # Example
/// ```
/// use odisvcplib::hexcodec;
///
/// assert_eq!(hexcodec::encode(&[0x0A, 0xFF]), "0x0a,0xff");
/// assert_eq!(hexcodec::encode(&[]), "");
/// ```
#[must_use]
pub fn encode(bytes: &[u8]) -> String {
    // "0x" + 2 digits + ","
    let mut out = String::with_capacity(bytes.len() * 5);
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        // Writing into a String cannot fail
        let _ = write!(out, "0x{byte:02x}");
    }
    out
}
