//! The `updater` module replaces the payload of a [`Dataset`] and refreshes its CRC footer.

use crate::checksum::{self, FOOTER_LEN};
use crate::dataset::Dataset;
use crate::error::OdisError;
use tracing::debug;

/// Replace the dataset payload with `new_payload` and rewrite its last 4 bytes with the
/// little-endian CRC-32 of all preceding bytes. Returns the new checksum value.
///
/// # Errors
/// Returns [`OdisError::InvalidPayload`] if `new_payload` is shorter than the checksum
/// footer. The dataset is left untouched in that case.
///
/// # Example
/// ```
/// use odisvcplib::{Dataset, checksum, updater};
///
/// let mut ds = Dataset::new(vec![0xAA; 8], 0x12, 0);
/// let crc = updater::update_payload(&mut ds, vec![0x10, 0x20, 0, 0, 0, 0]).unwrap();
///
/// assert_eq!(crc, checksum::compute(&[0x10, 0x20]));
/// assert_eq!(&ds.payload()[2..], &crc.to_le_bytes());
/// ```
pub fn update_payload(dataset: &mut Dataset, new_payload: Vec<u8>) -> Result<u32, OdisError> {
    if new_payload.len() < FOOTER_LEN {
        return Err(OdisError::InvalidPayload {
            length: new_payload.len(),
        });
    }

    dataset.payload = new_payload;

    let body_len = dataset.payload.len() - FOOTER_LEN;
    let crc = checksum::compute(&dataset.payload[..body_len]);
    dataset.payload[body_len..].copy_from_slice(&checksum::to_le_bytes(crc));

    debug!(crc = %format!("0x{crc:08x}"), size = dataset.payload.len(), "Payload replaced");
    Ok(crc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_payload_rewrites_footer() {
        // Arrange
        let mut ds = Dataset::new(vec![1, 2, 3, 4], 0x12, 0x100);
        let new_payload = vec![0x10, 0x20, 0x30, 0x40, 0x50, 0x60];

        // Act
        let res = update_payload(&mut ds, new_payload);

        // Assert
        let crc = checksum::compute(&[0x10, 0x20]);
        assert!(matches!(res, Ok(v) if v == crc));
        let mut expected = vec![0x10, 0x20];
        expected.extend_from_slice(&crc.to_le_bytes());
        assert_eq!(ds.payload(), expected.as_slice());
    }

    #[test]
    fn test_update_payload_footer_only() {
        // Arrange
        let mut ds = Dataset::new(vec![], 0, 0);

        // Act
        let res = update_payload(&mut ds, vec![0xFF; 4]);

        // Assert
        assert!(matches!(res, Ok(0)));
        assert_eq!(ds.payload(), &[0, 0, 0, 0]);
    }

    #[test]
    fn test_update_payload_too_short() {
        // Arrange
        let original = Dataset::new(vec![9, 9, 9, 9, 9], 1, 2);

        for len in 0..FOOTER_LEN {
            let mut ds = original.clone();

            // Act
            let res = update_payload(&mut ds, vec![0; len]);

            // Assert
            assert!(matches!(res, Err(OdisError::InvalidPayload { length }) if length == len));
            assert_eq!(ds, original);
        }
    }

    #[test]
    fn test_update_payload_idempotent() {
        // Arrange
        let mut ds = Dataset::new(vec![], 0, 0);
        let new_payload: Vec<u8> = (0..=255).collect();

        // Act
        let first = update_payload(&mut ds, new_payload.clone()).ok();
        let after_first = ds.clone();
        let second = update_payload(&mut ds, new_payload).ok();

        // Assert
        assert!(first.is_some());
        assert_eq!(first, second);
        assert_eq!(ds, after_first);
    }
}
