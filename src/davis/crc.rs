//! # CRC-16/CCITT Implementation
//!
//! CRC-16/CCITT checksum calculation for ISS packets (XMODEM variant).
//!
//! **Polynomial**: 0x1021 (x^16 + x^12 + x^5 + 1)
//! **Initial Value**: 0x0000, MSB first, no final XOR
//!
//! Running the CRC over the data bytes followed by their big-endian CRC yields
//! zero, which is how received packets are validated.

/// CRC-16/CCITT polynomial
const CRC16_POLY: u16 = 0x1021;

/// Precomputed CRC16 lookup table for fast calculation
const CRC16_TABLE: [u16; 256] = generate_crc16_table();

/// Generate CRC16 lookup table at compile time
const fn generate_crc16_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;

    while i < 256 {
        let mut crc = (i as u16) << 8;
        let mut j = 0;

        while j < 8 {
            if (crc & 0x8000) != 0 {
                crc = (crc << 1) ^ CRC16_POLY;
            } else {
                crc <<= 1;
            }
            j += 1;
        }

        table[i] = crc;
        i += 1;
    }

    table
}

/// Calculate CRC-16/CCITT checksum using lookup table (fast)
///
/// # Arguments
///
/// * `data` - Byte slice to calculate CRC for (bit-corrected packet bytes)
///
/// # Returns
///
/// * `u16` - Calculated CRC16 checksum
///
/// # Examples
///
/// ```
/// use iss_bridge::davis::crc::crc16_ccitt;
///
/// assert_eq!(crc16_ccitt(b"123456789"), 0x31C3);
/// ```
pub fn crc16_ccitt(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;

    for &byte in data {
        let index = ((crc >> 8) as u8 ^ byte) as usize;
        crc = (crc << 8) ^ CRC16_TABLE[index];
    }

    crc
}

/// Calculate CRC-16/CCITT checksum using direct algorithm (slow, for verification)
///
/// Bit-at-a-time form of the same checksum. Used primarily for testing the
/// lookup table implementation.
#[allow(dead_code)]
fn crc16_ccitt_slow(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;

    for &byte in data {
        crc ^= (byte as u16) << 8;

        for _ in 0..8 {
            if (crc & 0x8000) != 0 {
                crc = (crc << 1) ^ CRC16_POLY;
            } else {
                crc <<= 1;
            }
        }
    }

    crc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc16_empty() {
        assert_eq!(crc16_ccitt(&[]), 0x0000);
    }

    #[test]
    fn test_crc16_check_value() {
        // Standard check value for CRC-16/XMODEM
        assert_eq!(crc16_ccitt(b"123456789"), 0x31C3);
        assert_eq!(crc16_ccitt_slow(b"123456789"), 0x31C3);
    }

    #[test]
    fn test_crc16_lookup_table_matches_slow() {
        let test_data = [
            vec![0x01, 0x02, 0x03],
            vec![0xFF, 0xFE, 0xFD],
            vec![0xA0, 0x05, 0x40, 0x64, 0x00, 0x00],
            vec![0x00; 10],
            vec![0xFF; 10],
        ];

        for data in test_data.iter() {
            assert_eq!(
                crc16_ccitt(data),
                crc16_ccitt_slow(data),
                "CRC mismatch for data: {:?}",
                data
            );
        }
    }

    #[test]
    fn test_crc16_with_appended_trailer_is_zero() {
        let mut frame = vec![0x81, 0x02, 0x7F, 0x03, 0x20, 0x00, 0xAA, 0x55];
        let crc = crc16_ccitt(&frame);
        frame.extend_from_slice(&crc.to_be_bytes());

        assert_eq!(frame.len(), 10);
        assert_eq!(crc16_ccitt(&frame), 0);
    }

    #[test]
    fn test_crc16_detects_every_single_bit_flip() {
        let mut frame = vec![0x81, 0x02, 0x7F, 0x03, 0x20, 0x00, 0xAA, 0x55];
        let crc = crc16_ccitt(&frame);
        frame.extend_from_slice(&crc.to_be_bytes());

        for byte in 0..frame.len() {
            for bit in 0..8 {
                let mut corrupted = frame.clone();
                corrupted[byte] ^= 1 << bit;
                assert_ne!(
                    crc16_ccitt(&corrupted),
                    0,
                    "Flip of bit {} in byte {} went undetected",
                    bit,
                    byte
                );
            }
        }
    }

    #[test]
    fn test_crc16_changes_with_data() {
        let crc1 = crc16_ccitt(&[0xA0, 0x05, 0x40, 0x64]);
        let crc2 = crc16_ccitt(&[0xA0, 0x05, 0x40, 0x65]);

        assert_ne!(crc1, crc2, "CRC should change when data changes");
    }
}
