//! Persistent calibration record
//!
//! Fixed little-endian layout:
//!
//! | Bytes | Field |
//! |---|---|
//! | 0..4 | magic `"LLSC"` (`0x4C4C5343`) |
//! | 4 | version |
//! | 5 | electrode count |
//! | 6..8 | reserved, zero |
//! | 8..8+2N | offsets, `i16` each |
//! | 8+2N..12+2N | CRC32 over everything before it |

use crate::level::Offsets;

/// Magic number to identify a calibration record
pub const CALIBRATION_MAGIC: u32 = 0x4C4C5343; // "LLSC"

/// Current record layout version
pub const CALIBRATION_VERSION: u8 = 1;

const HEADER_LEN: usize = 8;
const CRC_LEN: usize = 4;

/// Why stored bytes were not accepted as a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RecordError {
    /// Storage erased or never written
    Blank,
    /// Fewer bytes than the layout needs
    Truncated,
    BadMagic,
    UnsupportedVersion(u8),
    /// Record was written for a different strip
    CountMismatch { stored: u8 },
    Crc,
}

/// Empty-vessel offsets of every electrode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationRecord<const N: usize> {
    pub offsets: Offsets<N>,
}

impl<const N: usize> CalibrationRecord<N> {
    /// Encoded size in bytes
    pub const ENCODED_LEN: usize = HEADER_LEN + 2 * N + CRC_LEN;

    pub const fn new(offsets: Offsets<N>) -> Self {
        Self { offsets }
    }

    /// Serialize into the start of `buf`, returning the bytes used
    ///
    /// Returns `None` when `buf` is shorter than [`Self::ENCODED_LEN`].
    pub fn encode(&self, buf: &mut [u8]) -> Option<usize> {
        let out = buf.get_mut(..Self::ENCODED_LEN)?;

        out[0..4].copy_from_slice(&CALIBRATION_MAGIC.to_le_bytes());
        out[4] = CALIBRATION_VERSION;
        out[5] = N as u8;
        out[6] = 0;
        out[7] = 0;
        for (i, offset) in self.offsets.iter().enumerate() {
            let at = HEADER_LEN + 2 * i;
            out[at..at + 2].copy_from_slice(&offset.to_le_bytes());
        }

        let body = Self::ENCODED_LEN - CRC_LEN;
        let crc = crc32(&out[..body]);
        out[body..].copy_from_slice(&crc.to_le_bytes());

        Some(Self::ENCODED_LEN)
    }

    /// Parse and verify a record
    pub fn decode(bytes: &[u8]) -> Result<Self, RecordError> {
        let bytes = bytes.get(..Self::ENCODED_LEN).ok_or(RecordError::Truncated)?;

        if bytes.iter().all(|&b| b == 0xFF) || bytes.iter().all(|&b| b == 0x00) {
            return Err(RecordError::Blank);
        }

        let magic = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        if magic != CALIBRATION_MAGIC {
            return Err(RecordError::BadMagic);
        }
        if bytes[4] != CALIBRATION_VERSION {
            return Err(RecordError::UnsupportedVersion(bytes[4]));
        }
        if bytes[5] as usize != N {
            return Err(RecordError::CountMismatch { stored: bytes[5] });
        }

        let body = Self::ENCODED_LEN - CRC_LEN;
        let stored = u32::from_le_bytes([
            bytes[body],
            bytes[body + 1],
            bytes[body + 2],
            bytes[body + 3],
        ]);
        if stored != crc32(&bytes[..body]) {
            return Err(RecordError::Crc);
        }

        let mut offsets = [0i16; N];
        for (i, offset) in offsets.iter_mut().enumerate() {
            let at = HEADER_LEN + 2 * i;
            *offset = i16::from_le_bytes([bytes[at], bytes[at + 1]]);
        }

        Ok(Self { offsets })
    }
}

/// CRC32 (IEEE 802.3 polynomial)
pub fn crc32(data: &[u8]) -> u32 {
    !crc32_update(0xFFFFFFFF, data)
}

fn crc32_update(crc: u32, data: &[u8]) -> u32 {
    const POLY: u32 = 0xEDB88320;
    let mut crc = crc;

    for &byte in data {
        crc ^= byte as u32;
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ POLY;
            } else {
                crc >>= 1;
            }
        }
    }

    crc
}

#[cfg(test)]
mod tests {
    use super::*;

    const OFFSETS: [i16; 12] = [0, 1486, 1864, 2563, 2680, 1892, 1905, 1825, 1904, 2024, 2086, 884];

    #[test]
    fn test_crc32_check_value() {
        assert_eq!(crc32(b"123456789"), 0xCBF43926);
    }

    #[test]
    fn test_encoded_layout() {
        let record = CalibrationRecord::new(OFFSETS);
        let mut buf = [0u8; 64];
        let len = record.encode(&mut buf).unwrap();

        assert_eq!(len, 36);
        assert_eq!(&buf[0..4], &[0x43, 0x53, 0x4C, 0x4C]);
        assert_eq!(buf[4], CALIBRATION_VERSION);
        assert_eq!(buf[5], 12);
        assert_eq!(&buf[8..10], &0i16.to_le_bytes());
        assert_eq!(&buf[10..12], &1486i16.to_le_bytes());
    }

    #[test]
    fn test_encode_short_buffer() {
        let record = CalibrationRecord::new(OFFSETS);
        let mut buf = [0u8; 35];
        assert_eq!(record.encode(&mut buf), None);
    }

    #[test]
    fn test_decode_encoded() {
        let record = CalibrationRecord::new(OFFSETS);
        let mut buf = [0u8; 36];
        record.encode(&mut buf).unwrap();
        assert_eq!(CalibrationRecord::<12>::decode(&buf), Ok(record));
    }

    #[test]
    fn test_decode_blank() {
        assert_eq!(CalibrationRecord::<12>::decode(&[0xFF; 36]), Err(RecordError::Blank));
        assert_eq!(CalibrationRecord::<12>::decode(&[0x00; 36]), Err(RecordError::Blank));
    }

    #[test]
    fn test_decode_truncated() {
        assert_eq!(CalibrationRecord::<12>::decode(&[0x11; 20]), Err(RecordError::Truncated));
    }

    #[test]
    fn test_decode_corrupt_crc() {
        let mut buf = [0u8; 36];
        CalibrationRecord::new(OFFSETS).encode(&mut buf).unwrap();
        buf[12] ^= 0x01;
        assert_eq!(CalibrationRecord::<12>::decode(&buf), Err(RecordError::Crc));
    }

    #[test]
    fn test_decode_wrong_count() {
        let mut buf = [0u8; 36];
        CalibrationRecord::new(OFFSETS).encode(&mut buf).unwrap();
        assert_eq!(
            CalibrationRecord::<11>::decode(&buf),
            Err(RecordError::CountMismatch { stored: 12 })
        );
    }

    #[test]
    fn test_decode_bad_magic_and_version() {
        let mut buf = [0u8; 36];
        CalibrationRecord::new(OFFSETS).encode(&mut buf).unwrap();

        let mut bad_magic = buf;
        bad_magic[0] = b'X';
        assert_eq!(CalibrationRecord::<12>::decode(&bad_magic), Err(RecordError::BadMagic));

        let mut bad_version = buf;
        bad_version[4] = 9;
        assert_eq!(
            CalibrationRecord::<12>::decode(&bad_version),
            Err(RecordError::UnsupportedVersion(9))
        );
    }
}
