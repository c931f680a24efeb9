//! Cursor over the values section of a loaded page.

use bytes::Bytes;

use sheaf_column::column::ScalarColumn;
use sheaf_common::{Error, Result};
use sheaf_format::schema::PhysicalType;

/// Decode-time options, fixed per chunk reader.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Offset added to decoded `Timestamp` values, normalizing file-local
    /// timestamps to the session time zone. Applied in microseconds.
    pub timestamp_offset_secs: i32,
}

/// Streaming decoder over the values section of one page.
///
/// The section stores present values only: fixed-width little-endian
/// values, length-prefixed byte strings, or `u32` dictionary codes,
/// depending on the leaf type and the page encoding.
pub(crate) struct ValueDecoder {
    buf: Bytes,
    pos: usize,
    type_desc: PhysicalType,
    ts_offset_micros: i64,
}

impl ValueDecoder {
    pub(crate) fn new(buf: Bytes, type_desc: PhysicalType, opts: &DecodeOptions) -> ValueDecoder {
        ValueDecoder {
            buf,
            pos: 0,
            type_desc,
            ts_offset_micros: opts.timestamp_offset_secs as i64 * 1_000_000,
        }
    }

    /// Appends the next `count` plain values to `column`.
    pub(crate) fn decode_plain(&mut self, column: &mut ScalarColumn, count: usize) -> Result<()> {
        match self.type_desc {
            PhysicalType::Binary => {
                for _ in 0..count {
                    let len = self.read_u32()? as usize;
                    let bytes = self.take(len)?;
                    column.push_binary(bytes);
                }
            }
            PhysicalType::Timestamp if self.ts_offset_micros != 0 => {
                for _ in 0..count {
                    let bytes = self.take(8)?;
                    let mut le = [0u8; 8];
                    le.copy_from_slice(bytes);
                    column
                        .values
                        .push(i64::from_le_bytes(le).wrapping_add(self.ts_offset_micros));
                }
            }
            _ => {
                let size = self
                    .type_desc
                    .fixed_size()
                    .expect("fixed-size physical type");
                let bytes = self.take(count * size)?;
                column.values.push_bytes(bytes);
            }
        }
        Ok(())
    }

    /// Advances past the next `count` plain values without materializing.
    pub(crate) fn skip_plain(&mut self, count: usize) -> Result<()> {
        match self.type_desc.fixed_size() {
            Some(size) => {
                self.take(count * size)?;
            }
            None => {
                for _ in 0..count {
                    let len = self.read_u32()? as usize;
                    self.take(len)?;
                }
            }
        }
        Ok(())
    }

    /// Appends the next `count` dictionary codes to `out`.
    pub(crate) fn decode_codes(&mut self, out: &mut Vec<u32>, count: usize) -> Result<()> {
        out.reserve(count);
        for _ in 0..count {
            out.push(self.read_u32()?);
        }
        Ok(())
    }

    pub(crate) fn skip_codes(&mut self, count: usize) -> Result<()> {
        self.take(count * 4)?;
        Ok(())
    }

    fn take(&mut self, len: usize) -> Result<&[u8]> {
        if self.pos + len > self.buf.len() {
            return Err(Error::corruption(
                "page values",
                "truncated values section",
            ));
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use sheaf_column::column::ScalarColumn;
    use sheaf_format::schema::PhysicalType;

    use super::{DecodeOptions, ValueDecoder};

    #[test]
    fn test_decode_fixed_width() {
        let buf: Vec<u8> = [10i64, -3, 42].iter().flat_map(|v| v.to_le_bytes()).collect();
        let mut decoder = ValueDecoder::new(
            Bytes::from(buf),
            PhysicalType::Int64,
            &DecodeOptions::default(),
        );
        let mut column = ScalarColumn::new(PhysicalType::Int64);
        decoder.decode_plain(&mut column, 2).unwrap();
        decoder.skip_plain(1).unwrap();
        assert_eq!(column.as_slice::<i64>(), [10, -3]);
        assert!(decoder.decode_plain(&mut column, 1).is_err());
    }

    #[test]
    fn test_decode_binary() {
        let mut buf = Vec::new();
        for value in [b"ab".as_slice(), b"", b"xyz"] {
            buf.extend_from_slice(&(value.len() as u32).to_le_bytes());
            buf.extend_from_slice(value);
        }
        let mut decoder = ValueDecoder::new(
            Bytes::from(buf),
            PhysicalType::Binary,
            &DecodeOptions::default(),
        );
        let mut column = ScalarColumn::new(PhysicalType::Binary);
        decoder.skip_plain(1).unwrap();
        decoder.decode_plain(&mut column, 2).unwrap();
        assert_eq!(column.binary_at(0), b"");
        assert_eq!(column.binary_at(1), b"xyz");
    }

    #[test]
    fn test_timestamp_offset_applied() {
        let micros = 1_700_000_000_000_000i64;
        let buf: Vec<u8> = micros.to_le_bytes().into();
        let opts = DecodeOptions {
            timestamp_offset_secs: -3600,
        };
        let mut decoder = ValueDecoder::new(Bytes::from(buf), PhysicalType::Timestamp, &opts);
        let mut column = ScalarColumn::new(PhysicalType::Timestamp);
        decoder.decode_plain(&mut column, 1).unwrap();
        assert_eq!(column.as_slice::<i64>(), [micros - 3600 * 1_000_000]);
    }

    #[test]
    fn test_decode_codes() {
        let buf: Vec<u8> = [5u32, 0, 7].iter().flat_map(|v| v.to_le_bytes()).collect();
        let mut decoder = ValueDecoder::new(
            Bytes::from(buf),
            PhysicalType::Binary,
            &DecodeOptions::default(),
        );
        let mut codes = Vec::new();
        decoder.decode_codes(&mut codes, 2).unwrap();
        assert_eq!(codes, [5, 0]);
        decoder.skip_codes(1).unwrap();
        assert!(decoder.skip_codes(1).is_err());
    }
}
