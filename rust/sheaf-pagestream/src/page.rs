//! Page envelope of the chunk stream.

use sheaf_common::{Error, Result, verify_data};

/// Encoded length of a [`PageHeader`].
pub const PAGE_HEADER_LEN: usize = 18;

/// Discriminates dictionary pages from data pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Data,
    Dictionary,
}

/// Encoding of the values section of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageEncoding {
    /// Fixed-width little-endian values, or length-prefixed byte strings.
    Plain,
    /// One `u32` dictionary code per present value.
    DictCodes,
}

/// Fixed-size header preceding every page body.
///
/// The body is laid out as repetition level runs, then definition level
/// runs, then the values section, with the section lengths recorded here.
/// `num_values` counts level slots, including nulls; the values section
/// holds only the present values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageHeader {
    pub kind: PageKind,
    pub encoding: PageEncoding,
    pub num_values: u32,
    pub rep_levels_len: u32,
    pub def_levels_len: u32,
    pub values_len: u32,
}

impl PageHeader {
    pub fn parse(buf: &[u8]) -> Result<PageHeader> {
        verify_data!(page_header, buf.len() >= PAGE_HEADER_LEN);
        let kind = match buf[0] {
            0 => PageKind::Data,
            1 => PageKind::Dictionary,
            code => {
                return Err(Error::corruption(
                    "page header",
                    format!("unknown page kind {code}"),
                ));
            }
        };
        let encoding = match buf[1] {
            0 => PageEncoding::Plain,
            1 => PageEncoding::DictCodes,
            code => {
                return Err(Error::corruption(
                    "page header",
                    format!("unknown page encoding {code}"),
                ));
            }
        };
        Ok(PageHeader {
            kind,
            encoding,
            num_values: read_u32(buf, 2),
            rep_levels_len: read_u32(buf, 6),
            def_levels_len: read_u32(buf, 10),
            values_len: read_u32(buf, 14),
        })
    }

    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.push(match self.kind {
            PageKind::Data => 0,
            PageKind::Dictionary => 1,
        });
        buf.push(match self.encoding {
            PageEncoding::Plain => 0,
            PageEncoding::DictCodes => 1,
        });
        buf.extend_from_slice(&self.num_values.to_le_bytes());
        buf.extend_from_slice(&self.rep_levels_len.to_le_bytes());
        buf.extend_from_slice(&self.def_levels_len.to_le_bytes());
        buf.extend_from_slice(&self.values_len.to_le_bytes());
    }

    /// Length of the page body, in bytes.
    pub fn body_len(&self) -> u64 {
        self.rep_levels_len as u64 + self.def_levels_len as u64 + self.values_len as u64
    }

    /// Total encoded length of the page, header included.
    pub fn page_len(&self) -> u64 {
        PAGE_HEADER_LEN as u64 + self.body_len()
    }
}

fn read_u32(buf: &[u8], pos: usize) -> u32 {
    let mut le = [0u8; 4];
    le.copy_from_slice(&buf[pos..pos + 4]);
    u32::from_le_bytes(le)
}
