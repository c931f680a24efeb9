//! File, row-group and column-chunk descriptors, with the footer codec used
//! to persist them.
//!
//! A sheaf file lays out all column chunks back to back, followed by the
//! encoded [`FileMeta`] and an 8-byte tail: the metadata length (`u32`,
//! little-endian) and the magic `SHF1`.

use sheaf_common::{Error, Result, verify_arg, verify_data};

use crate::schema::{FieldKind, FieldSchema, PhysicalType};

pub const FOOTER_MAGIC: [u8; 4] = *b"SHF1";
pub const FOOTER_TAIL_LEN: usize = 8;

/// Descriptor of one column chunk within a row group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnChunkMeta {
    /// Absolute file offset of the first page. When the chunk carries a
    /// dictionary, this is the dictionary page.
    pub file_offset: u64,
    /// Total size of all pages of this chunk, in bytes.
    pub size: u64,
    /// Total number of leaf values (level entries) across the data pages.
    pub num_values: u64,
    pub has_dictionary: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowGroupMeta {
    pub num_rows: u64,
    /// One entry per leaf column, ordered by physical column index.
    pub columns: Vec<ColumnChunkMeta>,
}

#[derive(Debug, Clone)]
pub struct FileMeta {
    /// Root of the schema tree: an anonymous non-nullable struct.
    pub schema: FieldSchema,
    pub row_groups: Vec<RowGroupMeta>,
}

impl FileMeta {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(256);
        encode_field(&self.schema, &mut buf);
        buf.extend_from_slice(&(self.row_groups.len() as u32).to_le_bytes());
        for group in &self.row_groups {
            buf.extend_from_slice(&group.num_rows.to_le_bytes());
            buf.extend_from_slice(&(group.columns.len() as u32).to_le_bytes());
            for column in &group.columns {
                buf.extend_from_slice(&column.file_offset.to_le_bytes());
                buf.extend_from_slice(&column.size.to_le_bytes());
                buf.extend_from_slice(&column.num_values.to_le_bytes());
                buf.push(column.has_dictionary as u8);
            }
        }
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<FileMeta> {
        let mut cursor = Cursor::new(buf);
        let schema = decode_field(&mut cursor, 0)?;
        let group_count = cursor.read_u32()? as usize;
        let mut row_groups = Vec::with_capacity(group_count.min(1024));
        for _ in 0..group_count {
            let num_rows = cursor.read_u64()?;
            let column_count = cursor.read_u32()? as usize;
            let mut columns = Vec::with_capacity(column_count.min(1024));
            for _ in 0..column_count {
                columns.push(ColumnChunkMeta {
                    file_offset: cursor.read_u64()?,
                    size: cursor.read_u64()?,
                    num_values: cursor.read_u64()?,
                    has_dictionary: cursor.read_u8()? != 0,
                });
            }
            verify_data!(row_group, columns.len() == schema.leaf_count());
            row_groups.push(RowGroupMeta { num_rows, columns });
        }
        verify_data!(file_meta, cursor.is_at_end());
        Ok(FileMeta {
            schema,
            row_groups,
        })
    }

    /// Appends the encoded metadata and the footer tail to `buf`, completing
    /// a file image.
    pub fn write_footer(&self, buf: &mut Vec<u8>) {
        let meta = self.encode();
        buf.extend_from_slice(&meta);
        buf.extend_from_slice(&(meta.len() as u32).to_le_bytes());
        buf.extend_from_slice(&FOOTER_MAGIC);
    }
}

/// Decodes the 8-byte footer tail, returning the metadata length.
pub fn decode_footer_tail(tail: &[u8]) -> Result<usize> {
    verify_arg!(tail, tail.len() == FOOTER_TAIL_LEN);
    if tail[4..] != FOOTER_MAGIC {
        return Err(Error::corruption("file footer", "bad magic"));
    }
    let len = u32::from_le_bytes([tail[0], tail[1], tail[2], tail[3]]);
    Ok(len as usize)
}

const NO_PHYSICAL_TYPE: u8 = 0xFF;
const MAX_SCHEMA_DEPTH: usize = 64;

fn encode_field(field: &FieldSchema, buf: &mut Vec<u8>) {
    assert!(field.name.len() <= u16::MAX as usize);
    buf.extend_from_slice(&(field.name.len() as u16).to_le_bytes());
    buf.extend_from_slice(field.name.as_bytes());
    buf.push(kind_code(field.kind));
    buf.push(field.is_nullable as u8);
    buf.push(
        field
            .physical_type
            .map_or(NO_PHYSICAL_TYPE, physical_type_code),
    );
    buf.extend_from_slice(&field.definition_level.to_le_bytes());
    buf.extend_from_slice(&field.repetition_level.to_le_bytes());
    buf.extend_from_slice(&field.repeated_parent_def_level.to_le_bytes());
    buf.extend_from_slice(&(field.physical_column_index as u32).to_le_bytes());
    buf.extend_from_slice(&(field.children.len() as u16).to_le_bytes());
    for child in &field.children {
        encode_field(child, buf);
    }
}

fn decode_field(cursor: &mut Cursor, depth: usize) -> Result<FieldSchema> {
    verify_data!(schema, depth < MAX_SCHEMA_DEPTH);
    let name_len = cursor.read_u16()? as usize;
    let name = std::str::from_utf8(cursor.take(name_len)?)
        .map_err(|_| Error::corruption("schema", "field name is not valid utf-8"))?
        .to_string();
    let kind = kind_from_code(cursor.read_u8()?)?;
    let is_nullable = cursor.read_u8()? != 0;
    let physical_type = match cursor.read_u8()? {
        NO_PHYSICAL_TYPE => None,
        code => Some(physical_type_from_code(code)?),
    };
    let definition_level = cursor.read_u16()?;
    let repetition_level = cursor.read_u16()?;
    let repeated_parent_def_level = cursor.read_u16()?;
    let physical_column_index = cursor.read_u32()? as usize;
    let child_count = cursor.read_u16()? as usize;
    let expected_children = match kind {
        FieldKind::Scalar => 0..=0,
        FieldKind::Array => 1..=1,
        FieldKind::Map => 2..=2,
        FieldKind::Struct => 0..=usize::MAX,
    };
    verify_data!(schema, expected_children.contains(&child_count));
    verify_data!(schema, (kind == FieldKind::Scalar) == physical_type.is_some());
    let mut children = Vec::with_capacity(child_count.min(1024));
    for _ in 0..child_count {
        children.push(decode_field(cursor, depth + 1)?);
    }
    Ok(FieldSchema {
        name,
        kind,
        physical_type,
        is_nullable,
        definition_level,
        repetition_level,
        repeated_parent_def_level,
        physical_column_index,
        children,
    })
}

fn kind_code(kind: FieldKind) -> u8 {
    match kind {
        FieldKind::Scalar => 0,
        FieldKind::Array => 1,
        FieldKind::Map => 2,
        FieldKind::Struct => 3,
    }
}

fn kind_from_code(code: u8) -> Result<FieldKind> {
    match code {
        0 => Ok(FieldKind::Scalar),
        1 => Ok(FieldKind::Array),
        2 => Ok(FieldKind::Map),
        3 => Ok(FieldKind::Struct),
        _ => Err(Error::corruption("schema", "unknown field kind")),
    }
}

fn physical_type_code(physical_type: PhysicalType) -> u8 {
    match physical_type {
        PhysicalType::Boolean => 0,
        PhysicalType::Int32 => 1,
        PhysicalType::Int64 => 2,
        PhysicalType::Float32 => 3,
        PhysicalType::Float64 => 4,
        PhysicalType::Timestamp => 5,
        PhysicalType::Binary => 6,
    }
}

fn physical_type_from_code(code: u8) -> Result<PhysicalType> {
    match code {
        0 => Ok(PhysicalType::Boolean),
        1 => Ok(PhysicalType::Int32),
        2 => Ok(PhysicalType::Int64),
        3 => Ok(PhysicalType::Float32),
        4 => Ok(PhysicalType::Float64),
        5 => Ok(PhysicalType::Timestamp),
        6 => Ok(PhysicalType::Binary),
        _ => Err(Error::corruption("schema", "unknown physical type")),
    }
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Cursor<'a> {
        Cursor { buf, pos: 0 }
    }

    fn is_at_end(&self) -> bool {
        self.pos == self.buf.len()
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.buf.len() - self.pos < len {
            return Err(Error::corruption("file metadata", "truncated buffer"));
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn read_u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_u64(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        Ok(u64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }
}
