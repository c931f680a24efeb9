//! Command implementations for sheaf-cmd

use std::sync::Arc;

use anyhow::{Context, Result};
use sheaf_format::metadata::{FOOTER_TAIL_LEN, FileMeta, decode_footer_tail};
use sheaf_io::{FileReader, ReadAt};

use crate::utils;

pub mod generate;
pub mod head;
pub mod inspect;

/// Opens a sheaf file and decodes its footer metadata.
///
/// Returns the positional reader over the file alongside the decoded
/// [`FileMeta`], ready to hand to the column readers.
pub fn open_file(path: &str) -> Result<(Arc<dyn ReadAt>, FileMeta)> {
    utils::validate_file_exists(path)?;
    let reader =
        FileReader::open(path).with_context(|| format!("Failed to open file: {path}"))?;
    let size = reader.size()?;
    if size < FOOTER_TAIL_LEN as u64 {
        anyhow::bail!("File is too short to hold a footer: {path}");
    }

    let tail = reader.read_at(size - FOOTER_TAIL_LEN as u64..size)?;
    let meta_len = decode_footer_tail(&tail)
        .with_context(|| format!("Failed to decode footer tail of: {path}"))? as u64;
    let meta_end = size - FOOTER_TAIL_LEN as u64;
    if meta_len > meta_end {
        anyhow::bail!("Footer metadata length {meta_len} exceeds the file size");
    }

    let meta_buf = reader.read_at(meta_end - meta_len..meta_end)?;
    let meta = FileMeta::decode(&meta_buf)
        .with_context(|| format!("Failed to decode file metadata of: {path}"))?;
    Ok((Arc::new(reader), meta))
}

#[cfg(test)]
mod tests {
    use sheaf_testkit::file_gen::build_file;
    use sheaf_testkit::sample::{sample_rows, sample_schema};

    use super::open_file;

    #[test]
    fn test_open_file_decodes_footer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.sheaf");
        let schema = sample_schema();
        let file = build_file(&schema, &[sample_rows(25, 7)], 8, false).unwrap();
        std::fs::write(&path, file).unwrap();

        let (reader, meta) = open_file(path.to_str().unwrap()).unwrap();
        assert_eq!(meta.row_groups.len(), 1);
        assert_eq!(meta.row_groups[0].num_rows, 25);
        assert_eq!(meta.schema.leaf_count(), meta.row_groups[0].columns.len());
        assert!(reader.size().unwrap() > 0);

        assert!(open_file(dir.path().to_str().unwrap()).is_err());
        assert!(open_file(dir.path().join("missing").to_str().unwrap()).is_err());
    }
}
