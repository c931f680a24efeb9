//! Inspect command implementation

use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;

use sheaf_format::metadata::{ColumnChunkMeta, FileMeta, RowGroupMeta};
use sheaf_format::schema::{FieldKind, FieldSchema};
use sheaf_io::ReadAt;
use sheaf_pagestream::page::{PageEncoding, PageHeader, PageKind};

use crate::commands::open_file;

#[derive(Serialize)]
struct InspectSummary {
    file: FileInfo,
    schema: SchemaInfo,
    row_groups: Vec<RowGroupInfo>,
}

#[derive(Serialize)]
struct FileInfo {
    file_size: u64,
    metadata_bytes: u64,
    total_row_count: u64,
    row_group_count: usize,
}

#[derive(Serialize)]
struct SchemaInfo {
    leaf_count: usize,
    fields: Vec<SchemaFieldInfo>,
}

#[derive(Serialize)]
struct SchemaFieldInfo {
    name: String,
    kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "type")]
    physical_type: Option<String>,
    nullable: bool,
    definition_level: u16,
    repetition_level: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    column_index: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<SchemaFieldInfo>,
}

#[derive(Serialize)]
struct RowGroupInfo {
    row_group_idx: usize,
    num_rows: u64,
    data_size: u64,
    columns: Vec<ChunkInfo>,
}

#[derive(Serialize)]
struct ChunkInfo {
    column_idx: usize,
    column: String,
    file_offset: u64,
    size: u64,
    num_values: u64,
    has_dictionary: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pages: Vec<PageInfo>,
}

#[derive(Serialize)]
struct PageInfo {
    kind: String,
    encoding: String,
    num_values: u32,
    rep_levels_len: u32,
    def_levels_len: u32,
    values_len: u32,
}

/// Run the inspect command
pub fn run(verbose: u8, file_path: String) -> Result<()> {
    println!("Inspecting file: {file_path}");

    let (file, meta) = open_file(&file_path)?;
    let file_info = create_file_info(&file, &meta)?;
    let schema_info = create_schema_info(&meta.schema);

    let leaf_paths = collect_leaf_paths(&meta.schema);
    let mut row_groups = Vec::with_capacity(meta.row_groups.len());
    for (index, group) in meta.row_groups.iter().enumerate() {
        row_groups.push(create_row_group_info(
            &file,
            group,
            index,
            &leaf_paths,
            verbose,
        )?);
    }

    let summary = InspectSummary {
        file: file_info,
        schema: schema_info,
        row_groups,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn create_file_info(file: &Arc<dyn ReadAt>, meta: &FileMeta) -> Result<FileInfo> {
    Ok(FileInfo {
        file_size: file.size()?,
        metadata_bytes: meta.encode().len() as u64,
        total_row_count: meta.row_groups.iter().map(|g| g.num_rows).sum(),
        row_group_count: meta.row_groups.len(),
    })
}

fn create_schema_info(root: &FieldSchema) -> SchemaInfo {
    SchemaInfo {
        leaf_count: root.leaf_count(),
        fields: root.children.iter().map(create_field_info).collect(),
    }
}

fn create_field_info(field: &FieldSchema) -> SchemaFieldInfo {
    SchemaFieldInfo {
        name: field.name.clone(),
        kind: kind_name(field.kind).to_string(),
        physical_type: field.physical_type.map(|t| format!("{t:?}")),
        nullable: field.is_nullable,
        definition_level: field.definition_level,
        repetition_level: field.repetition_level,
        column_index: field.is_leaf().then_some(field.physical_column_index),
        children: field.children.iter().map(create_field_info).collect(),
    }
}

fn create_row_group_info(
    file: &Arc<dyn ReadAt>,
    group: &RowGroupMeta,
    index: usize,
    leaf_paths: &[String],
    verbose: u8,
) -> Result<RowGroupInfo> {
    let mut columns = Vec::with_capacity(group.columns.len());
    for (column_idx, chunk) in group.columns.iter().enumerate() {
        let pages = if verbose > 0 {
            read_page_infos(file, chunk)
                .with_context(|| format!("Failed to walk the pages of column {column_idx}"))?
        } else {
            Vec::new()
        };
        columns.push(ChunkInfo {
            column_idx,
            column: leaf_paths
                .get(column_idx)
                .cloned()
                .unwrap_or_default(),
            file_offset: chunk.file_offset,
            size: chunk.size,
            num_values: chunk.num_values,
            has_dictionary: chunk.has_dictionary,
            pages,
        });
    }
    Ok(RowGroupInfo {
        row_group_idx: index,
        num_rows: group.num_rows,
        data_size: group.columns.iter().map(|c| c.size).sum(),
        columns,
    })
}

fn read_page_infos(file: &Arc<dyn ReadAt>, chunk: &ColumnChunkMeta) -> Result<Vec<PageInfo>> {
    let bytes = file.read_at(chunk.file_offset..chunk.file_offset + chunk.size)?;
    let mut pages = Vec::new();
    let mut pos = 0usize;
    while pos < bytes.len() {
        let header = PageHeader::parse(&bytes[pos..])?;
        pages.push(PageInfo {
            kind: match header.kind {
                PageKind::Data => "data".to_string(),
                PageKind::Dictionary => "dictionary".to_string(),
            },
            encoding: match header.encoding {
                PageEncoding::Plain => "plain".to_string(),
                PageEncoding::DictCodes => "dict-codes".to_string(),
            },
            num_values: header.num_values,
            rep_levels_len: header.rep_levels_len,
            def_levels_len: header.def_levels_len,
            values_len: header.values_len,
        });
        pos += header.page_len() as usize;
    }
    Ok(pages)
}

/// Dotted path of every leaf, ordered by physical column index.
fn collect_leaf_paths(root: &FieldSchema) -> Vec<String> {
    fn walk(field: &FieldSchema, prefix: &str, paths: &mut Vec<(usize, String)>) {
        let path = if prefix.is_empty() {
            field.name.clone()
        } else {
            format!("{prefix}.{}", field.name)
        };
        if field.is_leaf() {
            paths.push((field.physical_column_index, path));
            return;
        }
        for child in &field.children {
            walk(child, &path, paths);
        }
    }

    let mut paths = Vec::new();
    for child in &root.children {
        walk(child, "", &mut paths);
    }
    paths.sort_by_key(|(index, _)| *index);
    paths.into_iter().map(|(_, path)| path).collect()
}

fn kind_name(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Scalar => "scalar",
        FieldKind::Array => "array",
        FieldKind::Map => "map",
        FieldKind::Struct => "struct",
    }
}
