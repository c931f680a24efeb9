//! Generate command implementation

use anyhow::{Context, Result};
use std::time::Instant;

use sheaf_testkit::file_gen::build_file;
use sheaf_testkit::sample::{sample_rows, sample_schema};

use crate::utils;

/// Run the generate command
pub fn run(
    rows: u64,
    groups: u64,
    page_rows: u64,
    seed: u64,
    dict: bool,
    file_path: String,
) -> Result<()> {
    if rows == 0 || groups == 0 || page_rows == 0 {
        anyhow::bail!("rows, groups and page-rows must all be at least 1");
    }

    println!("Generating file: {file_path}");
    let start_time = Instant::now();

    let schema = sample_schema();
    let row_groups: Vec<_> = (0..groups)
        .map(|group| sample_rows(rows as usize, seed.wrapping_add(group)))
        .collect();

    let file = build_file(&schema, &row_groups, page_rows as usize, dict)
        .context("Failed to build the sample file")?;
    let file_size = file.len() as u64;
    std::fs::write(&file_path, file)
        .with_context(|| format!("Failed to write file: {file_path}"))?;

    let elapsed = start_time.elapsed();
    println!("Generation completed:");
    println!("  Total time: {:.3} seconds", elapsed.as_secs_f64());
    println!("  Row groups: {groups}");
    println!("  Rows: {}", rows * groups);
    println!("  File size: {}", utils::format_size(file_size));
    Ok(())
}
