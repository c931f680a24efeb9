use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod utils;

#[derive(Parser)]
#[command(name = "sheaf-cmd")]
#[command(about = "Command-line utility for Sheaf columnar file operations")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a sample file with a mix of flat and nested columns
    Generate {
        /// Number of rows per row group
        #[arg(long, default_value_t = 10_000)]
        rows: u64,

        /// Number of row groups
        #[arg(long, default_value_t = 1)]
        groups: u64,

        /// Number of rows per page
        #[arg(long, default_value_t = 1024)]
        page_rows: u64,

        /// Seed for the generated data
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Dictionary-encode the column chunks
        #[arg(long)]
        dict: bool,

        /// Output file path
        file_path: String,
    },

    /// Inspect a file and display summary information
    Inspect {
        /// Increase verbosity (-v lists the pages of every column chunk)
        #[arg(short, long, action = clap::ArgAction::Count)]
        verbose: u8,

        /// File path to inspect
        file_path: String,
    },

    /// Print the first rows of a column as JSON lines
    Head {
        /// Number of rows to print
        #[arg(short = 'n', long)]
        count: Option<u64>,

        /// Column to read; defaults to every top-level column
        #[arg(short, long)]
        column: Option<String>,

        /// Rows per read batch
        #[arg(long, default_value_t = 1024)]
        batch_size: u64,

        /// File path to read
        file_path: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            rows,
            groups,
            page_rows,
            seed,
            dict,
            file_path,
        } => commands::generate::run(rows, groups, page_rows, seed, dict, file_path),
        Commands::Inspect { verbose, file_path } => commands::inspect::run(verbose, file_path),
        Commands::Head {
            count,
            column,
            batch_size,
            file_path,
        } => commands::head::run(count, column, batch_size, file_path),
    }
}
