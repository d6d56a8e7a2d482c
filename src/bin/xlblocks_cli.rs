//! CLI tool for xlblocks - scans XLSX files for formula blocks and writes
//! call-out boxes
//!
//! Usage:
//!   xlblocks_cli scan <input.xlsx> --color FFFF00               # JSON to stdout
//!   xlblocks_cli scan <input.xlsx> --color FFFF00 -o out.json   # JSON to file
//!   xlblocks_cli annotate <input.xlsx> --config cfg.json -o out.xlsx
//!
//! Set `RUST_LOG=debug` for progress output on stderr.

use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use xlblocks::annotate::annotate_xlsx;
use xlblocks::parser::read_workbook;
use xlblocks::persist::StoredBlock;
use xlblocks::{
    persist_report, scan_workbook, AnnotateConfig, FillColor, MemoryStore, ScanOptions,
    XlblocksError,
};

#[derive(Parser)]
#[command(name = "xlblocks_cli")]
#[command(about = "Find formula blocks in XLSX worksheets and annotate them")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan every visible worksheet and print the blocks as JSON
    Scan {
        /// Workbook to scan
        file: PathBuf,

        /// Target fill colour (RRGGBB, #RRGGBB or AARRGGBB)
        #[arg(long, default_value = "FFFF00")]
        color: String,

        /// Also scan hidden worksheets
        #[arg(long)]
        include_hidden: bool,

        /// Write the JSON here instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Write call-out boxes for the configured remarks into a copy of the workbook
    Annotate {
        /// Workbook to annotate
        file: PathBuf,

        /// JSON configuration (scan options, layout, remarks)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Annotated workbook to write
        #[arg(long, short = 'o')]
        output: PathBuf,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SheetSummary<'a> {
    sheet: &'a str,
    blocks: usize,
    observed_colors: &'a BTreeSet<FillColor>,
}

#[derive(Serialize)]
struct ScanOutput<'a> {
    sheets: Vec<SheetSummary<'a>>,
    blocks: &'a [StoredBlock],
}

fn read_file(path: &Path) -> Result<Vec<u8>, String> {
    fs::read(path).map_err(|e| format!("Error reading {}: {e}", path.display()))
}

fn run_scan(
    file: &Path,
    color: &str,
    include_hidden: bool,
    output: Option<&Path>,
) -> Result<(), String> {
    let data = read_file(file)?;
    let sheets = read_workbook(&data).map_err(|e| format!("Error parsing XLSX: {e}"))?;
    let options = ScanOptions {
        target_color: FillColor::new(color),
        include_hidden,
    };
    let scans = scan_workbook(&sheets, &options).map_err(|e| format!("Error scanning: {e}"))?;

    let mut store = MemoryStore::new();
    for scan in &scans {
        persist_report(&mut store, &scan.sheet, &scan.report)
            .map_err(|e| format!("Error storing blocks: {e}"))?;
    }

    let report = ScanOutput {
        sheets: scans
            .iter()
            .map(|s| SheetSummary {
                sheet: &s.sheet,
                blocks: s.report.blocks.len(),
                observed_colors: &s.report.observed_colors,
            })
            .collect(),
        blocks: store.blocks(),
    };
    let json = serde_json::to_string_pretty(&report)
        .map_err(|e| format!("Error serializing JSON: {e}"))?;

    match output {
        Some(path) => {
            fs::write(path, &json).map_err(|e| format!("Error writing {}: {e}", path.display()))?;
            info!(path = %path.display(), blocks = store.blocks().len(), "scan written");
        }
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{json}").map_err(|e| format!("Error writing stdout: {e}"))?;
        }
    }
    Ok(())
}

fn run_annotate(file: &Path, config: Option<&Path>, output: &Path) -> Result<(), String> {
    let data = read_file(file)?;
    let config = match config {
        Some(path) => {
            let json = fs::read_to_string(path)
                .map_err(|e| format!("Error reading {}: {e}", path.display()))?;
            AnnotateConfig::from_json(&json).map_err(|e: XlblocksError| {
                format!("Invalid configuration {}: {e}", path.display())
            })?
        }
        None => AnnotateConfig::default(),
    };

    let annotated = annotate_xlsx(&data, &config).map_err(|e| format!("Error annotating: {e}"))?;
    fs::write(output, &annotated.bytes)
        .map_err(|e| format!("Error writing {}: {e}", output.display()))?;

    for sheet in &annotated.sheets {
        info!(sheet = %sheet.sheet, blocks = sheet.blocks, callouts = sheet.callouts.len(), "annotated");
    }
    eprintln!("Written: {}", output.display());
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match &cli.command {
        Commands::Scan {
            file,
            color,
            include_hidden,
            output,
        } => run_scan(file, color, *include_hidden, output.as_deref()),
        Commands::Annotate {
            file,
            config,
            output,
        } => run_annotate(file, config.as_deref(), output),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("{message}");
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}
