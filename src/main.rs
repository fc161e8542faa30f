//! Main entry point for the odsread CLI application.
//!
//! Prints a rectangle of cell values from one sheet of an `.ods` file, or
//! inspects the file's sheets and archive members.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, Write};

use odsread::cli::Area;
use odsread::{Cli, Diagnostics, LocalFileReader, Spreadsheet, ZipExtractor};

/// Application entry point.
///
/// On failure the collected diagnostics are printed to stderr before the
/// error itself, and the process exits with status 1.
fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .init();

    let mut diag = Diagnostics::new();
    let result = run(&cli, &mut diag);
    if result.is_err() && !diag.is_empty() {
        eprint!("{diag}");
    }
    result
}

fn run(cli: &Cli, diag: &mut Diagnostics) -> Result<()> {
    // Archive-level modes don't need content.xml to parse.
    if cli.list_members {
        return list_members(cli, diag);
    }
    if let Some(member) = &cli.extract {
        return extract_member(cli, member, diag);
    }

    // Validate the area before doing any work on the file.
    let area = match &cli.area {
        Some(area) => Some(area.parse::<Area>()?),
        None => None,
    };

    let ods = Spreadsheet::open(&cli.file, &cli.limits(), diag)
        .with_context(|| format!("cannot read {}", cli.file.display()))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if cli.list_sheets {
        for name in ods.sheet_names() {
            writeln!(out, "{name}")?;
        }
        return Ok(());
    }

    if let Some(name) = &cli.print_sheet {
        let sheet = ods.sheet_element(name, diag)?;
        write!(out, "{sheet}")?;
        return Ok(());
    }

    let (Some(name), Some(area)) = (&cli.sheet, area) else {
        anyhow::bail!("a sheet and an area are required");
    };
    let sheet = ods.sheet(name, cli.grid(), diag)?;

    for row in area.rows() {
        let line = area
            .cols()
            .map(|col| sheet.value(row, col).unwrap_or_default())
            .collect::<Vec<_>>()
            .join("\t");
        writeln!(out, "{line}")?;
    }

    Ok(())
}

/// List archive members in a table.
///
/// Shows sizes, the space saved by compression and the DOS timestamp of
/// each member, followed by totals over all non-directory entries.
fn list_members(cli: &Cli, diag: &mut Diagnostics) -> Result<()> {
    let reader = LocalFileReader::new(&cli.file)
        .with_context(|| format!("cannot open {}", cli.file.display()))?;
    let extractor = ZipExtractor::new(reader);
    let entries = extractor.list_files(diag)?;

    println!(
        "{:>10}  {:>10}  {:>5}  {:>10}  {:>5}  Name",
        "Length", "Size", "Cmpr", "Date", "Time"
    );
    println!("{}", "-".repeat(70));

    let mut total_uncompressed = 0u64;
    let mut total_compressed = 0u64;
    let mut file_count = 0usize;

    for entry in &entries {
        let (year, month, day) = entry.mod_date();
        let (hour, minute, _second) = entry.mod_time();

        println!(
            "{:>10}  {:>10}  {}  {:04}-{:02}-{:02}  {:02}:{:02}  {}",
            entry.uncompressed_size,
            entry.compressed_size,
            ratio(entry.compressed_size, entry.uncompressed_size),
            year,
            month,
            day,
            hour,
            minute,
            entry.file_name
        );

        if !entry.is_directory {
            total_uncompressed += entry.uncompressed_size;
            total_compressed += entry.compressed_size;
            file_count += 1;
        }
    }

    println!("{}", "-".repeat(70));
    println!(
        "{:>10}  {:>10}  {}  {:>19}  {} files",
        total_uncompressed,
        total_compressed,
        ratio(total_compressed, total_uncompressed),
        "",
        file_count
    );

    Ok(())
}

/// Write one member, uncompressed, to stdout.
fn extract_member(cli: &Cli, member: &str, diag: &mut Diagnostics) -> Result<()> {
    let reader = LocalFileReader::new(&cli.file)
        .with_context(|| format!("cannot open {}", cli.file.display()))?;
    let extractor = ZipExtractor::new(reader);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    extractor.extract_to_writer(member, &mut out, diag)?;
    Ok(())
}

/// Percentage saved by compression, right-aligned to five columns.
fn ratio(compressed: u64, uncompressed: u64) -> String {
    if uncompressed > 0 {
        let saved = 100u64.saturating_sub(compressed.saturating_mul(100) / uncompressed);
        format!("{saved:>4}%")
    } else {
        "  0%".to_string()
    }
}
