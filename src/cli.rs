use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;
use clap::builder::RangedU64ValueParser;
use thiserror::Error;

use crate::ods::GridLimits;
use crate::xml::{DEFAULT_MAX_DEPTH, DEFAULT_MAX_STRING, Limits};

/// Largest accepted `--max-depth`.
pub const MAX_DEPTH_ARG: u64 = 1_000_000;
/// Largest accepted `--max-text`.
pub const MAX_TEXT_ARG: u64 = 1 << 20;
/// Largest accepted `--rows`, the row count of an ODF sheet.
pub const MAX_ROWS_ARG: u64 = 1 << 20;
/// Largest accepted `--cols`.
pub const MAX_COLS_ARG: u64 = 1 << 14;

#[derive(Parser, Debug)]
#[command(name = "odsread")]
#[command(version)]
#[command(about = "Read values from Open Document Spreadsheet files (.ods)", long_about = None)]
#[command(after_help = "Examples:\n  \
  odsread budget.ods Summary B1:H99     print cells B1 to H99 of sheet Summary\n  \
  odsread -l budget.ods                 list sheet names\n  \
  odsread -x content.xml budget.ods     dump the raw content.xml member")]
pub struct Cli {
    /// Spreadsheet file (.ods)
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Sheet to read values from
    #[arg(
        value_name = "SHEET",
        required_unless_present_any = ["list_sheets", "print_sheet", "list_members", "extract"]
    )]
    pub sheet: Option<String>,

    /// Cell area, e.g. B1:H99
    #[arg(
        value_name = "AREA",
        requires = "sheet",
        required_unless_present_any = ["list_sheets", "print_sheet", "list_members", "extract"]
    )]
    pub area: Option<String>,

    /// List sheet names
    #[arg(short = 'l')]
    pub list_sheets: bool,

    /// Pretty-print the XML of a sheet
    #[arg(short = 'p', value_name = "SHEET")]
    pub print_sheet: Option<String>,

    /// List archive members
    #[arg(short = 'm')]
    pub list_members: bool,

    /// Write a raw archive member to stdout
    #[arg(short = 'x', value_name = "MEMBER")]
    pub extract: Option<String>,

    /// Maximum XML element nesting depth
    #[arg(
        long,
        value_name = "N",
        default_value_t = DEFAULT_MAX_DEPTH,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..=MAX_DEPTH_ARG)
    )]
    pub max_depth: usize,

    /// Maximum length of an XML name, attribute value or text run
    #[arg(
        long,
        value_name = "BYTES",
        default_value_t = DEFAULT_MAX_STRING,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..=MAX_TEXT_ARG)
    )]
    pub max_text: usize,

    /// Number of sheet rows read
    #[arg(
        long,
        value_name = "N",
        default_value_t = GridLimits::DEFAULT_ROWS,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..=MAX_ROWS_ARG)
    )]
    pub rows: usize,

    /// Number of sheet columns read
    #[arg(
        long,
        value_name = "N",
        default_value_t = GridLimits::DEFAULT_COLS,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..=MAX_COLS_ARG)
    )]
    pub cols: usize,

    /// More log output (-vv for debug, -vvv for trace)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn limits(&self) -> Limits {
        Limits::new()
            .with_max_depth(self.max_depth)
            .with_max_string(self.max_text)
    }

    pub fn grid(&self) -> GridLimits {
        GridLimits::new(self.rows, self.cols)
    }

    pub fn log_level(&self) -> log::LevelFilter {
        match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

/// One cell coordinate, 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRef {
    pub row: usize,
    pub col: usize,
}

/// Inclusive rectangle of cells such as `B1:H99`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Area {
    pub first: CellRef,
    pub last: CellRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AreaError {
    #[error("invalid area format: \"{0}\" (expected e.g. B1:H99)")]
    Format(String),

    #[error("invalid column name: \"{0}\"")]
    Column(String),

    #[error("invalid area coordinates: {0}")]
    Reversed(String),

    #[error("rows are numbered from 1: \"{0}\"")]
    ZeroRow(String),
}

impl Area {
    pub fn rows(&self) -> std::ops::RangeInclusive<usize> {
        self.first.row..=self.last.row
    }

    pub fn cols(&self) -> std::ops::RangeInclusive<usize> {
        self.first.col..=self.last.col
    }
}

impl FromStr for Area {
    type Err = AreaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (first, last) = s
            .split_once(':')
            .ok_or_else(|| AreaError::Format(s.to_string()))?;
        let first: CellRef = first.parse()?;
        let last: CellRef = last.parse()?;

        if first.row > last.row || first.col > last.col {
            return Err(AreaError::Reversed(s.to_string()));
        }
        Ok(Area { first, last })
    }
}

impl FromStr for CellRef {
    type Err = AreaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let split = s
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(s.len());
        let (letters, digits) = s.split_at(split);

        if letters.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AreaError::Format(s.to_string()));
        }

        let col = column_index(letters).ok_or_else(|| AreaError::Column(letters.to_string()))?;
        let row: usize = digits
            .parse()
            .map_err(|_| AreaError::Format(s.to_string()))?;
        if row == 0 {
            return Err(AreaError::ZeroRow(s.to_string()));
        }

        Ok(CellRef { row: row - 1, col })
    }
}

/// `A` → 0, `Z` → 25, `AA` → 26, ...
pub fn column_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    letters.bytes().try_fold(0usize, |acc, b| {
        if !b.is_ascii_uppercase() {
            return None;
        }
        acc.checked_mul(26)?.checked_add((b - b'A') as usize + 1)
    })
    .map(|n| n - 1)
}
