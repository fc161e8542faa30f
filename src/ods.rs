//! Open Document Spreadsheet reader.
//!
//! An `.ods` file is a ZIP archive whose cell data lives in `content.xml`.
//! [`Spreadsheet::open`] extracts and parses that member once; each
//! [`Sheet`] is then a fixed-size grid of cell strings read from the tree.

use std::fmt;
use std::io::{self, Seek};
use std::path::{Path, PathBuf};

use log::{debug, warn};
use thiserror::Error;

use crate::bounded::CapacityExceeded;
use crate::diag::Diagnostics;
use crate::io::{LocalFileReader, ReadAt};
use crate::xml::{self, Document, Element, Limits, NodeId, XmlError};
use crate::zip::{ZipError, ZipExtractor};

/// Archive member holding the document body.
pub const CONTENT_MEMBER: &str = "content.xml";

/// Location of the element whose children are the sheets.
pub const SPREADSHEET_PATH: &str = "/office:document-content/office:body/office:spreadsheet";

/// Longest cell text kept, in bytes.
pub const MAX_CELL_TEXT: usize = 256;

/// Largest grid [`Spreadsheet::sheet`] allocates, in cells.
pub const MAX_GRID_CELLS: usize = 1 << 24;

const TABLE: &str = "table:table";
const TABLE_NAME: &str = "table:name";
const ROW: &str = "table:table-row";
const HEADER_ROWS: &str = "table:table-header-rows";
const ROW_GROUP: &str = "table:table-row-group";
const CELL: &str = "table:table-cell";
const COVERED_CELL: &str = "table:covered-table-cell";
const ROWS_REPEATED: &str = "table:number-rows-repeated";
const COLUMNS_REPEATED: &str = "table:number-columns-repeated";
const VALUE_TYPE: &str = "office:value-type";
const PARAGRAPH: &str = "text:p";
const SPACE: &str = "text:s";
const SPACE_COUNT: &str = "text:c";
const TAB: &str = "text:tab";
const LINE_BREAK: &str = "text:line-break";

#[derive(Debug, Error)]
pub enum OdsError {
    #[error("failed to open \"{}\": {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to create a tmp file: {0}")]
    TempFile(#[source] io::Error),

    #[error("failed to extract \"{CONTENT_MEMBER}\"")]
    Extract(#[from] ZipError),

    #[error("failed to seek to the beginning of the tmp file: {0}")]
    Rewind(#[source] io::Error),

    #[error("failed to parse spreadsheet")]
    Parse(#[from] XmlError),

    #[error("spreadsheet root elem not found")]
    NoSpreadsheet,

    #[error("sheet not found: \"{name}\"")]
    SheetNotFound { name: String },

    #[error("grid of {rows}x{cols} cells exceeds the maximum of {MAX_GRID_CELLS}")]
    GridTooLarge { rows: usize, cols: usize },
}

impl OdsError {
    /// A configured bound in the ZIP or XML layer was exceeded.
    pub fn is_resource_limit(&self) -> bool {
        match self {
            OdsError::Extract(e) => e.is_resource_limit(),
            OdsError::Parse(e) => e.is_resource_limit(),
            OdsError::GridTooLarge { .. } => true,
            _ => false,
        }
    }

    /// The archive has no `content.xml`, or the named sheet is missing.
    pub fn is_not_found(&self) -> bool {
        match self {
            OdsError::Extract(e) => e.is_not_found(),
            OdsError::SheetNotFound { .. } => true,
            _ => false,
        }
    }
}

/// Size of the cell grid read from a sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLimits {
    pub rows: usize,
    pub cols: usize,
}

impl GridLimits {
    pub const DEFAULT_ROWS: usize = 150;
    pub const DEFAULT_COLS: usize = 26;

    pub const fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }
}

impl Default for GridLimits {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ROWS, Self::DEFAULT_COLS)
    }
}

/// A parsed spreadsheet document.
pub struct Spreadsheet {
    doc: Document,
    spreadsheet: NodeId,
}

impl Spreadsheet {
    /// Open an `.ods` file.
    ///
    /// On failure the reason is appended to `diag` below whatever the ZIP
    /// or XML layer reported.
    pub fn open(path: impl AsRef<Path>, limits: &Limits, diag: &mut Diagnostics) -> Result<Self, OdsError> {
        let path = path.as_ref();
        let reader = LocalFileReader::new(path).map_err(|source| OdsError::Open {
            path: path.to_path_buf(),
            source,
        });
        let result = reader.and_then(|reader| Self::load(reader, limits, diag));
        report(result, diag)
    }

    /// Read a spreadsheet from any random-access source.
    pub fn from_reader<R: ReadAt>(reader: R, limits: &Limits, diag: &mut Diagnostics) -> Result<Self, OdsError> {
        report(Self::load(reader, limits, diag), diag)
    }

    /// Wrap an already parsed `content.xml`.
    pub fn from_document(doc: Document) -> Result<Self, OdsError> {
        let spreadsheet = doc.find(SPREADSHEET_PATH).ok_or(OdsError::NoSpreadsheet)?.id();
        Ok(Self { doc, spreadsheet })
    }

    fn load<R: ReadAt>(reader: R, limits: &Limits, diag: &mut Diagnostics) -> Result<Self, OdsError> {
        let mut tmp = tempfile::tempfile().map_err(OdsError::TempFile)?;
        let extractor = ZipExtractor::new(reader);
        let size = extractor.extract_to_writer(CONTENT_MEMBER, &mut tmp, diag)?;
        debug!("extracted {size} bytes of {CONTENT_MEMBER}");

        tmp.rewind().map_err(OdsError::Rewind)?;
        let doc = xml::parse(tmp, limits, diag)?;
        debug!("{CONTENT_MEMBER}: {} nodes", doc.len());

        Self::from_document(doc)
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// The `office:spreadsheet` element.
    pub fn spreadsheet(&self) -> Element<'_> {
        // The id was produced by `find` on this same document.
        self.doc.get(self.spreadsheet).unwrap_or_else(|| self.doc.root())
    }

    /// Names of all sheets, in document order.
    pub fn sheet_names(&self) -> Vec<&str> {
        self.spreadsheet()
            .children()
            .filter(|e| e.is_named(TABLE))
            .filter_map(|e| e.attr(TABLE_NAME))
            .collect()
    }

    /// The `table:table` element of the sheet called `name`.
    pub fn sheet_element(&self, name: &str, diag: &mut Diagnostics) -> Result<Element<'_>, OdsError> {
        let found = self
            .spreadsheet()
            .child_with_attr(TABLE, TABLE_NAME, name)
            .ok_or_else(|| OdsError::SheetNotFound {
                name: name.to_string(),
            });
        report(found, diag)
    }

    /// Read the top-left `grid` corner of the sheet called `name`.
    ///
    /// Rows outside the grid are never visited. Cells whose text is too
    /// long are left empty and noted in `diag`.
    pub fn sheet(&self, name: &str, grid: GridLimits, diag: &mut Diagnostics) -> Result<Sheet<'_>, OdsError> {
        let element = self.sheet_element(name, diag)?;
        let cells = grid
            .rows
            .checked_mul(grid.cols)
            .filter(|&n| n <= MAX_GRID_CELLS)
            .ok_or(OdsError::GridTooLarge {
                rows: grid.rows,
                cols: grid.cols,
            });
        let cells = report(cells, diag)?;
        let mut sheet = Sheet {
            name: name.to_string(),
            element,
            grid,
            cells: vec![None; cells],
        };
        let mut next_row = 0;
        sheet.read_rows(element, &mut next_row, diag);
        debug!("sheet \"{name}\": {next_row} rows read");
        Ok(sheet)
    }
}

impl fmt::Debug for Spreadsheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Spreadsheet")
            .field("nodes", &self.doc.len())
            .field("sheets", &self.sheet_names())
            .finish()
    }
}

/// Cell strings of one sheet, row-major.
#[derive(Debug)]
pub struct Sheet<'a> {
    name: String,
    element: Element<'a>,
    grid: GridLimits,
    cells: Vec<Option<String>>,
}

impl<'a> Sheet<'a> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The sheet's `table:table` element.
    pub fn element(&self) -> Element<'a> {
        self.element
    }

    pub fn grid(&self) -> GridLimits {
        self.grid
    }

    /// Text of the cell at 0-based `row`, `col`.
    ///
    /// `None` outside the grid and for cells without a value.
    pub fn value(&self, row: usize, col: usize) -> Option<&str> {
        if row >= self.grid.rows || col >= self.grid.cols {
            return None;
        }
        self.cells[row * self.grid.cols + col].as_deref()
    }

    fn read_rows(&mut self, parent: Element<'a>, next_row: &mut usize, diag: &mut Diagnostics) {
        for child in parent.children() {
            if *next_row >= self.grid.rows {
                return;
            }
            if child.is_named(ROW) {
                let row = *next_row;
                self.read_row(child, row, diag);

                let repeat = repeat_count(child, ROWS_REPEATED).min(self.grid.rows - row);
                let cols = self.grid.cols;
                for copy in row + 1..row + repeat {
                    let (done, rest) = self.cells.split_at_mut(copy * cols);
                    rest[..cols].clone_from_slice(&done[row * cols..(row + 1) * cols]);
                }
                *next_row = row + repeat;
            } else if child.is_named(HEADER_ROWS) || child.is_named(ROW_GROUP) {
                self.read_rows(child, next_row, diag);
            }
        }
    }

    fn read_row(&mut self, row: Element<'a>, index: usize, diag: &mut Diagnostics) {
        let base = index * self.grid.cols;
        let mut col = 0;
        for cell in row.children() {
            if col >= self.grid.cols {
                break;
            }
            if !cell.is_named(CELL) && !cell.is_named(COVERED_CELL) {
                continue;
            }

            let repeat = repeat_count(cell, COLUMNS_REPEATED).min(self.grid.cols - col);
            let value = cell_value(cell).unwrap_or_else(|e| {
                warn!("cell ({index}, {col}): {e}");
                diag.add(format_args!("ods: too long text in ({index}, {col})"));
                None
            });
            for slot in &mut self.cells[base + col..base + col + repeat] {
                slot.clone_from(&value);
            }
            col += repeat;
        }
    }
}

/// Value of a repeat attribute; absent, zero or unparsable means 1.
fn repeat_count(element: Element<'_>, attr: &str) -> usize {
    match element.attr(attr).map(str::parse::<usize>) {
        None => 1,
        Some(Ok(n)) if n > 0 => n,
        Some(_) => {
            warn!("ignoring invalid {attr} on <{}>", element.name().unwrap_or_default());
            1
        }
    }
}

/// Displayed text of a cell, or `None` for a cell without a value type.
fn cell_value(cell: Element<'_>) -> Result<Option<String>, CapacityExceeded> {
    if cell.attr(VALUE_TYPE).is_none() {
        return Ok(None);
    }

    let mut text = String::new();
    for (i, p) in cell.children().filter(|c| c.is_named(PARAGRAPH)).enumerate() {
        if i > 0 {
            push_text(&mut text, "\n")?;
        }
        collect_text(p, &mut text)?;
    }
    Ok(Some(text))
}

fn collect_text(element: Element<'_>, out: &mut String) -> Result<(), CapacityExceeded> {
    for child in element.children() {
        if let Some(text) = child.text() {
            push_text(out, text)?;
        } else if child.is_named(SPACE) {
            let count = repeat_count(child, SPACE_COUNT);
            ensure_room(out, count)?;
            out.extend(std::iter::repeat_n(' ', count));
        } else if child.is_named(TAB) {
            push_text(out, "\t")?;
        } else if child.is_named(LINE_BREAK) {
            push_text(out, "\n")?;
        } else {
            // text:span, text:a and friends
            collect_text(child, out)?;
        }
    }
    Ok(())
}

fn push_text(out: &mut String, text: &str) -> Result<(), CapacityExceeded> {
    ensure_room(out, text.len())?;
    out.push_str(text);
    Ok(())
}

fn ensure_room(out: &str, extra: usize) -> Result<(), CapacityExceeded> {
    match out.len().checked_add(extra) {
        Some(len) if len <= MAX_CELL_TEXT => Ok(()),
        _ => Err(CapacityExceeded {
            capacity: MAX_CELL_TEXT,
        }),
    }
}

fn report<T>(result: Result<T, OdsError>, diag: &mut Diagnostics) -> Result<T, OdsError> {
    if let Err(e) = &result {
        debug!("ods error: {e:?}");
        diag.add(format_args!("ods: {e}"));
    }
    result
}
