//! # odsread
//!
//! Read cell values out of Open Document Spreadsheet (`.ods`) files.
//!
//! An `.ods` file is a ZIP archive; its cells live in the `content.xml`
//! member. This crate carries the two format readers needed to get at
//! them, both designed for untrusted input with memory bounded by
//! configuration rather than by input size:
//!
//! - [`zip`]: locates one member through the central directory and
//!   streams it out (store or raw deflate), verifying CRC-32
//! - [`xml`]: a byte-level state-machine parser producing an owned,
//!   navigable element tree
//!
//! [`ods`] combines them into a spreadsheet reader. Failures are returned
//! as typed errors and also described, one line per layer, in a
//! [`Diagnostics`] buffer.
//!
//! ## Example
//!
//! ```no_run
//! use odsread::{Diagnostics, GridLimits, Spreadsheet};
//! use odsread::xml::Limits;
//!
//! let mut diag = Diagnostics::new();
//! let ods = match Spreadsheet::open("budget.ods", &Limits::default(), &mut diag) {
//!     Ok(ods) => ods,
//!     Err(_) => {
//!         eprint!("{diag}");
//!         return;
//!     }
//! };
//!
//! for name in ods.sheet_names() {
//!     println!("{name}");
//! }
//!
//! let sheet = ods.sheet("Summary", GridLimits::default(), &mut diag).unwrap();
//! println!("B1 = {:?}", sheet.value(0, 1));
//! ```

pub mod bounded;
pub mod cli;
pub mod diag;
pub mod io;
pub mod ods;
pub mod xml;
pub mod zip;

pub use cli::Cli;
pub use diag::Diagnostics;
pub use io::{LocalFileReader, ReadAt};
pub use ods::{GridLimits, OdsError, Sheet, Spreadsheet};
pub use xml::{Document, Element, XmlError};
pub use zip::{ZipError, ZipExtractor, ZipFileEntry};
