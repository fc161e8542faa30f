#![allow(dead_code)]
use std::io::Write;
use std::sync::Once;

use byteorder::{LittleEndian, WriteBytesExt};
use flate2::Compression;
use flate2::write::DeflateEncoder;
use tempfile::NamedTempFile;

static LOGGER_INIT: Once = Once::new();

// Tests run concurrently, so the logger may only be installed once.
pub fn ensure_env_logger_initialized() {
    LOGGER_INIT.call_once(|| {
        let mut builder = env_logger::Builder::from_default_env();
        builder
            .format(|buf, record| writeln!(buf, "[{}] - {}", record.level(), record.args()))
            .is_test(true)
            .init();
    });
}

pub const STORED: u16 = 0;
pub const DEFLATED: u16 = 8;

/// One archive member, as it will be laid out on disk.
#[derive(Debug, Clone)]
pub struct Entry {
    pub name: String,
    /// Bytes written after the Local File header.
    pub payload: Vec<u8>,
    pub method: u16,
    /// Method recorded in the Local File header, when it should differ.
    pub local_method: Option<u16>,
    pub flags: u16,
    pub crc32: u32,
    pub uncompressed_size: u32,
    pub extra: Vec<u8>,
}

impl Entry {
    pub fn stored(name: &str, data: &[u8]) -> Self {
        Self::raw(name, STORED, data.to_vec(), crc32fast::hash(data), data.len() as u32)
    }

    pub fn deflated(name: &str, data: &[u8]) -> Self {
        Self::raw(name, DEFLATED, deflate(data), crc32fast::hash(data), data.len() as u32)
    }

    pub fn raw(name: &str, method: u16, payload: Vec<u8>, crc32: u32, uncompressed_size: u32) -> Self {
        Self {
            name: name.to_string(),
            payload,
            method,
            local_method: None,
            flags: 0,
            crc32,
            uncompressed_size,
            extra: Vec::new(),
        }
    }
}

/// Where a member ended up inside the built archive.
#[derive(Debug, Clone)]
pub struct Placement {
    pub lfh_offset: usize,
    pub data_offset: usize,
    pub data_len: usize,
}

#[derive(Debug, Clone)]
pub struct Archive {
    pub bytes: Vec<u8>,
    pub placements: Vec<Placement>,
    pub cd_offset: usize,
    pub eocdr_offset: usize,
}

#[derive(Debug, Default)]
pub struct ArchiveBuilder {
    entries: Vec<Entry>,
    comment: Vec<u8>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(mut self, entry: Entry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn stored(self, name: &str, data: &[u8]) -> Self {
        self.entry(Entry::stored(name, data))
    }

    pub fn deflated(self, name: &str, data: &[u8]) -> Self {
        self.entry(Entry::deflated(name, data))
    }

    pub fn comment(mut self, comment: &[u8]) -> Self {
        self.comment = comment.to_vec();
        self
    }

    pub fn build(self) -> Archive {
        let mut out = Vec::new();
        let mut placements = Vec::new();

        for e in &self.entries {
            let lfh_offset = out.len();
            out.write_u32::<LittleEndian>(0x04034b50).unwrap();
            out.write_u16::<LittleEndian>(20).unwrap();
            out.write_u16::<LittleEndian>(e.flags).unwrap();
            out.write_u16::<LittleEndian>(e.local_method.unwrap_or(e.method)).unwrap();
            out.write_u16::<LittleEndian>(0x6000).unwrap();
            out.write_u16::<LittleEndian>(0x5821).unwrap();
            out.write_u32::<LittleEndian>(e.crc32).unwrap();
            out.write_u32::<LittleEndian>(e.payload.len() as u32).unwrap();
            out.write_u32::<LittleEndian>(e.uncompressed_size).unwrap();
            out.write_u16::<LittleEndian>(e.name.len() as u16).unwrap();
            out.write_u16::<LittleEndian>(e.extra.len() as u16).unwrap();
            out.extend_from_slice(e.name.as_bytes());
            out.extend_from_slice(&e.extra);

            let data_offset = out.len();
            out.extend_from_slice(&e.payload);
            placements.push(Placement {
                lfh_offset,
                data_offset,
                data_len: e.payload.len(),
            });
        }

        let cd_offset = out.len();
        for (e, p) in self.entries.iter().zip(&placements) {
            out.write_u32::<LittleEndian>(0x02014b50).unwrap();
            out.write_u16::<LittleEndian>(0x031e).unwrap();
            out.write_u16::<LittleEndian>(20).unwrap();
            out.write_u16::<LittleEndian>(e.flags).unwrap();
            out.write_u16::<LittleEndian>(e.method).unwrap();
            out.write_u16::<LittleEndian>(0x6000).unwrap();
            out.write_u16::<LittleEndian>(0x5821).unwrap();
            out.write_u32::<LittleEndian>(e.crc32).unwrap();
            out.write_u32::<LittleEndian>(e.payload.len() as u32).unwrap();
            out.write_u32::<LittleEndian>(e.uncompressed_size).unwrap();
            out.write_u16::<LittleEndian>(e.name.len() as u16).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap();
            out.write_u32::<LittleEndian>(0o100644 << 16).unwrap();
            out.write_u32::<LittleEndian>(p.lfh_offset as u32).unwrap();
            out.extend_from_slice(e.name.as_bytes());
        }
        let cd_size = out.len() - cd_offset;

        let eocdr_offset = out.len();
        out.write_u32::<LittleEndian>(0x06054b50).unwrap();
        out.write_u16::<LittleEndian>(0).unwrap();
        out.write_u16::<LittleEndian>(0).unwrap();
        out.write_u16::<LittleEndian>(self.entries.len() as u16).unwrap();
        out.write_u16::<LittleEndian>(self.entries.len() as u16).unwrap();
        out.write_u32::<LittleEndian>(cd_size as u32).unwrap();
        out.write_u32::<LittleEndian>(cd_offset as u32).unwrap();
        out.write_u16::<LittleEndian>(self.comment.len() as u16).unwrap();
        out.extend_from_slice(&self.comment);

        Archive {
            bytes: out,
            placements,
            cd_offset,
            eocdr_offset,
        }
    }
}

/// Raw deflate stream (no zlib header), as stored in ZIP members.
pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Deterministic, poorly compressible filler.
pub fn noise(len: usize) -> Vec<u8> {
    let mut state = 0x2545_f491_u32;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state >> 24) as u8
        })
        .collect()
}

/// Wrap sheets (`table:table` elements) in a minimal `content.xml`.
pub fn content_xml(tables: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<office:document-content xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" office:version="1.2">
  <office:scripts/>
  <office:body>
    <office:spreadsheet>
      {tables}
    </office:spreadsheet>
  </office:body>
</office:document-content>
"#
    )
}

pub fn string_cell(text: &str) -> String {
    format!(r#"<table:table-cell office:value-type="string"><text:p>{text}</text:p></table:table-cell>"#)
}

pub fn float_cell(value: f64) -> String {
    format!(
        r#"<table:table-cell office:value-type="float" office:value="{value}"><text:p>{value}</text:p></table:table-cell>"#
    )
}

/// A two-sheet document: "Prices" with a header row and two items, and
/// an empty "Notes".
pub fn sample_content() -> String {
    let header = format!("<table:table-row>{}{}</table:table-row>", string_cell("Item"), string_cell("Price"));
    let apple = format!("<table:table-row>{}{}</table:table-row>", string_cell("Apple"), float_cell(1.5));
    let pear = format!(
        "<table:table-row>{}<table:table-cell/>{}</table:table-row>",
        string_cell("Pear &amp; co"),
        float_cell(2.0),
    );
    content_xml(&format!(
        r#"<table:table table:name="Prices">{header}{apple}{pear}</table:table><table:table table:name="Notes"/>"#
    ))
}

/// An `.ods`-shaped archive: stored `mimetype` first, deflated `content.xml`.
pub fn ods_archive(content: &str) -> Vec<u8> {
    ArchiveBuilder::new()
        .stored("mimetype", b"application/vnd.oasis.opendocument.spreadsheet")
        .deflated("content.xml", content.as_bytes())
        .stored("META-INF/manifest.xml", b"<manifest:manifest/>")
        .build()
        .bytes
}

pub fn write_temp(bytes: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(bytes).unwrap();
    file.flush().unwrap();
    file
}
