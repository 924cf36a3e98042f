//! Text extraction from uploaded files
//!
//! Office Open XML files are read straight from their zip parts; PDFs go
//! through `pdf-extract`; everything else must be UTF-8.

use std::collections::HashMap;
use std::io::{Cursor, Read};

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use thiserror::Error;
use zip::ZipArchive;

/// Largest accepted upload
pub const MAX_FILE_SIZE: u64 = 20 * 1024 * 1024;

/// Extracted text longer than this is cut before prompting
pub const MAX_CONTENT_CHARS: usize = 10_000;

const TRUNCATION_MARKER: &str = "\n... (content truncated)";

/// Decompressed bytes read from one Office archive, across all its parts
pub const MAX_EXTRACTED_SIZE: u64 = 5 * MAX_FILE_SIZE;

/// Highest column count in a worksheet (`XFD`)
const MAX_COLUMNS: usize = 16_384;

/// Legacy binary Office formats, recognised but not supported
const LEGACY_EXTENSIONS: &[&str] = &[".doc", ".xls", ".ppt"];

#[derive(Error, Debug)]
pub enum FileError {
    #[error("file is {0} bytes, limit is {MAX_FILE_SIZE}")]
    TooLarge(u64),

    #[error("unsupported file type: {0}")]
    Unsupported(String),

    #[error("file is not valid UTF-8 text")]
    InvalidEncoding,

    #[error("failed to extract text: {0}")]
    Extraction(String),
}

fn extraction_error(e: impl std::fmt::Display) -> FileError {
    FileError::Extraction(e.to_string())
}

/// Broad file category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCategory {
    Documents,
    Spreadsheets,
    Presentations,
    Code,
}

impl FileCategory {
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            FileCategory::Documents => &[".pdf", ".docx", ".txt", ".md"],
            FileCategory::Spreadsheets => &[".xlsx", ".csv"],
            FileCategory::Presentations => &[".pptx"],
            FileCategory::Code => &[
                ".py", ".js", ".ts", ".html", ".css", ".java", ".cpp", ".c", ".php", ".rb", ".go",
                ".rs", ".json", ".yaml", ".yml", ".sql",
            ],
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        [
            FileCategory::Documents,
            FileCategory::Spreadsheets,
            FileCategory::Presentations,
            FileCategory::Code,
        ]
        .into_iter()
        .find(|c| c.extensions().contains(&ext))
    }
}

/// Lowercase extension including the dot, e.g. `.pdf`
pub fn file_extension(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(format!(".{}", ext.to_lowercase()))
}

/// Extension without the dot, as logged in `conversations.file_type`
pub fn file_type(file_name: &str) -> Option<String> {
    file_extension(file_name).map(|ext| ext.trim_start_matches('.').to_string())
}

/// Check size and type before downloading/extracting
pub fn validate(file_name: &str, size: u64) -> Result<FileCategory, FileError> {
    if size > MAX_FILE_SIZE {
        return Err(FileError::TooLarge(size));
    }

    let ext = file_extension(file_name).ok_or_else(|| FileError::Unsupported(file_name.to_string()))?;
    if LEGACY_EXTENSIONS.contains(&ext.as_str()) {
        return Err(FileError::Unsupported(ext));
    }
    FileCategory::from_extension(&ext).ok_or(FileError::Unsupported(ext))
}

/// Extract plain text from a validated file
pub fn extract_text(file_name: &str, bytes: &[u8]) -> Result<String, FileError> {
    validate(file_name, bytes.len() as u64)?;
    let ext = file_extension(file_name).unwrap_or_default();

    let text = match ext.as_str() {
        ".pdf" => pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| FileError::Extraction(format!("{:?}", e)))?,
        ".docx" => extract_docx(&mut OfficeArchive::open(bytes, MAX_EXTRACTED_SIZE)?)?,
        ".xlsx" => extract_xlsx(&mut OfficeArchive::open(bytes, MAX_EXTRACTED_SIZE)?)?,
        ".pptx" => extract_pptx(&mut OfficeArchive::open(bytes, MAX_EXTRACTED_SIZE)?)?,
        _ => decode_utf8(bytes)?,
    };

    Ok(text.trim().to_string())
}

/// Cut content to [`MAX_CONTENT_CHARS`] and mark the cut
pub fn truncate_content(text: &str) -> String {
    match text.char_indices().nth(MAX_CONTENT_CHARS) {
        Some((idx, _)) => format!("{}{}", &text[..idx], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}

fn decode_utf8(bytes: &[u8]) -> Result<String, FileError> {
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    String::from_utf8(bytes.to_vec()).map_err(|_| FileError::InvalidEncoding)
}

/// Zip container with a budget on how much it may decompress
struct OfficeArchive<'a> {
    zip: ZipArchive<Cursor<&'a [u8]>>,
    remaining: u64,
}

impl<'a> OfficeArchive<'a> {
    fn open(bytes: &'a [u8], limit: u64) -> Result<Self, FileError> {
        let zip = ZipArchive::new(Cursor::new(bytes)).map_err(extraction_error)?;
        Ok(Self { zip, remaining: limit })
    }

    fn has_part(&self, name: &str) -> bool {
        self.zip.file_names().any(|n| n == name)
    }

    fn file_names(&self) -> Vec<String> {
        self.zip.file_names().map(str::to_string).collect()
    }

    fn read_part(&mut self, name: &str) -> Result<String, FileError> {
        let part = self.zip.by_name(name).map_err(extraction_error)?;

        // Declared part sizes are untrusted
        let mut xml = String::new();
        let read = part
            .take(self.remaining.saturating_add(1))
            .read_to_string(&mut xml)
            .map_err(extraction_error)? as u64;
        if read > self.remaining {
            return Err(FileError::Extraction(format!("{} expands beyond the extraction limit", name)));
        }
        self.remaining -= read;
        Ok(xml)
    }
}

/// Collect text runs (`<*:t>`), one line per paragraph (`<*:p>`)
fn paragraphs_text(xml: &str) -> Result<String, FileError> {
    let mut reader = Reader::from_str(xml);
    let mut out = String::new();
    let mut line = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event().map_err(extraction_error)? {
            Event::Start(e) if e.local_name().as_ref() == b"t" => in_text = true,
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    let trimmed = line.trim();
                    if !trimmed.is_empty() {
                        out.push_str(trimmed);
                        out.push('\n');
                    }
                    line.clear();
                }
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"tab" => line.push('\t'),
                b"br" => line.push(' '),
                _ => {}
            },
            Event::Text(t) if in_text => {
                line.push_str(&t.unescape().map_err(extraction_error)?);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !line.trim().is_empty() {
        out.push_str(line.trim());
    }
    Ok(out.trim_end().to_string())
}

fn extract_docx(archive: &mut OfficeArchive<'_>) -> Result<String, FileError> {
    let xml = archive.read_part("word/document.xml")?;
    paragraphs_text(&xml)
}

fn slide_number(name: &str) -> Option<u32> {
    name.strip_prefix("ppt/slides/slide")?
        .strip_suffix(".xml")?
        .parse()
        .ok()
}

fn extract_pptx(archive: &mut OfficeArchive<'_>) -> Result<String, FileError> {
    let mut slides: Vec<(u32, String)> = archive
        .file_names()
        .into_iter()
        .filter_map(|name| slide_number(&name).map(|n| (n, name)))
        .collect();
    slides.sort_by_key(|(n, _)| *n);

    let mut sections = Vec::new();
    for (number, name) in slides {
        let xml = archive.read_part(&name)?;
        let text = paragraphs_text(&xml)?;
        if !text.is_empty() {
            sections.push(format!("--- Slide {} ---\n{}", number, text));
        }
    }
    Ok(sections.join("\n\n"))
}

fn attr_value(e: &BytesStart<'_>, local: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == local)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

fn shared_strings(xml: &str) -> Result<Vec<String>, FileError> {
    let mut reader = Reader::from_str(xml);
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    let mut in_phonetic = false;

    loop {
        match reader.read_event().map_err(extraction_error)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => current.clear(),
                b"t" if !in_phonetic => in_text = true,
                b"rPh" => in_phonetic = true,
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => strings.push(std::mem::take(&mut current)),
                b"t" => in_text = false,
                b"rPh" => in_phonetic = false,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::Text(t) if in_text => current.push_str(&t.unescape().map_err(extraction_error)?),
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(strings)
}

/// Sheet names and their part paths, in workbook order
fn workbook_sheets(archive: &mut OfficeArchive<'_>) -> Result<Vec<(String, String)>, FileError> {
    let rels_xml = archive.read_part("xl/_rels/workbook.xml.rels")?;
    let mut targets = HashMap::new();
    let mut reader = Reader::from_str(&rels_xml);
    loop {
        match reader.read_event().map_err(extraction_error)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) = (attr_value(&e, b"Id"), attr_value(&e, b"Target")) {
                    let path = match target.strip_prefix('/') {
                        Some(absolute) => absolute.to_string(),
                        None => format!("xl/{}", target),
                    };
                    targets.insert(id, path);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let workbook_xml = archive.read_part("xl/workbook.xml")?;
    let mut sheets = Vec::new();
    let mut reader = Reader::from_str(&workbook_xml);
    loop {
        match reader.read_event().map_err(extraction_error)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                let name = attr_value(&e, b"name").unwrap_or_default();
                if let Some(path) = attr_value(&e, b"id").and_then(|id| targets.get(&id).cloned()) {
                    sheets.push((name, path));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(sheets)
}

/// Zero-based column index from a cell reference like `AB12`
fn column_index(cell_ref: &str) -> Result<usize, FileError> {
    let mut column = 0usize;
    for c in cell_ref.chars().take_while(|c| c.is_ascii_alphabetic()) {
        let digit = c.to_ascii_uppercase() as usize - 'A' as usize + 1;
        column = column
            .checked_mul(26)
            .and_then(|n| n.checked_add(digit))
            .filter(|n| *n <= MAX_COLUMNS)
            .ok_or_else(|| FileError::Extraction(format!("cell reference out of range: {}", cell_ref)))?;
    }
    Ok(column.saturating_sub(1))
}

fn sheet_rows(xml: &str, shared: &[String]) -> Result<Vec<String>, FileError> {
    let mut reader = Reader::from_str(xml);
    let mut rows = Vec::new();
    let mut cells: Vec<String> = Vec::new();
    let mut cell_type = String::new();
    let mut cell_col = 0usize;
    let mut value = String::new();
    let mut in_value = false;

    loop {
        match reader.read_event().map_err(extraction_error)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"row" => cells.clear(),
                b"c" => {
                    cell_type = attr_value(&e, b"t").unwrap_or_default();
                    cell_col = match attr_value(&e, b"r") {
                        Some(r) => column_index(&r)?,
                        None if cells.len() < MAX_COLUMNS => cells.len(),
                        None => return Err(FileError::Extraction("too many cells in row".to_string())),
                    };
                    value.clear();
                }
                b"v" | b"t" => in_value = true,
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"c" => {
                    let text = match cell_type.as_str() {
                        "s" => value
                            .trim()
                            .parse::<usize>()
                            .ok()
                            .and_then(|i| shared.get(i).cloned())
                            .unwrap_or_default(),
                        "b" => (if value.trim() == "1" { "TRUE" } else { "FALSE" }).to_string(),
                        _ => value.clone(),
                    };
                    if cells.len() <= cell_col {
                        cells.resize(cell_col + 1, String::new());
                    }
                    cells[cell_col] = text;
                }
                b"row" => {
                    if cells.iter().any(|c| !c.trim().is_empty()) {
                        rows.push(cells.join("\t"));
                    }
                    cells.clear();
                }
                _ => {}
            },
            Event::Text(t) if in_value => value.push_str(&t.unescape().map_err(extraction_error)?),
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(rows)
}

fn extract_xlsx(archive: &mut OfficeArchive<'_>) -> Result<String, FileError> {
    let shared = if archive.has_part("xl/sharedStrings.xml") {
        shared_strings(&archive.read_part("xl/sharedStrings.xml")?)?
    } else {
        Vec::new()
    };

    let mut sections = Vec::new();
    for (name, path) in workbook_sheets(archive)? {
        let xml = archive.read_part(&path)?;
        let rows = sheet_rows(&xml, &shared)?;
        if !rows.is_empty() {
            sections.push(format!("--- Sheet: {} ---\n{}", name, rows.join("\n")));
        }
    }
    Ok(sections.join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;

    fn build_zip(parts: &[(&str, &str)]) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buf);
            for (name, content) in parts {
                writer.start_file(*name, FileOptions::default()).unwrap();
                writer.write_all(content.as_bytes()).unwrap();
            }
            writer.finish().unwrap();
        }
        buf.into_inner()
    }

    #[test]
    fn test_validate() {
        assert_eq!(validate("report.PDF", 1024).unwrap(), FileCategory::Documents);
        assert_eq!(validate("main.rs", 10).unwrap(), FileCategory::Code);
        assert_eq!(validate("data.csv", 10).unwrap(), FileCategory::Spreadsheets);
        assert!(matches!(validate("old.doc", 10), Err(FileError::Unsupported(_))));
        assert!(matches!(validate("movie.mp4", 10), Err(FileError::Unsupported(_))));
        assert!(matches!(validate("noext", 10), Err(FileError::Unsupported(_))));
        assert!(matches!(validate("big.pdf", MAX_FILE_SIZE + 1), Err(FileError::TooLarge(_))));
    }

    #[test]
    fn test_plain_text_and_encoding() {
        assert_eq!(extract_text("notes.md", "\u{feff}# Title\n".as_bytes()).unwrap(), "# Title");
        assert!(matches!(
            extract_text("notes.txt", &[0xFF, 0xFE, 0x00]),
            Err(FileError::InvalidEncoding)
        ));
    }

    #[test]
    fn test_truncate_content() {
        let short = "สวัสดี";
        assert_eq!(truncate_content(short), short);

        let long = "ก".repeat(MAX_CONTENT_CHARS + 5);
        let cut = truncate_content(&long);
        assert!(cut.ends_with("\n... (content truncated)"));
        assert_eq!(cut.chars().count(), MAX_CONTENT_CHARS + TRUNCATION_MARKER.chars().count());
    }

    #[test]
    fn test_extract_docx() {
        let document = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>Quarterly</w:t></w:r><w:r><w:t xml:space="preserve"> sales &amp; costs</w:t></w:r></w:p>
    <w:p><w:r><w:t>ยอดขาย</w:t></w:r></w:p>
  </w:body>
</w:document>"#;
        let bytes = build_zip(&[("word/document.xml", document)]);
        assert_eq!(extract_text("q.docx", &bytes).unwrap(), "Quarterly sales & costs\nยอดขาย");
    }

    #[test]
    fn test_extract_pptx_orders_slides_numerically() {
        let slide = |text: &str| {
            format!(
                r#"<p:sld xmlns:p="p" xmlns:a="a"><p:cSld><p:spTree><p:sp><p:txBody><a:p><a:r><a:t>{}</a:t></a:r></a:p></p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#,
                text
            )
        };
        let s1 = slide("Intro");
        let s2 = slide("Pricing");
        let s10 = slide("Thanks");
        let bytes = build_zip(&[
            ("ppt/slides/slide10.xml", &s10),
            ("ppt/slides/slide2.xml", &s2),
            ("ppt/slides/slide1.xml", &s1),
        ]);

        let text = extract_text("deck.pptx", &bytes).unwrap();
        assert_eq!(
            text,
            "--- Slide 1 ---\nIntro\n\n--- Slide 2 ---\nPricing\n\n--- Slide 10 ---\nThanks"
        );
    }

    #[test]
    fn test_extract_xlsx() {
        let workbook = r#"<workbook xmlns="main" xmlns:r="rels"><sheets>
            <sheet name="Sales" sheetId="1" r:id="rId1"/>
        </sheets></workbook>"#;
        let rels = r#"<Relationships xmlns="rels">
            <Relationship Id="rId1" Type="worksheet" Target="worksheets/sheet1.xml"/>
        </Relationships>"#;
        let shared = r#"<sst><si><t>Product</t></si><si><t>Qty</t></si><si><t>Coffee</t></si></sst>"#;
        let sheet = r#"<worksheet><sheetData>
            <row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c></row>
            <row r="2"></row>
            <row r="3"><c r="A3" t="s"><v>2</v></c><c r="C3"><v>12</v></c></row>
        </sheetData></worksheet>"#;
        let bytes = build_zip(&[
            ("xl/workbook.xml", workbook),
            ("xl/_rels/workbook.xml.rels", rels),
            ("xl/sharedStrings.xml", shared),
            ("xl/worksheets/sheet1.xml", sheet),
        ]);

        let text = extract_text("sales.xlsx", &bytes).unwrap();
        assert_eq!(text, "--- Sheet: Sales ---\nProduct\tQty\nCoffee\t\t12");
    }

    #[test]
    fn test_corrupt_office_file() {
        assert!(matches!(
            extract_text("broken.docx", b"not a zip"),
            Err(FileError::Extraction(_))
        ));
    }

    #[test]
    fn test_column_index() {
        assert_eq!(column_index("A1").unwrap(), 0);
        assert_eq!(column_index("C3").unwrap(), 2);
        assert_eq!(column_index("AA10").unwrap(), 26);
        assert_eq!(column_index("XFD1").unwrap(), MAX_COLUMNS - 1);
    }

    #[test]
    fn test_column_index_out_of_range() {
        assert!(matches!(column_index("XFE1"), Err(FileError::Extraction(_))));
        assert!(matches!(column_index("ZZZZZZZZ1"), Err(FileError::Extraction(_))));
        assert!(matches!(column_index("ZZZZZZZZZZZZZZZ1"), Err(FileError::Extraction(_))));
    }

    fn single_cell_workbook(cell_ref: &str) -> Vec<u8> {
        let workbook = r#"<workbook xmlns:r="rels"><sheets><sheet name="S" sheetId="1" r:id="rId1"/></sheets></workbook>"#;
        let rels = r#"<Relationships><Relationship Id="rId1" Target="worksheets/sheet1.xml"/></Relationships>"#;
        let sheet = format!(
            r#"<worksheet><sheetData><row r="1"><c r="{}"><v>1</v></c></row></sheetData></worksheet>"#,
            cell_ref
        );
        build_zip(&[
            ("xl/workbook.xml", workbook),
            ("xl/_rels/workbook.xml.rels", rels),
            ("xl/worksheets/sheet1.xml", &sheet),
        ])
    }

    #[test]
    fn test_xlsx_with_huge_cell_reference_is_rejected() {
        for cell_ref in ["ZZZZZZZZ1", "ZZZZZZZZZZZZZZZ1"] {
            let bytes = single_cell_workbook(cell_ref);
            assert!(matches!(
                extract_text("evil.xlsx", &bytes),
                Err(FileError::Extraction(_))
            ));
        }

        let last_column = extract_text("wide.xlsx", &single_cell_workbook("XFD1")).unwrap();
        assert!(last_column.ends_with("\t1"));
    }

    #[test]
    fn test_decompression_budget() {
        let body = format!(
            "<w:document><w:body><w:p><w:r><w:t>{}</w:t></w:r></w:p></w:body></w:document>",
            "a".repeat(4096)
        );
        let bytes = build_zip(&[("word/document.xml", &body)]);
        assert!(bytes.len() < body.len());

        let mut tight = OfficeArchive::open(&bytes, 1024).unwrap();
        assert!(matches!(extract_docx(&mut tight), Err(FileError::Extraction(_))));

        let mut roomy = OfficeArchive::open(&bytes, 8192).unwrap();
        assert_eq!(extract_docx(&mut roomy).unwrap(), "a".repeat(4096));
    }

    #[test]
    fn test_decompression_budget_spans_all_parts() {
        let slide = format!("<p:sld><a:p><a:t>{}</a:t></a:p></p:sld>", "b".repeat(600));
        let bytes = build_zip(&[("ppt/slides/slide1.xml", &slide), ("ppt/slides/slide2.xml", &slide)]);

        let mut one_slide_budget = OfficeArchive::open(&bytes, 1000).unwrap();
        assert!(matches!(
            extract_pptx(&mut one_slide_budget),
            Err(FileError::Extraction(_))
        ));

        let mut enough = OfficeArchive::open(&bytes, 2000).unwrap();
        assert!(extract_pptx(&mut enough).unwrap().contains("--- Slide 2 ---"));
    }

    #[test]
    fn test_file_type() {
        assert_eq!(file_type("Report.PDF").as_deref(), Some("pdf"));
        assert_eq!(file_type("sales.xlsx").as_deref(), Some("xlsx"));
        assert_eq!(file_type("noext"), None);
    }
}
