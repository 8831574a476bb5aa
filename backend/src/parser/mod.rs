//! CSV protocol sheet reader with encoding and delimiter auto-detection.
//!
//! Sheets are usually exported from Excel, so they may arrive as
//! Windows-1252 or Latin-1 with `;` as delimiter. Every record becomes a
//! [`RawRow`] tagged with its file name and line number.

use indexmap::IndexMap;
use serde::Serialize;
use std::path::Path;

use crate::error::{CsvError, CsvResult};
use crate::models::{RawRow, RowOrigin};
use crate::transform::merger::{OPCODE_COLUMN, OPCODE_LABEL_COLUMN};

/// Columns every protocol sheet must carry.
pub const REQUIRED_COLUMNS: [&str; 2] = [OPCODE_COLUMN, OPCODE_LABEL_COLUMN];

/// Result of parsing with metadata
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedSheet {
    /// File or upload name
    pub source: String,
    /// Parsed rows, in file order
    pub rows: Vec<RawRow>,
    /// Detected encoding
    pub encoding: String,
    /// Detected delimiter
    pub delimiter: char,
    /// Column headers
    pub headers: Vec<String>,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "utf-8-sig" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match encoding.to_lowercase().as_str() {
        // WHATWG maps the latin1 labels to windows-1252
        "iso-8859-1" | "latin-1" | "latin1" | "windows-1252" | "cp1252" => {
            encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned()
        }
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Detect the delimiter by counting occurrences in the first line.
///
/// `|` is not a candidate: it separates packed values inside cells.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let mut best_sep = ',';
    let mut best_count = 0;

    for sep in [',', ';', '\t'] {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse decoded CSV text with an explicit delimiter.
pub fn parse_str(source: &str, content: &str, delimiter: char) -> CsvResult<(Vec<String>, Vec<RawRow>)> {
    if content.trim().is_empty() {
        return Err(CsvError::EmptyFile(source.to_string()));
    }

    let delimiter = u8::try_from(delimiter).map_err(|_| CsvError::Parse {
        source_name: source.to_string(),
        line: 1,
        message: format!("delimiter {:?} is not a single byte", delimiter),
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| parse_error(source, 1, e))?
        .iter()
        .map(|h| h.trim_matches('"').to_string())
        .collect();

    if headers.iter().all(String::is_empty) {
        return Err(CsvError::NoHeaders(source.to_string()));
    }

    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(CsvError::MissingColumn {
                source_name: source.to_string(),
                column: column.to_string(),
            });
        }
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| {
            let line = e.position().map_or(0, |p| line_at(content, p));
            parse_error(source, line, e)
        })?;

        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        let line = record.position().map_or(0, |p| line_at(content, p));
        let cells: IndexMap<String, String> = headers
            .iter()
            .enumerate()
            .map(|(i, header)| (header.clone(), record.get(i).unwrap_or("").to_string()))
            .collect();

        rows.push(RawRow::new(
            RowOrigin {
                source: source.to_string(),
                line,
            },
            cells,
        ));
    }

    Ok((headers, rows))
}

/// Parse CSV bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto(source: &str, bytes: &[u8]) -> CsvResult<ParsedSheet> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = detect_delimiter(&content);
    let (headers, rows) = parse_str(source, &content, delimiter)?;

    Ok(ParsedSheet {
        source: source.to_string(),
        rows,
        encoding,
        delimiter,
        headers,
    })
}

/// Parse a CSV file with auto-detection of encoding and delimiter.
pub fn parse_csv_file_auto<P: AsRef<Path>>(path: P) -> CsvResult<ParsedSheet> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| CsvError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    parse_bytes_auto(&name, &bytes)
}

/// 1-based line of a record.
///
/// The reader stamps a record with its position before skipping blank
/// lines, so step over any line terminators first.
fn line_at(content: &str, position: &csv::Position) -> usize {
    let bytes = content.as_bytes();
    let mut start = (position.byte() as usize).min(bytes.len());
    while start < bytes.len() && matches!(bytes[start], b'\r' | b'\n') {
        start += 1;
    }
    bytes[..start].iter().filter(|&&b| b == b'\n').count() + 1
}

fn parse_error(source: &str, line: usize, err: csv::Error) -> CsvError {
    CsvError::Parse {
        source_name: source.to_string(),
        line,
        message: err.to_string(),
    }
}
