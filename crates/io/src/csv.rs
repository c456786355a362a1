// CSV/TSV import/export
//
// A table is one header record followed by data records. Quoting follows
// RFC 4180, so fields may contain the delimiter, quotes, or line breaks.

use std::io::Read;
use std::path::Path;

use alchemist_engine::{Alignment, Table, TableError};

pub const DEFAULT_DELIMITER: u8 = b',';

#[derive(Debug, thiserror::Error)]
pub enum CsvError {
    #[error("no header row found")]
    Empty,
    #[error("malformed CSV at record {record}: {message}")]
    Malformed { record: usize, message: String },
    #[error(transparent)]
    Misaligned(#[from] TableError),
    #[error("{0}")]
    Io(String),
}

/// Parse comma-separated text into a table.
pub fn parse(content: &str, alignment: Alignment) -> Result<Table, CsvError> {
    parse_with_delimiter(content, DEFAULT_DELIMITER, alignment)
}

/// Parse delimited text. Empty lines and whitespace-only lines are skipped; the
/// first remaining record is the header row.
///
/// A quoted blank field (`"   "`) is a record, not an empty line.
pub fn parse_with_delimiter(
    content: &str,
    delimiter: u8,
    alignment: Alignment,
) -> Result<Table, CsvError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut records: Vec<Vec<String>> = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let record = result.map_err(|e| CsvError::Malformed {
            record: idx,
            message: e.to_string(),
        })?;
        if record.len() == 1 && is_blank_line(content, &record) {
            continue;
        }
        records.push(record.iter().map(str::to_string).collect());
    }

    let mut records = records.into_iter();
    let headers = records.next().ok_or(CsvError::Empty)?;
    let table = Table::from_rows(headers, records.collect(), alignment)?;

    log::debug!(
        "parsed CSV: {} columns, {} rows",
        table.col_count(),
        table.row_count()
    );
    Ok(table)
}

/// True when the raw input line behind a record holds nothing but whitespace.
fn is_blank_line(content: &str, record: &csv::StringRecord) -> bool {
    let start = record.position().map_or(0, |p| p.byte() as usize);
    content
        .get(start..)
        .and_then(|rest| rest.lines().next())
        .map_or(true, |line| line.trim().is_empty())
}

/// Serialize a table as comma-separated text: one record per line, no trailing
/// newline. Fields are quoted only when they need it; a record made of a single
/// blank field is always quoted so it does not read back as an empty line.
pub fn serialize(table: &Table) -> Result<String, CsvError> {
    serialize_with_delimiter(table, DEFAULT_DELIMITER)
}

pub fn serialize_with_delimiter(table: &Table, delimiter: u8) -> Result<String, CsvError> {
    let mut bytes = Vec::new();
    let records = std::iter::once(table.headers()).chain(table.rows().iter().map(Vec::as_slice));
    for record in records {
        bytes.extend(encode_record(record, delimiter)?);
    }

    let mut text = String::from_utf8(bytes).map_err(|e| CsvError::Io(e.to_string()))?;
    if text.ends_with('\n') {
        text.pop();
    }
    Ok(text)
}

fn encode_record(record: &[String], delimiter: u8) -> Result<Vec<u8>, CsvError> {
    let quote_style = match record {
        [field] if field.trim().is_empty() => csv::QuoteStyle::Always,
        _ => csv::QuoteStyle::Necessary,
    };
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(quote_style)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(record).map_err(|e| CsvError::Io(e.to_string()))?;
    writer.into_inner().map_err(|e| CsvError::Io(e.to_string()))
}

/// Parse text whose delimiter is unknown. Returns the table and the delimiter
/// it was read with, so it can be written back the same way.
pub fn parse_sniffed(content: &str) -> Result<(Table, u8), CsvError> {
    let delimiter = sniff_delimiter(content);
    let table = parse_with_delimiter(content, delimiter, Alignment::Pad)?;
    Ok((table, delimiter))
}

/// Load a table from disk, sniffing the delimiter. Short rows are padded.
pub fn load_path(path: &Path) -> Result<(Table, u8), CsvError> {
    let content = read_file_as_utf8(path)?;
    parse_sniffed(&content)
}

pub fn save_path(table: &Table, path: &Path, delimiter: u8) -> Result<(), CsvError> {
    let mut text = serialize_with_delimiter(table, delimiter)?;
    text.push('\n');
    std::fs::write(path, text).map_err(|e| CsvError::Io(format!("{}: {}", path.display(), e)))
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
pub fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(10)
        .collect();

    if sample_lines.is_empty() {
        return DEFAULT_DELIMITER;
    }

    let mut best = DEFAULT_DELIMITER;
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        // Must produce >1 field on the header line to be viable
        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        // Higher field count breaks ties
        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1, etc.)
pub fn read_file_as_utf8(path: &Path) -> Result<String, CsvError> {
    let mut file = std::fs::File::open(path)
        .map_err(|e| CsvError::Io(format!("{}: {}", path.display(), e)))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|e| CsvError::Io(format!("{}: {}", path.display(), e)))?;
    Ok(decode_bytes(bytes))
}

/// UTF-8 first; on failure fall back to Windows-1252 (common for Excel-exported CSVs).
pub fn decode_bytes(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            let bytes = e.into_bytes();
            log::warn!("input is not UTF-8, decoding as Windows-1252");
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            decoded.into_owned()
        }
    }
}
