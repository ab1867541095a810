use std::iter::Peekable;
use std::mem::take;
use std::path::Path;
use std::str::Chars;

use tracing::warn;

use crate::error::ImportError;
use crate::merge::row::{Cell, RawRow};

/// A parsed CSV file: header plus rows padded/truncated to the header width.
#[derive(Debug, Clone)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl Table {
    /// Empty fields become `Cell::Null`; everything else is text and typed on read.
    pub fn into_raw_rows(self) -> Vec<RawRow> {
        let headers = self.headers;
        self.rows
            .into_iter()
            .map(|row| {
                headers
                    .iter()
                    .cloned()
                    .zip(row)
                    .map(|(h, v)| (h, v.map(Cell::Text).unwrap_or(Cell::Null)))
                    .collect()
            })
            .collect()
    }
}

/// Record-at-a-time CSV/TSV reader. Quoted fields may hold separators,
/// newlines and `""` escapes; CRLF and LF both end a record.
struct Records<'a> {
    chars: Peekable<Chars<'a>>,
    sep: char,
}

impl<'a> Records<'a> {
    fn new(text: &'a str, sep: char) -> Self {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        Records {
            chars: text.chars().peekable(),
            sep,
        }
    }

    fn read_record(&mut self) -> Option<Vec<String>> {
        self.chars.peek()?;
        let mut fields = Vec::new();
        let mut current = String::new();
        let mut quoted = false;

        while let Some(ch) = self.chars.next() {
            if quoted {
                if ch != '"' {
                    current.push(ch);
                } else if self.chars.next_if_eq(&'"').is_some() {
                    current.push('"');
                } else {
                    quoted = false;
                }
                continue;
            }
            match ch {
                '"' => quoted = true,
                '\r' => {
                    self.chars.next_if_eq(&'\n');
                    break;
                }
                '\n' => break,
                c if c == self.sep => fields.push(take(&mut current)),
                c => current.push(c),
            }
        }

        // an unterminated quote swallows the rest of the text into the last field
        fields.push(current);
        Some(fields)
    }
}

impl Iterator for Records<'_> {
    type Item = Vec<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let record = self.read_record()?;
            let blank = record.len() == 1 && record[0].is_empty();
            if !blank {
                return Some(record);
            }
        }
    }
}

/// Every non-blank record of `text`.
pub fn parse_rows(text: &str, sep: char) -> Vec<Vec<String>> {
    Records::new(text, sep).collect()
}

/// Parse with the first row as header.
pub fn parse_table(text: &str, sep: char) -> Result<Table, ImportError> {
    let mut rows = Records::new(text, sep);
    let headers: Vec<String> = rows
        .next()
        .ok_or(ImportError::MissingHeader)?
        .into_iter()
        .map(|h| h.trim().to_string())
        .collect();

    for (i, h) in headers.iter().enumerate() {
        if h.is_empty() {
            return Err(ImportError::EmptyColumn(i));
        }
        if headers[..i].contains(h) {
            return Err(ImportError::DuplicateColumn(h.clone()));
        }
    }

    let width = headers.len();
    let rows = rows
        .enumerate()
        .map(|(line, row)| {
            if row.len() > width {
                warn!(line = line + 2, fields = row.len(), width, "row truncated to header width");
            }
            let mut cells: Vec<Option<String>> = row
                .into_iter()
                .take(width)
                .map(|v| if v.trim().is_empty() { None } else { Some(v) })
                .collect();
            cells.resize(width, None);
            cells
        })
        .collect();

    Ok(Table { headers, rows })
}

/// Read a file and parse it; `.tsv` files are tab-separated.
pub fn read_table(path: &Path) -> Result<Table, ImportError> {
    let text = std::fs::read_to_string(path)?;
    let sep = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => '\t',
        _ => ',',
    };
    parse_table(&text, sep)
}
