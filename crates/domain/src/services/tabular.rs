//! Tabular (CSV) and structured (JSON) catalog documents.
//!
//! Both carry `msgid`, `msgctxt`, `msgstr` triples. The CSV dialect is
//! RFC 4180: comma separated, double-quote quoting with `""` escapes, quoted
//! fields may span lines.

use crate::error::CatalogError;
use crate::models::{TranslationCatalog, TranslationEntry};

/// Header written on every CSV export.
pub const CSV_HEADER: [&str; 3] = ["msgid", "msgctxt", "msgstr"];

/// Renders entries as a CSV document with a header row.
pub fn to_csv(entries: &[TranslationEntry]) -> String {
    let mut csv = String::new();
    csv.push_str(&CSV_HEADER.join(","));
    csv.push('\n');
    for entry in entries {
        csv.push_str(&escape_field(&entry.msgid));
        csv.push(',');
        csv.push_str(&escape_field(entry.msgctxt.as_deref().unwrap_or("")));
        csv.push(',');
        csv.push_str(&escape_field(&entry.msgstr));
        csv.push('\n');
    }
    csv
}

fn escape_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Parses a CSV upload into a catalog, dropping rows with an empty `msgid`.
///
/// The header row must name `msgid` and `msgstr`; `msgctxt` is optional.
/// Column order is free and names are matched case-insensitively.
pub fn from_csv(input: &str) -> Result<TranslationCatalog, CatalogError> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    let mut rows = parse_rows(input)?.into_iter();

    let header = match rows.next() {
        Some(header) => header,
        None => return Ok(TranslationCatalog::new()),
    };
    let column = |name: &str| {
        header
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    };
    let msgid_col = column("msgid").ok_or(CatalogError::MissingColumn("msgid"))?;
    let msgstr_col = column("msgstr").ok_or(CatalogError::MissingColumn("msgstr"))?;
    let msgctxt_col = column("msgctxt");

    let mut catalog = TranslationCatalog::new();
    for row in rows {
        let field = |idx: usize| row.get(idx).cloned().unwrap_or_default();
        let msgctxt = msgctxt_col.map(field).filter(|c| !c.is_empty());
        catalog.push(TranslationEntry::new(field(msgid_col), msgctxt, field(msgstr_col)));
    }
    Ok(catalog)
}

fn parse_rows(input: &str) -> Result<Vec<Vec<String>>, CatalogError> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut quote_line = 1;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() => {
                in_quotes = true;
                quote_line = line;
            }
            '"' => {
                return Err(CatalogError::Csv {
                    line,
                    message: "unexpected quote inside unquoted field".into(),
                })
            }
            ',' => row.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
                line += 1;
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(CatalogError::Csv {
            line: quote_line,
            message: "unterminated quoted field".into(),
        });
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }

    // Blank lines carry no entries.
    rows.retain(|r| !(r.len() == 1 && r[0].is_empty()));
    Ok(rows)
}

/// Renders entries as a JSON array of objects.
pub fn to_json(entries: &[TranslationEntry]) -> Result<String, CatalogError> {
    Ok(serde_json::to_string_pretty(entries)?)
}

/// Parses a JSON array of `{msgid, msgctxt, msgstr}` objects.
pub fn from_json(input: &str) -> Result<TranslationCatalog, CatalogError> {
    let entries: Vec<TranslationEntry> = serde_json::from_str(input)?;
    Ok(entries
        .into_iter()
        .map(|e| TranslationEntry::new(e.msgid, e.msgctxt, e.msgstr))
        .collect())
}
