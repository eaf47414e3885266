//! Gettext PO/POT text catalogs.

use crate::error::CatalogError;
use crate::models::{TranslationCatalog, TranslationEntry};

/// Marker every non-empty template contains.
pub const ENTRY_MARKER: &str = "msgid \"";

/// Returns true if the text holds at least one non-header entry.
pub fn is_template(text: &str) -> bool {
    text.contains(ENTRY_MARKER) && parse(text).map(|c| !c.is_empty()).unwrap_or(false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Ctxt,
    Id,
    Plural,
    Str,
    OtherPluralStr,
}

#[derive(Default)]
struct Pending {
    msgctxt: Option<String>,
    msgid: Option<String>,
    msgstr: Option<String>,
}

impl Pending {
    fn flush(&mut self, catalog: &mut TranslationCatalog) {
        let pending = std::mem::take(self);
        if let Some(msgid) = pending.msgid {
            catalog.push(TranslationEntry::new(
                msgid,
                pending.msgctxt,
                pending.msgstr.unwrap_or_default(),
            ));
        }
    }
}

/// Parses PO or POT text. The header entry (empty `msgid`) is dropped, as
/// are obsolete `#~` entries. For plural entries the singular form and
/// `msgstr[0]` are kept.
pub fn parse(text: &str) -> Result<TranslationCatalog, CatalogError> {
    let mut catalog = TranslationCatalog::new();
    let mut pending = Pending::default();
    let mut field: Option<Field> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();

        if line.is_empty() {
            pending.flush(&mut catalog);
            field = None;
            continue;
        }
        if line.starts_with('#') {
            continue;
        }

        if line.starts_with('"') {
            let value = unquote(line, line_no)?;
            let target = match field {
                Some(Field::Ctxt) => pending.msgctxt.as_mut(),
                Some(Field::Id) => pending.msgid.as_mut(),
                Some(Field::Str) => pending.msgstr.as_mut(),
                Some(Field::Plural) | Some(Field::OtherPluralStr) => continue,
                None => {
                    return Err(CatalogError::Po {
                        line: line_no,
                        message: "string continuation without a keyword".into(),
                    })
                }
            };
            if let Some(target) = target {
                target.push_str(&value);
            }
            continue;
        }

        let (keyword, rest) = line.split_once(char::is_whitespace).ok_or_else(|| CatalogError::Po {
            line: line_no,
            message: format!("expected keyword and string, found '{}'", line),
        })?;
        let value = unquote(rest.trim(), line_no)?;

        match keyword {
            "msgctxt" => {
                pending.flush(&mut catalog);
                pending.msgctxt = Some(value);
                field = Some(Field::Ctxt);
            }
            "msgid" => {
                if pending.msgid.is_some() {
                    pending.flush(&mut catalog);
                }
                pending.msgid = Some(value);
                field = Some(Field::Id);
            }
            "msgid_plural" => field = Some(Field::Plural),
            "msgstr" | "msgstr[0]" => {
                pending.msgstr = Some(value);
                field = Some(Field::Str);
            }
            k if k.starts_with("msgstr[") => field = Some(Field::OtherPluralStr),
            other => {
                return Err(CatalogError::Po {
                    line: line_no,
                    message: format!("unknown keyword '{}'", other),
                })
            }
        }
    }

    pending.flush(&mut catalog);
    Ok(catalog)
}

fn unquote(token: &str, line: usize) -> Result<String, CatalogError> {
    let inner = token
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .ok_or_else(|| CatalogError::Po {
            line,
            message: format!("expected quoted string, found '{}'", token),
        })?;

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => {
                return Err(CatalogError::Po {
                    line,
                    message: "dangling escape".into(),
                })
            }
        }
    }
    Ok(out)
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}

/// Header fields written into generated catalogs.
pub fn header(project: &str, language: &str) -> String {
    format!(
        "Project-Id-Version: {}\nLanguage: {}\nMIME-Version: 1.0\nContent-Type: text/plain; charset=UTF-8\nContent-Transfer-Encoding: 8bit\nX-Generator: shop-provisioner\n",
        project, language
    )
}

/// Renders a catalog as PO text with a header entry.
pub fn render(catalog: &TranslationCatalog, project: &str, language: &str) -> String {
    let mut po = String::new();
    po.push_str("msgid \"\"\nmsgstr \"\"\n");
    for line in header(project, language).split_inclusive('\n') {
        po.push_str(&format!("\"{}\"\n", escape(line)));
    }

    for entry in catalog.entries() {
        po.push('\n');
        if let Some(ctx) = &entry.msgctxt {
            po.push_str(&format!("msgctxt \"{}\"\n", escape(ctx)));
        }
        po.push_str(&format!("msgid \"{}\"\n", escape(&entry.msgid)));
        po.push_str(&format!("msgstr \"{}\"\n", escape(&entry.msgstr)));
    }
    po
}
