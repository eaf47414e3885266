//! GNU MO compiled catalogs.
//!
//! Little-endian, revision 0, no hash table. Strings are sorted by key so
//! readers can binary search the original-string table.

use std::collections::BTreeMap;

use crate::error::CatalogError;
use crate::models::{TranslationCatalog, TranslationEntry};
use crate::services::po;

pub const MAGIC: u32 = 0x9504_12de;
const HEADER_LEN: usize = 28;

/// Compiles a catalog into MO bytes.
///
/// The PO header is stored under the empty key. Untranslated entries are
/// left out, and a repeated key keeps its last translation.
pub fn encode(
    catalog: &TranslationCatalog,
    project: &str,
    language: &str,
) -> Result<Vec<u8>, CatalogError> {
    let mut table: BTreeMap<Vec<u8>, Vec<u8>> = BTreeMap::new();
    table.insert(Vec::new(), po::header(project, language).into_bytes());
    for entry in catalog.entries().iter().filter(|e| !e.msgstr.is_empty()) {
        table.insert(entry.key().into_bytes(), entry.msgstr.clone().into_bytes());
    }

    let count = table.len();
    let originals_offset = HEADER_LEN;
    let translations_offset = originals_offset + 8 * count;
    let mut data_offset = translations_offset + 8 * count;

    let mut originals = Vec::with_capacity(count);
    for key in table.keys() {
        originals.push((key.len(), data_offset));
        data_offset += key.len() + 1;
    }
    let mut translations = Vec::with_capacity(count);
    for value in table.values() {
        translations.push((value.len(), data_offset));
        data_offset += value.len() + 1;
    }
    if data_offset > u32::MAX as usize {
        return Err(CatalogError::TooLarge);
    }

    let mut out = Vec::with_capacity(data_offset);
    for word in [
        MAGIC,
        0,
        count as u32,
        originals_offset as u32,
        translations_offset as u32,
        0,
        translations_offset as u32 + 8 * count as u32,
    ] {
        out.extend_from_slice(&word.to_le_bytes());
    }
    for (len, offset) in originals.iter().chain(translations.iter()) {
        out.extend_from_slice(&(*len as u32).to_le_bytes());
        out.extend_from_slice(&(*offset as u32).to_le_bytes());
    }
    for bytes in table.keys().chain(table.values()) {
        out.extend_from_slice(bytes);
        out.push(0);
    }
    Ok(out)
}

/// Reads MO bytes back into entries, skipping the header entry.
pub fn decode(bytes: &[u8]) -> Result<TranslationCatalog, CatalogError> {
    let word = |at: usize| -> Result<usize, CatalogError> {
        bytes
            .get(at..at + 4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as usize)
            .ok_or(CatalogError::Encoding)
    };
    if word(0)? != MAGIC as usize {
        return Err(CatalogError::Encoding);
    }
    let count = word(8)?;
    let originals = word(12)?;
    let translations = word(16)?;

    let string_at = |table: usize, idx: usize| -> Result<String, CatalogError> {
        let len = word(table + idx * 8)?;
        let offset = word(table + idx * 8 + 4)?;
        let raw = bytes.get(offset..offset + len).ok_or(CatalogError::Encoding)?;
        String::from_utf8(raw.to_vec()).map_err(|_| CatalogError::Encoding)
    };

    let mut catalog = TranslationCatalog::new();
    for idx in 0..count {
        let key = string_at(originals, idx)?;
        let msgstr = string_at(translations, idx)?;
        let (msgctxt, msgid) = match key.split_once('\u{4}') {
            Some((ctx, id)) => (Some(ctx.to_string()), id.to_string()),
            None => (None, key),
        };
        catalog.push(TranslationEntry::new(msgid, msgctxt, msgstr));
    }
    Ok(catalog)
}
