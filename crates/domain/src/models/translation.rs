//! Translation catalog models.

use serde::{Deserialize, Serialize};

/// One translatable string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationEntry {
    pub msgid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msgctxt: Option<String>,
    #[serde(default)]
    pub msgstr: String,
}

impl TranslationEntry {
    pub fn new(msgid: impl Into<String>, msgctxt: Option<String>, msgstr: impl Into<String>) -> Self {
        Self {
            msgid: msgid.into(),
            msgctxt: msgctxt.filter(|c| !c.is_empty()),
            msgstr: msgstr.into(),
        }
    }

    /// Lookup key used by compiled catalogs: `msgctxt \x04 msgid`.
    pub fn key(&self) -> String {
        match &self.msgctxt {
            Some(ctx) => format!("{}\u{4}{}", ctx, self.msgid),
            None => self.msgid.clone(),
        }
    }
}

/// Ordered, append-only sequence of translation entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationCatalog {
    entries: Vec<TranslationEntry>,
}

impl TranslationCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry. Entries with an empty source string are dropped;
    /// returns whether the entry was kept.
    pub fn push(&mut self, entry: TranslationEntry) -> bool {
        if entry.msgid.is_empty() {
            return false;
        }
        self.entries.push(entry);
        true
    }

    pub fn entries(&self) -> &[TranslationEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<TranslationEntry> for TranslationCatalog {
    fn from_iter<I: IntoIterator<Item = TranslationEntry>>(iter: I) -> Self {
        let mut catalog = TranslationCatalog::new();
        for entry in iter {
            catalog.push(entry);
        }
        catalog
    }
}

/// Output format for translation exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Json => "application/json",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

/// Upload format, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFormat {
    Csv,
    Json,
}

impl UploadFormat {
    /// Dispatches on the (case-insensitive) extension of an uploaded file name.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let (_, ext) = filename.rsplit_once('.')?;
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(UploadFormat::Csv),
            "json" => Some(UploadFormat::Json),
            _ => None,
        }
    }
}

/// Response payload for a translation upload.
#[derive(Debug, Clone, Serialize)]
pub struct UploadResponse {
    pub status: String,
    pub entries: usize,
    pub lang: String,
    pub files: Vec<String>,
}
