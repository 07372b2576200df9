//! External corpus source (JSON).
//!
//! Accepts either a bare array of entries or an object wrapping them under
//! `entries` or `lines`. Entry `i` enriches line `i + 1`; the cardinality
//! check happens when the corpus is built.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Texts and extra keywords for one line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceEntry {
    #[serde(default)]
    pub id: Option<u16>,
    #[serde(default)]
    pub name: Option<String>,
    /// Traditional line text.
    #[serde(default)]
    pub shin: Option<String>,
    /// Transformation text.
    #[serde(default)]
    pub hen: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSource {
    List(Vec<SourceEntry>),
    Entries { entries: Vec<SourceEntry> },
    Lines { lines: Vec<SourceEntry> },
}

/// A parsed corpus source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorpusSource {
    entries: Vec<SourceEntry>,
}

impl CorpusSource {
    pub fn from_entries(entries: Vec<SourceEntry>) -> Self {
        Self { entries }
    }

    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let raw: RawSource = serde_json::from_str(json)?;
        let entries = match raw {
            RawSource::List(entries) => entries,
            RawSource::Entries { entries } => entries,
            RawSource::Lines { lines } => lines,
        };
        Ok(Self { entries })
    }

    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let text = std::fs::read_to_string(path).map_err(|source| EngineError::CorpusRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn entries(&self) -> &[SourceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_bare_array() {
        let src = CorpusSource::from_json(r#"[{"name": "乾為天 初九", "shin": "潛龍勿用"}, {}]"#)
            .unwrap();
        assert_eq!(src.len(), 2);
        assert_eq!(src.entries()[0].shin.as_deref(), Some("潛龍勿用"));
        assert_eq!(src.entries()[1], SourceEntry::default());
    }

    #[test]
    fn parses_wrapped_forms() {
        let a = CorpusSource::from_json(r#"{"entries": [{"id": 1}]}"#).unwrap();
        let b = CorpusSource::from_json(r#"{"lines": [{"id": 1}]}"#).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.entries()[0].id, Some(1));
    }

    #[test]
    fn malformed_json_is_format_error() {
        let err = CorpusSource::from_json(r#"{"rows": []}"#).unwrap_err();
        assert!(matches!(err, EngineError::CorpusFormat(_)));
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"keywords": ["龍"]}}]"#).unwrap();
        let src = CorpusSource::load(file.path()).unwrap();
        assert_eq!(src.entries()[0].keywords, vec!["龍".to_string()]);
    }

    #[test]
    fn load_missing_file_is_read_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = CorpusSource::load(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, EngineError::CorpusRead { .. }));
    }
}
