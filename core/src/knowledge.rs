//! Read-only domain knowledge used to answer questions without the generative backend.
//!
//! The knowledge base is a handful of JSON documents loaded once at startup.
//! Documents are loosely structured, so every value is held as a
//! [`KnowledgeValue`] tree and looked up by path. A missing document or a
//! missing path is a normal condition: callers substitute their own defaults.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Documents the knowledge base knows how to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DocumentName {
    Alerts,
    FallbackData,
    Reports,
    Greetings,
    SensorStatus,
}

impl DocumentName {
    pub const ALL: [DocumentName; 5] = [
        DocumentName::Alerts,
        DocumentName::FallbackData,
        DocumentName::Reports,
        DocumentName::Greetings,
        DocumentName::SensorStatus,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DocumentName::Alerts => "alerts",
            DocumentName::FallbackData => "fallback-data",
            DocumentName::Reports => "reports",
            DocumentName::Greetings => "greetings",
            DocumentName::SensorStatus => "sensor-status",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|doc| doc.as_str().eq_ignore_ascii_case(name.trim()))
    }

    pub fn file_name(self) -> String {
        format!("{}.json", self.as_str())
    }
}

impl fmt::Display for DocumentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node of a knowledge document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KnowledgeValue {
    Null,
    Flag(bool),
    Number(f64),
    Text(String),
    List(Vec<KnowledgeValue>),
    Map(BTreeMap<String, KnowledgeValue>),
}

impl KnowledgeValue {
    /// Walk `path` through nested maps. Explicit `null` counts as absent.
    pub fn lookup(&self, path: &[&str]) -> Option<&KnowledgeValue> {
        let mut current = self;
        for key in path {
            current = current.as_map()?.get(*key)?;
        }
        match current {
            KnowledgeValue::Null => None,
            value => Some(value),
        }
    }

    /// Scalar rendering: text as-is, integral numbers without a fractional part.
    pub fn as_text(&self) -> Option<String> {
        match self {
            KnowledgeValue::Text(text) => Some(text.clone()),
            KnowledgeValue::Number(number) => Some(format_number(*number)),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[KnowledgeValue]> {
        match self {
            KnowledgeValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, KnowledgeValue>> {
        match self {
            KnowledgeValue::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            KnowledgeValue::Null => "null",
            KnowledgeValue::Flag(_) => "boolean",
            KnowledgeValue::Number(_) => "number",
            KnowledgeValue::Text(_) => "string",
            KnowledgeValue::List(_) => "list",
            KnowledgeValue::Map(_) => "mapping",
        }
    }
}

fn format_number(number: f64) -> String {
    if number.fract() == 0.0 && number.abs() < 1e15 {
        format!("{}", number as i64)
    } else {
        number.to_string()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum KnowledgeError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Read and parse a single knowledge document.
pub fn load_document(path: &Path) -> Result<KnowledgeValue, KnowledgeError> {
    let raw = std::fs::read_to_string(path).map_err(|source| KnowledgeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| KnowledgeError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// In-memory knowledge base, immutable once built.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    documents: BTreeMap<DocumentName, KnowledgeValue>,
}

impl KnowledgeBase {
    pub fn from_documents(
        documents: impl IntoIterator<Item = (DocumentName, KnowledgeValue)>,
    ) -> Self {
        Self {
            documents: documents.into_iter().collect(),
        }
    }

    /// Load every known document from `primary`, falling back to `fallback`
    /// when nothing at all could be loaded from the primary directory.
    pub fn load(primary: &Path, fallback: Option<&Path>) -> Self {
        let kb = Self::load_dir(primary);
        if !kb.is_empty() {
            return kb;
        }

        match fallback {
            Some(fallback) if fallback != primary => {
                tracing::warn!(
                    primary = %primary.display(),
                    fallback = %fallback.display(),
                    "no knowledge documents loaded; retrying from fallback directory"
                );
                let kb = Self::load_dir(fallback);
                if kb.is_empty() {
                    tracing::error!("knowledge base is empty; fallback responses will use defaults");
                }
                kb
            }
            _ => {
                tracing::error!("knowledge base is empty; fallback responses will use defaults");
                kb
            }
        }
    }

    fn load_dir(dir: &Path) -> Self {
        let mut documents = BTreeMap::new();
        for doc in DocumentName::ALL {
            let path = dir.join(doc.file_name());
            match load_document(&path) {
                Ok(value) => {
                    tracing::info!(document = doc.as_str(), path = %path.display(), "loaded knowledge document");
                    documents.insert(doc, value);
                }
                Err(err) => {
                    tracing::warn!(document = doc.as_str(), error = %err, "skipping knowledge document");
                }
            }
        }
        Self { documents }
    }

    pub fn document(&self, doc: DocumentName) -> Option<&KnowledgeValue> {
        self.documents.get(&doc)
    }

    pub fn get(&self, doc: DocumentName, path: &[&str]) -> Option<&KnowledgeValue> {
        self.document(doc)?.lookup(path)
    }

    pub fn document_names(&self) -> Vec<&'static str> {
        self.documents.keys().map(|doc| doc.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
