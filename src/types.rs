//! Core types for the vault.

use crate::error::{Result, VaultError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Filename prefix that marks a workflow document.
pub const DOCUMENT_PREFIX: &str = "wf-";

/// File extension for documents, metadata lists, and version payloads.
pub const JSON_EXT: &str = ".json";

/// Unique identifier for a workflow document. Doubles as its on-disk key.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId(String);

impl DocumentId {
    /// Validate and wrap an id.
    ///
    /// Ids name files directly, so they must carry the `wf-` prefix and must
    /// not contain path separators.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if !id.starts_with(DOCUMENT_PREFIX) {
            return Err(VaultError::InvalidName(format!(
                "document id must start with '{}': {}",
                DOCUMENT_PREFIX, id
            )));
        }
        if id.contains('/') || id.contains('\\') || id.contains("..") {
            return Err(VaultError::InvalidName(format!(
                "document id must not contain path components: {}",
                id
            )));
        }
        Ok(DocumentId(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// On-disk filename for the document's current state.
    pub fn file_name(&self) -> String {
        format!("{}{}", self.0, JSON_EXT)
    }

    /// Recover an id from a document filename. `None` for anything that is
    /// not a `wf-*.json` file.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let stem = name.strip_suffix(JSON_EXT)?;
        DocumentId::new(stem).ok()
    }
}

impl TryFrom<String> for DocumentId {
    type Error = VaultError;

    fn try_from(value: String) -> Result<Self> {
        DocumentId::new(value)
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.0
    }
}

impl fmt::Debug for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentId({})", self.0)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single workflow document: a directed graph of typed nodes and edges plus
/// tagging and ownership metadata.
///
/// Nodes and edges are opaque to this subsystem; they are carried as raw JSON
/// values so the editor's shapes round-trip unchanged. Unknown top-level
/// fields are preserved the same way.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<Value>,
    #[serde(default)]
    pub edges: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(
        default,
        rename = "teamId",
        skip_serializing_if = "Option::is_none"
    )]
    pub team_id: Option<String>,
    #[serde(
        default,
        rename = "ownerId",
        skip_serializing_if = "Option::is_none"
    )]
    pub owner_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Document {
    /// Minimal document with the given id and name.
    pub fn new(id: DocumentId, name: impl Into<String>) -> Self {
        Document {
            id,
            name: name.into(),
            nodes: Vec::new(),
            edges: Vec::new(),
            tags: Vec::new(),
            team_id: None,
            owner_id: None,
            extra: Map::new(),
        }
    }
}

/// One entry of `tags.json`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One entry of `teams.json`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One entry of `owners.json`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Owner {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Counts extracted from one archive by [`crate::ArchiveCatalog::inspect`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub team_count: usize,
    pub owner_count: usize,
    pub tag_count: usize,
    pub document_count: usize,
    pub total_node_count: usize,
}
