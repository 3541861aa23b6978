//! Core types shared between the orchestration engine and its callers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The name of an index in the document store.
///
/// Index names are plain strings on the wire, but the engine passes them
/// around enough (routing, refresh tracking, failure reports) that a
/// dedicated type keeps the signatures honest.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndexName(String);

impl IndexName {
    /// Creates an index name from anything string-like.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the raw index name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IndexName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IndexName {
    fn from(name: &str) -> Self {
        Self(name.to_owned())
    }
}

impl From<String> for IndexName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// How urgently a write must become visible to searches.
///
/// The strategy is a property of each individual work. Works that share a
/// strategy can share a bulk request; the engine refuses to mix strategies
/// within one bulk so that the post-bulk refresh handling stays uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshStrategy {
    /// The write becomes visible whenever the store's own refresh cycle
    /// picks it up.
    #[default]
    None,
    /// The touched index must be refreshed before the changeset is reported
    /// complete.
    Immediate,
}

/// Descriptive metadata for a unit of work, used in logs and failure reports.
///
/// This is deliberately lossy: it identifies the work well enough for a
/// human reading an error report, without holding onto the work's payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkInfo {
    /// Short operation label, e.g. `"index"`, `"delete"`, `"refresh"`.
    pub kind: String,
    /// The index the work targets, when it targets exactly one.
    pub index: Option<IndexName>,
    /// The document the work targets, when it targets exactly one.
    pub document_id: Option<String>,
    /// Opaque routing key carried for diagnostics.
    pub queuing_key: Option<String>,
}

impl WorkInfo {
    /// Creates work metadata with just an operation label.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            index: None,
            document_id: None,
            queuing_key: None,
        }
    }

    /// Sets the index the work targets.
    pub fn with_index(mut self, index: IndexName) -> Self {
        self.index = Some(index);
        self
    }

    /// Sets the document the work targets.
    pub fn with_document_id(mut self, document_id: impl Into<String>) -> Self {
        self.document_id = Some(document_id.into());
        self
    }

    /// Sets the routing key the work was submitted under.
    pub fn with_queuing_key(mut self, queuing_key: impl Into<String>) -> Self {
        self.queuing_key = Some(queuing_key.into());
        self
    }
}

impl fmt::Display for WorkInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(index) = &self.index {
            write!(f, " index={}", index)?;
        }
        if let Some(document_id) = &self.document_id {
            write!(f, " id={}", document_id)?;
        }
        Ok(())
    }
}

/// The successful outcome of a unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkOutcome {
    /// A document was written. `created` is false when an existing document
    /// was overwritten.
    Indexed { created: bool },
    /// A delete was attempted. `found` is false when the document did not
    /// exist in the first place.
    Deleted { found: bool },
    /// One or more indexes were refreshed.
    Refreshed,
    /// The store acknowledged the operation without further detail.
    Acknowledged,
}
