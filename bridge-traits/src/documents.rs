//! Document Store Abstraction
//!
//! Provides a platform-agnostic trait for the hosted document database that
//! owns catalog, user, and transaction records. The core consumes it purely
//! through get/query/set/update operations keyed by document id; it never
//! assumes anything about the wire protocol behind it.
//!
//! ## Collections
//!
//! Documents live in named collections addressed by slash-separated paths,
//! e.g. `books`, `users`, or the per-user subcollection
//! `users/{principal}/transactions`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// A document: a JSON object keyed by field name.
pub type Document = serde_json::Map<String, Value>;

/// Sort direction for ordered queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Query options for listing a collection.
#[derive(Debug, Clone, Default)]
pub struct DocumentQuery {
    /// Order results by this field
    pub order_by: Option<(String, SortDirection)>,
    /// Maximum number of documents to return
    pub limit: Option<usize>,
}

impl DocumentQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Order by a field, descending. The common "newest first" listing.
    pub fn newest_first(field: impl Into<String>) -> Self {
        Self {
            order_by: Some((field.into(), SortDirection::Descending)),
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Remote document database trait
///
/// All operations are keyed by `(collection, id)`. Updates are field-level
/// merges, which is the only mutation granularity the remote store offers;
/// there are no multi-document transactions.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync`; the core shares one handle across
/// async tasks via `Arc`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document by id. Returns `Ok(None)` if it does not exist.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Create or replace a document.
    async fn set(&self, collection: &str, id: &str, data: Document) -> Result<()>;

    /// Merge fields into an existing document.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::DocumentNotFound`](crate::BridgeError::DocumentNotFound)
    /// if the document does not exist.
    async fn update(&self, collection: &str, id: &str, fields: Document) -> Result<()>;

    /// Append a document with a store-generated id. Returns the new id.
    async fn add(&self, collection: &str, data: Document) -> Result<String>;

    /// List documents in a collection, with optional ordering and limit.
    ///
    /// Returns `(id, document)` pairs.
    async fn query(
        &self,
        collection: &str,
        query: DocumentQuery,
    ) -> Result<Vec<(String, Document)>>;
}
