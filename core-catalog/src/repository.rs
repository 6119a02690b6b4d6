//! # Catalog Repository
//!
//! Read access to the audiobook catalog held in the remote document store.
//!
//! The repository trait is the seam for testing: the player core takes an
//! `Arc<dyn CatalogRepository>` and never talks to the document store
//! directly.

use crate::error::{CatalogError, Result};
use crate::models::{BookId, CatalogItem};
use async_trait::async_trait;
use bridge_traits::documents::{DocumentQuery, DocumentStore};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Collection holding catalog item documents.
const CATALOG_COLLECTION: &str = "audiobooks";

/// Read-side repository over the audiobook catalog.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// All items ordered by creation time descending.
    async fn list_recent(&self, limit: usize) -> Result<Vec<CatalogItem>>;

    /// Items ordered by play count descending (the trending shelf).
    async fn list_popular(&self, limit: usize) -> Result<Vec<CatalogItem>>;

    /// Point lookup by document id.
    async fn find_by_id(&self, id: &BookId) -> Result<Option<CatalogItem>>;
}

/// `CatalogRepository` implementation over a [`DocumentStore`].
pub struct DocumentCatalogRepository {
    store: Arc<dyn DocumentStore>,
}

impl DocumentCatalogRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    fn item_from_document(
        id: &str,
        document: serde_json::Map<String, Value>,
    ) -> Result<CatalogItem> {
        let mut item: CatalogItem = serde_json::from_value(Value::Object(document))
            .map_err(|e| CatalogError::InvalidItem {
                id: id.to_string(),
                message: e.to_string(),
            })?;
        item.id = BookId::new(id);

        item.validate().map_err(|message| CatalogError::InvalidItem {
            id: id.to_string(),
            message,
        })?;

        Ok(item)
    }

    /// Convert documents to items, skipping malformed entries with a warning
    /// so one bad upload cannot empty the whole shelf.
    fn collect_items(documents: Vec<(String, serde_json::Map<String, Value>)>) -> Vec<CatalogItem> {
        documents
            .into_iter()
            .filter_map(|(id, doc)| match Self::item_from_document(&id, doc) {
                Ok(item) => Some(item),
                Err(e) => {
                    warn!(item_id = %id, error = %e, "Skipping malformed catalog item");
                    None
                }
            })
            .collect()
    }
}

#[async_trait]
impl CatalogRepository for DocumentCatalogRepository {
    #[instrument(skip(self))]
    async fn list_recent(&self, limit: usize) -> Result<Vec<CatalogItem>> {
        let documents = self
            .store
            .query(
                CATALOG_COLLECTION,
                DocumentQuery::newest_first("createdAt").with_limit(limit),
            )
            .await?;

        let items = Self::collect_items(documents);
        debug!(count = items.len(), "Listed recent catalog items");
        Ok(items)
    }

    #[instrument(skip(self))]
    async fn list_popular(&self, limit: usize) -> Result<Vec<CatalogItem>> {
        // The store orders by creation time only; popularity is sorted here.
        let documents = self
            .store
            .query(CATALOG_COLLECTION, DocumentQuery::new())
            .await?;

        let mut items = Self::collect_items(documents);
        items.sort_by(|a, b| b.plays.cmp(&a.plays));
        items.truncate(limit);
        Ok(items)
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: &BookId) -> Result<Option<CatalogItem>> {
        match self.store.get(CATALOG_COLLECTION, id.as_str()).await? {
            Some(document) => Ok(Some(Self::item_from_document(id.as_str(), document)?)),
            None => Ok(None),
        }
    }
}
