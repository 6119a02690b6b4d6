//! In-Memory Document Store
//!
//! Collection-addressed document storage used as a desktop shim and in
//! integration tests standing in for the hosted document database.

use async_trait::async_trait;
use bridge_traits::{
    documents::{Document, DocumentQuery, DocumentStore, SortDirection},
    error::{BridgeError, Result},
};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

/// In-memory `DocumentStore` implementation.
///
/// Collections are created lazily. Documents within a collection keep their
/// insertion order, which ordered queries re-sort by the requested field.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: Mutex<HashMap<String, Vec<(String, Document)>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn compare_field(a: &Document, b: &Document, field: &str) -> std::cmp::Ordering {
        let av = a.get(field);
        let bv = b.get(field);
        match (av, bv) {
            (Some(Value::Number(x)), Some(Value::Number(y))) => {
                let x = x.as_f64().unwrap_or(0.0);
                let y = y.as_f64().unwrap_or(0.0);
                x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal)
            }
            (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
            (Some(_), None) => std::cmp::Ordering::Greater,
            (None, Some(_)) => std::cmp::Ordering::Less,
            _ => std::cmp::Ordering::Equal,
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let collections = self.collections.lock().await;
        let doc = collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|(doc_id, _)| doc_id == id))
            .map(|(_, doc)| doc.clone());
        Ok(doc)
    }

    async fn set(&self, collection: &str, id: &str, data: Document) -> Result<()> {
        let mut collections = self.collections.lock().await;
        let docs = collections.entry(collection.to_string()).or_default();
        match docs.iter_mut().find(|(doc_id, _)| doc_id == id) {
            Some((_, existing)) => *existing = data,
            None => docs.push((id.to_string(), data)),
        }
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, fields: Document) -> Result<()> {
        let mut collections = self.collections.lock().await;
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|(doc_id, _)| doc_id == id))
            .ok_or_else(|| BridgeError::DocumentNotFound(format!("{}/{}", collection, id)))?;

        for (key, value) in fields {
            doc.1.insert(key, value);
        }
        Ok(())
    }

    async fn add(&self, collection: &str, data: Document) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let mut collections = self.collections.lock().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .push((id.clone(), data));
        Ok(id)
    }

    async fn query(
        &self,
        collection: &str,
        query: DocumentQuery,
    ) -> Result<Vec<(String, Document)>> {
        let collections = self.collections.lock().await;
        let mut docs: Vec<(String, Document)> = collections
            .get(collection)
            .map(|docs| docs.clone())
            .unwrap_or_default();

        if let Some((field, direction)) = &query.order_by {
            docs.sort_by(|(_, a), (_, b)| {
                let ordering = Self::compare_field(a, b, field);
                match direction {
                    SortDirection::Ascending => ordering,
                    SortDirection::Descending => ordering.reverse(),
                }
            });
        }

        if let Some(limit) = query.limit {
            docs.truncate(limit);
        }

        Ok(docs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(fields: Value) -> Document {
        fields.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn set_and_get_roundtrip() {
        let store = MemoryDocumentStore::new();
        store
            .set("users", "u1", doc(json!({"coins": 15})))
            .await
            .unwrap();

        let fetched = store.get("users", "u1").await.unwrap().unwrap();
        assert_eq!(fetched.get("coins"), Some(&json!(15)));
        assert!(store.get("users", "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_merges_fields() {
        let store = MemoryDocumentStore::new();
        store
            .set("users", "u1", doc(json!({"coins": 15, "name": "a"})))
            .await
            .unwrap();
        store
            .update("users", "u1", doc(json!({"coins": 5})))
            .await
            .unwrap();

        let fetched = store.get("users", "u1").await.unwrap().unwrap();
        assert_eq!(fetched.get("coins"), Some(&json!(5)));
        assert_eq!(fetched.get("name"), Some(&json!("a")));
    }

    #[tokio::test]
    async fn update_missing_document_fails() {
        let store = MemoryDocumentStore::new();
        let err = store
            .update("users", "nope", doc(json!({"coins": 5})))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::DocumentNotFound(_)));
    }

    #[tokio::test]
    async fn query_orders_descending_with_limit() {
        let store = MemoryDocumentStore::new();
        for (id, created) in [("a", 1), ("b", 3), ("c", 2)] {
            store
                .set("books", id, doc(json!({"created_at": created})))
                .await
                .unwrap();
        }

        let results = store
            .query("books", DocumentQuery::newest_first("created_at").with_limit(2))
            .await
            .unwrap();

        let ids: Vec<&str> = results.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn add_generates_unique_ids() {
        let store = MemoryDocumentStore::new();
        let id1 = store
            .add("users/u1/transactions", doc(json!({"amount": -10})))
            .await
            .unwrap();
        let id2 = store
            .add("users/u1/transactions", doc(json!({"amount": 50})))
            .await
            .unwrap();
        assert_ne!(id1, id2);

        let all = store
            .query("users/u1/transactions", DocumentQuery::new())
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
    }
}
