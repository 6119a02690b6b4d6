//! Domain models for the audiobook catalog
//!
//! This module contains the catalog item model with validation and document
//! mapping. Items are owned by the remote document store; the core treats a
//! fetched item as an immutable value for the duration of a playback session.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a catalog item, assigned by the document store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookId(pub String);

impl BookId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for BookId {
    fn default() -> Self {
        Self(String::new())
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for BookId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// An audiobook catalog entry.
///
/// Field names mirror the document shape in the remote store (camelCase).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    /// Document id (injected by the repository, not stored in the document)
    #[serde(skip)]
    pub id: BookId,
    /// Book title
    pub title: String,
    /// Author name
    pub author: String,
    /// Cover image URL
    pub cover_url: String,
    /// Slug addressing the audio files at the delivery endpoint
    pub audio_slug: String,
    /// Number of chapters, 1-based indexing
    pub total_chapters: u32,
    /// Play counter maintained server-side
    #[serde(default)]
    pub plays: u64,
    /// Average rating; items without votes default to 4.5
    #[serde(default = "default_rating")]
    pub rating: f64,
    /// Creation timestamp (Unix epoch seconds)
    #[serde(default)]
    pub created_at: i64,
}

fn default_rating() -> f64 {
    4.5
}

impl CatalogItem {
    /// Validate item data.
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("Item title cannot be empty".to_string());
        }

        if self.audio_slug.trim().is_empty() {
            return Err("Audio slug cannot be empty".to_string());
        }

        if self.total_chapters == 0 {
            return Err("Item must have at least one chapter".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_item() -> CatalogItem {
        CatalogItem {
            id: BookId::new("book-1"),
            title: "The Long Road".to_string(),
            author: "A. Writer".to_string(),
            cover_url: "https://cdn.example.com/covers/book-1.jpg".to_string(),
            audio_slug: "the-long-road".to_string(),
            total_chapters: 12,
            plays: 1000,
            rating: 4.2,
            created_at: 1_700_000_000,
        }
    }

    #[test]
    fn test_validation() {
        assert!(sample_item().validate().is_ok());

        let mut no_title = sample_item();
        no_title.title = "  ".to_string();
        assert!(no_title.validate().is_err());

        let mut no_slug = sample_item();
        no_slug.audio_slug = String::new();
        assert!(no_slug.validate().is_err());

        let mut no_chapters = sample_item();
        no_chapters.total_chapters = 0;
        assert!(no_chapters.validate().is_err());
    }

    #[test]
    fn test_deserializes_document_shape() {
        let doc = json!({
            "title": "The Long Road",
            "author": "A. Writer",
            "coverUrl": "https://cdn.example.com/covers/book-1.jpg",
            "audioSlug": "the-long-road",
            "totalChapters": 12,
            "createdAt": 1_700_000_000i64
        });

        let item: CatalogItem = serde_json::from_value(doc).unwrap();
        assert_eq!(item.audio_slug, "the-long-road");
        assert_eq!(item.total_chapters, 12);
        // Defaults for absent counters
        assert_eq!(item.plays, 0);
        assert!((item.rating - 4.5).abs() < f64::EPSILON);
    }
}
