//! # Persisted Client State
//!
//! Small key-value state kept on the client for instant UI reads: liked items,
//! listening history, and mirrors of the coin balance and membership flag.
//!
//! Everything here is a cache of server truth. The entitlement gate reads the
//! document store, never these mirrors.

use crate::error::{CatalogError, Result};
use crate::models::CatalogItem;
use bridge_traits::SettingsStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Both the liked list and the history list are capped at this many entries.
pub const MAX_SAVED_ITEMS: usize = 5;

const LIKED_KEY: &str = "liked_items";
const HISTORY_KEY: &str = "history_items";
const COIN_BALANCE_KEY: &str = "coin_balance";
const MEMBERSHIP_KEY: &str = "membership_active";

/// Compact catalog item reference kept in the liked/history lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedItem {
    pub id: String,
    pub title: String,
    pub author: String,
    pub cover_url: String,
}

impl From<&CatalogItem> for SavedItem {
    fn from(item: &CatalogItem) -> Self {
        Self {
            id: item.id.to_string(),
            title: item.title.clone(),
            author: item.author.clone(),
            cover_url: item.cover_url.clone(),
        }
    }
}

/// Client state store over a [`SettingsStore`].
pub struct ClientStateStore {
    settings: Arc<dyn SettingsStore>,
}

impl ClientStateStore {
    pub fn new(settings: Arc<dyn SettingsStore>) -> Self {
        Self { settings }
    }

    async fn read_list(&self, key: &str) -> Result<Vec<SavedItem>> {
        match self.settings.get_string(key).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| CatalogError::Serialization(e.to_string())),
            None => Ok(Vec::new()),
        }
    }

    async fn write_list(&self, key: &str, items: &[SavedItem]) -> Result<()> {
        let raw = serde_json::to_string(items)
            .map_err(|e| CatalogError::Serialization(e.to_string()))?;
        self.settings.set_string(key, &raw).await?;
        Ok(())
    }

    /// Liked items, most recently liked first.
    pub async fn liked(&self) -> Result<Vec<SavedItem>> {
        self.read_list(LIKED_KEY).await
    }

    /// Toggle the liked state of an item.
    ///
    /// Returns `true` if the item is liked after the call. Liking a sixth item
    /// drops the oldest one.
    #[instrument(skip(self, item), fields(item_id = %item.id))]
    pub async fn toggle_liked(&self, item: &CatalogItem) -> Result<bool> {
        let mut liked = self.read_list(LIKED_KEY).await?;
        let id = item.id.to_string();

        if let Some(index) = liked.iter().position(|saved| saved.id == id) {
            liked.remove(index);
            self.write_list(LIKED_KEY, &liked).await?;
            debug!("Item unliked");
            return Ok(false);
        }

        if liked.len() >= MAX_SAVED_ITEMS {
            liked.pop();
        }
        liked.insert(0, SavedItem::from(item));
        self.write_list(LIKED_KEY, &liked).await?;
        debug!("Item liked");
        Ok(true)
    }

    /// Listening history, most recent first.
    pub async fn history(&self) -> Result<Vec<SavedItem>> {
        self.read_list(HISTORY_KEY).await
    }

    /// Record an item at the front of the history list.
    ///
    /// Re-opening an item moves it to the front instead of duplicating it.
    #[instrument(skip(self, item), fields(item_id = %item.id))]
    pub async fn record_history(&self, item: &CatalogItem) -> Result<()> {
        let mut history = self.read_list(HISTORY_KEY).await?;
        let id = item.id.to_string();

        history.retain(|saved| saved.id != id);
        history.insert(0, SavedItem::from(item));
        history.truncate(MAX_SAVED_ITEMS);

        self.write_list(HISTORY_KEY, &history).await
    }

    /// Mirrored coin balance. Missing key reads as zero.
    pub async fn coin_balance(&self) -> Result<u64> {
        let value = self.settings.get_i64(COIN_BALANCE_KEY).await?.unwrap_or(0);
        Ok(value.max(0) as u64)
    }

    /// Update the mirrored coin balance.
    pub async fn set_coin_balance(&self, balance: u64) -> Result<()> {
        self.settings
            .set_i64(COIN_BALANCE_KEY, balance as i64)
            .await?;
        Ok(())
    }

    /// Mirrored membership flag. Missing key reads as inactive.
    pub async fn membership_active(&self) -> Result<bool> {
        Ok(self.settings.get_bool(MEMBERSHIP_KEY).await?.unwrap_or(false))
    }

    /// Update the mirrored membership flag.
    pub async fn set_membership_active(&self, active: bool) -> Result<()> {
        self.settings.set_bool(MEMBERSHIP_KEY, active).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BookId;
    use bridge_desktop::MemorySettingsStore;

    fn item(id: &str, title: &str) -> CatalogItem {
        CatalogItem {
            id: BookId::new(id),
            title: title.to_string(),
            author: "A. Writer".to_string(),
            cover_url: "https://cdn.example.com/cover.jpg".to_string(),
            audio_slug: id.to_string(),
            total_chapters: 3,
            plays: 0,
            rating: 4.5,
            created_at: 0,
        }
    }

    fn store() -> ClientStateStore {
        ClientStateStore::new(Arc::new(MemorySettingsStore::new()))
    }

    #[tokio::test]
    async fn toggle_liked_adds_then_removes() {
        let state = store();
        let book = item("b1", "First");

        assert!(state.toggle_liked(&book).await.unwrap());
        assert_eq!(state.liked().await.unwrap().len(), 1);

        assert!(!state.toggle_liked(&book).await.unwrap());
        assert!(state.liked().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn liked_list_caps_at_five() {
        let state = store();
        for i in 0..6 {
            let book = item(&format!("b{}", i), &format!("Book {}", i));
            state.toggle_liked(&book).await.unwrap();
        }

        let liked = state.liked().await.unwrap();
        assert_eq!(liked.len(), MAX_SAVED_ITEMS);
        // Newest first; the first-liked item fell off.
        assert_eq!(liked[0].id, "b5");
        assert!(!liked.iter().any(|saved| saved.id == "b0"));
    }

    #[tokio::test]
    async fn history_moves_reopened_item_to_front() {
        let state = store();
        state.record_history(&item("b1", "First")).await.unwrap();
        state.record_history(&item("b2", "Second")).await.unwrap();
        state.record_history(&item("b1", "First")).await.unwrap();

        let history = state.history().await.unwrap();
        let ids: Vec<&str> = history.iter().map(|saved| saved.id.as_str()).collect();
        assert_eq!(ids, vec!["b1", "b2"]);
    }

    #[tokio::test]
    async fn history_caps_at_five() {
        let state = store();
        for i in 0..7 {
            state
                .record_history(&item(&format!("b{}", i), "Book"))
                .await
                .unwrap();
        }

        let history = state.history().await.unwrap();
        assert_eq!(history.len(), MAX_SAVED_ITEMS);
        assert_eq!(history[0].id, "b6");
    }

    #[tokio::test]
    async fn mirrors_default_and_roundtrip() {
        let state = store();

        assert_eq!(state.coin_balance().await.unwrap(), 0);
        assert!(!state.membership_active().await.unwrap());

        state.set_coin_balance(25).await.unwrap();
        state.set_membership_active(true).await.unwrap();

        assert_eq!(state.coin_balance().await.unwrap(), 25);
        assert!(state.membership_active().await.unwrap());
    }
}
