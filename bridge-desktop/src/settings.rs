//! In-Memory Settings Storage

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::SettingsStore,
};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

/// Typed value as stored; type mismatches on read are reported, not coerced.
#[derive(Debug, Clone, PartialEq)]
enum SettingValue {
    Text(String),
    Flag(bool),
    Integer(i64),
}

/// In-memory `SettingsStore` implementation.
///
/// Holds the small key-value client state (liked items, history, balance and
/// membership mirrors) for desktop hosts and tests.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    values: Mutex<HashMap<String, SettingValue>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn type_mismatch(key: &str, expected: &str) -> BridgeError {
        BridgeError::OperationFailed(format!("Setting {} is not a {}", key, expected))
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        debug!(key = key, "Stored string setting");
        self.values
            .lock()
            .await
            .insert(key.to_string(), SettingValue::Text(value.to_string()));
        Ok(())
    }

    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        match self.values.lock().await.get(key) {
            Some(SettingValue::Text(s)) => Ok(Some(s.clone())),
            Some(_) => Err(Self::type_mismatch(key, "string")),
            None => Ok(None),
        }
    }

    async fn set_bool(&self, key: &str, value: bool) -> Result<()> {
        self.values
            .lock()
            .await
            .insert(key.to_string(), SettingValue::Flag(value));
        Ok(())
    }

    async fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        match self.values.lock().await.get(key) {
            Some(SettingValue::Flag(b)) => Ok(Some(*b)),
            Some(_) => Err(Self::type_mismatch(key, "bool")),
            None => Ok(None),
        }
    }

    async fn set_i64(&self, key: &str, value: i64) -> Result<()> {
        self.values
            .lock()
            .await
            .insert(key.to_string(), SettingValue::Integer(value));
        Ok(())
    }

    async fn get_i64(&self, key: &str) -> Result<Option<i64>> {
        match self.values.lock().await.get(key) {
            Some(SettingValue::Integer(i)) => Ok(Some(*i)),
            Some(_) => Err(Self::type_mismatch(key, "i64")),
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.values.lock().await.remove(key);
        Ok(())
    }

    async fn has_key(&self, key: &str) -> Result<bool> {
        Ok(self.values.lock().await.contains_key(key))
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        Ok(self.values.lock().await.keys().cloned().collect())
    }

    async fn clear_all(&self) -> Result<()> {
        self.values.lock().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn roundtrip_typed_values() {
        let store = MemorySettingsStore::new();

        store.set_string("theme", "dark").await.unwrap();
        store.set_bool("membership_active", true).await.unwrap();
        store.set_i64("coin_balance", 25).await.unwrap();

        assert_eq!(
            store.get_string("theme").await.unwrap(),
            Some("dark".to_string())
        );
        assert_eq!(store.get_bool("membership_active").await.unwrap(), Some(true));
        assert_eq!(store.get_i64("coin_balance").await.unwrap(), Some(25));
        assert_eq!(store.get_i64("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn type_mismatch_is_an_error() {
        let store = MemorySettingsStore::new();
        store.set_i64("coin_balance", 25).await.unwrap();

        assert!(store.get_string("coin_balance").await.is_err());
    }

    #[tokio::test]
    async fn delete_and_clear() {
        let store = MemorySettingsStore::new();
        store.set_bool("a", true).await.unwrap();
        store.set_bool("b", false).await.unwrap();

        store.delete("a").await.unwrap();
        assert!(!store.has_key("a").await.unwrap());
        assert!(store.has_key("b").await.unwrap());

        store.clear_all().await.unwrap();
        assert!(store.list_keys().await.unwrap().is_empty());
    }
}
