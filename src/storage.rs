/// Typed access to the two records kept in extension storage
use log::warn;
use serde_json::Value;

use crate::error::StorageError;
use crate::history::HistoryEntry;
use crate::settings::Settings;

pub const SETTINGS_KEY: &str = "extensionSettings";
pub const HISTORY_KEY: &str = "videoHistory";

/// A key-value area such as `chrome.storage.local`
///
/// Each call is atomic on its own; callers composing a read and a write
/// get no transaction across the two.
#[allow(async_fn_in_trait)]
pub trait StorageArea {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;
    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError>;
}

/// Current settings, defaults filling whatever the stored record lacks
pub async fn load_settings<S: StorageArea>(storage: &S) -> Settings {
    match storage.get(SETTINGS_KEY).await {
        Ok(Some(value)) => Settings::from_stored(value).unwrap_or_else(|e| {
            warn!("Ignoring unreadable settings record: {}", e);
            Settings::default()
        }),
        Ok(None) => Settings::default(),
        Err(e) => {
            warn!("Failed to load settings, using defaults: {}", e);
            Settings::default()
        }
    }
}

pub async fn save_settings<S: StorageArea>(storage: &S, settings: &Settings) -> Result<(), StorageError> {
    let value = serde_json::to_value(settings)?;
    storage.set(SETTINGS_KEY, value).await
}

/// Stored history, or an empty list when nothing has been written yet
///
/// Entries are decoded one by one: unreadable ones are dropped, incomplete
/// ones are repaired, so the next write leaves a clean record behind.
pub async fn load_history<S: StorageArea>(storage: &S) -> Result<Vec<HistoryEntry>, StorageError> {
    let items = match storage.get(HISTORY_KEY).await? {
        Some(Value::Null) | None => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(other) => {
            warn!("History record is not a list, starting over: {}", other);
            return Ok(Vec::new());
        }
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<HistoryEntry>(item) {
            Ok(entry) => Some(entry.repaired()),
            Err(e) => {
                warn!("Dropping unreadable history entry: {}", e);
                None
            }
        })
        .collect())
}

pub async fn save_history<S: StorageArea>(storage: &S, entries: &[HistoryEntry]) -> Result<(), StorageError> {
    let value = serde_json::to_value(entries)?;
    storage.set(HISTORY_KEY, value).await
}

pub async fn has_history_record<S: StorageArea>(storage: &S) -> Result<bool, StorageError> {
    Ok(storage.get(HISTORY_KEY).await?.is_some())
}
