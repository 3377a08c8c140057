/// Opened-video history: the persisted list and the store that guards it
///
/// Rules:
/// 1. One entry per `videoId`; re-adding restamps it and moves it to the front
/// 2. Newest first
/// 3. Never longer than the configured `historyLimit`
/// 4. Entries older than `historyDuration` days are purged (0 = keep forever)
///
/// Every store operation is best effort: storage failures are logged and
/// turned into an empty or unchanged result.
use std::rc::Rc;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use futures::lock::Mutex;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use crate::storage::{self, StorageArea};
use crate::video;

pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const UNKNOWN_CHANNEL: &str = "Unknown Channel";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub video_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub date_added: String,
}

impl HistoryEntry {
    /// When the entry was added, from `dateAdded` with `timestamp` as fallback
    pub fn added_at(&self) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(&self.date_added)
            .map(|date| date.with_timezone(&Utc))
            .ok()
            .or_else(|| DateTime::<Utc>::from_timestamp_millis(self.timestamp))
            .unwrap_or_default()
    }

    /// Fill whatever an older or hand-edited record left out
    pub fn repaired(mut self) -> HistoryEntry {
        if self.title.trim().is_empty() {
            self.title = UNKNOWN_TITLE.to_string();
        }
        if self.channel.trim().is_empty() {
            self.channel = UNKNOWN_CHANNEL.to_string();
        }
        if self.url.trim().is_empty() {
            self.url = video::watch_url(&self.video_id);
        }
        if self.thumbnail.trim().is_empty() {
            self.thumbnail = video::thumbnail_url(&self.video_id);
        }

        let added_at = self.added_at();
        if self.timestamp == 0 {
            self.timestamp = added_at.timestamp_millis();
        }
        if DateTime::parse_from_rfc3339(&self.date_added).is_err() {
            self.date_added = added_at.to_rfc3339_opts(SecondsFormat::Millis, true);
        }
        self
    }
}

/// What callers know about a video when they ask for it to be remembered
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryCandidate {
    pub video_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

impl HistoryCandidate {
    pub fn new(video_id: impl Into<String>) -> Self {
        HistoryCandidate {
            video_id: video_id.into(),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    /// Build the stored entry, preferring our own metadata, then what the
    /// previous entry for this video had, then placeholders.
    pub fn stamp(&self, previous: Option<&HistoryEntry>, now: DateTime<Utc>) -> HistoryEntry {
        let pick = |ours: &Option<String>, theirs: Option<&String>, fallback: String| {
            non_blank(ours.as_ref())
                .or_else(|| non_blank(theirs))
                .unwrap_or(fallback)
        };

        HistoryEntry {
            video_id: self.video_id.clone(),
            title: pick(&self.title, previous.map(|p| &p.title), UNKNOWN_TITLE.to_string()),
            url: video::watch_url(&self.video_id),
            channel: pick(&self.channel, previous.map(|p| &p.channel), UNKNOWN_CHANNEL.to_string()),
            thumbnail: pick(
                &self.thumbnail,
                previous.map(|p| &p.thumbnail),
                video::thumbnail_url(&self.video_id),
            ),
            timestamp: now.timestamp_millis(),
            date_added: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty()).map(str::to_string)
}

/// The history record, newest first
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct HistoryList {
    pub entries: Vec<HistoryEntry>,
}

impl HistoryList {
    pub fn new(entries: Vec<HistoryEntry>) -> Self {
        HistoryList { entries }
    }

    pub fn get(&self, video_id: &str) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.video_id == video_id)
    }

    /// Replace any entry with the same id, put `entry` first, then cap
    pub fn upsert(&mut self, entry: HistoryEntry, limit: usize) {
        self.entries.retain(|e| e.video_id != entry.video_id);
        self.entries.insert(0, entry);
        self.entries.truncate(limit.max(1));
    }

    pub fn remove(&mut self, video_id: &str) -> bool {
        let original_len = self.entries.len();
        self.entries.retain(|e| e.video_id != video_id);
        self.entries.len() < original_len
    }

    /// Drop entries added before `cutoff`, returning how many went
    pub fn expire_before(&mut self, cutoff: DateTime<Utc>) -> usize {
        let original_len = self.entries.len();
        self.entries.retain(|e| e.added_at() >= cutoff);
        original_len - self.entries.len()
    }

    pub fn sort_newest_first(&mut self) {
        self.entries.sort_by(|a, b| b.added_at().cmp(&a.added_at()));
    }
}

/// Entries whose title, channel, or id contain `query`, ignoring case
pub fn filter_entries(entries: &[HistoryEntry], query: &str) -> Vec<HistoryEntry> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return entries.to_vec();
    }

    entries
        .iter()
        .filter(|entry| {
            entry.title.to_lowercase().contains(&query)
                || entry.channel.to_lowercase().contains(&query)
                || entry.video_id.to_lowercase().contains(&query)
        })
        .cloned()
        .collect()
}

/// Source of "now" for stamping and retention
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// History operations over the persisted record
pub struct HistoryStore<S> {
    storage: Rc<S>,
    clock: Box<dyn Clock>,
    // Held across each read-modify-write so interleaved messages can't
    // overwrite each other's changes.
    writer: Mutex<()>,
}

impl<S: StorageArea> HistoryStore<S> {
    pub fn new(storage: Rc<S>) -> Self {
        Self::with_clock(storage, SystemClock)
    }

    pub fn with_clock(storage: Rc<S>, clock: impl Clock + 'static) -> Self {
        HistoryStore {
            storage,
            clock: Box::new(clock),
            writer: Mutex::new(()),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Create an empty record if none exists yet
    pub async fn initialize(&self) {
        let _guard = self.writer.lock().await;

        match storage::has_history_record(&*self.storage).await {
            Ok(true) => debug!("History record already present"),
            Ok(false) => match storage::save_history(&*self.storage, &[]).await {
                Ok(()) => info!("Created empty history record"),
                Err(e) => error!("Failed to create history record: {}", e),
            },
            Err(e) => error!("Failed to check history record: {}", e),
        }
    }

    /// All entries, newest first; empty if storage can't be read
    pub async fn get_all(&self) -> Vec<HistoryEntry> {
        match storage::load_history(&*self.storage).await {
            Ok(entries) => {
                let mut list = HistoryList::new(entries);
                list.sort_newest_first();
                list.entries
            }
            Err(e) => {
                error!("Failed to read history: {}", e);
                Vec::new()
            }
        }
    }

    /// Remember a video, returning the entry as stored
    pub async fn add(&self, candidate: HistoryCandidate) -> Option<HistoryEntry> {
        if candidate.video_id.trim().is_empty() {
            warn!("Ignoring history entry without a video id");
            return None;
        }

        let limit = storage::load_settings(&*self.storage).await.history_limit as usize;
        let _guard = self.writer.lock().await;

        let mut list = match storage::load_history(&*self.storage).await {
            Ok(entries) => HistoryList::new(entries),
            Err(e) => {
                error!("Failed to read history, not adding {}: {}", candidate.video_id, e);
                return None;
            }
        };

        let entry = candidate.stamp(list.get(&candidate.video_id), self.clock.now());
        list.upsert(entry.clone(), limit);

        match storage::save_history(&*self.storage, &list.entries).await {
            Ok(()) => {
                debug!("Added {} to history ({} entries)", entry.video_id, list.entries.len());
                Some(entry)
            }
            Err(e) => {
                error!("Failed to save history: {}", e);
                None
            }
        }
    }

    pub async fn delete(&self, video_id: &str) {
        let _guard = self.writer.lock().await;

        let mut list = match storage::load_history(&*self.storage).await {
            Ok(entries) => HistoryList::new(entries),
            Err(e) => {
                error!("Failed to read history, not deleting {}: {}", video_id, e);
                return;
            }
        };

        if !list.remove(video_id) {
            debug!("{} not in history, nothing to delete", video_id);
        }

        if let Err(e) = storage::save_history(&*self.storage, &list.entries).await {
            error!("Failed to save history after delete: {}", e);
        }
    }

    /// Drop entries older than `retention_days`; 0 keeps everything
    pub async fn purge_expired(&self, retention_days: u32) -> usize {
        if retention_days == 0 {
            return 0;
        }

        let _guard = self.writer.lock().await;

        let mut list = match storage::load_history(&*self.storage).await {
            Ok(entries) => HistoryList::new(entries),
            Err(e) => {
                error!("Failed to read history for purge: {}", e);
                return 0;
            }
        };

        let cutoff = self.clock.now() - Duration::days(i64::from(retention_days));
        let removed = list.expire_before(cutoff);
        if removed == 0 {
            return 0;
        }

        match storage::save_history(&*self.storage, &list.entries).await {
            Ok(()) => {
                info!("Purged {} history entries older than {} days", removed, retention_days);
                removed
            }
            Err(e) => {
                error!("Failed to save history after purge: {}", e);
                0
            }
        }
    }

    /// Empty the history record
    pub async fn clear(&self) -> bool {
        let _guard = self.writer.lock().await;

        match storage::save_history(&*self.storage, &[]).await {
            Ok(()) => {
                info!("History cleared");
                true
            }
            Err(e) => {
                error!("Failed to clear history: {}", e);
                false
            }
        }
    }
}
