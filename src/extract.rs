/// Videos listed on the page in the active tab
///
/// The selector heuristics for the site's markup live in the content script;
/// this side only asks for the list and tidies what comes back.
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::HostError;
use crate::history::HistoryCandidate;
use crate::window::TabId;

pub const UNTITLED_VIDEO: &str = "Untitled Video";

/// Message the content script answers with the page's videos
pub const PAGE_VIDEOS_ACTION: &str = "getPageVideos";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VideoSummary {
    pub video_id: String,
    #[serde(default)]
    pub title: String,
    /// Duration label as shown on the page, e.g. "12:34"
    #[serde(default)]
    pub minutes: String,
}

impl VideoSummary {
    pub fn to_candidate(&self) -> HistoryCandidate {
        HistoryCandidate::new(self.video_id.clone()).with_title(self.title.clone())
    }
}

#[allow(async_fn_in_trait)]
pub trait PageExtractor {
    async fn extract(&self, tab_id: TabId) -> Result<Vec<VideoSummary>, HostError>;
}

/// Asks the content script running in the tab
pub struct ContentScriptExtractor;

impl PageExtractor for ContentScriptExtractor {
    async fn extract(&self, tab_id: TabId) -> Result<Vec<VideoSummary>, HostError> {
        let reply = crate::chrome::send_tab_message(tab_id, &serde_json::json!({ "action": PAGE_VIDEOS_ACTION })).await?;
        if reply.is_null() {
            return Ok(Vec::new());
        }

        let raw: Vec<VideoSummary> =
            serde_json::from_value(reply).map_err(|e| HostError::Malformed(e.to_string()))?;
        Ok(normalize_summaries(raw))
    }
}

/// Drop id-less entries, keep the first of each id, fill blank titles
pub fn normalize_summaries(raw: Vec<VideoSummary>) -> Vec<VideoSummary> {
    let mut seen = HashSet::new();

    raw.into_iter()
        .filter(|video| !video.video_id.trim().is_empty())
        .filter(|video| seen.insert(video.video_id.clone()))
        .map(|mut video| {
            video.title = video.title.trim().to_string();
            if video.title.is_empty() {
                video.title = UNTITLED_VIDEO.to_string();
            }
            video.minutes = video.minutes.trim().to_string();
            video
        })
        .collect()
}
