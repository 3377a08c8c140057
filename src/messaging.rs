/// Requests exchanged between the popup, content scripts, and the background worker
///
/// Every message is a small tagged object: `{ "action": "<name>", ...fields }`.
/// Only requests that answer (`expects_reply`) keep the reply channel open.
use log::{debug, error, warn};
use serde::{Deserialize, Serialize};

use crate::error::HostError;
use crate::history::{HistoryCandidate, HistoryEntry, HistoryStore};
use crate::storage::{self, StorageArea};
use crate::video;
use crate::window::{TabId, WindowCoordinator, WindowHost};

pub const BADGE_COLOR: &str = "#FF0000";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Request {
    OpenPopup { video_id: String },
    OpenMusicPopup { music_id: String },
    AddVideoToHistory(HistoryCandidate),
    DeleteVideoFromHistory { video_id: String },
    GetVideoHistory,
    ClearVideoHistory,
    UpdateBadge { count: BadgeText },
}

impl Request {
    /// Whether the sender should wait for a response
    pub fn expects_reply(&self) -> bool {
        matches!(self, Request::GetVideoHistory | Request::ClearVideoHistory)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Request, serde_json::Error> {
        serde_json::from_value(value)
    }
}

/// Badge content: content scripts send either a label or a count
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum BadgeText {
    Label(String),
    Count(i64),
}

impl BadgeText {
    pub fn to_text(&self) -> String {
        match self {
            BadgeText::Label(label) => label.clone(),
            BadgeText::Count(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Response {
    History { history: Vec<HistoryEntry> },
    Success { success: bool },
}

/// Where a message came from
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageSender {
    pub tab_id: Option<TabId>,
}

/// Toolbar badge calls
#[allow(async_fn_in_trait)]
pub trait BadgeHost {
    async fn set_badge_text(&self, text: &str, tab_id: Option<TabId>) -> Result<(), HostError>;
    async fn set_badge_color(&self, color: &str, tab_id: Option<TabId>) -> Result<(), HostError>;
}

/// Owns the history store and window coordinator for the background worker
pub struct MessageRouter<S, H, B> {
    history: HistoryStore<S>,
    windows: WindowCoordinator<H>,
    badge: B,
}

impl<S, H, B> MessageRouter<S, H, B>
where
    S: StorageArea,
    H: WindowHost,
    B: BadgeHost,
{
    pub fn new(history: HistoryStore<S>, windows: WindowCoordinator<H>, badge: B) -> Self {
        MessageRouter {
            history,
            windows,
            badge,
        }
    }

    pub fn history(&self) -> &HistoryStore<S> {
        &self.history
    }

    pub fn windows(&self) -> &WindowCoordinator<H> {
        &self.windows
    }

    /// Worker start: make sure history exists and drop expired entries
    pub async fn start(&self) {
        self.history.initialize().await;
        let settings = storage::load_settings(self.history.storage()).await;
        self.history.purge_expired(settings.history_duration).await;
    }

    /// Handle one request to completion; `Some` only when `expects_reply`
    pub async fn dispatch(&self, request: Request, sender: &MessageSender) -> Option<Response> {
        debug!("Dispatching {:?}", request);

        match request {
            Request::OpenPopup { video_id } => {
                self.open(&video::watch_url(&video_id)).await;
                None
            }
            Request::OpenMusicPopup { music_id } => {
                self.open(&video::music_url(&music_id)).await;
                None
            }
            Request::AddVideoToHistory(candidate) => {
                self.history.add(candidate).await;
                None
            }
            Request::DeleteVideoFromHistory { video_id } => {
                self.history.delete(&video_id).await;
                None
            }
            Request::GetVideoHistory => {
                let settings = storage::load_settings(self.history.storage()).await;
                self.history.purge_expired(settings.history_duration).await;
                Some(Response::History {
                    history: self.history.get_all().await,
                })
            }
            Request::ClearVideoHistory => Some(Response::Success {
                success: self.history.clear().await,
            }),
            Request::UpdateBadge { count } => {
                self.update_badge(&count.to_text(), sender.tab_id).await;
                None
            }
        }
    }

    /// Toolbar icon click: pop out the active tab if it is a watch page
    pub async fn handle_action_click(&self, tab_url: Option<&str>) {
        match tab_url {
            Some(url) if video::is_watch_url(url) => self.open(url).await,
            _ => debug!("Toolbar click outside a watch page ignored"),
        }
    }

    async fn open(&self, url: &str) {
        let settings = storage::load_settings(self.history.storage()).await;
        if let Err(e) = self.windows.open_or_focus(url, &settings).await {
            error!("Failed to open pop-out for {}: {}", url, e);
        }
    }

    async fn update_badge(&self, text: &str, tab_id: Option<TabId>) {
        if let Err(e) = self.badge.set_badge_text(text, tab_id).await {
            warn!("Failed to set badge text: {}", e);
            return;
        }
        if let Err(e) = self.badge.set_badge_color(BADGE_COLOR, tab_id).await {
            warn!("Failed to set badge color: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistoryCandidate;
    use crate::storage::{HISTORY_KEY, SETTINGS_KEY};
    use crate::testing::{entry_at, FakeBadge, FakeWindowHost, FixedClock, MemoryStorage};
    use serde_json::json;
    use std::rc::Rc;

    const START_MS: i64 = 1_700_000_000_000;

    type TestRouter = MessageRouter<MemoryStorage, FakeWindowHost, FakeBadge>;

    fn router() -> (TestRouter, Rc<MemoryStorage>, FixedClock) {
        let storage = Rc::new(MemoryStorage::new());
        let clock = FixedClock::at_millis(START_MS);
        let history = HistoryStore::with_clock(storage.clone(), clock.clone());
        let router = MessageRouter::new(history, WindowCoordinator::new(FakeWindowHost::new()), FakeBadge::default());
        (router, storage, clock)
    }

    fn from_tab(tab_id: TabId) -> MessageSender {
        MessageSender { tab_id: Some(tab_id) }
    }

    fn parse(value: serde_json::Value) -> Request {
        Request::from_value(value).unwrap()
    }

    #[test]
    fn test_parse_wire_messages() {
        assert_eq!(
            parse(json!({ "action": "openPopup", "videoId": "abc" })),
            Request::OpenPopup { video_id: "abc".to_string() }
        );
        assert_eq!(
            parse(json!({ "action": "openMusicPopup", "musicId": "m1" })),
            Request::OpenMusicPopup { music_id: "m1".to_string() }
        );
        assert_eq!(
            parse(json!({ "action": "addVideoToHistory", "videoId": "abc", "title": "T" })),
            Request::AddVideoToHistory(HistoryCandidate::new("abc").with_title("T"))
        );
        assert_eq!(
            parse(json!({ "action": "deleteVideoFromHistory", "videoId": "abc" })),
            Request::DeleteVideoFromHistory { video_id: "abc".to_string() }
        );
        assert_eq!(parse(json!({ "action": "getVideoHistory" })), Request::GetVideoHistory);
        assert_eq!(
            parse(json!({ "action": "updateBadge", "count": "ON" })),
            Request::UpdateBadge { count: BadgeText::Label("ON".to_string()) }
        );
        assert_eq!(
            parse(json!({ "action": "updateBadge", "count": 3 })),
            Request::UpdateBadge { count: BadgeText::Count(3) }
        );
    }

    #[test]
    fn test_unknown_and_malformed_messages_are_rejected() {
        assert!(Request::from_value(json!({ "action": "togglePlayPause" })).is_err());
        assert!(Request::from_value(json!({ "action": "openPopup" })).is_err());
        assert!(Request::from_value(json!({ "videoId": "abc" })).is_err());
    }

    #[test]
    fn test_only_queries_expect_replies() {
        assert!(Request::GetVideoHistory.expects_reply());
        assert!(Request::ClearVideoHistory.expects_reply());
        assert!(!Request::OpenPopup { video_id: "a".to_string() }.expects_reply());
        assert!(!Request::AddVideoToHistory(HistoryCandidate::new("a")).expects_reply());
        assert!(!Request::UpdateBadge { count: BadgeText::Count(1) }.expects_reply());
    }

    #[test]
    fn test_response_shapes() {
        let history = Response::History { history: vec![entry_at("a", START_MS)] };
        let value = serde_json::to_value(&history).unwrap();
        assert_eq!(value["history"][0]["videoId"], json!("a"));

        let success = serde_json::to_value(Response::Success { success: true }).unwrap();
        assert_eq!(success, json!({ "success": true }));
    }

    #[test]
    fn test_badge_text() {
        assert_eq!(BadgeText::Label("ON".to_string()).to_text(), "ON");
        assert_eq!(BadgeText::Count(0).to_text(), "0");
        assert_eq!(BadgeText::Count(12).to_text(), "12");
    }

    #[tokio::test]
    async fn test_add_then_get_history() {
        let (router, _, clock) = router();
        let sender = MessageSender::default();

        let reply = router
            .dispatch(parse(json!({ "action": "addVideoToHistory", "videoId": "abc", "title": "T1" })), &sender)
            .await;
        assert!(reply.is_none());
        clock.advance_millis(1_000);
        router
            .dispatch(parse(json!({ "action": "addVideoToHistory", "videoId": "abc", "title": "T2" })), &sender)
            .await;

        match router.dispatch(Request::GetVideoHistory, &sender).await {
            Some(Response::History { history }) => {
                assert_eq!(history.len(), 1);
                assert_eq!(history[0].title, "T2");
            }
            other => panic!("unexpected reply {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_delete_from_history() {
        let (router, _, _) = router();
        let sender = MessageSender::default();
        router.dispatch(Request::AddVideoToHistory(HistoryCandidate::new("abc")), &sender).await;

        let reply = router
            .dispatch(Request::DeleteVideoFromHistory { video_id: "abc".to_string() }, &sender)
            .await;

        assert!(reply.is_none());
        assert!(router.history().get_all().await.is_empty());
    }

    #[tokio::test]
    async fn test_get_history_purges_expired() {
        let (router, storage, _) = router();
        storage.insert(SETTINGS_KEY, json!({ "historyDuration": 7 }));
        let stored = vec![
            entry_at("recent", START_MS - 24 * 60 * 60 * 1000),
            entry_at("old", START_MS - 8 * 24 * 60 * 60 * 1000),
        ];
        storage.insert(HISTORY_KEY, serde_json::to_value(&stored).unwrap());

        let reply = router.dispatch(Request::GetVideoHistory, &MessageSender::default()).await;

        match reply {
            Some(Response::History { history }) => {
                assert_eq!(history.len(), 1);
                assert_eq!(history[0].video_id, "recent");
            }
            other => panic!("unexpected reply {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_get_history_on_broken_storage_is_empty() {
        let (router, storage, _) = router();
        storage.fail_reads(true);

        let reply = router.dispatch(Request::GetVideoHistory, &MessageSender::default()).await;

        assert_eq!(reply, Some(Response::History { history: Vec::new() }));
    }

    #[tokio::test]
    async fn test_clear_history_reports_success() {
        let (router, storage, _) = router();
        router.dispatch(Request::AddVideoToHistory(HistoryCandidate::new("a")), &MessageSender::default()).await;

        let reply = router.dispatch(Request::ClearVideoHistory, &MessageSender::default()).await;
        assert_eq!(reply, Some(Response::Success { success: true }));
        assert_eq!(storage.value(HISTORY_KEY), Some(json!([])));

        storage.fail_writes(true);
        let reply = router.dispatch(Request::ClearVideoHistory, &MessageSender::default()).await;
        assert_eq!(reply, Some(Response::Success { success: false }));
    }

    #[tokio::test]
    async fn test_open_popup_uses_watch_url_and_settings() {
        let (router, storage, _) = router();
        storage.insert(SETTINGS_KEY, json!({ "windowWidth": 640, "windowHeight": 360 }));

        router.dispatch(Request::OpenPopup { video_id: "abc".to_string() }, &MessageSender::default()).await;
        router.dispatch(Request::OpenPopup { video_id: "def".to_string() }, &MessageSender::default()).await;

        let host = router.windows().host();
        let created = host.created.borrow();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].url, "https://www.youtube.com/watch?v=abc");
        assert_eq!((created[0].width, created[0].height), (640, 360));
        assert_eq!(host.retargeted.borrow()[0].1, "https://www.youtube.com/watch?v=def");
    }

    #[tokio::test]
    async fn test_open_music_popup() {
        let (router, _, _) = router();

        router.dispatch(Request::OpenMusicPopup { music_id: "trk".to_string() }, &MessageSender::default()).await;

        assert_eq!(
            router.windows().host().created.borrow()[0].url,
            "https://music.youtube.com/watch?v=trk"
        );
    }

    #[tokio::test]
    async fn test_open_failure_is_swallowed() {
        let (router, _, _) = router();
        router.windows().host().fail_create(true);

        let reply = router.dispatch(Request::OpenPopup { video_id: "abc".to_string() }, &MessageSender::default()).await;

        assert!(reply.is_none());
        assert_eq!(router.windows().current().await, None);
    }

    #[tokio::test]
    async fn test_update_badge_scoped_to_sender_tab() {
        let (router, _, _) = router();

        router
            .dispatch(Request::UpdateBadge { count: BadgeText::Label("ON".to_string()) }, &from_tab(7))
            .await;

        assert_eq!(*router.badge.texts.borrow(), vec![("ON".to_string(), Some(7))]);
        assert_eq!(*router.badge.colors.borrow(), vec![(BADGE_COLOR.to_string(), Some(7))]);
    }

    #[tokio::test]
    async fn test_action_click_only_on_watch_pages() {
        let (router, _, _) = router();

        router.handle_action_click(None).await;
        router.handle_action_click(Some("https://www.youtube.com/feed/subscriptions")).await;
        assert!(router.windows().host().created.borrow().is_empty());

        router.handle_action_click(Some("https://www.youtube.com/watch?v=abc&t=10")).await;
        assert_eq!(
            router.windows().host().created.borrow()[0].url,
            "https://www.youtube.com/watch?v=abc&t=10"
        );
    }

    #[tokio::test]
    async fn test_start_initializes_and_purges() {
        let (router, storage, _) = router();

        router.start().await;
        assert_eq!(storage.value(HISTORY_KEY), Some(json!([])));

        let stored = vec![entry_at("old", START_MS - 31 * 24 * 60 * 60 * 1000)];
        storage.insert(HISTORY_KEY, serde_json::to_value(&stored).unwrap());
        router.start().await;
        assert_eq!(storage.value(HISTORY_KEY), Some(json!([])));
    }
}
