/// In-memory stand-ins for the browser host, shared by the unit tests
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::error::{HostError, StorageError};
use crate::history::{Clock, HistoryEntry};
use crate::messaging::BadgeHost;
use crate::storage::StorageArea;
use crate::window::{CreatedWindow, PopupLayout, TabId, WindowBounds, WindowHost, WindowId};

pub fn entry_at(video_id: &str, millis: i64) -> HistoryEntry {
    let at = DateTime::<Utc>::from_timestamp_millis(millis).unwrap();
    HistoryEntry {
        video_id: video_id.to_string(),
        title: format!("Video {}", video_id),
        url: format!("https://www.youtube.com/watch?v={}", video_id),
        channel: "Some Channel".to_string(),
        thumbnail: format!("https://i.ytimg.com/vi/{}/mqdefault.jpg", video_id),
        timestamp: millis,
        date_added: at.to_rfc3339_opts(SecondsFormat::Millis, true),
    }
}

#[derive(Clone)]
pub struct FixedClock {
    now: Rc<Cell<DateTime<Utc>>>,
}

impl FixedClock {
    pub fn at_millis(millis: i64) -> Self {
        FixedClock {
            now: Rc::new(Cell::new(DateTime::<Utc>::from_timestamp_millis(millis).unwrap())),
        }
    }

    pub fn advance_millis(&self, millis: i64) {
        self.now.set(self.now.get() + chrono::Duration::milliseconds(millis));
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}

#[derive(Default)]
pub struct MemoryStorage {
    values: RefCell<HashMap<String, Value>>,
    fail_reads: Cell<bool>,
    fail_writes: Cell<bool>,
    yield_on_read: Cell<bool>,
    writes: Cell<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: &str, value: Value) {
        self.values.borrow_mut().insert(key.to_string(), value);
    }

    pub fn value(&self, key: &str) -> Option<Value> {
        self.values.borrow().get(key).cloned()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.set(fail);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    /// Suspend inside every read so concurrent callers interleave
    pub fn yield_on_read(&self, enabled: bool) {
        self.yield_on_read.set(enabled);
    }

    pub fn write_count(&self) -> usize {
        self.writes.get()
    }
}

impl StorageArea for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        if self.yield_on_read.get() {
            tokio::task::yield_now().await;
        }
        if self.fail_reads.get() {
            return Err(StorageError::Read("injected read failure".to_string()));
        }
        Ok(self.value(key))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        if self.fail_writes.get() {
            return Err(StorageError::Write("injected write failure".to_string()));
        }
        self.writes.set(self.writes.get() + 1);
        self.insert(key, value);
        Ok(())
    }
}

/// Window host that keeps windows in a set and records every call
pub struct FakeWindowHost {
    pub focused: Cell<Option<WindowBounds>>,
    next_id: Cell<WindowId>,
    alive: RefCell<HashSet<WindowId>>,
    pub created: RefCell<Vec<PopupLayout>>,
    pub retargeted: RefCell<Vec<(WindowId, String, bool)>>,
    pub styled: RefCell<Vec<TabId>>,
    fail_create: Cell<bool>,
}

impl FakeWindowHost {
    pub fn new() -> Self {
        FakeWindowHost {
            focused: Cell::new(Some(WindowBounds {
                left: 100,
                top: 50,
                width: 1600,
                height: 1000,
            })),
            next_id: Cell::new(1),
            alive: RefCell::new(HashSet::new()),
            created: RefCell::new(Vec::new()),
            retargeted: RefCell::new(Vec::new()),
            styled: RefCell::new(Vec::new()),
            fail_create: Cell::new(false),
        }
    }

    /// The user closes a window; no notification is delivered
    pub fn close(&self, id: WindowId) {
        self.alive.borrow_mut().remove(&id);
    }

    pub fn fail_create(&self, fail: bool) {
        self.fail_create.set(fail);
    }

    pub fn tab_of(id: WindowId) -> TabId {
        id + 1000
    }
}

impl WindowHost for FakeWindowHost {
    async fn last_focused(&self) -> Result<WindowBounds, HostError> {
        self.focused
            .get()
            .ok_or_else(|| HostError::Call("no focused window".to_string()))
    }

    async fn create_popup(&self, layout: &PopupLayout) -> Result<CreatedWindow, HostError> {
        tokio::task::yield_now().await;
        if self.fail_create.get() {
            return Err(HostError::Call("injected create failure".to_string()));
        }
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.alive.borrow_mut().insert(id);
        self.created.borrow_mut().push(layout.clone());
        Ok(CreatedWindow {
            id,
            tab_id: Some(Self::tab_of(id)),
        })
    }

    async fn window_exists(&self, id: WindowId) -> bool {
        self.alive.borrow().contains(&id)
    }

    async fn retarget(&self, id: WindowId, url: &str, focused: bool) -> Result<(), HostError> {
        if !self.alive.borrow().contains(&id) {
            return Err(HostError::WindowGone(id));
        }
        self.retargeted.borrow_mut().push((id, url.to_string(), focused));
        Ok(())
    }

    async fn insert_css(&self, tab_id: TabId, _css: &str) -> Result<(), HostError> {
        self.styled.borrow_mut().push(tab_id);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeBadge {
    pub texts: RefCell<Vec<(String, Option<TabId>)>>,
    pub colors: RefCell<Vec<(String, Option<TabId>)>>,
}

impl BadgeHost for FakeBadge {
    async fn set_badge_text(&self, text: &str, tab_id: Option<TabId>) -> Result<(), HostError> {
        self.texts.borrow_mut().push((text.to_string(), tab_id));
        Ok(())
    }

    async fn set_badge_color(&self, color: &str, tab_id: Option<TabId>) -> Result<(), HostError> {
        self.colors.borrow_mut().push((color.to_string(), tab_id));
        Ok(())
    }
}
