/// The floating pop-out window
///
/// At most one window is managed at a time. Opening a video either creates it,
/// or retargets the existing one if the host still knows about it.
use std::cell::RefCell;
use std::collections::HashSet;

use futures::lock::Mutex;
use log::{debug, error, info, warn};

use crate::error::HostError;
use crate::settings::Settings;

pub type WindowId = i32;
pub type TabId = i32;

/// Trims the site chrome so the player fills the pop-out window
pub const POPUP_STYLE: &str = r#"
html {
    overflow: hidden !important;
}
ytd-page-manager {
    margin: 0 !important;
}
div#full-bleed-container {
    height: 100vh !important;
    max-height: 100vh !important;
}
div.video-stream.html5-main-video {
    width: 100vw !important;
    height: 100vh !important;
}
div#masthead-container,
button.ytp-fullscreen-button,
.popup-player-btn {
    display: none !important;
}
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowBounds {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

/// A popup-type window to create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupLayout {
    pub url: String,
    pub width: i32,
    pub height: i32,
    /// `None` lets the host choose
    pub left: Option<i32>,
    pub top: Option<i32>,
}

impl PopupLayout {
    /// Center a `width` x `height` window over `over`
    pub fn centered(url: &str, width: u32, height: u32, over: Option<WindowBounds>) -> Self {
        let width = width as i32;
        let height = height as i32;

        PopupLayout {
            url: url.to_string(),
            width,
            height,
            left: over.map(|b| b.left + half_rounded(b.width - width)),
            top: over.map(|b| b.top + half_rounded(b.height - height)),
        }
    }
}

// Rounds .5 up, like the browser's Math.round.
fn half_rounded(n: i32) -> i32 {
    (n as f64 / 2.0 + 0.5).floor() as i32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreatedWindow {
    pub id: WindowId,
    pub tab_id: Option<TabId>,
}

/// Browser window and tab calls the coordinator relies on
#[allow(async_fn_in_trait)]
pub trait WindowHost {
    async fn last_focused(&self) -> Result<WindowBounds, HostError>;
    async fn create_popup(&self, layout: &PopupLayout) -> Result<CreatedWindow, HostError>;
    /// Liveness probe; any failure means the window is gone
    async fn window_exists(&self, id: WindowId) -> bool;
    /// Load `url` in the window's tab, bringing it to front if `focused`
    async fn retarget(&self, id: WindowId, url: &str, focused: bool) -> Result<(), HostError>;
    async fn insert_css(&self, tab_id: TabId, css: &str) -> Result<(), HostError>;
}

pub struct WindowCoordinator<H> {
    host: H,
    // Held for the whole probe/create sequence so two opens can't both create.
    current: Mutex<Option<WindowId>>,
    awaiting_style: RefCell<HashSet<TabId>>,
}

impl<H: WindowHost> WindowCoordinator<H> {
    pub fn new(host: H) -> Self {
        WindowCoordinator {
            host,
            current: Mutex::new(None),
            awaiting_style: RefCell::new(HashSet::new()),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub async fn current(&self) -> Option<WindowId> {
        *self.current.lock().await
    }

    /// Show `url` in the pop-out window, creating the window if needed
    pub async fn open_or_focus(&self, url: &str, settings: &Settings) -> Result<WindowId, HostError> {
        let mut current = self.current.lock().await;

        if let Some(id) = *current {
            if self.host.window_exists(id).await {
                match self.host.retarget(id, url, settings.auto_focus).await {
                    Ok(()) => {
                        debug!("Retargeted pop-out window {} to {}", id, url);
                        return Ok(id);
                    }
                    // Closed between the probe and the update.
                    Err(HostError::WindowGone(_)) => {}
                    Err(e) => return Err(e),
                }
            }
            debug!("Pop-out window {} is gone, creating a new one", id);
            *current = None;
        }

        let created = self.create(url, settings).await?;
        *current = Some(created.id);
        Ok(created.id)
    }

    async fn create(&self, url: &str, settings: &Settings) -> Result<CreatedWindow, HostError> {
        let focused = match self.host.last_focused().await {
            Ok(bounds) => Some(bounds),
            Err(e) => {
                warn!("No focused window to center on: {}", e);
                None
            }
        };

        let layout = PopupLayout::centered(url, settings.window_width, settings.window_height, focused);
        let created = self.host.create_popup(&layout).await?;

        match created.tab_id {
            Some(tab_id) => {
                self.awaiting_style.borrow_mut().insert(tab_id);
            }
            None => warn!("Pop-out window {} has no tab to style", created.id),
        }

        info!("Created pop-out window {} ({}x{})", created.id, layout.width, layout.height);
        Ok(created)
    }

    /// The host reports a closed window
    pub async fn on_window_removed(&self, id: WindowId) {
        let mut current = self.current.lock().await;
        if *current == Some(id) {
            debug!("Pop-out window {} closed", id);
            *current = None;
        }
    }

    /// The host reports a tab finished loading; styles a fresh pop-out once
    pub async fn on_tab_complete(&self, tab_id: TabId) {
        let pending = self.awaiting_style.borrow_mut().remove(&tab_id);
        if !pending {
            return;
        }

        match self.host.insert_css(tab_id, POPUP_STYLE).await {
            Ok(()) => debug!("Styled pop-out tab {}", tab_id),
            Err(e) => error!("Failed to style pop-out tab {}: {}", tab_id, e),
        }
    }
}
