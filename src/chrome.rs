/// Bindings to the `chrome.*` extension APIs
///
/// Host calls go through promise-returning APIs; every JS failure is turned
/// into a `StorageError` or `HostError` before it leaves this module.
use js_sys::{Function, Object, Reflect};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use crate::error::{HostError, StorageError};
use crate::messaging::{BadgeHost, MessageSender, Request, Response};
use crate::storage::StorageArea;
use crate::window::{CreatedWindow, PopupLayout, TabId, WindowBounds, WindowHost, WindowId};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(catch, js_namespace = ["chrome", "storage", "local"], js_name = get)]
    async fn storage_local_get(key: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "storage", "local"], js_name = set)]
    async fn storage_local_set(items: &Object) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "windows"], js_name = getLastFocused)]
    async fn windows_get_last_focused() -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "windows"], js_name = create)]
    async fn windows_create(create_data: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "windows"], js_name = get)]
    async fn windows_get(window_id: i32) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "windows"], js_name = update)]
    async fn windows_update(window_id: i32, update_info: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "tabs"], js_name = query)]
    async fn tabs_query(query_info: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "tabs"], js_name = update)]
    async fn tabs_update(tab_id: i32, update_properties: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "tabs"], js_name = sendMessage)]
    async fn tabs_send_message(tab_id: i32, message: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "scripting"], js_name = insertCSS)]
    async fn scripting_insert_css(injection: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "action"], js_name = setBadgeText)]
    async fn action_set_badge_text(details: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "action"], js_name = setBadgeBackgroundColor)]
    async fn action_set_badge_background_color(details: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "runtime"], js_name = sendMessage)]
    async fn runtime_send_message(message: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(js_namespace = ["chrome", "runtime", "onMessage"], js_name = addListener)]
    pub fn add_message_listener(callback: &Closure<dyn FnMut(JsValue, JsValue, Function) -> bool>);

    #[wasm_bindgen(js_namespace = ["chrome", "action", "onClicked"], js_name = addListener)]
    pub fn add_action_clicked_listener(callback: &Closure<dyn FnMut(JsValue)>);

    #[wasm_bindgen(js_namespace = ["chrome", "windows", "onRemoved"], js_name = addListener)]
    pub fn add_window_removed_listener(callback: &Closure<dyn FnMut(i32)>);

    #[wasm_bindgen(js_namespace = ["chrome", "tabs", "onUpdated"], js_name = addListener)]
    pub fn add_tab_updated_listener(callback: &Closure<dyn FnMut(i32, JsValue, JsValue)>);
}

/// Human-readable text for a rejected promise
fn describe(error: &JsValue) -> String {
    error
        .dyn_ref::<js_sys::Error>()
        .map(|e| String::from(e.message()))
        .or_else(|| error.as_string())
        .unwrap_or_else(|| format!("{:?}", error))
}

pub fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, HostError> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| HostError::Malformed(format!("{:?}", e)))
}

pub fn from_js<T: DeserializeOwned>(value: JsValue) -> Result<T, HostError> {
    serde_wasm_bindgen::from_value(value).map_err(|e| HostError::Malformed(format!("{:?}", e)))
}

fn host_call(error: JsValue) -> HostError {
    HostError::Call(describe(&error))
}

// --- Storage ---

/// `chrome.storage.local`
pub struct ChromeStorage;

impl StorageArea for ChromeStorage {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let items = storage_local_get(key)
            .await
            .map_err(|e| StorageError::Read(describe(&e)))?;
        let value = Reflect::get(&items, &JsValue::from_str(key))
            .map_err(|e| StorageError::Read(describe(&e)))?;

        if value.is_undefined() {
            return Ok(None);
        }

        serde_wasm_bindgen::from_value(value)
            .map(Some)
            .map_err(|e| StorageError::Read(format!("{:?}", e)))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let js_value = to_js(&value).map_err(|e| StorageError::Write(e.to_string()))?;
        let items = Object::new();
        Reflect::set(&items, &JsValue::from_str(key), &js_value)
            .map_err(|e| StorageError::Write(describe(&e)))?;

        storage_local_set(&items)
            .await
            .map(|_| ())
            .map_err(|e| StorageError::Write(describe(&e)))
    }
}

// --- Windows, tabs, badge ---

#[derive(Debug, Deserialize)]
struct RawWindow {
    id: Option<i32>,
    left: Option<i32>,
    top: Option<i32>,
    width: Option<i32>,
    height: Option<i32>,
    #[serde(default)]
    tabs: Vec<RawTab>,
}

#[derive(Debug, Deserialize)]
pub struct RawTab {
    pub id: Option<i32>,
    pub url: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateData<'a> {
    url: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    width: i32,
    height: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    left: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top: Option<i32>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BadgeDetails<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    color: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tab_id: Option<TabId>,
}

/// Window, tab, scripting, and badge calls of the running browser
pub struct ChromeHost;

impl WindowHost for ChromeHost {
    async fn last_focused(&self) -> Result<WindowBounds, HostError> {
        let raw: RawWindow = from_js(windows_get_last_focused().await.map_err(host_call)?)?;
        Ok(WindowBounds {
            left: raw.left.unwrap_or_default(),
            top: raw.top.unwrap_or_default(),
            width: raw.width.unwrap_or_default(),
            height: raw.height.unwrap_or_default(),
        })
    }

    async fn create_popup(&self, layout: &PopupLayout) -> Result<CreatedWindow, HostError> {
        let data = CreateData {
            url: &layout.url,
            kind: "popup",
            width: layout.width,
            height: layout.height,
            left: layout.left,
            top: layout.top,
        };

        let raw: RawWindow = from_js(windows_create(to_js(&data)?).await.map_err(host_call)?)?;
        let id = raw
            .id
            .ok_or_else(|| HostError::Malformed("created window has no id".to_string()))?;

        Ok(CreatedWindow {
            id,
            tab_id: raw.tabs.first().and_then(|tab| tab.id),
        })
    }

    async fn window_exists(&self, id: WindowId) -> bool {
        windows_get(id).await.is_ok()
    }

    async fn retarget(&self, id: WindowId, url: &str, focused: bool) -> Result<(), HostError> {
        let tabs: Vec<RawTab> = from_js(
            tabs_query(to_js(&serde_json::json!({ "windowId": id }))?)
                .await
                .map_err(|_| HostError::WindowGone(id))?,
        )?;
        let tab_id = tabs
            .first()
            .and_then(|tab| tab.id)
            .ok_or(HostError::WindowGone(id))?;

        tabs_update(tab_id, to_js(&serde_json::json!({ "url": url }))?)
            .await
            .map_err(host_call)?;

        if focused {
            windows_update(id, to_js(&serde_json::json!({ "focused": true }))?)
                .await
                .map_err(host_call)?;
        }
        Ok(())
    }

    async fn insert_css(&self, tab_id: TabId, css: &str) -> Result<(), HostError> {
        let injection = serde_json::json!({ "target": { "tabId": tab_id }, "css": css });
        scripting_insert_css(to_js(&injection)?)
            .await
            .map(|_| ())
            .map_err(host_call)
    }
}

impl BadgeHost for ChromeHost {
    async fn set_badge_text(&self, text: &str, tab_id: Option<TabId>) -> Result<(), HostError> {
        let details = BadgeDetails { text: Some(text), color: None, tab_id };
        action_set_badge_text(to_js(&details)?)
            .await
            .map(|_| ())
            .map_err(host_call)
    }

    async fn set_badge_color(&self, color: &str, tab_id: Option<TabId>) -> Result<(), HostError> {
        let details = BadgeDetails { text: None, color: Some(color), tab_id };
        action_set_badge_background_color(to_js(&details)?)
            .await
            .map(|_| ())
            .map_err(host_call)
    }
}

// --- Messaging ---

/// Decode an inbound runtime message
pub fn decode_request(message: JsValue) -> Result<Request, HostError> {
    let value: Value = from_js(message)?;
    Request::from_value(value).map_err(|e| HostError::Malformed(e.to_string()))
}

/// `sender.tab.id`, when the message came from a content script
pub fn decode_sender(sender: JsValue) -> MessageSender {
    #[derive(Deserialize)]
    struct RawSender {
        tab: Option<RawTab>,
    }

    let tab_id = from_js::<RawSender>(sender)
        .ok()
        .and_then(|raw| raw.tab)
        .and_then(|tab| tab.id);
    MessageSender { tab_id }
}

pub fn decode_tab(tab: JsValue) -> Option<RawTab> {
    from_js(tab).ok()
}

/// Send a request to the background worker and wait for its reply
pub async fn send_request(request: &Request) -> Result<Option<Response>, HostError> {
    let reply = runtime_send_message(to_js(request)?).await.map_err(host_call)?;
    if reply.is_undefined() || reply.is_null() {
        return Ok(None);
    }
    from_js(reply).map(Some)
}

pub async fn send_tab_message(tab_id: TabId, message: &Value) -> Result<Value, HostError> {
    let reply = tabs_send_message(tab_id, to_js(message)?).await.map_err(host_call)?;
    if reply.is_undefined() {
        return Ok(Value::Null);
    }
    from_js(reply)
}

/// The active tab of the current window
pub async fn active_tab() -> Result<Option<RawTab>, HostError> {
    let query = serde_json::json!({ "active": true, "currentWindow": true });
    let tabs: Vec<RawTab> = from_js(tabs_query(to_js(&query)?).await.map_err(host_call)?)?;
    Ok(tabs.into_iter().next())
}
