/// Background service worker entry point
///
/// Owns the single `MessageRouter` and forwards browser events into it.
use std::rc::Rc;

use js_sys::Function;
use log::{debug, info, warn};
use serde::Deserialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

use crate::chrome::{self, ChromeHost, ChromeStorage};
use crate::history::HistoryStore;
use crate::messaging::MessageRouter;
use crate::window::WindowCoordinator;

type Router = MessageRouter<ChromeStorage, ChromeHost, ChromeHost>;

#[derive(Deserialize)]
struct ChangeInfo {
    status: Option<String>,
}

#[wasm_bindgen]
pub fn init_background() {
    let history = HistoryStore::new(Rc::new(ChromeStorage));
    let router: Rc<Router> = Rc::new(MessageRouter::new(
        history,
        WindowCoordinator::new(ChromeHost),
        ChromeHost,
    ));

    {
        let router = router.clone();
        spawn_local(async move { router.start().await });
    }

    listen_for_messages(router.clone());
    listen_for_action_clicks(router.clone());
    listen_for_window_removal(router.clone());
    listen_for_tab_loads(router);

    info!("Background worker started");
}

fn listen_for_messages(router: Rc<Router>) {
    let listener = Closure::<dyn FnMut(JsValue, JsValue, Function) -> bool>::new(
        move |message: JsValue, sender: JsValue, send_response: Function| {
            let request = match chrome::decode_request(message) {
                Ok(request) => request,
                // Meant for a content script, or malformed.
                Err(e) => {
                    debug!("Ignoring message: {}", e);
                    return false;
                }
            };

            let sender = chrome::decode_sender(sender);
            let keep_open = request.expects_reply();
            let router = router.clone();

            spawn_local(async move {
                let Some(response) = router.dispatch(request, &sender).await else {
                    return;
                };
                match chrome::to_js(&response) {
                    Ok(reply) => {
                        if let Err(e) = send_response.call1(&JsValue::NULL, &reply) {
                            warn!("Failed to send response: {:?}", e);
                        }
                    }
                    Err(e) => warn!("Failed to encode response: {}", e),
                }
            });

            keep_open
        },
    );

    chrome::add_message_listener(&listener);
    listener.forget();
}

fn listen_for_action_clicks(router: Rc<Router>) {
    let listener = Closure::<dyn FnMut(JsValue)>::new(move |tab: JsValue| {
        let url = chrome::decode_tab(tab).and_then(|tab| tab.url);
        let router = router.clone();
        spawn_local(async move { router.handle_action_click(url.as_deref()).await });
    });

    chrome::add_action_clicked_listener(&listener);
    listener.forget();
}

fn listen_for_window_removal(router: Rc<Router>) {
    let listener = Closure::<dyn FnMut(i32)>::new(move |window_id: i32| {
        let router = router.clone();
        spawn_local(async move { router.windows().on_window_removed(window_id).await });
    });

    chrome::add_window_removed_listener(&listener);
    listener.forget();
}

fn listen_for_tab_loads(router: Rc<Router>) {
    let listener = Closure::<dyn FnMut(i32, JsValue, JsValue)>::new(
        move |tab_id: i32, change_info: JsValue, _tab: JsValue| {
            let complete = chrome::from_js::<ChangeInfo>(change_info)
                .ok()
                .and_then(|info| info.status)
                .is_some_and(|status| status == "complete");
            if !complete {
                return;
            }

            let router = router.clone();
            spawn_local(async move { router.windows().on_tab_complete(tab_id).await });
        },
    );

    chrome::add_tab_updated_listener(&listener);
    listener.forget();
}
