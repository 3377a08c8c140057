/// Video Pop-out - Chrome Extension that plays videos in a floating window
/// Built with Rust + WASM + Yew

pub mod background;
pub mod chat;
mod chrome;
pub mod error;
pub mod extract;
pub mod history;
pub mod messaging;
pub mod settings;
pub mod storage;
pub mod ui;
pub mod video;
pub mod window;

#[cfg(test)]
mod testing;

use wasm_bindgen::prelude::*;

// Set up panic hook for better error messages in the browser console
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

// Re-export URL helpers for the content scripts
#[wasm_bindgen]
pub fn video_id_from_url(url: &str) -> Option<String> {
    video::video_id_from_url(url)
}

// Start the Yew app for the popup
#[wasm_bindgen]
pub fn start_popup() {
    yew::Renderer::<ui::popup::App>::new().render();
}
