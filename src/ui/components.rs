/// Reusable UI components

use chrono::{DateTime, Local, TimeZone};
use yew::prelude::*;

use crate::history::HistoryEntry;

#[derive(Properties, PartialEq)]
pub struct VideoListItemProps {
    pub video_id: AttrValue,
    pub title: AttrValue,
    /// Second line: duration for page videos, open time for history
    pub meta: AttrValue,
    pub on_open: Callback<String>,
    /// Shown as a trash button when set
    #[prop_or_default]
    pub on_delete: Option<Callback<String>>,
}

#[function_component(VideoListItem)]
pub fn video_list_item(props: &VideoListItemProps) -> Html {
    let on_open = {
        let on_open = props.on_open.clone();
        let video_id = props.video_id.to_string();
        Callback::from(move |e: MouseEvent| {
            e.prevent_default();
            on_open.emit(video_id.clone());
        })
    };

    let delete_button = props.on_delete.clone().map(|on_delete| {
        let video_id = props.video_id.to_string();
        let onclick = Callback::from(move |e: MouseEvent| {
            // Keep the click from opening the video underneath.
            e.stop_propagation();
            on_delete.emit(video_id.clone());
        });
        html! {
            <button class="delete-btn" title="Delete from history" {onclick}>{"🗑️"}</button>
        }
    });

    html! {
        <li class="video-item" data-video-id={props.video_id.clone()}>
            <div class="video-content" onclick={on_open}>
                <div class="video-title">{props.title.clone()}</div>
                <div class="video-meta">{props.meta.clone()}</div>
            </div>
            {delete_button}
        </li>
    }
}

#[derive(Properties, PartialEq)]
pub struct EmptyStateProps {
    pub message: AttrValue,
}

#[function_component(EmptyState)]
pub fn empty_state(props: &EmptyStateProps) -> Html {
    html! {
        <p class="message-text">{props.message.clone()}</p>
    }
}

pub fn duration_label(minutes: &str) -> String {
    if minutes.is_empty() {
        "Duration unknown".to_string()
    } else {
        format!("Duration: {}", minutes)
    }
}

pub fn opened_label(entry: &HistoryEntry) -> String {
    format!("Opened {}", format_date(&entry.added_at().with_timezone(&Local)))
}

fn format_date<Tz: TimeZone>(date: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    date.format("%Y-%m-%d %H:%M:%S").to_string()
}
