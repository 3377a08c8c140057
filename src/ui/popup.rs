/// Toolbar popup: videos on the current page and the opened-video history

use log::{debug, warn};
use patternfly_yew::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::HtmlInputElement;
use yew::prelude::*;

use crate::chrome::{self, ChromeStorage};
use crate::extract::{ContentScriptExtractor, PageExtractor, VideoSummary};
use crate::history::{filter_entries, HistoryCandidate, HistoryEntry};
use crate::messaging::{Request, Response};
use crate::settings::ThemeMode;
use crate::storage;
use crate::ui::components::{duration_label, opened_label, EmptyState, VideoListItem};
use crate::video;

#[derive(Clone, PartialEq)]
enum ActiveTab {
    CurrentPage,
    History,
}

#[derive(Clone, PartialEq)]
enum PageVideos {
    Loading,
    NotOnSite,
    Loaded(Vec<VideoSummary>),
    Error(String),
}

#[derive(Clone, PartialEq)]
enum HistoryState {
    Loading,
    Loaded(Vec<HistoryEntry>),
    Error(String),
}

#[function_component(App)]
pub fn app() -> Html {
    let active_tab = use_state(|| ActiveTab::CurrentPage);
    let page_videos = use_state(|| PageVideos::Loading);
    let history = use_state(|| HistoryState::Loading);
    let query = use_state(String::new);

    // Theme and page videos on mount
    {
        let page_videos = page_videos.clone();
        use_effect_with((), move |_| {
            spawn_local(async move {
                apply_theme().await;
                page_videos.set(load_page_videos().await);
            });
            || ()
        });
    }

    // History is fetched each time its tab is shown
    {
        let history = history.clone();
        use_effect_with((*active_tab).clone(), move |tab| {
            if *tab == ActiveTab::History {
                history.set(HistoryState::Loading);
                spawn_local(async move {
                    match get_history().await {
                        Ok(entries) => history.set(HistoryState::Loaded(entries)),
                        Err(e) => history.set(HistoryState::Error(e)),
                    }
                });
            }
            || ()
        });
    }

    let on_tab_click = {
        let active_tab = active_tab.clone();
        move |tab: ActiveTab| {
            let active_tab = active_tab.clone();
            Callback::from(move |_: MouseEvent| {
                active_tab.set(tab.clone());
            })
        }
    };

    let on_search = {
        let query = query.clone();
        Callback::from(move |e: InputEvent| {
            let input: HtmlInputElement = e.target_unchecked_into();
            query.set(input.value());
        })
    };

    let on_delete = {
        let history = history.clone();
        Callback::from(move |video_id: String| {
            if let HistoryState::Loaded(entries) = &*history {
                let remaining = entries.iter().filter(|e| e.video_id != video_id).cloned().collect();
                history.set(HistoryState::Loaded(remaining));
            }
            spawn_local(async move {
                if let Err(e) = send(&Request::DeleteVideoFromHistory { video_id }).await {
                    warn!("{}", e);
                }
            });
        })
    };

    let open_from_page = |videos: &[VideoSummary]| {
        let videos = videos.to_vec();
        Callback::from(move |video_id: String| {
            if let Some(video) = videos.iter().find(|v| v.video_id == video_id) {
                open_video(video.to_candidate());
            }
        })
    };

    let open_from_history = |entries: &[HistoryEntry]| {
        let entries = entries.to_vec();
        Callback::from(move |video_id: String| {
            if let Some(entry) = entries.iter().find(|e| e.video_id == video_id) {
                open_video(HistoryCandidate::new(entry.video_id.clone()).with_title(entry.title.clone()));
            }
        })
    };

    let tab_class = |tab: ActiveTab| {
        if *active_tab == tab {
            "pf-v5-c-tabs__item pf-m-current"
        } else {
            "pf-v5-c-tabs__item"
        }
    };

    html! {
        <div class="padding-20">
            <h1 class="popup-title">{"Video Pop-out"}</h1>

            <div class="pf-v5-c-tabs tabs-nav">
                <ul class="pf-v5-c-tabs__list">
                    <li class={tab_class(ActiveTab::CurrentPage)}>
                        <button class="pf-v5-c-tabs__link" onclick={on_tab_click(ActiveTab::CurrentPage)}>
                            <span class="pf-v5-c-tabs__item-text">{"Current page"}</span>
                        </button>
                    </li>
                    <li class={tab_class(ActiveTab::History)}>
                        <button class="pf-v5-c-tabs__link" onclick={on_tab_click(ActiveTab::History)}>
                            <span class="pf-v5-c-tabs__item-text">{"History"}</span>
                        </button>
                    </li>
                </ul>
            </div>

            <div class="tab-pane-content">
                {match &*active_tab {
                    ActiveTab::CurrentPage => match &*page_videos {
                        PageVideos::Loading => html! { <Spinner /> },
                        PageVideos::NotOnSite => html! {
                            <EmptyState message="Open a video page to list its videos." />
                        },
                        PageVideos::Error(err) => html! {
                            <Alert r#type={AlertType::Warning} title={"No videos found"} inline={true}>
                                {err.clone()}
                            </Alert>
                        },
                        PageVideos::Loaded(videos) if videos.is_empty() => html! {
                            <EmptyState message="No videos on this page." />
                        },
                        PageVideos::Loaded(videos) => {
                            let on_open = open_from_page(videos);
                            html! {
                                <>
                                    <EmptyState message="Click a video to open it in a pop-out window." />
                                    <ul class="video-list">
                                        {for videos.iter().map(|video| html! {
                                            <VideoListItem
                                                key={video.video_id.clone()}
                                                video_id={video.video_id.clone()}
                                                title={video.title.clone()}
                                                meta={duration_label(&video.minutes)}
                                                on_open={on_open.clone()}
                                            />
                                        })}
                                    </ul>
                                </>
                            }
                        }
                    },
                    ActiveTab::History => match &*history {
                        HistoryState::Loading => html! { <Spinner /> },
                        HistoryState::Error(err) => html! {
                            <Alert r#type={AlertType::Danger} title={"Error getting history"} inline={true}>
                                {err.clone()}
                            </Alert>
                        },
                        HistoryState::Loaded(entries) if entries.is_empty() => html! {
                            <EmptyState message="No videos opened yet." />
                        },
                        HistoryState::Loaded(entries) => {
                            let visible = filter_entries(entries, &query);
                            let on_open = open_from_history(entries);
                            html! {
                                <>
                                    <input
                                        class="pf-v5-c-form-control search-input"
                                        type="search"
                                        placeholder="Search history"
                                        value={(*query).clone()}
                                        oninput={on_search.clone()}
                                    />
                                    <EmptyState message={format!("{} videos in history", entries.len())} />
                                    <ul class="video-list">
                                        {for visible.iter().map(|entry| html! {
                                            <VideoListItem
                                                key={entry.video_id.clone()}
                                                video_id={entry.video_id.clone()}
                                                title={entry.title.clone()}
                                                meta={opened_label(entry)}
                                                on_open={on_open.clone()}
                                                on_delete={Some(on_delete.clone())}
                                            />
                                        })}
                                    </ul>
                                </>
                            }
                        }
                    },
                }}
            </div>
        </div>
    }
}

// Helper functions

async fn send(request: &Request) -> Result<Option<Response>, String> {
    chrome::send_request(request)
        .await
        .map_err(|e| format!("Failed to send {:?}: {}", request, e))
}

async fn get_history() -> Result<Vec<HistoryEntry>, String> {
    match send(&Request::GetVideoHistory).await? {
        Some(Response::History { history }) => Ok(history),
        None => Ok(Vec::new()),
        Some(other) => Err(format!("Unexpected reply: {:?}", other)),
    }
}

async fn load_page_videos() -> PageVideos {
    let tab = match chrome::active_tab().await {
        Ok(Some(tab)) => tab,
        Ok(None) => return PageVideos::NotOnSite,
        Err(e) => return PageVideos::Error(format!("Failed to get active tab: {}", e)),
    };

    let (Some(tab_id), Some(url)) = (tab.id, tab.url) else {
        return PageVideos::NotOnSite;
    };
    if !video::is_site_url(&url) {
        return PageVideos::NotOnSite;
    }

    match ContentScriptExtractor.extract(tab_id).await {
        Ok(videos) => PageVideos::Loaded(videos),
        Err(e) => PageVideos::Error(format!("Failed to read page: {}", e)),
    }
}

/// Remember the video, open it, and dismiss the popup
fn open_video(candidate: HistoryCandidate) {
    spawn_local(async move {
        let video_id = candidate.video_id.clone();
        if let Err(e) = send(&Request::AddVideoToHistory(candidate)).await {
            warn!("{}", e);
        }
        if let Err(e) = send(&Request::OpenPopup { video_id }).await {
            warn!("{}", e);
        }
        if let Some(window) = web_sys::window() {
            if let Err(e) = window.close() {
                warn!("Failed to close popup: {:?}", e);
            }
        }
    });
}

async fn apply_theme() {
    let settings = storage::load_settings(&ChromeStorage).await;
    let Some(window) = web_sys::window() else {
        return;
    };

    let prefers_dark = settings.theme_mode == ThemeMode::Auto
        && window
            .match_media("(prefers-color-scheme: dark)")
            .ok()
            .flatten()
            .is_some_and(|query| query.matches());
    let theme = settings.theme_mode.resolve(prefers_dark);

    if let Some(body) = window.document().and_then(|d| d.body()) {
        if let Err(e) = body.class_list().add_1(theme.body_class()) {
            warn!("Failed to apply theme: {:?}", e);
        }
    }
    debug!("Applied {:?} theme", theme);
}
