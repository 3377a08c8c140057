/// URL conventions for the video site
///
/// Everything the extension derives from a bare video id lives here:
/// the pop-out target, the music player target, and the fallback thumbnail.
use url::Url;

const WATCH_BASE: &str = "https://www.youtube.com/watch";
const MUSIC_WATCH_BASE: &str = "https://music.youtube.com/watch";
const THUMBNAIL_BASE: &str = "https://i.ytimg.com/vi/";

const WATCH_HOSTS: [&str; 4] = [
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
];

/// Watch page for a video id, e.g. `https://www.youtube.com/watch?v=abc`
pub fn watch_url(video_id: &str) -> String {
    with_video_param(WATCH_BASE, video_id)
}

/// Music player page for a track id
pub fn music_url(music_id: &str) -> String {
    with_video_param(MUSIC_WATCH_BASE, music_id)
}

/// Default thumbnail when the page gave us none
pub fn thumbnail_url(video_id: &str) -> String {
    format!("{}{}/mqdefault.jpg", THUMBNAIL_BASE, video_id)
}

fn with_video_param(base: &str, video_id: &str) -> String {
    match Url::parse_with_params(base, &[("v", video_id)]) {
        Ok(url) => url.to_string(),
        // The bases are constants, so this only guards against a bad edit.
        Err(_) => format!("{}?v={}", base, video_id),
    }
}

/// Extract the `v` parameter from a watch page URL
///
/// Returns `None` for non-watch pages and for an empty `v`.
pub fn video_id_from_url(url: &str) -> Option<String> {
    let parsed = parse_watch_url(url)?;
    parsed
        .query_pairs()
        .find(|(key, _)| key == "v")
        .map(|(_, value)| value.into_owned())
        .filter(|id| !id.is_empty())
}

/// True when the URL is a watch page on one of the video site's hosts
pub fn is_watch_url(url: &str) -> bool {
    parse_watch_url(url).is_some()
}

/// True for any page on the video site, watch page or not
pub fn is_site_url(url: &str) -> bool {
    parse_site_url(url).is_some()
}

fn parse_site_url(url: &str) -> Option<Url> {
    let parsed = Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    WATCH_HOSTS.contains(&host.as_str()).then_some(parsed)
}

fn parse_watch_url(url: &str) -> Option<Url> {
    parse_site_url(url).filter(|parsed| parsed.path() == "/watch")
}
