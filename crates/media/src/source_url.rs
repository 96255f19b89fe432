//! Recognised source URL shapes.

use url::Url;

const WATCH_HOSTS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
];

/// Whether `text` is a single YouTube video URL: `youtube.com/watch?v=<id>`,
/// `youtube.com/shorts/<id>`, or `youtu.be/<id>`, over http(s).
pub fn is_supported_url(text: &str) -> bool {
    let text = text.trim();
    if text.is_empty() || text.contains(char::is_whitespace) {
        return false;
    }
    let Ok(url) = Url::parse(text) else {
        return false;
    };
    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }
    let Some(host) = url.host_str() else {
        return false;
    };

    if host == "youtu.be" {
        return first_segment(&url).is_some_and(|id| !id.is_empty());
    }
    if !WATCH_HOSTS.contains(&host) {
        return false;
    }

    match url.path() {
        "/watch" => url.query_pairs().any(|(k, v)| k == "v" && !v.is_empty()),
        path => path
            .strip_prefix("/shorts/")
            .is_some_and(|id| !id.is_empty() && !id.contains('/')),
    }
}

fn first_segment(url: &Url) -> Option<&str> {
    url.path_segments().and_then(|mut s| s.next())
}
