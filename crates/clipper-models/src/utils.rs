//! Video URL sanity checks.
//!
//! Catches links users commonly paste by mistake (playlists, search result
//! pages) before a request is sent.

use crate::error::ValidationError;

/// Check if URL is from a YouTube domain
pub fn is_youtube_url(url: &str) -> bool {
    let url = url.to_ascii_lowercase();
    url.contains("youtube") || url.contains("youtu.be")
}

/// YouTube link that points into a playlist.
pub fn is_playlist_link(url: &str) -> bool {
    is_youtube_url(url) && url.to_ascii_lowercase().contains("list=")
}

/// Google search result page (Google Drive links are fine).
pub fn is_google_search_link(url: &str) -> bool {
    let url = url.to_ascii_lowercase();
    let is_search = url.contains("google.com/search") || (url.contains("google.") && url.contains("/search"));
    is_search && !url.contains("drive.google.com")
}

/// Bing search result page.
pub fn is_bing_search_link(url: &str) -> bool {
    let url = url.to_ascii_lowercase();
    url.contains("bing.com/") && (url.contains("/search") || url.contains("?q="))
}

/// Reject links that are known not to be video pages.
pub fn check_video_link(url: &str) -> Result<(), ValidationError> {
    if is_playlist_link(url) {
        return Err(ValidationError::PlaylistLink);
    }
    if is_google_search_link(url) {
        return Err(ValidationError::GoogleSearchLink);
    }
    if is_bing_search_link(url) {
        return Err(ValidationError::BingSearchLink);
    }
    Ok(())
}
