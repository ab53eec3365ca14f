use std::path::Path;

use tokio::fs;

pub const INDEX_TEMPLATE: &str = "index.html";
pub const VIDEO_TEMPLATE: &str = "video.html";

/// Marker in `video.html` replaced with the playlist URL.
pub const PLAYLIST_PLACEHOLDER: &str = "@playlistName";

pub async fn load(dir: &Path, name: &str) -> std::io::Result<String> {
    fs::read_to_string(dir.join(name)).await
}

pub fn render_playlist(template: &str, playlist_url: &str) -> String {
    template.replace(PLAYLIST_PLACEHOLDER, playlist_url)
}
