//! Store fixtures backed by a SQLite file in a temporary directory.

use clip_archiver::store::{ClipStore, Namespace, NewClip};
use clip_archiver::Database;
use tempfile::TempDir;

pub const NAMESPACE: &str = "some_streamer";

/// Opens a fresh file-backed store with [`NAMESPACE`] registered.
///
/// Keep the returned `TempDir` alive for the duration of the test.
pub async fn file_store() -> (TempDir, ClipStore, Namespace) {
    let dir = TempDir::new().unwrap();
    let db = Database::new(&dir.path().join("clips.sqlite3")).await.unwrap();
    let store = ClipStore::new(db);
    let namespace = Namespace::parse(NAMESPACE).unwrap();
    store.ensure_namespace(&namespace).await.unwrap();
    (dir, store, namespace)
}

/// A clip with a derived asset URL and no VOD offset.
pub fn new_clip(id: &str, view_count: i64, created_at: &str) -> NewClip {
    NewClip {
        id: id.to_string(),
        url: format!("https://clips.example.tv/{id}"),
        embed_url: format!("https://clips.example.tv/embed?clip={id}"),
        broadcaster_id: "1001".to_string(),
        broadcaster_name: "Some Streamer".to_string(),
        creator_id: "2002".to_string(),
        creator_name: "viewer".to_string(),
        video_id: String::new(),
        game_id: "509658".to_string(),
        language: "en".to_string(),
        title: format!("clip {id}"),
        view_count,
        created_at: created_at.to_string(),
        thumbnail_url: format!("https://media.example/{id}-preview-480x272.jpg"),
        duration: 30.0,
        vod_offset: None,
        asset_url: format!("https://media.example/{id}.mp4"),
        updated_at: "2024-01-01T00:00:00Z".to_string(),
    }
}
