//! Conversion of listed clips into storable records.

use tracing::debug;

use crate::api::HelixClip;
use crate::store::NewClip;

/// Token separating the video URL from the thumbnail suffix.
const PREVIEW_DELIMITER: &str = "-preview-";

/// Extension substituted for the thumbnail suffix.
const ASSET_SUFFIX: &str = ".mp4";

/// Derives the direct video URL from a thumbnail URL.
///
/// `https://host/AT-cm%7C123-preview-480x272.jpg` becomes
/// `https://host/AT-cm%7C123.mp4`.
#[must_use]
pub fn derive_asset_url(thumbnail_url: &str) -> Option<String> {
    thumbnail_url
        .find(PREVIEW_DELIMITER)
        .map(|index| format!("{}{ASSET_SUFFIX}", &thumbnail_url[..index]))
}

/// Builds the record to upsert, stamping `updated_at`.
#[must_use]
pub fn enrich(clip: HelixClip, updated_at: &str) -> NewClip {
    let asset_url = derive_asset_url(&clip.thumbnail_url).unwrap_or_else(|| {
        debug!(clip = %clip.id, thumbnail = %clip.thumbnail_url, "No asset URL in thumbnail");
        String::new()
    });
    NewClip {
        id: clip.id,
        url: clip.url,
        embed_url: clip.embed_url,
        broadcaster_id: clip.broadcaster_id,
        broadcaster_name: clip.broadcaster_name,
        creator_id: clip.creator_id,
        creator_name: clip.creator_name,
        video_id: clip.video_id,
        game_id: clip.game_id,
        language: clip.language,
        title: clip.title,
        view_count: clip.view_count,
        created_at: clip.created_at,
        thumbnail_url: clip.thumbnail_url,
        duration: clip.duration,
        vod_offset: clip.vod_offset,
        asset_url,
        updated_at: updated_at.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_asset_url() {
        assert_eq!(
            derive_asset_url("https://clips-media.example/AT-cm%7C123-preview-480x272.jpg")
                .as_deref(),
            Some("https://clips-media.example/AT-cm%7C123.mp4")
        );
    }

    #[test]
    fn test_derive_asset_url_without_delimiter() {
        assert_eq!(derive_asset_url("https://static.example/thumb.jpg"), None);
        assert_eq!(derive_asset_url(""), None);
    }

    #[test]
    fn test_enrich_copies_fields_and_stamps() {
        let clip = HelixClip {
            id: "Slug".to_string(),
            title: "t".to_string(),
            view_count: 9,
            thumbnail_url: "https://m.example/x-preview-1.jpg".to_string(),
            vod_offset: Some(42),
            ..HelixClip::default()
        };
        let record = enrich(clip, "2024-05-01T00:00:00Z");
        assert_eq!(record.id, "Slug");
        assert_eq!(record.view_count, 9);
        assert_eq!(record.vod_offset, Some(42));
        assert_eq!(record.asset_url, "https://m.example/x.mp4");
        assert_eq!(record.updated_at, "2024-05-01T00:00:00Z");
    }

    #[test]
    fn test_enrich_missing_delimiter_leaves_asset_empty() {
        let clip = HelixClip {
            id: "Slug".to_string(),
            thumbnail_url: "https://m.example/plain.jpg".to_string(),
            ..HelixClip::default()
        };
        assert_eq!(enrich(clip, "now").asset_url, "");
    }
}
