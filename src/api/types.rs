//! Wire types of the Helix API and the query/page types built from them.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;

/// Application credentials obtained once per process.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// OAuth bearer token.
    pub bearer: String,
    /// Application client id sent as `Client-Id`.
    pub client_id: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("bearer", &"HIDDEN")
            .field("client_id", &self.client_id)
            .finish()
    }
}

/// Body of the token endpoint's success response.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// Error body shape shared by the Helix and token endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: String,
}

/// A resolved broadcaster account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub broadcaster_id: String,
    pub login: String,
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HelixUser {
    pub id: String,
    pub login: String,
    #[serde(default)]
    pub display_name: String,
}

impl From<HelixUser> for Account {
    fn from(user: HelixUser) -> Self {
        Self {
            broadcaster_id: user.id,
            login: user.login,
            display_name: user.display_name,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct UsersResponse {
    #[serde(default)]
    pub data: Vec<HelixUser>,
}

/// One clip as returned by `GET /helix/clips`.
///
/// Missing text fields decode as empty strings; `vod_offset` is `null` when
/// the source video is gone.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(default)]
pub struct HelixClip {
    pub id: String,
    pub url: String,
    pub embed_url: String,
    pub broadcaster_id: String,
    pub broadcaster_name: String,
    pub creator_id: String,
    pub creator_name: String,
    pub video_id: String,
    pub game_id: String,
    pub language: String,
    pub title: String,
    pub view_count: i64,
    pub created_at: String,
    pub thumbnail_url: String,
    pub duration: f64,
    pub vod_offset: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Pagination {
    #[serde(default)]
    pub cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ClipsResponse {
    #[serde(default)]
    pub data: Vec<HelixClip>,
    #[serde(default)]
    pub pagination: Pagination,
}

/// Parameters of one clip listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipQuery {
    pub broadcaster_id: String,
    /// Page size.
    pub first: u32,
    /// Continuation cursor from the previous page.
    pub after: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl ClipQuery {
    /// First page of `broadcaster_id` between `started_at` and `ended_at`.
    #[must_use]
    pub fn window(
        broadcaster_id: impl Into<String>,
        first: u32,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
    ) -> Self {
        Self {
            broadcaster_id: broadcaster_id.into(),
            first,
            after: None,
            started_at: Some(started_at),
            ended_at: Some(ended_at),
        }
    }

    /// The same query continued at `cursor`.
    #[must_use]
    pub fn after(&self, cursor: impl Into<String>) -> Self {
        Self {
            after: Some(cursor.into()),
            ..self.clone()
        }
    }

    /// Query pairs in request order.
    pub(crate) fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("broadcaster_id", self.broadcaster_id.clone()),
            ("first", self.first.to_string()),
        ];
        if let Some(after) = &self.after {
            pairs.push(("after", after.clone()));
        }
        if let Some(started_at) = self.started_at {
            pairs.push(("started_at", rfc3339_z(started_at)));
        }
        if let Some(ended_at) = self.ended_at {
            pairs.push(("ended_at", rfc3339_z(ended_at)));
        }
        pairs
    }
}

fn rfc3339_z(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// One page of clips.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClipPage {
    pub clips: Vec<HelixClip>,
    /// Continuation cursor; `None` on the last page.
    pub cursor: Option<String>,
}

impl From<ClipsResponse> for ClipPage {
    fn from(response: ClipsResponse) -> Self {
        Self {
            clips: response.data,
            cursor: response.pagination.cursor.filter(|c| !c.is_empty()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_clips_response_null_vod_offset() {
        let json = r#"{
            "data": [{"id": "A", "view_count": 5, "vod_offset": null, "duration": 12.5}],
            "pagination": {"cursor": "abc"}
        }"#;
        let page: ClipPage = serde_json::from_str::<ClipsResponse>(json).unwrap().into();
        assert_eq!(page.clips.len(), 1);
        assert_eq!(page.clips[0].vod_offset, None);
        assert_eq!(page.clips[0].view_count, 5);
        assert_eq!(page.cursor.as_deref(), Some("abc"));
    }

    #[test]
    fn test_empty_cursor_is_absent() {
        let json = r#"{"data": [], "pagination": {"cursor": ""}}"#;
        let page: ClipPage = serde_json::from_str::<ClipsResponse>(json).unwrap().into();
        assert_eq!(page.cursor, None);

        let json = r#"{"data": [], "pagination": {}}"#;
        let page: ClipPage = serde_json::from_str::<ClipsResponse>(json).unwrap().into();
        assert_eq!(page.cursor, None);
    }

    #[test]
    fn test_query_pairs_use_z_suffix() {
        let start = Utc.with_ymd_and_hms(2019, 6, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2019, 7, 1, 0, 5, 0).unwrap();
        let query = ClipQuery::window("42", 100, start, end).after("cur");
        let pairs = query.pairs();
        assert_eq!(pairs[0], ("broadcaster_id", "42".to_string()));
        assert_eq!(pairs[1], ("first", "100".to_string()));
        assert_eq!(pairs[2], ("after", "cur".to_string()));
        assert_eq!(pairs[3], ("started_at", "2019-06-01T00:00:00Z".to_string()));
        assert_eq!(pairs[4], ("ended_at", "2019-07-01T00:05:00Z".to_string()));
    }

    #[test]
    fn test_credentials_debug_hides_bearer() {
        let creds = Credentials {
            bearer: "secret-token".to_string(),
            client_id: "cid".to_string(),
        };
        let text = format!("{creds:?}");
        assert!(!text.contains("secret-token"));
        assert!(text.contains("cid"));
    }
}
