//! Harvest against a mock Helix server, persisted to a SQLite file.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use clip_archiver::api::{ApiEndpoints, Credentials, HelixClient};
use clip_archiver::download::HttpSettings;
use clip_archiver::harvest::{HarvestPlan, Harvester};
use clip_archiver::progress::{NoopProgress, ProgressReporter};
use clip_archiver::store::{DownloadStatus, YearMonth};
use serde_json::{Value, json};
use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod support;
use support::fixtures::file_store;
use support::socket_guard::start_mock_server_or_skip;

const BROADCASTER_ID: &str = "1001";

fn helix_clip(id: &str, views: i64, created_at: &str) -> Value {
    json!({
        "id": id,
        "url": format!("https://clips.example.tv/{id}"),
        "embed_url": format!("https://clips.example.tv/embed?clip={id}"),
        "broadcaster_id": BROADCASTER_ID,
        "broadcaster_name": "Some Streamer",
        "creator_id": "2002",
        "creator_name": "viewer",
        "video_id": "",
        "game_id": "509658",
        "language": "en",
        "title": format!("clip {id}"),
        "view_count": views,
        "created_at": created_at,
        "thumbnail_url": format!("https://clips-media.example/{id}-preview-480x272.jpg"),
        "duration": 28.4,
        "vod_offset": null
    })
}

fn page(clips: Vec<Value>, cursor: Option<&str>) -> ResponseTemplate {
    let pagination = match cursor {
        Some(cursor) => json!({ "cursor": cursor }),
        None => json!({}),
    };
    ResponseTemplate::new(200).set_body_json(json!({ "data": clips, "pagination": pagination }))
}

/// Raises the interrupt flag as soon as the first page is stored.
struct InterruptAfterFirstPage(Arc<AtomicBool>);

impl ProgressReporter for InterruptAfterFirstPage {
    fn clips_harvested(&self, _count: usize) {
        self.0.store(true, Ordering::SeqCst);
    }
}

fn client(server: &MockServer) -> HelixClient {
    HelixClient::with_endpoints(
        Credentials {
            bearer: "test-token".to_string(),
            client_id: "test-client".to_string(),
        },
        &HttpSettings::default(),
        &ApiEndpoints::single(&server.uri()),
    )
    .unwrap()
}

#[tokio::test]
async fn test_harvest_follows_cursor_and_stores_enriched_clips() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };

    Mock::given(method("GET"))
        .and(path("/helix/clips"))
        .and(header("Authorization", "Bearer test-token"))
        .and(header("Client-Id", "test-client"))
        .and(query_param("broadcaster_id", BROADCASTER_ID))
        .and(query_param("started_at", "2020-01-01T00:00:00Z"))
        .and(query_param("ended_at", "2020-02-01T00:05:00Z"))
        .and(query_param_is_missing("after"))
        .respond_with(page(
            vec![
                helix_clip("first", 10, "2020-01-03T10:00:00Z"),
                helix_clip("second", 20, "2020-01-04T10:00:00Z"),
            ],
            Some("cursor-1"),
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/helix/clips"))
        .and(query_param("started_at", "2020-01-01T00:00:00Z"))
        .and(query_param("after", "cursor-1"))
        .respond_with(page(
            vec![helix_clip("third", 30, "2020-01-20T10:00:00Z")],
            None,
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/helix/clips"))
        .and(query_param("started_at", "2020-02-01T00:00:00Z"))
        .respond_with(page(vec![], None))
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, store, ns) = file_store().await;
    let harvester = Harvester::new(
        Arc::new(client(&server)),
        Arc::new(store.clone()),
        BROADCASTER_ID,
        2,
        Arc::new(NoopProgress),
    );
    let plan = HarvestPlan::new(
        YearMonth::new(2020, 1).unwrap(),
        YearMonth::new(2020, 2).unwrap(),
    );

    let stats = harvester
        .run(&ns, &plan, Arc::new(AtomicBool::new(false)))
        .await
        .unwrap();

    assert_eq!(stats.windows(), 2);
    assert_eq!(stats.pages(), 3);
    assert_eq!(stats.clips(), 3);
    assert_eq!(stats.failed_windows(), 0);

    let third = store.get(&ns, "third").await.unwrap().unwrap();
    assert_eq!(third.asset_url, "https://clips-media.example/third.mp4");
    assert_eq!(third.download_status, DownloadStatus::Unattempted);
    assert_eq!(third.vod_offset(), None);
    assert!(!third.updated_at.is_empty());
    assert_eq!(
        store.latest_created_window(&ns).await,
        YearMonth::new(2020, 1).unwrap()
    );
}

#[tokio::test]
async fn test_harvest_retries_transient_page_failure() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };

    Mock::given(method("GET"))
        .and(path("/helix/clips"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({ "message": "busy" })))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/helix/clips"))
        .respond_with(page(
            vec![helix_clip("only", 5, "2021-07-07T07:07:07Z")],
            None,
        ))
        .mount(&server)
        .await;

    let (_dir, store, ns) = file_store().await;
    let month = YearMonth::new(2021, 7).unwrap();
    let stats = Harvester::new(
        Arc::new(client(&server)),
        Arc::new(store.clone()),
        BROADCASTER_ID,
        40,
        Arc::new(NoopProgress),
    )
    .run(
        &ns,
        &HarvestPlan::new(month, month),
        Arc::new(AtomicBool::new(false)),
    )
    .await
    .unwrap();

    assert_eq!(stats.failed_windows(), 0);
    assert_eq!(stats.clips(), 1);
    assert!(store.get(&ns, "only").await.unwrap().is_some());
}

#[tokio::test]
async fn test_harvest_rerun_refreshes_view_count() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };

    Mock::given(method("GET"))
        .and(path("/helix/clips"))
        .respond_with(page(
            vec![helix_clip("same", 100, "2021-07-07T07:07:07Z")],
            None,
        ))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/helix/clips"))
        .respond_with(page(
            vec![helix_clip("same", 150, "2021-07-07T07:07:07Z")],
            None,
        ))
        .mount(&server)
        .await;

    let (_dir, store, ns) = file_store().await;
    let month = YearMonth::new(2021, 7).unwrap();
    let harvester = Harvester::new(
        Arc::new(client(&server)),
        Arc::new(store.clone()),
        BROADCASTER_ID,
        40,
        Arc::new(NoopProgress),
    );
    let plan = HarvestPlan::new(month, month);
    for _ in 0..2 {
        harvester
            .run(&ns, &plan, Arc::new(AtomicBool::new(false)))
            .await
            .unwrap();
    }

    let record = store.get(&ns, "same").await.unwrap().unwrap();
    assert_eq!(record.view_count, 150);
    assert_eq!(
        store
            .count_by_status(&ns, DownloadStatus::Unattempted)
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn test_interrupt_mid_window_keeps_stored_page_and_stops() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };

    Mock::given(method("GET"))
        .and(path("/helix/clips"))
        .and(query_param("started_at", "2020-01-01T00:00:00Z"))
        .and(query_param_is_missing("after"))
        .respond_with(page(
            vec![helix_clip("early", 10, "2020-01-03T10:00:00Z")],
            Some("cursor-1"),
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/helix/clips"))
        .and(query_param("after", "cursor-1"))
        .respond_with(
            page(vec![helix_clip("late", 20, "2020-01-20T10:00:00Z")], None)
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/helix/clips"))
        .and(query_param("started_at", "2020-02-01T00:00:00Z"))
        .respond_with(page(vec![], None))
        .expect(0)
        .mount(&server)
        .await;

    let (_dir, store, ns) = file_store().await;
    let interrupted = Arc::new(AtomicBool::new(false));
    let harvester = Harvester::new(
        Arc::new(client(&server)),
        Arc::new(store.clone()),
        BROADCASTER_ID,
        1,
        Arc::new(InterruptAfterFirstPage(Arc::clone(&interrupted))),
    );
    let plan = HarvestPlan::new(
        YearMonth::new(2020, 1).unwrap(),
        YearMonth::new(2020, 2).unwrap(),
    );

    let started = Instant::now();
    let stats = harvester.run(&ns, &plan, interrupted).await.unwrap();

    assert!(stats.was_interrupted());
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(stats.windows(), 1);
    assert_eq!(stats.pages(), 1);
    assert!(store.get(&ns, "early").await.unwrap().is_some());
    assert!(store.get(&ns, "late").await.unwrap().is_none());
}
