//! Integration tests for the clip store against a SQLite file.

use clip_archiver::store::{DownloadStatus, Namespace, StoreError, VOD_OFFSET_ABSENT, YearMonth};

mod support;
use support::fixtures::{file_store, new_clip};

#[tokio::test]
async fn test_upsert_twice_keeps_one_row_with_latest_views() {
    let (_dir, store, ns) = file_store().await;

    store
        .upsert(&ns, &[new_clip("a", 100, "2020-01-01T00:00:00Z")])
        .await
        .unwrap();
    store
        .upsert(&ns, &[new_clip("a", 150, "2020-01-01T00:00:00Z")])
        .await
        .unwrap();

    let all = store.candidate_records(&ns, 0, 0, true).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].view_count, 150);
}

#[tokio::test]
async fn test_upsert_preserves_download_state_and_other_fields() {
    let (_dir, store, ns) = file_store().await;
    store
        .upsert(&ns, &[new_clip("a", 10, "2020-01-01T00:00:00Z")])
        .await
        .unwrap();
    let stored = store.get(&ns, "a").await.unwrap().unwrap();
    store
        .record_outcome(&ns, stored.local_id, DownloadStatus::Downloaded, "/out/a.mp4")
        .await
        .unwrap();

    let mut refreshed = new_clip("a", 99, "2020-01-01T00:00:00Z");
    refreshed.title = "renamed upstream".to_string();
    refreshed.updated_at = "2024-02-02T00:00:00Z".to_string();
    store.upsert(&ns, &[refreshed]).await.unwrap();

    let after = store.get(&ns, "a").await.unwrap().unwrap();
    assert_eq!(after.view_count, 99);
    assert_eq!(after.updated_at, "2024-02-02T00:00:00Z");
    assert_eq!(after.title, "clip a");
    assert_eq!(after.download_status, DownloadStatus::Downloaded);
    assert_eq!(after.download_path, "/out/a.mp4");
    assert_eq!(after.local_id, stored.local_id);
}

#[tokio::test]
async fn test_absent_vod_offset_is_stored_as_sentinel() {
    let (_dir, store, ns) = file_store().await;
    store
        .upsert(&ns, &[new_clip("a", 1, "2020-01-01T00:00:00Z")])
        .await
        .unwrap();

    let stored = store.get(&ns, "a").await.unwrap().unwrap();
    assert_eq!(stored.vod_offset, VOD_OFFSET_ABSENT);
    assert_eq!(stored.vod_offset(), None);
}

#[tokio::test]
async fn test_latest_created_window_resume_point() {
    let (_dir, store, ns) = file_store().await;
    assert_eq!(store.latest_created_window(&ns).await, YearMonth::EPOCH);
    assert_eq!(YearMonth::EPOCH, YearMonth::new(2016, 1).unwrap());

    store
        .upsert(
            &ns,
            &[
                new_clip("old", 1, "2018-03-01T00:00:00Z"),
                new_clip("new", 1, "2019-06-15T12:30:00Z"),
            ],
        )
        .await
        .unwrap();
    assert_eq!(
        store.latest_created_window(&ns).await,
        YearMonth::new(2019, 6).unwrap()
    );
}

#[tokio::test]
async fn test_latest_created_window_unparsable_degrades_to_epoch() {
    let (_dir, store, ns) = file_store().await;
    store
        .upsert(&ns, &[new_clip("bad", 1, "yesterday")])
        .await
        .unwrap();
    assert_eq!(store.latest_created_window(&ns).await, YearMonth::EPOCH);
}

#[tokio::test]
async fn test_candidate_filtering_by_min_view_and_cap() {
    let (_dir, store, ns) = file_store().await;
    store
        .upsert(
            &ns,
            &[
                new_clip("ten", 10, "2020-01-01T00:00:00Z"),
                new_clip("sixty", 60, "2020-01-02T00:00:00Z"),
                new_clip("two_hundred", 200, "2020-01-03T00:00:00Z"),
            ],
        )
        .await
        .unwrap();

    let ids: Vec<String> = store
        .candidate_records(&ns, 50, 0, false)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, ["sixty", "two_hundred"]);

    let capped = store.candidate_records(&ns, 50, 1, false).await.unwrap();
    assert_eq!(capped.len(), 1);
    assert_eq!(capped[0].id, "sixty", "cap follows storage order, not views");
}

#[tokio::test]
async fn test_force_flag_includes_downloaded_records() {
    let (_dir, store, ns) = file_store().await;
    store
        .upsert(
            &ns,
            &[
                new_clip("done", 5, "2020-01-01T00:00:00Z"),
                new_clip("failed", 5, "2020-01-02T00:00:00Z"),
                new_clip("fresh", 5, "2020-01-03T00:00:00Z"),
            ],
        )
        .await
        .unwrap();
    let done = store.get(&ns, "done").await.unwrap().unwrap();
    let failed = store.get(&ns, "failed").await.unwrap().unwrap();
    store
        .record_outcome(&ns, done.local_id, DownloadStatus::Downloaded, "/x.mp4")
        .await
        .unwrap();
    store
        .record_outcome(&ns, failed.local_id, DownloadStatus::Pending, "/y.mp4")
        .await
        .unwrap();

    let without: Vec<String> = store
        .candidate_records(&ns, 0, 0, false)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(without, ["failed", "fresh"]);

    let with = store.candidate_records(&ns, 0, 0, true).await.unwrap();
    assert_eq!(with.len(), 3);
}

#[tokio::test]
async fn test_namespaces_are_isolated() {
    let (_dir, store, ns) = file_store().await;
    let other = Namespace::parse("other_streamer").unwrap();
    store.ensure_namespace(&other).await.unwrap();
    store.ensure_namespace(&other).await.unwrap();

    store
        .upsert(&ns, &[new_clip("shared_id", 1, "2020-01-01T00:00:00Z")])
        .await
        .unwrap();
    store
        .upsert(&other, &[new_clip("shared_id", 2, "2021-05-01T00:00:00Z")])
        .await
        .unwrap();

    assert_eq!(store.get(&ns, "shared_id").await.unwrap().unwrap().view_count, 1);
    assert_eq!(store.get(&other, "shared_id").await.unwrap().unwrap().view_count, 2);
    assert_eq!(
        store.latest_created_window(&ns).await,
        YearMonth::new(2020, 1).unwrap()
    );
}

#[tokio::test]
async fn test_record_outcome_unknown_local_id() {
    let (_dir, store, ns) = file_store().await;
    let err = store
        .record_outcome(&ns, 4242, DownloadStatus::Downloaded, "")
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::RecordNotFound { local_id: 4242, .. }));
}

#[tokio::test]
async fn test_count_by_status_and_completed_records() {
    let (_dir, store, ns) = file_store().await;
    store
        .upsert(
            &ns,
            &[
                new_clip("a", 1, "2020-01-01T00:00:00Z"),
                new_clip("b", 1, "2020-01-02T00:00:00Z"),
            ],
        )
        .await
        .unwrap();
    let a = store.get(&ns, "a").await.unwrap().unwrap();
    store
        .record_outcome(&ns, a.local_id, DownloadStatus::Downloaded, "/a.mp4")
        .await
        .unwrap();

    assert_eq!(
        store
            .count_by_status(&ns, DownloadStatus::Downloaded)
            .await
            .unwrap(),
        1
    );
    assert_eq!(
        store
            .count_by_status(&ns, DownloadStatus::Unattempted)
            .await
            .unwrap(),
        1
    );
    let completed = store.completed_records(&ns).await.unwrap();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].id, "a");
}
