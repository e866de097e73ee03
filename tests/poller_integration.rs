//! Poller behavior with a live task.

mod common;

use std::time::Duration;

use common::{item, pipeline, rss, ScriptedClient, SwitchableStore};
use feedmerge::config::PollerConfig;
use feedmerge::{PollState, Poller, PollerStatus};

const NEWS: &str = "https://news.example.com/rss.xml";

async fn wait_until(
    handle: &feedmerge::PollerHandle,
    condition: impl FnMut(&PollerStatus) -> bool,
) -> PollerStatus {
    let mut rx = handle.subscribe_status();
    let status = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(condition))
        .await
        .expect("poller did not reach the expected status")
        .unwrap()
        .clone();
    status
}

#[tokio::test]
async fn test_manual_polls_publish_snapshots() {
    let dir = tempfile::tempdir().unwrap();
    let client = ScriptedClient::new();
    let store = SwitchableStore::new();
    client.serve(NEWS, rss("News", &[item("https://news.example.com/a", "A", 1)]));

    let (poller, handle) = Poller::new(
        pipeline(dir.path(), &[NEWS], client.clone(), Some(store.clone())),
        &PollerConfig {
            interval_secs: 3600,
            run_on_start: false,
        },
    );
    let task = poller.spawn();
    let before = handle.snapshot();

    handle.poll_now().await.unwrap();
    let status = wait_until(&handle, |s| s.last_report.is_some()).await;
    assert_eq!(status.state, PollState::Idle);
    assert_eq!(status.message(), "Added 1 new item(s). Total: 1");

    client.serve(
        NEWS,
        rss(
            "News",
            &[
                item("https://news.example.com/a", "A", 1),
                item("https://news.example.com/b", "B", 2),
            ],
        ),
    );
    handle.poll_now().await.unwrap();
    wait_until(&handle, |s| {
        s.last_report.as_ref().map(|r| r.total) == Some(2)
    })
    .await;

    // Earlier readers keep the collection they were handed.
    assert!(before.is_empty());
    assert_eq!(handle.snapshot().len(), 2);
    assert_eq!(store.batches(), vec![1, 1]);

    handle.shutdown().await.unwrap();
    task.await.unwrap();
}

#[tokio::test]
async fn test_upsert_all_command_recovers_after_outage() {
    let dir = tempfile::tempdir().unwrap();
    let client = ScriptedClient::new();
    let store = SwitchableStore::new();
    store.set_down(true);
    client.serve(
        NEWS,
        rss(
            "News",
            &[
                item("https://news.example.com/a", "A", 1),
                item("https://news.example.com/b", "B", 2),
            ],
        ),
    );

    let (poller, handle) = Poller::new(
        pipeline(dir.path(), &[NEWS], client, Some(store.clone())),
        &PollerConfig {
            interval_secs: 3600,
            run_on_start: true,
        },
    );
    let task = poller.spawn();

    let status = wait_until(&handle, |s| s.last_report.is_some()).await;
    assert!(status.message().contains("DB upsert error"));
    assert_eq!(store.row_count(), 0);

    store.set_down(false);
    handle.upsert_all().await.unwrap();
    let status = wait_until(&handle, |s| s.last_upsert.is_some()).await;
    assert_eq!(
        status.last_upsert.as_deref(),
        Some("Upserted 2 row(s) to the database")
    );
    assert_eq!(store.row_count(), 2);

    handle.shutdown().await.unwrap();
    task.await.unwrap();
}

#[tokio::test]
async fn test_commands_queue_behind_running_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let client = ScriptedClient::new();
    client.serve(NEWS, rss("News", &[item("https://news.example.com/a", "A", 1)]));

    let (poller, handle) = Poller::new(
        pipeline(dir.path(), &[NEWS], client, None),
        &PollerConfig::default(),
    );
    let task = poller.spawn();

    for _ in 0..5 {
        handle.poll_now().await.unwrap();
    }
    handle.shutdown().await.unwrap();

    let pipeline = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(pipeline.collection().len(), 1);
}
