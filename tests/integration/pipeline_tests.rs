//! End-to-end pipeline runs against a mock listing server

use crate::common::{is_empty_dir, mount_archive, mount_listing, test_config, zip_bytes};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zip_ingest::config::FailurePolicy;
use zip_ingest::storage::StoreWrite;
use zip_ingest::{
    Config, Coordinator, ErrorClass, IngestError, MemoryStore, Namespace, RunOutcome,
};

#[tokio::test]
async fn test_single_archive_end_to_end() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let archive_link = format!("{}/a.zip", base_url);

    mount_listing(
        &mock_server,
        &[
            archive_link.clone(),
            format!("{}/b.txt", base_url),
            "/c.zip".to_string(),
        ],
    )
    .await;
    mount_archive(
        &mock_server,
        "/a.zip",
        zip_bytes(&[("r1.xml", "<r1/>"), ("r2.xml", "<r2/>")]),
        1,
    )
    .await;
    mount_archive(&mock_server, "/b.txt", Vec::new(), 0).await;
    mount_archive(&mock_server, "/c.zip", Vec::new(), 0).await;

    let scratch = tempfile::tempdir().expect("Failed to create scratch dir");
    let store = MemoryStore::new();
    let mut config = test_config(&mock_server, scratch.path());
    config.workers.count = 1;

    let coordinator = Coordinator::new(config, store.clone()).expect("Failed to create coordinator");
    let outcome = coordinator.run().await.expect("Run failed");

    let summary = match outcome {
        RunOutcome::Completed(summary) => summary,
        other => panic!("Expected completion, got {:?}", other),
    };
    assert_eq!(summary.links_discovered, 1);
    assert_eq!(summary.archives_downloaded, 1);
    assert_eq!(summary.records_pushed, 2);

    assert_eq!(
        store.writes(),
        vec![
            StoreWrite::Push(b"<r1/>".to_vec()),
            StoreWrite::Mark(Namespace::Processed, "r1.xml".to_string()),
            StoreWrite::Push(b"<r2/>".to_vec()),
            StoreWrite::Mark(Namespace::Processed, "r2.xml".to_string()),
            StoreWrite::Mark(Namespace::Downloaded, archive_link),
        ]
    );
    // LPUSH order: newest record first
    assert_eq!(store.queue(), vec![b"<r2/>".to_vec(), b"<r1/>".to_vec()]);
    assert!(is_empty_dir(scratch.path()));
}

#[tokio::test]
async fn test_single_archive_with_default_config() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let archive_link = format!("{}/a.zip", base_url);
    let listing = [
        archive_link.clone(),
        format!("{}/b.txt", base_url),
        "/c.zip".to_string(),
    ];

    // Repeated runs, each on a fresh store, so a racy stop shows up
    for _ in 0..5 {
        mount_listing(&mock_server, &listing).await;
        mount_archive(
            &mock_server,
            "/a.zip",
            zip_bytes(&[("r1.xml", "<r1/>"), ("r2.xml", "<r2/>")]),
            1,
        )
        .await;

        let store = MemoryStore::new();
        let config = Config::new(format!("{}/listing/", base_url));
        let outcome = Coordinator::new(config, store.clone())
            .expect("Failed to create coordinator")
            .run()
            .await
            .expect("Run failed");

        assert!(matches!(outcome, RunOutcome::Completed(_)));
        assert_eq!(store.keys(Namespace::Downloaded), vec![archive_link.clone()]);
        assert_eq!(store.queue(), vec![b"<r2/>".to_vec(), b"<r1/>".to_vec()]);
        assert_eq!(store.keys(Namespace::Processed), vec!["r1.xml", "r2.xml"]);

        mock_server.verify().await;
        mock_server.reset().await;
    }
}

#[tokio::test]
async fn test_rerun_pushes_nothing_new() {
    let mock_server = MockServer::start().await;
    mount_listing(
        &mock_server,
        &["2024-01.zip".to_string(), "2024-02.zip".to_string()],
    )
    .await;
    // Each archive is fetched by the first run only
    mount_archive(
        &mock_server,
        "/listing/2024-01.zip",
        zip_bytes(&[("jan-1.xml", "<jan1/>"), ("jan-2.xml", "<jan2/>")]),
        1,
    )
    .await;
    mount_archive(
        &mock_server,
        "/listing/2024-02.zip",
        zip_bytes(&[("feb-1.xml", "<feb1/>")]),
        1,
    )
    .await;

    let scratch = tempfile::tempdir().expect("Failed to create scratch dir");
    let store = MemoryStore::new();

    let first = Coordinator::new(test_config(&mock_server, scratch.path()), store.clone())
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("First run failed");
    assert_eq!(first.summary().records_pushed, 3);

    let second = Coordinator::new(test_config(&mock_server, scratch.path()), store.clone())
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("Second run failed");

    let summary = second.summary();
    assert_eq!(summary.archives_already_handled, 2);
    assert_eq!(summary.archives_downloaded, 0);
    assert_eq!(summary.records_pushed, 0);
    assert_eq!(store.queue().len(), 3);
    assert_eq!(
        store.keys(Namespace::Processed),
        vec!["feb-1.xml", "jan-1.xml", "jan-2.xml"]
    );
}

#[tokio::test]
async fn test_downloaded_link_is_never_fetched() {
    let mock_server = MockServer::start().await;
    mount_listing(&mock_server, &["old.zip".to_string(), "new.zip".to_string()]).await;
    mount_archive(&mock_server, "/listing/old.zip", zip_bytes(&[("old.xml", "<old/>")]), 0).await;
    mount_archive(&mock_server, "/listing/new.zip", zip_bytes(&[("new.xml", "<new/>")]), 1).await;

    let scratch = tempfile::tempdir().expect("Failed to create scratch dir");
    let store = MemoryStore::new();
    store.seed(Namespace::Downloaded, "old.zip");

    let outcome = Coordinator::new(test_config(&mock_server, scratch.path()), store.clone())
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("Run failed");

    assert_eq!(outcome.summary().archives_already_handled, 1);
    assert!(!store.contains(Namespace::Processed, "old.xml"));
    assert_eq!(store.queue(), vec![b"<new/>".to_vec()]);
}

#[tokio::test]
async fn test_processed_entry_is_not_pushed_again() {
    let mock_server = MockServer::start().await;
    mount_listing(&mock_server, &["partial.zip".to_string()]).await;
    mount_archive(
        &mock_server,
        "/listing/partial.zip",
        zip_bytes(&[("r1.xml", "<r1/>"), ("r2.xml", "<r2/>")]),
        1,
    )
    .await;

    // A previous run pushed r1.xml but died before finishing the archive
    let scratch = tempfile::tempdir().expect("Failed to create scratch dir");
    let store = MemoryStore::new();
    store.seed(Namespace::Processed, "r1.xml");

    let outcome = Coordinator::new(test_config(&mock_server, scratch.path()), store.clone())
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("Run failed");

    assert_eq!(outcome.summary().records_already_processed, 1);
    assert_eq!(store.queue(), vec![b"<r2/>".to_vec()]);
    assert!(store.contains(Namespace::Downloaded, "partial.zip"));
}

#[tokio::test]
async fn test_scratch_files_removed_for_every_outcome() {
    let mock_server = MockServer::start().await;
    mount_listing(
        &mock_server,
        &[
            "good.zip".to_string(),
            "missing.zip".to_string(),
            "broken.zip".to_string(),
        ],
    )
    .await;
    mount_archive(&mock_server, "/listing/good.zip", zip_bytes(&[("g.xml", "<g/>")]), 1).await;
    mount_archive(&mock_server, "/listing/broken.zip", b"not a zip at all".to_vec(), 1).await;
    Mock::given(method("GET"))
        .and(path("/listing/missing.zip"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let scratch = tempfile::tempdir().expect("Failed to create scratch dir");
    let store = MemoryStore::new();
    let mut config = test_config(&mock_server, scratch.path());
    config.workers.on_error = FailurePolicy::Skip;

    let outcome = Coordinator::new(config, store.clone())
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("Run failed");

    assert!(matches!(outcome, RunOutcome::Completed(_)));
    assert_eq!(outcome.summary().failures_skipped, 2);
    assert_eq!(store.keys(Namespace::Downloaded), vec!["good.zip"]);
    assert!(is_empty_dir(scratch.path()));
}

#[tokio::test]
async fn test_halt_policy_fails_run() {
    let mock_server = MockServer::start().await;
    mount_listing(&mock_server, &["broken.zip".to_string()]).await;
    mount_archive(&mock_server, "/listing/broken.zip", b"PK but not really".to_vec(), 1).await;

    let scratch = tempfile::tempdir().expect("Failed to create scratch dir");
    let store = MemoryStore::new();
    let config = test_config(&mock_server, scratch.path());
    assert_eq!(config.workers.on_error, FailurePolicy::Halt);

    let result = Coordinator::new(config, store.clone())
        .expect("Failed to create coordinator")
        .run()
        .await;

    match result {
        Err(IngestError::Link(failure)) => {
            assert_eq!(failure.link, "broken.zip");
            assert_eq!(failure.error.class(), ErrorClass::MalformedArchive);
        }
        other => panic!("Expected a link failure, got {:?}", other),
    }
    assert!(store.writes().is_empty());
}

#[tokio::test]
async fn test_listing_failure_fails_run() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/listing/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let scratch = tempfile::tempdir().expect("Failed to create scratch dir");
    let mut config = test_config(&mock_server, scratch.path());
    // Crawler failures halt regardless of the worker policy
    config.workers.on_error = FailurePolicy::Skip;

    let result = Coordinator::new(config, MemoryStore::new())
        .expect("Failed to create coordinator")
        .run()
        .await;

    assert!(matches!(
        result,
        Err(IngestError::Status { status, .. }) if status.as_u16() == 503
    ));
}

#[tokio::test]
async fn test_listing_without_archives_completes() {
    let mock_server = MockServer::start().await;
    mount_listing(
        &mock_server,
        &["readme.txt".to_string(), "/a.zip".to_string()],
    )
    .await;

    let scratch = tempfile::tempdir().expect("Failed to create scratch dir");
    let mut config = test_config(&mock_server, scratch.path());
    config.workers.drain_on_complete = false;

    let outcome = Coordinator::new(config, MemoryStore::new())
        .expect("Failed to create coordinator")
        .run()
        .await
        .expect("Run failed");

    assert_eq!(outcome, RunOutcome::Completed(Default::default()));
}

#[tokio::test]
async fn test_shutdown_cancels_run() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/listing/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<a href=\"late.zip\">late</a>")
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&mock_server)
        .await;

    let scratch = tempfile::tempdir().expect("Failed to create scratch dir");
    let store = MemoryStore::new();
    let coordinator = Coordinator::new(test_config(&mock_server, scratch.path()), store.clone())
        .expect("Failed to create coordinator");

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let outcome = tokio::time::timeout(Duration::from_secs(5), coordinator.run_until(shutdown))
        .await
        .expect("Run did not stop after shutdown")
        .expect("Run failed");

    assert!(matches!(outcome, RunOutcome::Cancelled(_)));
    assert!(store.writes().is_empty());
}
