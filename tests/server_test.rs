//! Server integration tests
//!
//! Tests for HTTP endpoints and collection scheduling.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{FakePool, FakeSource};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use zpool_exporter::collectors::ZpoolCollector;
use zpool_exporter::metrics::MetricsCollector;
use zpool_exporter::server::{self, AppState};
use zpool_exporter::zfs::PoolSource;

/// Helper to create a test metrics instance
fn create_test_metrics() -> MetricsCollector {
    MetricsCollector::new().expect("Failed to create metrics")
}

async fn get(app: &axum::Router, uri: &str) -> (StatusCode, String) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[test]
fn test_index_page_links_to_metrics() {
    let page = server::index_page("/custom/metrics");
    assert!(page.contains("<h1>ZFS Exporter</h1>"));
    assert!(page.contains("<a href=\"/custom/metrics\">Metrics</a>"));
}

#[tokio::test]
async fn test_root_and_custom_telemetry_path() {
    // Given: A polling-mode server with a published snapshot
    let metrics = create_test_metrics();
    let source: Arc<dyn PoolSource> = Arc::new(FakeSource::new(vec![FakePool::healthy("tank")]));
    let collector = ZpoolCollector::init(source).await.unwrap();
    metrics.publish(collector.collect().await);
    let app = server::router(AppState::polling(metrics, "/zfs"));

    // When: Requesting the index page
    let (status, body) = get(&app, "/").await;

    // Then: It links to the configured path
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("href=\"/zfs\""));

    // When: Scraping the configured path
    let (status, body) = get(&app, "/zfs").await;

    // Then: The snapshot is rendered
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("zfs_zpool_poolstate{poolname=\"tank\"} 0"));
    assert!(body.contains("zfs_zpool_vdevstate"));

    // Then: The default path is not served
    let (status, _) = get(&app, "/metrics").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_polling_scrapes_do_not_query_pools() {
    // Given: A polling-mode server with nothing published yet
    let app = server::router(AppState::polling(create_test_metrics(), "/metrics"));

    // When: Scraping
    let (status, body) = get(&app, "/metrics").await;

    // Then: The endpoint answers with an empty exposition
    assert_eq!(status, StatusCode::OK);
    assert!(!body.contains("zfs_zpool_"));
}

#[tokio::test]
async fn test_on_demand_collects_on_every_scrape() {
    // Given: An on-demand server for a pool whose tree query fails
    let fake = Arc::new(FakeSource::new(vec![FakePool::healthy("tank")]));
    fake.update("tank", |p| p.fail_tree = true);
    let source: Arc<dyn PoolSource> = fake.clone();
    let collector = Arc::new(ZpoolCollector::init(source).await.unwrap());
    let app = server::router(AppState::on_demand(
        create_test_metrics(),
        "/metrics",
        collector.clone(),
    ));

    // When: Scraping twice
    let (_, first) = get(&app, "/metrics").await;
    let (_, second) = get(&app, "/metrics").await;

    // Then: Each scrape ran its own pass
    assert!(first.contains("zfs_zpool_collecterrors{poolname=\"tank\"} 1"));
    assert!(second.contains("zfs_zpool_collecterrors{poolname=\"tank\"} 2"));
    assert!(!second.contains("zfs_zpool_vdevstate"));

    // When: The pool recovers
    fake.update("tank", |p| p.fail_tree = false);
    let (_, third) = get(&app, "/metrics").await;

    // Then: Vdev metrics are back immediately
    assert!(third.contains("zfs_zpool_vdevstate"));
    assert!(third.contains("zfs_zpool_collecterrors{poolname=\"tank\"} 2"));
    assert_eq!(collector.error_count("tank").await, 2);
}

#[tokio::test]
async fn test_polling_loop_stops_when_pools_cannot_be_listed() {
    // Given: A source whose enumeration fails
    let source: Arc<dyn PoolSource> = Arc::new(FakeSource::failing_list());
    let metrics = create_test_metrics();

    // When: Starting the polling loop
    let finished = tokio::time::timeout(
        Duration::from_secs(5),
        server::collect_metrics_loop(source, metrics.clone(), 1),
    )
    .await;

    // Then: The loop returns instead of retrying and nothing is published
    assert!(finished.is_ok(), "polling loop should stop");
    assert!(metrics.snapshot().is_empty());
}

#[tokio::test]
async fn test_polling_loop_publishes_snapshots() {
    // Given: A polling loop over two healthy pools
    let source: Arc<dyn PoolSource> = Arc::new(FakeSource::new(vec![
        FakePool::healthy("tank"),
        FakePool::healthy("backup"),
    ]));
    let metrics = create_test_metrics();
    let handle = tokio::spawn(server::collect_metrics_loop(source, metrics.clone(), 1));

    // When: Waiting for the first pass
    let published = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if !metrics.snapshot().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    handle.abort();

    // Then: Both pools are exported
    assert!(published.is_ok(), "no snapshot published");
    let rendered = metrics.render().unwrap();
    assert!(rendered.contains("poolname=\"tank\""));
    assert!(rendered.contains("poolname=\"backup\""));
}

#[test]
fn test_metrics_rendering_is_stable() {
    // Given: A metrics collector with a snapshot
    let metrics = create_test_metrics();
    metrics.publish(
        zpool_exporter::collectors::vdev_samples("tank", &common::disk("sda", 4)),
    );

    // When: Rendering the same metrics twice
    let render1 = metrics.render().expect("First render failed");
    let render2 = metrics.render().expect("Second render failed");

    // Then: Both renderings should be identical
    assert_eq!(render1, render2, "Metrics rendering is not stable");
}
