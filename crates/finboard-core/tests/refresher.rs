#![allow(unused_crate_dependencies)]
#![allow(clippy::tests_outside_test_module, reason = "integration tests live in tests/ dir")]
#![allow(clippy::expect_used, reason = "integration test, panics are the assertion mechanism")]

use std::sync::Arc;
use std::time::Duration;

use finboard_core::fetch::{FetchConfig, FetchPipeline};
use finboard_core::utils::time::now_millis;
use finboard_core::WidgetRefresher;
use finboard_types::{FieldFormat, WidgetConfig, WidgetField};
use serde_json::json;
use tokio::time::timeout;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn refresher() -> WidgetRefresher {
    let pipeline = FetchPipeline::new(FetchConfig::default()).expect("pipeline builds");
    WidgetRefresher::new(Arc::new(pipeline))
}

fn quote_widget(server: &MockServer, refresh_interval: u64) -> WidgetConfig {
    let mut widget = WidgetConfig::new("AAPL", format!("{}/quote", server.uri()));
    widget.refresh_interval = refresh_interval;
    widget.selected_fields =
        vec![WidgetField::new("c").with_display_name("Price").with_format(FieldFormat::Currency)];
    widget
}

async fn mount_quote(server: &MockServer, expected: u64) {
    Mock::given(method("GET"))
        .and(path("/quote"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"c": 101.5})))
        .expect(expected)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_auto_refresh_publishes_snapshots() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/quote"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"c": 101.5})))
        .mount(&server)
        .await;

    let refresher = refresher();
    let mut rx = refresher.subscribe();
    let widget = quote_widget(&server, 1);
    let id = widget.id.clone();
    refresher.start([widget]);

    let snapshot = timeout(Duration::from_secs(3), rx.recv()).await.expect("first tick").expect("channel open");
    assert_eq!(snapshot.widget_id, id);
    assert_eq!(snapshot.values, vec![("Price".to_string(), "$101.50".to_string())]);
    assert_eq!(refresher.active_tasks(), 1);

    // Second tick is served from the 30s cache.
    let second = timeout(Duration::from_secs(3), rx.recv()).await.expect("second tick").expect("channel open");
    assert!(second.outcome.from_cache);

    refresher.shutdown();
    assert_eq!(refresher.active_tasks(), 0);
}

#[tokio::test]
async fn test_blocked_origin_skips_timed_refresh() {
    let server = MockServer::start().await;
    mount_quote(&server, 0).await;

    let refresher = refresher();
    let widget = quote_widget(&server, 1);
    let origin = FetchPipeline::origin_of(&widget.api_url).expect("origin");
    refresher.pipeline().registry().record_limit(&origin, now_millis() + 60_000);

    let mut rx = refresher.subscribe();
    refresher.start([widget]);

    assert!(timeout(Duration::from_millis(1_500), rx.recv()).await.is_err(), "tick should be skipped");
    refresher.shutdown();
}

#[tokio::test]
async fn test_refresh_now_bypasses_cache() {
    let server = MockServer::start().await;
    mount_quote(&server, 2).await;

    let refresher = refresher();
    let mut rx = refresher.subscribe();
    let widget = quote_widget(&server, 0);
    let id = widget.id.clone();
    refresher.start([widget]);

    let initial = timeout(Duration::from_secs(3), rx.recv()).await.expect("initial load").expect("channel open");
    assert!(!initial.outcome.from_cache);

    let forced = refresher.refresh_now(&id).await.expect("known widget");
    assert!(!forced.outcome.from_cache);
    assert_eq!(forced.values[0].1, "$101.50");
}

#[tokio::test]
async fn test_zero_ttl_widget_always_refetches() {
    let server = MockServer::start().await;
    mount_quote(&server, 3).await;

    let refresher = refresher();
    let mut rx = refresher.subscribe();
    let mut widget = quote_widget(&server, 0);
    widget.cache_ttl = 0;
    refresher.start([widget]);
    timeout(Duration::from_secs(3), rx.recv()).await.expect("initial load").expect("channel open");

    for snapshot in refresher.refresh_all().await.into_iter().chain(refresher.refresh_all().await) {
        assert!(!snapshot.outcome.from_cache);
    }
}

#[tokio::test]
async fn test_unknown_widget() {
    let refresher = refresher();
    assert!(refresher.refresh_now("widget-missing").await.is_err());
    assert!(!refresher.remove_widget("widget-missing"));
}
