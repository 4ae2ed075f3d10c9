//! HTTP API routes and handlers.
//!
//! This module contains all HTTP endpoint implementations organized by domain:
//! - `health` - Service health checks
//! - `beacons` - Beacons currently present
//! - `scan` - Scan start and stop
//! - `proximity` - Nearest-beacon ranking
//! - `error` - API error types
//! - `openapi` - OpenAPI specification generation

use axum::routing::get;
use axum::Router;

use crate::state::SharedState;

pub mod beacons;
pub mod error;
pub mod health;
pub mod openapi;
pub mod proximity;
pub mod scan;

// Re-export commonly used types
pub use error::{ApiError, ApiResult, ErrorResponse};

// Re-export OpenAPI utilities for the gen-openapi binary
pub use openapi::get_openapi_json;

/// Creates the combined API router with all endpoints.
///
/// # Route Structure
///
/// ```text
/// /health                - Health check
/// /api
/// ├── /beacons           - Present beacons
/// ├── /scan/start        - Start scanning
/// ├── /scan/stop         - Stop scanning
/// ├── /proximity         - Nearest-beacon ranking
/// └── /openapi.json      - OpenAPI specification
/// ```
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .nest("/health", health::router())
        .nest(
            "/api",
            Router::new()
                .route("/beacons", get(beacons::list_beacons))
                .route("/proximity", get(proximity::check_proximity))
                .route("/openapi.json", get(openapi::get_openapi_spec))
                .nest("/scan", scan::router()),
        )
        .with_state(state)
}

#[cfg(all(test, any(feature = "mock-bluetooth", not(feature = "bluetooth"))))]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::extract::Path;
    use axum::http::StatusCode;
    use axum::response::Html;
    use axum_test::TestServer;
    use beaconwatch_core::radio::mock::{
        uid_advertisement, url_advertisement, MockRadio, RadioRequest,
    };
    use beaconwatch_core::radio::{radio_channel, RadioEvent, RadioSender};
    use beaconwatch_core::Config;

    use crate::api::beacons::BeaconsResponse;
    use crate::api::health::HealthResponse;
    use crate::api::proximity::ProximityResponse;
    use crate::api::scan::{ScanResponse, ScanStatus};
    use crate::state::AppState;

    struct TestApp {
        server: TestServer,
        radio_tx: RadioSender,
        radio: MockRadio,
        sampling_tx: RadioSender,
        sampling_radio: MockRadio,
    }

    fn app() -> TestApp {
        let radio = MockRadio::new();
        let (radio_tx, radio_rx) = radio_channel();
        let sampling_radio = MockRadio::new();
        let (sampling_tx, sampling_rx) = radio_channel();
        let state = AppState::with_radios(
            Config::default(),
            (radio.clone(), radio_rx),
            (sampling_radio.clone(), sampling_rx),
        )
        .unwrap();
        TestApp {
            server: TestServer::new(create_router(state)).unwrap(),
            radio_tx,
            radio,
            sampling_tx,
            sampling_radio,
        }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    async fn serve_page(title: &'static str) -> SocketAddr {
        let app = Router::new().route(
            "/",
            get(move || async move { Html(format!("<html><title>{title}</title></html>")) }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    /// Serves `/{name}` titled `name`, answering only once `pages` requests
    /// are in flight at the same time.
    async fn serve_pages_together(pages: usize) -> SocketAddr {
        let barrier = Arc::new(tokio::sync::Barrier::new(pages));
        let app = Router::new().route(
            "/{name}",
            get(move |Path(name): Path<String>| {
                let barrier = barrier.clone();
                async move {
                    barrier.wait().await;
                    Html(format!("<html><title>{name}</title></html>"))
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn test_health() {
        let app = app();
        let response = app.server.get("/health").await;
        response.assert_status_ok();

        let health: HealthResponse = response.json();
        assert_eq!(health.status, "ok");
        assert!(!health.scanning);
        assert!(!health.radio_ready);
    }

    #[tokio::test]
    async fn test_start_is_pending_until_radio_ready() {
        let app = app();

        let scan: ScanResponse = app.server.post("/api/scan/start").await.json();
        assert_eq!(scan.state, ScanStatus::Pending);
        assert_eq!(app.radio.scan_count(), 0);

        app.radio_tx.send(RadioEvent::ReadinessChanged(true)).unwrap();
        settle().await;

        let health: HealthResponse = app.server.get("/health").await.json();
        assert!(health.scanning);
        assert_eq!(app.radio.scan_count(), 1);
    }

    #[tokio::test]
    async fn test_beacons_lists_present_and_stop_clears() {
        let app = app();
        app.radio_tx.send(RadioEvent::ReadinessChanged(true)).unwrap();
        app.server.post("/api/scan/start").await.assert_status_ok();

        for rssi in [-60, -61] {
            let adv = uid_advertisement("AA:BB:CC:DD:EE:FF", [1; 10], [2; 6], rssi);
            app.radio_tx.send(RadioEvent::Advertisement(adv)).unwrap();
        }
        settle().await;

        let listed: BeaconsResponse = app.server.get("/api/beacons").await.json();
        assert_eq!(listed.count, 1);
        assert_eq!(listed.scan_state, ScanStatus::Scanning);
        let beacon = &listed.beacons[0];
        assert_eq!(
            beacon.beacon.key,
            format!("uid:{}{}", "01".repeat(10), "02".repeat(6))
        );
        assert_eq!(beacon.beacon.rssi_dbm, Some(-61));
        assert_eq!(beacon.sightings, 2);

        let stopped: ScanResponse = app.server.post("/api/scan/stop").await.json();
        assert_eq!(stopped.state, ScanStatus::Idle);
        assert_eq!(stopped.present, 0);

        let listed: BeaconsResponse = app.server.get("/api/beacons").await.json();
        assert_eq!(listed.count, 0);
    }

    #[tokio::test]
    async fn test_proximity_rejects_bad_window() {
        let app = app();
        let response = app
            .server
            .get("/api/proximity")
            .add_query_param("window_secs", 0)
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);

        let body: ErrorResponse = response.json();
        assert_eq!(body.error, "invalid_window");

        app.server
            .get("/api/proximity")
            .add_query_param("window_secs", 61)
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_proximity_ranks_and_labels_beacons() {
        let app = app();
        let addr = serve_page("Near Page").await;
        let near_url = format!("http://{addr}/");
        app.sampling_tx.send(RadioEvent::ReadinessChanged(true)).unwrap();

        let feeder = tokio::spawn({
            let sampling_tx = app.sampling_tx.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                for rssi in [-80, -82, -78] {
                    let adv = uid_advertisement("far", [9; 10], [9; 6], rssi);
                    sampling_tx.send(RadioEvent::Advertisement(adv)).unwrap();
                    let adv = url_advertisement("near", &near_url, rssi + 30);
                    sampling_tx.send(RadioEvent::Advertisement(adv)).unwrap();
                }
            }
        });

        let response = app
            .server
            .get("/api/proximity")
            .add_query_param("window_secs", 1)
            .await;
        feeder.await.unwrap();
        response.assert_status_ok();

        let ranked: ProximityResponse = response.json();
        assert_eq!(ranked.window_secs, 1);
        assert_eq!(ranked.beacons.len(), 2);
        assert_eq!(ranked.nearest.as_deref(), Some(format!("http://{addr}/").as_str()));

        let near = &ranked.beacons[0];
        assert_eq!(near.rank, 1);
        assert_eq!(near.average_rssi_dbm, -50);
        assert_eq!(near.samples, 2);
        assert_eq!(near.title.as_deref(), Some("Near Page"));

        let far = &ranked.beacons[1];
        assert_eq!(far.rank, 2);
        assert_eq!(far.average_rssi_dbm, -80);
        assert!(far.title.is_none());

        assert_eq!(
            app.sampling_radio.requests().last(),
            Some(&RadioRequest::Stop)
        );
    }

    #[tokio::test]
    async fn test_proximity_fetches_titles_concurrently() {
        let mut config = Config::default();
        config.server.title_fetch_timeout_secs = 2;
        let (sampling_tx, sampling_rx) = radio_channel();
        let (_radio_tx, radio_rx) = radio_channel();
        let state = AppState::with_radios(
            config,
            (MockRadio::new(), radio_rx),
            (MockRadio::new(), sampling_rx),
        )
        .unwrap();
        let server = TestServer::new(create_router(state)).unwrap();

        let addr = serve_pages_together(2).await;
        sampling_tx.send(RadioEvent::ReadinessChanged(true)).unwrap();
        let feeder = tokio::spawn({
            let sampling_tx = sampling_tx.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                for rssi in [-60, -61] {
                    let adv = url_advertisement("a", &format!("http://{addr}/alpha"), rssi);
                    sampling_tx.send(RadioEvent::Advertisement(adv)).unwrap();
                    let adv = url_advertisement("b", &format!("http://{addr}/beta"), rssi - 10);
                    sampling_tx.send(RadioEvent::Advertisement(adv)).unwrap();
                }
            }
        });

        let response = server
            .get("/api/proximity")
            .add_query_param("window_secs", 1)
            .await;
        feeder.await.unwrap();

        let ranked: ProximityResponse = response.json();
        let titles: Vec<Option<&str>> = ranked
            .beacons
            .iter()
            .map(|beacon| beacon.title.as_deref())
            .collect();
        assert_eq!(titles, [Some("alpha"), Some("beta")]);
    }

    #[tokio::test]
    async fn test_proximity_leaves_presence_scan_running() {
        let app = app();
        app.radio_tx.send(RadioEvent::ReadinessChanged(true)).unwrap();
        app.sampling_tx.send(RadioEvent::ReadinessChanged(true)).unwrap();
        app.server.post("/api/scan/start").await.assert_status_ok();

        let adv = uid_advertisement("AA:BB:CC:DD:EE:FF", [1; 10], [2; 6], -60);
        app.radio_tx.send(RadioEvent::Advertisement(adv)).unwrap();
        settle().await;

        app.server
            .get("/api/proximity")
            .add_query_param("window_secs", 1)
            .await
            .assert_status_ok();

        let listed: BeaconsResponse = app.server.get("/api/beacons").await.json();
        assert_eq!(listed.count, 1);
        assert_eq!(listed.scan_state, ScanStatus::Scanning);

        let health: HealthResponse = app.server.get("/health").await.json();
        assert!(health.scanning);
        assert_eq!(app.radio.scan_count(), 1);
        assert!(!app.radio.requests().contains(&RadioRequest::Stop));
        assert_eq!(app.sampling_radio.scan_count(), 1);
    }

    #[tokio::test]
    async fn test_openapi_endpoint() {
        let app = app();
        let response = app.server.get("/api/openapi.json").await;
        response.assert_status_ok();
        assert!(response.text().contains("beaconwatch API"));
    }
}
