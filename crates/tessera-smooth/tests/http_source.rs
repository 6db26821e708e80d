mod fixture;

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use fixture::*;
use tessera_events::TrackRole;
use tessera_net::{NetError, NetOptions, RetryPolicy};
use tessera_smooth::{BuildError, SmoothError, SourceBuilder, SourceConfig};
use tokio::net::TcpListener;
use url::Url;

const FRAGMENT_LEN: usize = 20_000;

struct TestServer {
    base_url: Url,
    manifest_hits: Arc<AtomicUsize>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    async fn new() -> Self {
        let manifest_hits = Arc::new(AtomicUsize::new(0));
        let router = Router::new()
            .route("/video.ism/Manifest", get(|| async { "vod" }))
            .route("/flaky.ism/Manifest", get(flaky_manifest))
            .route("/video.ism/{quality}/{fragment}", get(fragment))
            .with_state(manifest_hits.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let server = axum::serve(listener, router).with_graceful_shutdown(async {
            shutdown_rx.await.ok();
        });
        tokio::spawn(async move {
            server.await.unwrap();
        });

        Self {
            base_url: Url::parse(&format!("http://{addr}")).unwrap(),
            manifest_hits,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    fn url(&self, path: &str) -> String {
        self.base_url.join(path).unwrap().to_string()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
    }
}

/// Fails with 503 on the first request, then serves the manifest.
async fn flaky_manifest(State(hits): State<Arc<AtomicUsize>>) -> impl IntoResponse {
    if hits.fetch_add(1, Ordering::SeqCst) == 0 {
        (StatusCode::SERVICE_UNAVAILABLE, "busy").into_response()
    } else {
        "vod".into_response()
    }
}

async fn fragment(Path((quality, fragment)): Path<(String, String)>) -> impl IntoResponse {
    if quality.starts_with("QualityLevels(") && fragment.starts_with("Fragments(") {
        (StatusCode::OK, vec![1u8; FRAGMENT_LEN]).into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

fn config(url: String) -> SourceConfig {
    SourceConfig::new(url).with_net(
        NetOptions::default()
            .with_request_timeout(Duration::from_secs(2))
            .with_retry_policy(RetryPolicy::new(
                2,
                Duration::from_millis(10),
                Duration::from_millis(50),
            )),
    )
}

#[tokio::test]
async fn vod_source_over_http() {
    init_tracing();
    let server = TestServer::new().await;
    let (player, mut callbacks) = RecordingPlayer::new();
    let mut builder = SourceBuilder::new(config(server.url("/video.ism")), parser()).unwrap();

    builder.build_renderers(player.clone());
    turn(&mut callbacks).await;

    assert_eq!(player.error_count(), 0);
    let source = player.take_source();
    assert_eq!(source.len(), 3);

    let video = source.track(TrackRole::Video).unwrap();
    let chunk = video.load_chunk(0, Duration::ZERO).await.unwrap();
    assert_eq!(chunk.len(), FRAGMENT_LEN);
    assert!(player.meter().bitrate_estimate().is_some());

    let text = source.track(TrackRole::Text).unwrap();
    let _cue = text.load_chunk(0, Duration::ZERO).await.unwrap();
    // 20 kB fits in one 64 KiB segment; the text budget holds two.
    let _second_cue = text.load_chunk(1, Duration::ZERO).await.unwrap();
    let err = text.load_chunk(2, Duration::ZERO).await.unwrap_err();
    assert!(matches!(err, SmoothError::BufferFull { .. }));
}

#[tokio::test]
async fn transient_manifest_failure_is_retried() {
    let server = TestServer::new().await;
    let (player, mut callbacks) = RecordingPlayer::new();
    let mut builder = SourceBuilder::new(config(server.url("/flaky.ism")), parser()).unwrap();

    builder.build_renderers(player.clone());
    turn(&mut callbacks).await;

    assert_eq!(server.manifest_hits.load(Ordering::SeqCst), 2);
    assert_eq!(player.error_count(), 0);
    assert_eq!(player.source_count(), 1);
}

#[tokio::test]
async fn missing_manifest_is_a_build_error() {
    let server = TestServer::new().await;
    let (player, mut callbacks) = RecordingPlayer::new();
    let mut builder = SourceBuilder::new(config(server.url("/missing.ism")), parser()).unwrap();

    builder.build_renderers(player.clone());
    turn(&mut callbacks).await;

    assert_eq!(player.source_count(), 0);
    let errors = player.errors.lock();
    assert_eq!(errors.len(), 1);
    assert!(matches!(
        &errors[0],
        BuildError::Manifest(SmoothError::Net(NetError::HttpStatus { status: 404, .. }))
    ));
}

#[test]
fn unparseable_url_is_rejected() {
    let err = SourceBuilder::new(SourceConfig::new("not a url"), parser()).unwrap_err();
    assert!(matches!(err, SmoothError::InvalidUrl(_)));
}
