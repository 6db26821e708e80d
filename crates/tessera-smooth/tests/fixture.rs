#![allow(dead_code)]

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tessera_abr::{BandwidthMeter, DefaultBandwidthMeter};
use tessera_drm::ProtectionElement;
use tessera_events::EventBus;
use tessera_net::{Headers, Net, NetError};
use tessera_smooth::{
    BuildError, CallbackContext, CallbackLoop, DEFAULT_TIMESCALE, ManifestParser,
    MultiSampleSource, Player, SmoothError, SmoothResult, SmoothStreamingManifest, StreamElement,
    StreamKind, TrackElement,
};
use tokio::sync::Semaphore;
use url::Url;

pub const PLAYREADY: [u8; 16] = [
    0x9a, 0x04, 0xf0, 0x79, 0x98, 0x40, 0x42, 0x86, 0xab, 0x92, 0xe6, 0x5b, 0xe0, 0x88, 0x5f, 0x95,
];

pub const CHUNK_LEN: usize = 1000;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Player that records every callback it receives.
pub struct RecordingPlayer {
    ctx: CallbackContext,
    meter: Arc<dyn BandwidthMeter>,
    events: EventBus,
    pub sources: Mutex<Vec<MultiSampleSource>>,
    pub errors: Mutex<Vec<BuildError>>,
}

impl RecordingPlayer {
    pub fn new() -> (Arc<Self>, CallbackLoop) {
        let (ctx, callbacks) = CallbackContext::new();
        let player = Arc::new(Self {
            ctx,
            meter: Arc::new(DefaultBandwidthMeter::new()),
            events: EventBus::default(),
            sources: Mutex::new(Vec::new()),
            errors: Mutex::new(Vec::new()),
        });
        (player, callbacks)
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn meter(&self) -> &Arc<dyn BandwidthMeter> {
        &self.meter
    }

    pub fn source_count(&self) -> usize {
        self.sources.lock().len()
    }

    pub fn error_count(&self) -> usize {
        self.errors.lock().len()
    }

    pub fn take_source(&self) -> MultiSampleSource {
        self.sources.lock().pop().expect("a published source")
    }
}

impl Player for RecordingPlayer {
    fn callback_context(&self) -> CallbackContext {
        self.ctx.clone()
    }

    fn bandwidth_meter(&self) -> Arc<dyn BandwidthMeter> {
        self.meter.clone()
    }

    fn track_events(&self) -> EventBus {
        self.events.clone()
    }

    fn on_source_ready(&self, source: MultiSampleSource) {
        self.sources.lock().push(source);
    }

    fn on_build_error(&self, error: BuildError) {
        self.errors.lock().push(error);
    }
}

/// In-memory transport serving one manifest body and fixed-size chunks.
///
/// When gated, every request waits for a permit from [`GatedNet::open`].
pub struct GatedNet {
    manifest: Option<&'static [u8]>,
    gate: Option<Semaphore>,
    requests: Mutex<Vec<(Url, Option<Headers>)>>,
    served: AtomicUsize,
}

impl GatedNet {
    pub fn serving(manifest: &'static [u8]) -> Arc<Self> {
        Arc::new(Self::new(Some(manifest), None))
    }

    pub fn gated(manifest: &'static [u8]) -> Arc<Self> {
        Arc::new(Self::new(Some(manifest), Some(Semaphore::new(0))))
    }

    /// Every manifest request fails with 404.
    pub fn not_found() -> Arc<Self> {
        Arc::new(Self::new(None, None))
    }

    fn new(manifest: Option<&'static [u8]>, gate: Option<Semaphore>) -> Self {
        Self {
            manifest,
            gate,
            requests: Mutex::new(Vec::new()),
            served: AtomicUsize::new(0),
        }
    }

    pub fn open(&self, requests: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(requests);
        }
    }

    pub fn requests(&self) -> Vec<(Url, Option<Headers>)> {
        self.requests.lock().clone()
    }

    pub fn served(&self) -> usize {
        self.served.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Net for GatedNet {
    async fn get_bytes(&self, url: Url, headers: Option<Headers>) -> Result<Bytes, NetError> {
        self.requests.lock().push((url.clone(), headers));
        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|e| NetError::http(e.to_string()))?
                .forget();
        }
        self.served.fetch_add(1, Ordering::SeqCst);

        if url.path().to_ascii_lowercase().ends_with("/manifest") {
            return match self.manifest {
                Some(body) => Ok(Bytes::from_static(body)),
                None => Err(NetError::http_status(404, url.to_string())),
            };
        }
        Ok(Bytes::from(vec![0u8; CHUNK_LEN]))
    }
}

fn stream(kind: StreamKind, name: &str, bitrates: &[u64]) -> StreamElement {
    StreamElement {
        kind,
        name: Some(name.to_string()),
        timescale: DEFAULT_TIMESCALE,
        url_template: format!("QualityLevels({{bitrate}})/Fragments({name}={{start time}})"),
        tracks: bitrates
            .iter()
            .map(|&bitrate| TrackElement {
                bitrate,
                fourcc: "AACL".into(),
                ..Default::default()
            })
            .collect(),
        chunk_start_times: vec![0, 20_000_000, 40_000_000],
        last_chunk_duration: 20_000_000,
    }
}

/// Stand-in for the XML parser: `vod`, `live` and `protected` bodies are
/// understood, anything else is a parse error.
pub fn parser() -> Arc<dyn ManifestParser> {
    Arc::new(
        |_url: &Url, data: &[u8]| -> SmoothResult<SmoothStreamingManifest> {
            let (is_live, protected) = match data {
                b"vod" => (false, false),
                b"live" => (true, false),
                b"protected" => (false, true),
                _ => {
                    return Err(SmoothError::ManifestParse(format!(
                        "unexpected manifest body ({} bytes)",
                        data.len()
                    )));
                }
            };
            Ok(SmoothStreamingManifest {
                duration: if is_live { 0 } else { 6 * DEFAULT_TIMESCALE },
                is_live,
                protection: protected
                    .then(|| ProtectionElement::new(PLAYREADY, Bytes::from_static(b"<pro/>"))),
                stream_elements: vec![
                    stream(StreamKind::Video, "video", &[350_000, 1_500_000]),
                    stream(StreamKind::Audio, "audio", &[128_000]),
                    stream(StreamKind::Text, "text", &[1_000]),
                ],
                ..Default::default()
            })
        },
    )
}

/// Run the next posted callback, failing the test if none arrives.
pub async fn turn(callbacks: &mut CallbackLoop) {
    let alive = tokio::time::timeout(Duration::from_secs(5), callbacks.turn())
        .await
        .expect("callback posted in time");
    assert!(alive, "callback loop closed");
}

/// Let spawned fetch tasks run to completion without driving the loop.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}
