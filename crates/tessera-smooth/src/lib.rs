//! Cancelable SmoothStreaming source assembly.
//!
//! [`SourceBuilder::build_renderers`] fetches the manifest once and, on the
//! player's [`CallbackLoop`], assembles three track pipelines (video, audio,
//! text) over one shared [`DefaultLoadControl`] and the player's bandwidth
//! meter. The result reaches the [`Player`] exactly once, as a
//! [`MultiSampleSource`] or a [`BuildError`], unless the build is canceled
//! before its outcome is handled.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use tessera_abr::{BandwidthMeter, DefaultBandwidthMeter};
//! use tessera_events::EventBus;
//! use tessera_smooth::{
//!     BuildError, CallbackContext, MultiSampleSource, Player, SmoothResult,
//!     SmoothStreamingManifest, SourceBuilder, SourceConfig,
//! };
//! use url::Url;
//!
//! struct Host {
//!     ctx: CallbackContext,
//!     meter: Arc<dyn BandwidthMeter>,
//!     events: EventBus,
//! }
//!
//! impl Player for Host {
//!     fn callback_context(&self) -> CallbackContext {
//!         self.ctx.clone()
//!     }
//!     fn bandwidth_meter(&self) -> Arc<dyn BandwidthMeter> {
//!         self.meter.clone()
//!     }
//!     fn track_events(&self) -> EventBus {
//!         self.events.clone()
//!     }
//!     fn on_source_ready(&self, source: MultiSampleSource) {
//!         println!("ready: {} tracks", source.len());
//!     }
//!     fn on_build_error(&self, error: BuildError) {
//!         eprintln!("build failed: {error}");
//!     }
//! }
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let (ctx, callbacks) = CallbackContext::new();
//! let host = Arc::new(Host {
//!     ctx,
//!     meter: Arc::new(DefaultBandwidthMeter::new()),
//!     events: EventBus::default(),
//! });
//!
//! let parser = |_url: &Url, _data: &[u8]| -> SmoothResult<SmoothStreamingManifest> {
//!     // Plug in a real SmoothStreaming XML parser here.
//!     Ok(SmoothStreamingManifest::default())
//! };
//! let mut builder = SourceBuilder::new(
//!     SourceConfig::new("https://example.com/video.ism"),
//!     Arc::new(parser),
//! )?;
//! let _build = builder.build_renderers(host);
//! callbacks.run().await;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

mod assembly;
mod builder;
mod chunk_source;
mod config;
mod context;
mod data_source;
mod error;
mod fetcher;
mod load_control;
mod manifest;
mod player;
mod sample_source;
mod url;

pub use crate::{
    assembly::{
        AUDIO_BUFFER_SEGMENTS, BUFFER_SEGMENT_SIZE, LIVE_EDGE_LATENCY, TEXT_BUFFER_SEGMENTS,
        TrackParams, VIDEO_BUFFER_SEGMENTS,
    },
    builder::{BuildHandle, BuildRequest, SourceBuilder},
    chunk_source::SmoothStreamingChunkSource,
    config::{DEFAULT_USER_AGENT, SourceConfig},
    context::{CallbackContext, CallbackLoop},
    data_source::HttpDataSource,
    error::{BuildError, SmoothError, SmoothResult},
    fetcher::{FetchState, ManifestFetchTask, ManifestFetcher, ManifestOutcome},
    load_control::{Allocation, DefaultAllocator, DefaultLoadControl, LoaderId},
    manifest::{
        DEFAULT_TIMESCALE, ManifestParser, SmoothStreamingManifest, StreamElement, StreamKind,
        TrackElement,
    },
    player::Player,
    sample_source::{ChunkSampleSource, MultiSampleSource, ProtectionStatus},
    url::{MANIFEST_SUFFIX, normalize_manifest_url, parse_manifest_url},
};
