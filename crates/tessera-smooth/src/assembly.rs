//! Construction of the three track pipelines of a SmoothStreaming source.

use std::{sync::Arc, time::Duration};

use tessera_abr::{AdaptiveEvaluator, BandwidthMeter, FormatEvaluator};
use tessera_events::{EventBus, TrackRole};
use tessera_net::Net;
use tracing::debug;

use crate::{
    chunk_source::SmoothStreamingChunkSource,
    data_source::HttpDataSource,
    fetcher::ManifestFetcher,
    load_control::{DefaultAllocator, DefaultLoadControl},
    sample_source::{ChunkSampleSource, MultiSampleSource, ProtectionStatus},
};

/// Granularity of buffer accounting.
pub const BUFFER_SEGMENT_SIZE: usize = 64 * 1024;
pub const VIDEO_BUFFER_SEGMENTS: usize = 200;
pub const AUDIO_BUFFER_SEGMENTS: usize = 54;
pub const TEXT_BUFFER_SEGMENTS: usize = 2;
/// Minimum distance behind the live point when starting live playback.
pub const LIVE_EDGE_LATENCY: Duration = Duration::from_secs(30);

/// Fixed per-role pipeline parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrackParams {
    pub buffer_segments: usize,
    pub adaptive: bool,
}

impl TrackParams {
    pub const fn for_role(role: TrackRole) -> Self {
        match role {
            TrackRole::Video => Self {
                buffer_segments: VIDEO_BUFFER_SEGMENTS,
                adaptive: true,
            },
            TrackRole::Audio => Self {
                buffer_segments: AUDIO_BUFFER_SEGMENTS,
                adaptive: false,
            },
            TrackRole::Text => Self {
                buffer_segments: TEXT_BUFFER_SEGMENTS,
                adaptive: false,
            },
        }
    }

    /// Buffer budget in bytes.
    pub const fn buffer_size(&self) -> usize {
        BUFFER_SEGMENT_SIZE * self.buffer_segments
    }
}

/// Shared inputs of one assembly.
pub(crate) struct AssemblyInputs<'a> {
    pub fetcher: &'a Arc<ManifestFetcher>,
    pub net: &'a Arc<dyn Net>,
    pub user_agent: &'a str,
    pub meter: Arc<dyn BandwidthMeter>,
    pub events: EventBus,
}

/// Build video, audio and text pipelines over one fresh load control.
///
/// Performs no I/O.
pub(crate) fn assemble(inputs: AssemblyInputs<'_>, protection: ProtectionStatus) -> MultiSampleSource {
    let load_control = Arc::new(DefaultLoadControl::new(DefaultAllocator::new(
        BUFFER_SEGMENT_SIZE,
    )));

    let tracks = TrackRole::ALL
        .into_iter()
        .map(|role| {
            let params = TrackParams::for_role(role);
            let data_source =
                HttpDataSource::new(inputs.net.clone(), inputs.user_agent, inputs.meter.clone());
            let evaluator = params.adaptive.then(|| {
                Box::new(AdaptiveEvaluator::new(inputs.meter.clone())) as Box<dyn FormatEvaluator>
            });
            let chunk_source = SmoothStreamingChunkSource::new(
                inputs.fetcher.clone(),
                role.into(),
                data_source,
                evaluator,
                LIVE_EDGE_LATENCY,
            );
            ChunkSampleSource::new(
                chunk_source,
                load_control.clone(),
                params.buffer_size(),
                inputs.events.clone(),
                role,
            )
        })
        .collect::<Vec<_>>();

    debug!(
        url = %inputs.fetcher.url(),
        tracks = tracks.len(),
        target_buffer = load_control.target_buffer_size(),
        ?protection,
        "source assembled"
    );
    MultiSampleSource::new(tracks, protection)
}
