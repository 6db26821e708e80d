use std::{fmt, sync::Arc, time::Duration};

use parking_lot::Mutex;
use tessera_drm::DrmSession;
use tessera_events::{EventBus, TrackEvent, TrackRole};
use tracing::{debug, warn};

use crate::{
    SmoothResult,
    chunk_source::SmoothStreamingChunkSource,
    load_control::{Allocation, DefaultLoadControl, LoaderId},
};

/// Buffered sample source of one track, fed chunk by chunk.
pub struct ChunkSampleSource {
    chunk_source: SmoothStreamingChunkSource,
    load_control: Arc<DefaultLoadControl>,
    loader: LoaderId,
    buffer_size: usize,
    events: EventBus,
    track: TrackRole,
    current_format: Mutex<Option<usize>>,
}

impl fmt::Debug for ChunkSampleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkSampleSource")
            .field("track", &self.track)
            .field("buffer_size", &self.buffer_size)
            .field("chunk_source", &self.chunk_source)
            .finish_non_exhaustive()
    }
}

impl ChunkSampleSource {
    /// Register with `load_control` under a `buffer_size` byte budget.
    pub fn new(
        chunk_source: SmoothStreamingChunkSource,
        load_control: Arc<DefaultLoadControl>,
        buffer_size: usize,
        events: EventBus,
        track: TrackRole,
    ) -> Self {
        let loader = load_control.register(buffer_size);
        events.publish(TrackEvent::Registered { track, buffer_size });
        Self {
            chunk_source,
            load_control,
            loader,
            buffer_size,
            events,
            track,
            current_format: Mutex::new(None),
        }
    }

    pub fn track(&self) -> TrackRole {
        self.track
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    pub fn chunk_source(&self) -> &SmoothStreamingChunkSource {
        &self.chunk_source
    }

    pub fn load_control(&self) -> &Arc<DefaultLoadControl> {
        &self.load_control
    }

    /// Bytes of this track currently held in the shared load control.
    pub fn buffered_bytes(&self) -> usize {
        self.load_control.buffered_bytes(self.loader)
    }

    /// Quality level used for the last loaded chunk.
    pub fn current_format(&self) -> Option<usize> {
        *self.current_format.lock()
    }

    /// Fetch chunk `index` and admit it into this track's buffer.
    ///
    /// `buffered` is the media duration already queued ahead of the playhead;
    /// the adaptive evaluator (if any) uses it to decide on switches.
    pub async fn load_chunk(&self, index: usize, buffered: Duration) -> SmoothResult<Allocation> {
        match self.try_load_chunk(index, buffered).await {
            Ok(allocation) => {
                self.events.publish(TrackEvent::LoadCompleted {
                    track: self.track,
                    chunk_index: index,
                    bytes: allocation.len() as u64,
                });
                Ok(allocation)
            }
            Err(error) => {
                warn!(track = %self.track, chunk = index, %error, "chunk load failed");
                self.events.publish(TrackEvent::LoadError {
                    track: self.track,
                    error: error.to_string(),
                });
                Err(error)
            }
        }
    }

    async fn try_load_chunk(&self, index: usize, buffered: Duration) -> SmoothResult<Allocation> {
        let previous = self.current_format();
        let format = self.chunk_source.select_format(previous, buffered)?;
        if previous != Some(format) {
            debug!(track = %self.track, from = ?previous, to = format, "format changed");
            self.events.publish(TrackEvent::FormatChanged {
                track: self.track,
                from: previous,
                to: format,
            });
            *self.current_format.lock() = Some(format);
        }

        let url = self.chunk_source.chunk_url(format, index)?;
        self.events.publish(TrackEvent::LoadStarted {
            track: self.track,
            chunk_index: index,
            format_index: format,
        });

        let data = self.chunk_source.data_source().fetch(url).await?;
        self.load_control.allocate(self.loader, data)
    }
}

impl Drop for ChunkSampleSource {
    fn drop(&mut self) {
        self.load_control.unregister(self.loader);
    }
}

/// Outcome of protected-content handling for an assembled source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProtectionStatus {
    /// The manifest carries no protection element.
    Clear,
    /// Protected content, but no session was negotiated.
    Unnegotiated,
    Negotiated(DrmSession),
}

/// The assembled multi-track source handed to the player.
pub struct MultiSampleSource {
    tracks: Vec<ChunkSampleSource>,
    protection: ProtectionStatus,
}

impl fmt::Debug for MultiSampleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiSampleSource")
            .field(
                "tracks",
                &self.tracks.iter().map(|t| t.track()).collect::<Vec<_>>(),
            )
            .field("protection", &self.protection)
            .finish()
    }
}

impl MultiSampleSource {
    /// Combine pipelines. Their order is preserved.
    pub fn new(tracks: Vec<ChunkSampleSource>, protection: ProtectionStatus) -> Self {
        Self { tracks, protection }
    }

    pub fn tracks(&self) -> &[ChunkSampleSource] {
        &self.tracks
    }

    pub fn track(&self, role: TrackRole) -> Option<&ChunkSampleSource> {
        self.tracks.iter().find(|t| t.track() == role)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn protection(&self) -> &ProtectionStatus {
        &self.protection
    }

    /// Load control shared by all pipelines.
    pub fn load_control(&self) -> Option<&Arc<DefaultLoadControl>> {
        self.tracks.first().map(ChunkSampleSource::load_control)
    }
}
