//! SmoothStreaming manifest model.
//!
//! The wire format is handled by a [`ManifestParser`] supplied by the host;
//! this module only describes the parsed result.

use std::time::Duration;

use tessera_abr::Format;
use tessera_drm::ProtectionElement;
use tessera_events::TrackRole;
use url::Url;

use crate::{SmoothError, SmoothResult};

/// Ticks per second used when a manifest does not specify a timescale.
pub const DEFAULT_TIMESCALE: u64 = 10_000_000;

/// Converts raw manifest bytes into a [`SmoothStreamingManifest`].
pub trait ManifestParser: Send + Sync {
    fn parse(&self, url: &Url, data: &[u8]) -> SmoothResult<SmoothStreamingManifest>;
}

impl<F> ManifestParser for F
where
    F: Fn(&Url, &[u8]) -> SmoothResult<SmoothStreamingManifest> + Send + Sync,
{
    fn parse(&self, url: &Url, data: &[u8]) -> SmoothResult<SmoothStreamingManifest> {
        self(url, data)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Video,
    Audio,
    Text,
    Unknown,
}

impl From<TrackRole> for StreamKind {
    fn from(role: TrackRole) -> Self {
        match role {
            TrackRole::Video => Self::Video,
            TrackRole::Audio => Self::Audio,
            TrackRole::Text => Self::Text,
        }
    }
}

/// One quality level of a stream element.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrackElement {
    pub bitrate: u64,
    pub fourcc: String,
    pub max_width: Option<u32>,
    pub max_height: Option<u32>,
    pub sampling_rate: Option<u32>,
    pub channels: Option<u16>,
    pub language: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamElement {
    pub kind: StreamKind,
    pub name: Option<String>,
    /// Ticks per second for chunk times.
    pub timescale: u64,
    /// Chunk URL template, relative to the manifest URL.
    pub url_template: String,
    pub tracks: Vec<TrackElement>,
    /// Chunk start times in ticks.
    pub chunk_start_times: Vec<u64>,
    /// Duration of the last chunk in ticks.
    pub last_chunk_duration: u64,
}

impl StreamElement {
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("{:?}", self.kind).to_ascii_lowercase())
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_start_times.len()
    }

    pub fn chunk_start_time(&self, chunk: usize) -> Option<Duration> {
        self.chunk_start_times
            .get(chunk)
            .map(|&t| ticks_to_duration(t, self.timescale))
    }

    /// Duration of chunk `chunk`, derived from the next chunk's start time.
    pub fn chunk_duration(&self, chunk: usize) -> Option<Duration> {
        let start = *self.chunk_start_times.get(chunk)?;
        let ticks = match self.chunk_start_times.get(chunk + 1) {
            Some(&next) => next.saturating_sub(start),
            None => self.last_chunk_duration,
        };
        Some(ticks_to_duration(ticks, self.timescale))
    }

    /// End of the last chunk.
    pub fn end_time(&self) -> Duration {
        let end = self
            .chunk_start_times
            .last()
            .map_or(0, |&t| t.saturating_add(self.last_chunk_duration));
        ticks_to_duration(end, self.timescale)
    }

    /// Index of the chunk containing `position`, clamped to the available chunks.
    pub fn chunk_index(&self, position: Duration) -> Option<usize> {
        if self.chunk_start_times.is_empty() {
            return None;
        }
        let idx = self
            .chunk_start_times
            .partition_point(|&t| ticks_to_duration(t, self.timescale) <= position);
        Some(idx.saturating_sub(1))
    }

    /// Selectable formats for adaptive evaluation.
    pub fn formats(&self) -> Vec<Format> {
        self.tracks
            .iter()
            .enumerate()
            .map(|(index, track)| Format::new(index, track.bitrate))
            .collect()
    }

    /// Request URL for chunk `chunk` of quality level `track`.
    pub fn build_request_url(&self, base: &Url, track: usize, chunk: usize) -> SmoothResult<Url> {
        let bitrate = self
            .tracks
            .get(track)
            .map(|t| t.bitrate)
            .ok_or_else(|| SmoothError::TrackNotFound {
                stream: self.display_name(),
                track,
            })?;
        let start = self
            .chunk_start_times
            .get(chunk)
            .ok_or_else(|| SmoothError::ChunkNotFound {
                stream: self.display_name(),
                chunk,
            })?;

        let relative = self
            .url_template
            .replace("{bitrate}", &bitrate.to_string())
            .replace("{Bitrate}", &bitrate.to_string())
            .replace("{start time}", &start.to_string())
            .replace("{start_time}", &start.to_string());

        base.join(&relative)
            .map_err(|e| SmoothError::InvalidUrl(format!("{relative}: {e}")))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SmoothStreamingManifest {
    pub major_version: u32,
    pub minor_version: u32,
    pub timescale: u64,
    /// Presentation duration in ticks, 0 when unknown (live).
    pub duration: u64,
    /// DVR window length in ticks, 0 when unbounded.
    pub dvr_window_length: u64,
    pub lookahead_count: u32,
    pub is_live: bool,
    pub protection: Option<ProtectionElement>,
    pub stream_elements: Vec<StreamElement>,
}

impl Default for SmoothStreamingManifest {
    fn default() -> Self {
        Self {
            major_version: 2,
            minor_version: 0,
            timescale: DEFAULT_TIMESCALE,
            duration: 0,
            dvr_window_length: 0,
            lookahead_count: 0,
            is_live: false,
            protection: None,
            stream_elements: Vec::new(),
        }
    }
}

impl SmoothStreamingManifest {
    /// First stream element of the given kind.
    pub fn stream_element(&self, kind: StreamKind) -> Option<&StreamElement> {
        self.stream_elements.iter().find(|e| e.kind == kind)
    }

    pub fn duration(&self) -> Option<Duration> {
        (self.duration > 0).then(|| ticks_to_duration(self.duration, self.timescale))
    }

    pub fn is_protected(&self) -> bool {
        self.protection.is_some()
    }
}

pub(crate) fn ticks_to_duration(ticks: u64, timescale: u64) -> Duration {
    let timescale = if timescale == 0 {
        DEFAULT_TIMESCALE
    } else {
        timescale
    };
    let micros = u128::from(ticks) * 1_000_000 / u128::from(timescale);
    Duration::from_micros(u64::try_from(micros).unwrap_or(u64::MAX))
}

#[cfg(test)]
pub(crate) mod tests {
    use rstest::rstest;

    use super::*;

    pub(crate) fn video_element() -> StreamElement {
        StreamElement {
            kind: StreamKind::Video,
            name: Some("video".into()),
            timescale: DEFAULT_TIMESCALE,
            url_template: "QualityLevels({bitrate})/Fragments(video={start time})".into(),
            tracks: vec![
                TrackElement {
                    bitrate: 350_000,
                    fourcc: "H264".into(),
                    max_width: Some(320),
                    max_height: Some(180),
                    ..Default::default()
                },
                TrackElement {
                    bitrate: 1_500_000,
                    fourcc: "H264".into(),
                    max_width: Some(1280),
                    max_height: Some(720),
                    ..Default::default()
                },
            ],
            chunk_start_times: vec![0, 20_000_000, 40_000_000],
            last_chunk_duration: 20_000_000,
        }
    }

    #[test]
    fn request_url_substitutes_template() {
        let base = Url::parse("http://x/video.ism/Manifest").unwrap();
        let url = video_element().build_request_url(&base, 1, 2).unwrap();
        assert_eq!(
            url.as_str(),
            "http://x/video.ism/QualityLevels(1500000)/Fragments(video=40000000)"
        );
    }

    #[test]
    fn request_url_rejects_unknown_track_and_chunk() {
        let base = Url::parse("http://x/video.ism/Manifest").unwrap();
        let element = video_element();
        assert!(matches!(
            element.build_request_url(&base, 5, 0),
            Err(SmoothError::TrackNotFound { track: 5, .. })
        ));
        assert!(matches!(
            element.build_request_url(&base, 0, 9),
            Err(SmoothError::ChunkNotFound { chunk: 9, .. })
        ));
    }

    #[rstest]
    #[case(0, Some(Duration::from_secs(2)))]
    #[case(2, Some(Duration::from_secs(2)))]
    #[case(3, None)]
    fn chunk_durations(#[case] chunk: usize, #[case] expected: Option<Duration>) {
        assert_eq!(video_element().chunk_duration(chunk), expected);
    }

    #[rstest]
    #[case(Duration::ZERO, 0)]
    #[case(Duration::from_millis(1999), 0)]
    #[case(Duration::from_secs(2), 1)]
    #[case(Duration::from_secs(60), 2)]
    fn chunk_index_for_position(#[case] position: Duration, #[case] expected: usize) {
        assert_eq!(video_element().chunk_index(position), Some(expected));
    }

    #[test]
    fn end_time_covers_last_chunk() {
        assert_eq!(video_element().end_time(), Duration::from_secs(6));
    }

    #[test]
    fn formats_follow_track_order() {
        let formats = video_element().formats();
        assert_eq!(
            formats,
            vec![Format::new(0, 350_000), Format::new(1, 1_500_000)]
        );
    }

    #[test]
    fn stream_lookup_by_kind() {
        let manifest = SmoothStreamingManifest {
            duration: 60 * DEFAULT_TIMESCALE,
            stream_elements: vec![video_element()],
            ..Default::default()
        };
        assert!(manifest.stream_element(StreamKind::Video).is_some());
        assert!(manifest.stream_element(StreamKind::Audio).is_none());
        assert_eq!(manifest.duration(), Some(Duration::from_secs(60)));
        assert!(!manifest.is_protected());
    }
}
