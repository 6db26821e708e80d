use std::{fmt, sync::Arc, time::Duration};

use tessera_abr::FormatEvaluator;
use url::Url;

use crate::{
    SmoothError, SmoothResult,
    data_source::HttpDataSource,
    fetcher::ManifestFetcher,
    manifest::{StreamElement, StreamKind},
};

/// Chunk selection for one stream element of a SmoothStreaming manifest.
///
/// Reads the fetcher's current manifest on every call, so a refreshed live
/// manifest is picked up without rebuilding the source.
pub struct SmoothStreamingChunkSource {
    fetcher: Arc<ManifestFetcher>,
    kind: StreamKind,
    data_source: HttpDataSource,
    evaluator: Option<Box<dyn FormatEvaluator>>,
    live_edge_latency: Duration,
}

impl fmt::Debug for SmoothStreamingChunkSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmoothStreamingChunkSource")
            .field("url", &self.fetcher.url().as_str())
            .field("kind", &self.kind)
            .field("adaptive", &self.evaluator.is_some())
            .field("live_edge_latency", &self.live_edge_latency)
            .finish()
    }
}

impl SmoothStreamingChunkSource {
    pub fn new(
        fetcher: Arc<ManifestFetcher>,
        kind: StreamKind,
        data_source: HttpDataSource,
        evaluator: Option<Box<dyn FormatEvaluator>>,
        live_edge_latency: Duration,
    ) -> Self {
        Self {
            fetcher,
            kind,
            data_source,
            evaluator,
            live_edge_latency,
        }
    }

    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    pub fn fetcher(&self) -> &Arc<ManifestFetcher> {
        &self.fetcher
    }

    pub fn data_source(&self) -> &HttpDataSource {
        &self.data_source
    }

    pub fn has_adaptive_evaluator(&self) -> bool {
        self.evaluator.is_some()
    }

    pub fn live_edge_latency(&self) -> Duration {
        self.live_edge_latency
    }

    /// Stream element of this source's kind in the current manifest.
    pub fn stream_element(&self) -> SmoothResult<StreamElement> {
        let manifest = self.fetcher.manifest().ok_or(SmoothError::NoManifest)?;
        manifest
            .stream_element(self.kind)
            .cloned()
            .ok_or_else(|| SmoothError::StreamNotFound(format!("{:?}", self.kind)))
    }

    /// Playback start for live content: the window end minus the live-edge latency.
    ///
    /// `None` for on-demand content or when no stream of this kind exists.
    pub fn live_start_position(&self) -> Option<Duration> {
        let manifest = self.fetcher.manifest()?;
        if !manifest.is_live {
            return None;
        }
        let element = manifest.stream_element(self.kind)?;
        Some(element.end_time().saturating_sub(self.live_edge_latency))
    }

    /// Quality level index for the next chunk.
    ///
    /// Without an evaluator the first quality level is used.
    pub fn select_format(&self, current: Option<usize>, buffered: Duration) -> SmoothResult<usize> {
        let element = self.stream_element()?;
        if element.tracks.is_empty() {
            return Err(SmoothError::TrackNotFound {
                stream: element.display_name(),
                track: 0,
            });
        }

        let Some(evaluator) = &self.evaluator else {
            return Ok(0);
        };
        Ok(evaluator
            .evaluate(&element.formats(), current, buffered)
            .map_or(0, |evaluation| evaluation.format_index))
    }

    pub fn chunk_url(&self, track: usize, chunk: usize) -> SmoothResult<Url> {
        self.stream_element()?
            .build_request_url(self.fetcher.url(), track, chunk)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use bytes::Bytes;
    use rstest::rstest;
    use tessera_abr::{DefaultBandwidthMeter, Evaluation, EvaluationReason, Format};
    use tessera_net::{Headers, Net, NetError};

    use super::*;
    use crate::manifest::{SmoothStreamingManifest, tests::video_element};

    struct LiveFlagNet(bool);

    #[async_trait]
    impl Net for LiveFlagNet {
        async fn get_bytes(&self, _url: Url, _headers: Option<Headers>) -> Result<Bytes, NetError> {
            Ok(Bytes::from_static(if self.0 { b"live" } else { b"vod" }))
        }
    }

    struct Highest;

    impl FormatEvaluator for Highest {
        fn evaluate(
            &self,
            formats: &[Format],
            _current: Option<usize>,
            _buffered: Duration,
        ) -> Option<Evaluation> {
            formats.iter().max_by_key(|f| f.bitrate_bps).map(|f| Evaluation {
                format_index: f.index,
                reason: EvaluationReason::Initial,
                changed: true,
            })
        }
    }

    async fn loaded_fetcher(live: bool) -> Arc<ManifestFetcher> {
        let parser = |_url: &Url, data: &[u8]| -> SmoothResult<SmoothStreamingManifest> {
            Ok(SmoothStreamingManifest {
                is_live: data == b"live",
                stream_elements: vec![video_element()],
                ..Default::default()
            })
        };
        let fetcher = Arc::new(ManifestFetcher::new(
            Url::parse("http://x/video.ism/Manifest").unwrap(),
            "ua",
            Arc::new(LiveFlagNet(live)),
            Arc::new(parser),
        ));
        fetcher.load().await.unwrap();
        fetcher
    }

    fn source(
        fetcher: Arc<ManifestFetcher>,
        kind: StreamKind,
        evaluator: Option<Box<dyn FormatEvaluator>>,
        latency: Duration,
    ) -> SmoothStreamingChunkSource {
        let data_source = HttpDataSource::new(
            Arc::new(LiveFlagNet(false)),
            "ua",
            Arc::new(DefaultBandwidthMeter::new()),
        );
        SmoothStreamingChunkSource::new(fetcher, kind, data_source, evaluator, latency)
    }

    #[rstest]
    #[case(true, Duration::from_secs(1), Some(Duration::from_secs(5)))]
    #[case(true, Duration::from_secs(30), Some(Duration::ZERO))]
    #[case(false, Duration::from_secs(1), None)]
    #[tokio::test]
    async fn live_start_position(
        #[case] live: bool,
        #[case] latency: Duration,
        #[case] expected: Option<Duration>,
    ) {
        let source = source(loaded_fetcher(live).await, StreamKind::Video, None, latency);
        assert_eq!(source.live_start_position(), expected);
    }

    #[tokio::test]
    async fn fixed_selection_uses_first_quality_level() {
        let source = source(
            loaded_fetcher(false).await,
            StreamKind::Video,
            None,
            Duration::ZERO,
        );
        assert!(!source.has_adaptive_evaluator());
        assert_eq!(source.select_format(Some(1), Duration::ZERO).unwrap(), 0);
    }

    #[tokio::test]
    async fn evaluator_drives_selection() {
        let source = source(
            loaded_fetcher(false).await,
            StreamKind::Video,
            Some(Box::new(Highest)),
            Duration::ZERO,
        );
        assert!(source.has_adaptive_evaluator());
        assert_eq!(source.select_format(None, Duration::ZERO).unwrap(), 1);
        assert_eq!(
            source.chunk_url(1, 1).unwrap().as_str(),
            "http://x/video.ism/QualityLevels(1500000)/Fragments(video=20000000)"
        );
    }

    #[tokio::test]
    async fn missing_stream_kind_is_reported() {
        let source = source(
            loaded_fetcher(false).await,
            StreamKind::Audio,
            None,
            Duration::ZERO,
        );
        assert!(matches!(
            source.select_format(None, Duration::ZERO),
            Err(SmoothError::StreamNotFound(_))
        ));
        assert_eq!(source.live_start_position(), None);
    }

    #[test]
    fn no_manifest_before_load() {
        let fetcher = Arc::new(ManifestFetcher::new(
            Url::parse("http://x/Manifest").unwrap(),
            "ua",
            Arc::new(LiveFlagNet(false)),
            Arc::new(|_: &Url, _: &[u8]| -> SmoothResult<SmoothStreamingManifest> {
                Ok(SmoothStreamingManifest::default())
            }),
        ));
        let source = source(fetcher, StreamKind::Video, None, Duration::ZERO);
        assert!(matches!(
            source.chunk_url(0, 0),
            Err(SmoothError::NoManifest)
        ));
    }
}
