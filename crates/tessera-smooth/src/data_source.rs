use std::{fmt, sync::Arc, time::Instant};

use bytes::Bytes;
use tessera_abr::{BandwidthMeter, ThroughputSample};
use tessera_net::{Headers, Net};
use tracing::trace;
use url::Url;

use crate::SmoothResult;

/// Per-track HTTP data source.
///
/// Shares the transport with the other tracks of a source; every completed
/// transfer is reported to the bandwidth meter.
#[derive(Clone)]
pub struct HttpDataSource {
    net: Arc<dyn Net>,
    user_agent: String,
    meter: Arc<dyn BandwidthMeter>,
}

impl fmt::Debug for HttpDataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpDataSource")
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

impl HttpDataSource {
    pub fn new(
        net: Arc<dyn Net>,
        user_agent: impl Into<String>,
        meter: Arc<dyn BandwidthMeter>,
    ) -> Self {
        Self {
            net,
            user_agent: user_agent.into(),
            meter,
        }
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn bandwidth_meter(&self) -> &Arc<dyn BandwidthMeter> {
        &self.meter
    }

    pub async fn fetch(&self, url: Url) -> SmoothResult<Bytes> {
        let mut headers = Headers::new();
        headers.insert("User-Agent", self.user_agent.as_str());

        let started = Instant::now();
        let bytes = self.net.get_bytes(url.clone(), Some(headers)).await?;
        let elapsed = started.elapsed();

        trace!(%url, bytes = bytes.len(), ?elapsed, "chunk fetched");
        self.meter
            .on_transfer(ThroughputSample::network(bytes.len() as u64, elapsed));
        Ok(bytes)
    }
}
