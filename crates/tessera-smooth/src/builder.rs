//! Cancelable source builds.
//!
//! A build fetches the manifest once and, unless canceled before the outcome
//! reaches the player's callback loop, assembles and publishes the
//! three-track source. Cancellation never aborts in-flight I/O; it only
//! guarantees that the outcome has no effect.

use std::{fmt, sync::Arc};

use tessera_drm::{DeferredProtection, DrmResult, MediaDrmCallback, ProtectionHandler};
use tessera_net::{HttpClient, Net, NetExt};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::{
    BuildError, SmoothError, SmoothResult,
    assembly::{AssemblyInputs, assemble},
    config::SourceConfig,
    fetcher::{ManifestFetchTask, ManifestFetcher, ManifestOutcome},
    manifest::{ManifestParser, SmoothStreamingManifest},
    player::Player,
    sample_source::ProtectionStatus,
    url::parse_manifest_url,
};

/// Parameters of one build, fixed when the build starts.
#[derive(Clone)]
pub struct BuildRequest {
    /// Normalized manifest URL.
    pub url: Url,
    pub user_agent: String,
    pub drm_callback: Option<Arc<dyn MediaDrmCallback>>,
}

impl fmt::Debug for BuildRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildRequest")
            .field("url", &self.url.as_str())
            .field("user_agent", &self.user_agent)
            .field("drm_callback", &self.drm_callback.is_some())
            .finish()
    }
}

/// Cancels one specific build.
#[derive(Clone, Debug)]
pub struct BuildHandle {
    token: CancellationToken,
}

impl BuildHandle {
    /// Discard this build's outcome if it has not been handled yet.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

struct ActiveBuild {
    token: CancellationToken,
    // Held so the build owns its fetch; dropping it detaches the fetch.
    _task: ManifestFetchTask,
}

/// Builds SmoothStreaming sources for a [`Player`].
pub struct SourceBuilder {
    url: Url,
    user_agent: String,
    drm_callback: Option<Arc<dyn MediaDrmCallback>>,
    net: Arc<dyn Net>,
    parser: Arc<dyn ManifestParser>,
    protection: Arc<dyn ProtectionHandler>,
    current: Option<ActiveBuild>,
}

impl fmt::Debug for SourceBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceBuilder")
            .field("url", &self.url.as_str())
            .field("user_agent", &self.user_agent)
            .field("building", &self.current.is_some())
            .finish_non_exhaustive()
    }
}

impl SourceBuilder {
    /// Normalize the manifest URL and set up the transport from `config.net`.
    pub fn new(config: SourceConfig, parser: Arc<dyn ManifestParser>) -> SmoothResult<Self> {
        let url = parse_manifest_url(&config.url)?;
        let net = HttpClient::new(config.net.clone())?
            .with_timeout(config.net.request_timeout)
            .with_retry(config.net.retry_policy.clone());

        Ok(Self {
            url,
            user_agent: config.user_agent,
            drm_callback: config.drm_callback,
            net: Arc::new(net),
            parser,
            protection: Arc::new(DeferredProtection),
            current: None,
        })
    }

    /// Replace the transport.
    pub fn with_net(mut self, net: Arc<dyn Net>) -> Self {
        self.net = net;
        self
    }

    pub fn with_protection(mut self, protection: Arc<dyn ProtectionHandler>) -> Self {
        self.protection = protection;
        self
    }

    pub fn manifest_url(&self) -> &Url {
        &self.url
    }

    /// Whether a build is held (running or finished, not canceled).
    pub fn is_building(&self) -> bool {
        self.current.is_some()
    }

    /// Start a build whose outcome is delivered to `player`.
    ///
    /// A build already held by this builder is canceled first.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn build_renderers<P: Player>(&mut self, player: Arc<P>) -> BuildHandle {
        self.cancel();

        let request = BuildRequest {
            url: self.url.clone(),
            user_agent: self.user_agent.clone(),
            drm_callback: self.drm_callback.clone(),
        };
        let token = CancellationToken::new();
        let fetcher = Arc::new(ManifestFetcher::new(
            request.url.clone(),
            request.user_agent.clone(),
            self.net.clone(),
            self.parser.clone(),
        ));
        debug!(url = %request.url, "build started");

        let ctx = player.callback_context();
        let build = AsyncBuild {
            request,
            fetcher: fetcher.clone(),
            net: self.net.clone(),
            protection: self.protection.clone(),
            player,
            token: token.clone(),
        };
        let task = fetcher.single_load(ctx, move |outcome| build.on_outcome(outcome));

        self.current = Some(ActiveBuild {
            token: token.clone(),
            _task: task,
        });
        BuildHandle { token }
    }

    /// Cancel the current build, if any. Safe to call at any time.
    pub fn cancel(&mut self) {
        if let Some(build) = self.current.take() {
            build.token.cancel();
            debug!(url = %self.url, "build canceled");
        }
    }
}

/// State of one build, consumed by its manifest outcome.
struct AsyncBuild<P> {
    request: BuildRequest,
    fetcher: Arc<ManifestFetcher>,
    net: Arc<dyn Net>,
    protection: Arc<dyn ProtectionHandler>,
    player: Arc<P>,
    token: CancellationToken,
}

impl<P: Player> AsyncBuild<P> {
    fn on_outcome(self, outcome: ManifestOutcome) {
        match outcome {
            ManifestOutcome::Success(manifest) => self.on_manifest_success(&manifest),
            ManifestOutcome::Failure(error) => self.on_manifest_failure(error),
        }
    }

    fn on_manifest_failure(self, error: SmoothError) {
        if self.token.is_cancelled() {
            debug!(url = %self.request.url, %error, "build canceled, dropping manifest error");
            return;
        }
        debug!(url = %self.request.url, %error, "build failed");
        self.player.on_build_error(BuildError::Manifest(error));
    }

    fn on_manifest_success(self, manifest: &SmoothStreamingManifest) {
        if self.token.is_cancelled() {
            debug!(url = %self.request.url, "build canceled, dropping manifest");
            return;
        }

        let protection = match self.resolve_protection(manifest) {
            Ok(protection) => protection,
            Err(error) => {
                debug!(url = %self.request.url, %error, "protection setup failed");
                self.player.on_build_error(BuildError::Protection(error));
                return;
            }
        };

        let source = assemble(
            AssemblyInputs {
                fetcher: &self.fetcher,
                net: &self.net,
                user_agent: &self.request.user_agent,
                meter: self.player.bandwidth_meter(),
                events: self.player.track_events(),
            },
            protection,
        );
        self.player.on_source_ready(source);
    }

    fn resolve_protection(&self, manifest: &SmoothStreamingManifest) -> DrmResult<ProtectionStatus> {
        let Some(element) = &manifest.protection else {
            return Ok(ProtectionStatus::Clear);
        };
        let session = self
            .protection
            .open_session(element, self.request.drm_callback.as_deref())?;
        Ok(session.map_or(ProtectionStatus::Unnegotiated, ProtectionStatus::Negotiated))
    }
}
