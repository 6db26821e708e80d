//! Manifest fetch layer: network fetch + parse, and the single-shot fetch task.

use std::{fmt, sync::Arc};

use parking_lot::{Mutex, RwLock};
use tessera_net::{Headers, Net};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use url::Url;

use crate::{
    SmoothError, SmoothResult,
    context::CallbackContext,
    manifest::{ManifestParser, SmoothStreamingManifest},
};

/// Terminal result of one manifest fetch. Exactly one is produced per attempt.
#[derive(Debug)]
pub enum ManifestOutcome {
    Success(Arc<SmoothStreamingManifest>),
    Failure(SmoothError),
}

impl From<SmoothResult<Arc<SmoothStreamingManifest>>> for ManifestOutcome {
    fn from(result: SmoothResult<Arc<SmoothStreamingManifest>>) -> Self {
        match result {
            Ok(manifest) => Self::Success(manifest),
            Err(error) => Self::Failure(error),
        }
    }
}

/// Fetches and parses the manifest at one URL, keeping the last good copy.
///
/// Shared by the fetch task and every chunk source of the assembled source,
/// so live refreshes are visible to all tracks.
pub struct ManifestFetcher {
    url: Url,
    user_agent: String,
    net: Arc<dyn Net>,
    parser: Arc<dyn ManifestParser>,
    manifest: RwLock<Option<Arc<SmoothStreamingManifest>>>,
}

impl fmt::Debug for ManifestFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManifestFetcher")
            .field("url", &self.url.as_str())
            .field("user_agent", &self.user_agent)
            .field("loaded", &self.manifest.read().is_some())
            .finish_non_exhaustive()
    }
}

impl ManifestFetcher {
    pub fn new(
        url: Url,
        user_agent: impl Into<String>,
        net: Arc<dyn Net>,
        parser: Arc<dyn ManifestParser>,
    ) -> Self {
        Self {
            url,
            user_agent: user_agent.into(),
            net,
            parser,
            manifest: RwLock::new(None),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Last successfully loaded manifest.
    pub fn manifest(&self) -> Option<Arc<SmoothStreamingManifest>> {
        self.manifest.read().clone()
    }

    /// Fetch and parse the manifest, replacing the stored copy on success.
    pub async fn load(&self) -> SmoothResult<Arc<SmoothStreamingManifest>> {
        let mut headers = Headers::new();
        headers.insert("User-Agent", self.user_agent.as_str());

        debug!(url = %self.url, "fetching manifest");
        let bytes = self.net.get_bytes(self.url.clone(), Some(headers)).await?;
        let manifest = Arc::new(self.parser.parse(&self.url, &bytes)?);

        debug!(
            url = %self.url,
            bytes = bytes.len(),
            streams = manifest.stream_elements.len(),
            live = manifest.is_live,
            protected = manifest.is_protected(),
            "manifest loaded"
        );
        *self.manifest.write() = Some(manifest.clone());
        Ok(manifest)
    }

    /// Start a single fetch whose outcome is delivered to `callback` on `ctx`.
    pub fn single_load<F>(self: &Arc<Self>, ctx: CallbackContext, callback: F) -> ManifestFetchTask
    where
        F: FnOnce(ManifestOutcome) + Send + 'static,
    {
        let mut task = ManifestFetchTask::new(self.clone());
        task.start(ctx, callback);
        task
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchState {
    NotStarted,
    InFlight,
    Completed,
}

/// One asynchronous fetch-and-parse attempt.
///
/// Dropping the task detaches the fetch; its outcome is still posted, and it is
/// up to the callback to ignore it.
pub struct ManifestFetchTask {
    fetcher: Arc<ManifestFetcher>,
    state: Arc<Mutex<FetchState>>,
    join: Option<JoinHandle<()>>,
}

impl fmt::Debug for ManifestFetchTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManifestFetchTask")
            .field("url", &self.fetcher.url().as_str())
            .field("state", &self.state())
            .finish()
    }
}

impl ManifestFetchTask {
    pub fn new(fetcher: Arc<ManifestFetcher>) -> Self {
        Self {
            fetcher,
            state: Arc::new(Mutex::new(FetchState::NotStarted)),
            join: None,
        }
    }

    pub fn state(&self) -> FetchState {
        *self.state.lock()
    }

    pub fn fetcher(&self) -> &Arc<ManifestFetcher> {
        &self.fetcher
    }

    /// Spawn the fetch on the current tokio runtime.
    ///
    /// The outcome is posted to `ctx` exactly once. If the context's loop is gone
    /// by then, the outcome is abandoned and `callback` never runs.
    /// A task only starts once; later calls are ignored.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn start<F>(&mut self, ctx: CallbackContext, callback: F)
    where
        F: FnOnce(ManifestOutcome) + Send + 'static,
    {
        {
            let mut state = self.state.lock();
            if *state != FetchState::NotStarted {
                warn!(url = %self.fetcher.url(), state = ?*state, "fetch task already started");
                return;
            }
            *state = FetchState::InFlight;
        }

        let fetcher = self.fetcher.clone();
        let state = self.state.clone();
        self.join = Some(tokio::spawn(async move {
            let outcome = ManifestOutcome::from(fetcher.load().await);
            *state.lock() = FetchState::Completed;

            if !ctx.post(move || callback(outcome)) {
                debug!(url = %fetcher.url(), "callback context closed, manifest outcome abandoned");
            }
        }));
    }

    /// Wait for the spawned fetch to finish posting its outcome.
    pub async fn join(&mut self) {
        let Some(join) = self.join.take() else {
            return;
        };
        if let Err(e) = join.await {
            warn!(url = %self.fetcher.url(), error = %e, "manifest fetch task failed");
        }
    }
}
