use std::{fmt, sync::Arc};

use tessera_drm::MediaDrmCallback;
use tessera_net::NetOptions;

pub const DEFAULT_USER_AGENT: &str = concat!("tessera/", env!("CARGO_PKG_VERSION"));

/// Source configuration.
#[derive(Clone)]
pub struct SourceConfig {
    /// Manifest URL. `/Manifest` is appended when missing.
    pub url: String,
    pub user_agent: String,
    pub net: NetOptions,
    /// Passed to the protection handler for protected content.
    pub drm_callback: Option<Arc<dyn MediaDrmCallback>>,
}

impl fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceConfig")
            .field("url", &self.url)
            .field("user_agent", &self.user_agent)
            .field("net", &self.net)
            .field("drm_callback", &self.drm_callback.is_some())
            .finish()
    }
}

impl SourceConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            net: NetOptions::default(),
            drm_callback: None,
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_net(mut self, net: NetOptions) -> Self {
        self.net = net;
        self
    }

    pub fn with_drm_callback(mut self, callback: Arc<dyn MediaDrmCallback>) -> Self {
        self.drm_callback = Some(callback);
        self
    }
}
