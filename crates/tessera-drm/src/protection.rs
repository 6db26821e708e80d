use std::fmt;

use bytes::Bytes;
use tracing::warn;

use crate::DrmResult;

/// Protection header from a manifest.
#[derive(Clone, PartialEq, Eq)]
pub struct ProtectionElement {
    /// DRM system id.
    pub system_id: [u8; 16],
    /// Opaque scheme-specific initialization data.
    pub data: Bytes,
}

impl ProtectionElement {
    pub fn new(system_id: [u8; 16], data: Bytes) -> Self {
        Self { system_id, data }
    }

    /// System id in canonical 8-4-4-4-12 hex form.
    pub fn system_id_string(&self) -> String {
        let hex: String = self.system_id.iter().map(|b| format!("{b:02x}")).collect();
        format!(
            "{}-{}-{}-{}-{}",
            &hex[0..8],
            &hex[8..12],
            &hex[12..16],
            &hex[16..20],
            &hex[20..32]
        )
    }
}

impl fmt::Debug for ProtectionElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtectionElement")
            .field("system_id", &self.system_id_string())
            .field("data_len", &self.data.len())
            .finish()
    }
}

/// Opened protected-content session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DrmSession {
    pub system_id: [u8; 16],
    pub session_id: Bytes,
}

/// Host-provided transport for license and provisioning requests.
pub trait MediaDrmCallback: Send + Sync {
    /// Execute a provisioning request and return the response body.
    fn execute_provision_request(&self, system_id: &[u8; 16], request: &[u8]) -> DrmResult<Bytes>;

    /// Execute a license key request and return the response body.
    fn execute_key_request(&self, system_id: &[u8; 16], request: &[u8]) -> DrmResult<Bytes>;
}

/// Strategy for establishing a session for protected content.
pub trait ProtectionHandler: Send + Sync {
    /// Open a session for `element`.
    ///
    /// `Ok(None)` means the content is used without a session.
    fn open_session(
        &self,
        element: &ProtectionElement,
        callback: Option<&dyn MediaDrmCallback>,
    ) -> DrmResult<Option<DrmSession>>;
}

/// Handler that never negotiates a session.
#[derive(Clone, Copy, Debug, Default)]
pub struct DeferredProtection;

impl ProtectionHandler for DeferredProtection {
    fn open_session(
        &self,
        element: &ProtectionElement,
        _callback: Option<&dyn MediaDrmCallback>,
    ) -> DrmResult<Option<DrmSession>> {
        warn!(
            system_id = %element.system_id_string(),
            "protected content: session negotiation is not supported, continuing without one"
        );
        Ok(None)
    }
}
