use thiserror::Error;

/// Protected-content errors.
#[derive(Debug, Error)]
pub enum DrmError {
    #[error("Unsupported protection scheme: {0}")]
    UnsupportedScheme(String),

    #[error("DRM session failed: {0}")]
    SessionFailed(String),

    #[error("Key request failed: {0}")]
    KeyRequest(String),
}

pub type DrmResult<T> = Result<T, DrmError>;
