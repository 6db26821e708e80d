use thiserror::Error;

/// Manifest, transport and pipeline errors.
#[derive(Debug, Error)]
pub enum SmoothError {
    #[error("Network error: {0}")]
    Net(#[from] tessera_net::NetError),

    #[error("Manifest parsing error: {0}")]
    ManifestParse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("No manifest loaded")]
    NoManifest,

    #[error("Stream not found: {0}")]
    StreamNotFound(String),

    #[error("Track {track} not found in stream {stream}")]
    TrackNotFound { stream: String, track: usize },

    #[error("Chunk {chunk} not found in stream {stream}")]
    ChunkNotFound { stream: String, chunk: usize },

    #[error("Track buffer full: {requested} bytes requested, {available} available")]
    BufferFull { requested: usize, available: usize },

    #[error("Loader {0} is not registered with the load control")]
    UnknownLoader(usize),
}

pub type SmoothResult<T> = Result<T, SmoothError>;

/// Terminal failure of one source build.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Manifest load failed: {0}")]
    Manifest(#[from] SmoothError),

    #[error("Protected content setup failed: {0}")]
    Protection(#[from] tessera_drm::DrmError),
}
