use thiserror::Error;

/// All errors produced by tilawa-core.
///
/// The aligner and normalizer never fail; these cover construction, the
/// recognizer boundary and host I/O.
#[derive(Debug, Error)]
pub enum TilawaError {
    #[error("reference passage contains no words")]
    EmptyReference,

    #[error("microphone permission not granted")]
    PermissionDenied,

    #[error("speech recognizer failed to start: {0}")]
    RecognizerStart(String),

    #[error("session dispatcher is already running")]
    AlreadyRunning,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, TilawaError>;
