use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store connection is closed")]
    Disconnected,

    #[error("relay rejected request: {0}")]
    Remote(String),

    #[error("relay transport error: {0}")]
    Transport(String),

    #[error("malformed relay frame: {0}")]
    Codec(#[from] serde_json::Error),
}
