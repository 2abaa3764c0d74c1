use meshroom_core::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RoomError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("room has been torn down")]
    Closed,
}
