//! Shared model and store contracts for meshroom.
//!
//! The presence registry and relay mailbox are the only channels clients use
//! to find each other and exchange session descriptions; [`MemoryStore`] is an
//! in-process implementation of both.

mod error;
pub mod model;
pub mod store;
pub mod traits;
pub mod utils;

pub use error::StoreError;
pub use model::*;
pub use store::{MemoryStore, StoreConnection, Subscription};
pub use traits::{PresenceRegistry, RelayMailbox};
