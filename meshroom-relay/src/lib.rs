//! WebSocket relay exposing a [`MemoryStore`](meshroom_core::MemoryStore)
//! as a shared presence registry and relay mailbox.

mod relay_service;
mod ws_handler;

pub use relay_service::{RelayConfig, RelayService, RelaySocket};
pub use ws_handler::{router, run, serve, ws_handler};
