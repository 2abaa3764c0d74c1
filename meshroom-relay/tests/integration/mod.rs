//! Integration tests for meshroom-relay.
//!
//! - `relay_tests` - RelayClient talking to a live relay over WebSocket
