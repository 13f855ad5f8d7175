//! Integration tests for the realtime client.
//!
//! - `harness.rs`   - Fake connector, fake server peer and recording handlers
//! - `routing.rs`   - Message routing to group handlers
//! - `commands.rs`  - Subscribe / unsubscribe commands and replay on open
//! - `reconnect.rs` - Backoff schedule, attempt ceiling and cancellation
//! - `lifecycle.rs` - Connect / disconnect semantics and callbacks
//! - `websocket.rs` - The tungstenite connector against a loopback server

pub(crate) mod harness;

#[allow(unused_imports)]
pub use harness::{FakeConnector, FakePeer, Recorder, TestHarness};
