//! Live updates from the server.
//!
//! - [`RealtimeChannel`]: connection lifecycle (ticket, connect, reconnect)
//! - [`EventDispatcher`]: fans decoded events out to the view stores
//! - [`RealtimeConnector`]: socket seam, [`WebSocketConnector`] for real use

pub mod channel;
pub mod connector;
pub mod dispatch;

pub use channel::{ChannelState, RealtimeChannel};
pub use connector::{FrameStream, RealtimeConnector, WebSocketConnector};
pub use dispatch::EventDispatcher;
