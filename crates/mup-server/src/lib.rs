//! MUP Server: session engine for the Model UI Protocol.
//!
//! This library negotiates capabilities with UI clients, tracks their
//! sessions and security contexts, dispatches UI events to named server
//! handlers, and applies batches of component operations to a shared
//! registry. Envelopes travel over WebSocket, stdio or in-memory channels.

pub mod batch;
pub mod config;
pub mod context;
pub mod handlers;
pub mod protocol;
pub mod session;
pub mod transport;
pub mod types;

pub use config::ServerConfig;
pub use context::ServerContext;
pub use handlers::{DispatchTable, EventHandler, HandlerContext};
pub use protocol::ProtocolHandler;
pub use session::SessionManager;
#[cfg(feature = "stdio")]
pub use transport::StdioTransport;
#[cfg(feature = "ws")]
pub use transport::WebSocketTransport;
