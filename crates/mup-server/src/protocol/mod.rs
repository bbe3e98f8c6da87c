//! MUP protocol layer: envelope codec, capability negotiation, message routing.

pub mod codec;
pub mod handler;
pub mod negotiation;

pub use handler::{ConnectionState, ProtocolHandler};
pub use negotiation::{NegotiationState, QueryType, SessionPhase};
