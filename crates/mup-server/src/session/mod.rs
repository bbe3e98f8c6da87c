//! Session management: negotiated clients and their security contexts.

pub mod manager;
pub mod security;

pub use manager::{ClientSession, SessionManager, ANONYMOUS_USER};
pub use security::{SecurityContext, SecurityContextStore};
