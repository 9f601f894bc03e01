//! # outpost-session-memory
//!
//! In-memory backends for the storage traits in `outpost-auth`: a session
//! store and a login-state store. Suitable for single-process deployments and
//! tests; a multi-instance outpost wants a shared backend behind the same
//! traits.

pub mod session;
pub mod state;

pub use session::MemorySessionStore;
pub use state::MemoryLoginStateStore;
