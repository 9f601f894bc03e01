//! Storage traits for the callback core.

pub mod session;

pub use session::{SessionRecord, SessionStore, SessionStoreError};
