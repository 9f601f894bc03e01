//! Axum HTTP handlers for the outpost auth endpoints.

pub mod callback;

pub use callback::{CallbackParams, CallbackState, callback_handler};
