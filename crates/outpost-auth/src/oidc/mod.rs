//! OIDC relying-party machinery for the callback flow.
//!
//! - [`state`] - Anti-forgery login state validation
//! - [`exchange`] - Authorization-code token exchange
//! - [`verify`] - Bearer token signature and claims verification
//! - [`jwks`] - Provider JWKS fetching and caching
//! - [`discovery`] - Provider metadata discovery
//! - [`claims`] - Typed claims model and normalization

pub mod claims;
pub mod discovery;
pub mod exchange;
pub mod jwks;
pub mod state;
pub mod verify;
