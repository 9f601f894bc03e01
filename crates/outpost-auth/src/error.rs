//! Error types for the callback flow.
//!
//! Every failure before session persistence is "soft": the orchestrator logs
//! it and answers with a plain redirect so that provider diagnostic text is
//! never leaked into a response body. Session persistence failure is the one
//! hard error, surfaced as an explicit client error because at that point the
//! identity has already been verified.

/// Errors that can occur while redeeming an authorization-code callback.
#[derive(Debug, thiserror::Error)]
pub enum CallbackError {
    /// The callback carried no authorization code.
    #[error("callback request carried no authorization code")]
    MissingCode,

    /// The token exchange with the provider failed.
    #[error("token exchange failed: {0}")]
    ExchangeFailed(String),

    /// The bearer token failed cryptographic verification.
    #[error("token verification failed: {0}")]
    VerificationFailed(String),

    /// The verified claims payload could not be decoded into the typed model.
    #[error("failed to decode claims: {0}")]
    ClaimsDecodeFailed(String),

    /// The session record could not be persisted.
    #[error("failed to persist session: {0}")]
    SessionPersistFailed(String),
}

impl CallbackError {
    /// Creates an `ExchangeFailed` error from any displayable cause.
    #[must_use]
    pub fn exchange(cause: impl std::fmt::Display) -> Self {
        Self::ExchangeFailed(cause.to_string())
    }

    /// Creates a `VerificationFailed` error from any displayable cause.
    #[must_use]
    pub fn verification(cause: impl std::fmt::Display) -> Self {
        Self::VerificationFailed(cause.to_string())
    }

    /// Creates a `ClaimsDecodeFailed` error from any displayable cause.
    #[must_use]
    pub fn claims_decode(cause: impl std::fmt::Display) -> Self {
        Self::ClaimsDecodeFailed(cause.to_string())
    }

    /// Creates a `SessionPersistFailed` error from any displayable cause.
    #[must_use]
    pub fn session_persist(cause: impl std::fmt::Display) -> Self {
        Self::SessionPersistFailed(cause.to_string())
    }

    /// Returns `true` if this failure is handled by redirecting without a
    /// session rather than by an explicit error response.
    #[must_use]
    pub fn is_soft(&self) -> bool {
        !matches!(self, Self::SessionPersistFailed(_))
    }
}
