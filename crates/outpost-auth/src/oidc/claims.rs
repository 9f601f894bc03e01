//! Typed claims model and normalization.
//!
//! The verifier yields a raw JSON payload; this module deserializes it into
//! the outpost's typed shape and enforces one invariant: the proxy-specific
//! sub-structure is always present on [`IdentityClaims`], synthesized empty
//! when the provider omits it, so downstream consumers never null-check it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::CallbackResult;
use crate::error::CallbackError;
use crate::oidc::exchange::BearerToken;

/// Proxy-specific claims issued by the provider for this outpost.
///
/// All fields are optional on the wire; an instance with every field unset is
/// the synthesized default used when the provider sends no proxy claims.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProxyClaims {
    /// Arbitrary user attributes forwarded to the upstream application.
    #[serde(default)]
    pub user_attributes: HashMap<String, serde_json::Value>,

    /// Per-user upstream override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_override: Option<String>,

    /// Host header override for upstream requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_header: Option<String>,

    /// Whether the user is a superuser on the provider side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_superuser: Option<bool>,
}

/// Claims as they appear in the verified token payload.
#[derive(Debug, Clone, Deserialize)]
pub struct RawClaims {
    /// Subject identifier.
    pub sub: String,

    /// Expiration time (Unix timestamp).
    pub exp: i64,

    /// Audience (string or array on the wire).
    #[serde(default, deserialize_with = "deserialize_audience")]
    pub aud: Vec<String>,

    /// User's email address.
    #[serde(default)]
    pub email: Option<String>,

    /// Whether the email is verified.
    #[serde(default)]
    pub email_verified: Option<bool>,

    /// User's full name.
    #[serde(default)]
    pub name: Option<String>,

    /// User's preferred username.
    #[serde(default)]
    pub preferred_username: Option<String>,

    /// Group memberships.
    #[serde(default)]
    pub groups: Vec<String>,

    /// Provider session identifier.
    #[serde(default)]
    pub sid: Option<String>,

    /// Proxy-specific claims, absent for providers without them.
    #[serde(default)]
    pub proxy: Option<ProxyClaims>,

    /// Extra claims not defined in the struct.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Normalized, verified identity claims carried into the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// Subject identifier.
    pub sub: String,

    /// Expiration time of the identity token (Unix timestamp). The session
    /// lifetime derives from this.
    pub exp: i64,

    /// User's email address.
    pub email: Option<String>,

    /// Whether the email is verified.
    pub email_verified: Option<bool>,

    /// User's full name.
    pub name: Option<String>,

    /// User's preferred username.
    pub preferred_username: Option<String>,

    /// Group memberships.
    pub groups: Vec<String>,

    /// Provider session identifier.
    pub sid: Option<String>,

    /// Proxy-specific claims. Always present, possibly empty.
    pub proxy: ProxyClaims,

    /// The raw bearer token, carried for downstream forwarding.
    pub raw_token: String,
}

/// Normalizes a verified claims payload into [`IdentityClaims`].
///
/// # Errors
///
/// Returns [`CallbackError::ClaimsDecodeFailed`] if the payload does not
/// match the expected shape.
pub fn normalize(
    payload: serde_json::Value,
    bearer: &BearerToken,
) -> CallbackResult<IdentityClaims> {
    let raw: RawClaims =
        serde_json::from_value(payload).map_err(CallbackError::claims_decode)?;

    Ok(IdentityClaims {
        sub: raw.sub,
        exp: raw.exp,
        email: raw.email,
        email_verified: raw.email_verified,
        name: raw.name,
        preferred_username: raw.preferred_username,
        groups: raw.groups,
        sid: raw.sid,
        proxy: raw.proxy.unwrap_or_default(),
        raw_token: bearer.as_str().to_string(),
    })
}

/// Custom deserializer for audience which can be a string or an array.
fn deserialize_audience<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => Ok(vec![s]),
        OneOrMany::Many(v) => Ok(v),
    }
}
