//! Unverified inspection of bearer tokens.
//!
//! The client never holds the signing key, so it only reads the payload
//! segment to learn when a token expires and who it belongs to. Anything
//! that cannot be decoded is treated as expired.

use std::collections::BTreeSet;

use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token is empty")]
    Empty,

    #[error("Malformed token: expected 3 segments, found {0}")]
    Malformed(usize),

    #[error("Token payload is not valid base64: {0}")]
    Encoding(String),

    #[error("Token payload is not valid JSON claims: {0}")]
    Payload(String),

    #[error("Token payload has no usable exp claim")]
    MissingExpiry,
}

/// Claims read from an access token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Claims {
    /// `sub`, falling back to `userId`
    pub subject: Option<String>,
    pub email: Option<String>,
    pub roles: BTreeSet<String>,
    #[cfg_attr(feature = "ts", ts(type = "string | null"))]
    pub issued_at: Option<DateTime<Utc>>,
    #[cfg_attr(feature = "ts", ts(type = "string"))]
    pub expires_at: DateTime<Utc>,
}

impl Claims {
    /// True if the token expires before `now + buffer`
    pub fn is_expired_at(&self, buffer: Duration, now: DateTime<Utc>) -> bool {
        self.expires_at < now + buffer
    }

    pub fn time_until_expiry(&self) -> Duration {
        self.expires_at - Utc::now()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
}

impl StringOrNumber {
    fn into_string(self) -> String {
        match self {
            StringOrNumber::String(s) => s,
            StringOrNumber::Number(n) => n.to_string(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

#[derive(Deserialize)]
struct RawClaims {
    exp: Option<f64>,
    iat: Option<f64>,
    sub: Option<StringOrNumber>,
    #[serde(rename = "userId")]
    user_id: Option<StringOrNumber>,
    email: Option<String>,
    #[serde(alias = "role")]
    roles: Option<OneOrMany>,
}

fn timestamp(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    Utc.timestamp_opt(secs.floor() as i64, 0).single()
}

fn decode_segment(segment: &str) -> Result<Vec<u8>, TokenError> {
    let trimmed = segment.trim_end_matches('=');
    URL_SAFE_NO_PAD
        .decode(trimmed)
        .or_else(|_| STANDARD_NO_PAD.decode(trimmed))
        .map_err(|e| TokenError::Encoding(e.to_string()))
}

/// Decode the claims embedded in `token` without verifying its signature.
pub fn decode(token: &str) -> Result<Claims, TokenError> {
    if token.is_empty() {
        return Err(TokenError::Empty);
    }
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(TokenError::Malformed(segments.len()));
    }

    let payload = decode_segment(segments[1])?;
    let raw: RawClaims =
        serde_json::from_slice(&payload).map_err(|e| TokenError::Payload(e.to_string()))?;

    let expires_at = raw.exp.and_then(timestamp).ok_or(TokenError::MissingExpiry)?;
    let roles = match raw.roles {
        Some(OneOrMany::One(role)) => BTreeSet::from([role]),
        Some(OneOrMany::Many(roles)) => roles.into_iter().collect(),
        None => BTreeSet::new(),
    };

    Ok(Claims {
        subject: raw.sub.or(raw.user_id).map(StringOrNumber::into_string),
        email: raw.email,
        roles,
        issued_at: raw.iat.and_then(timestamp),
        expires_at,
    })
}

/// True if `token` is undecodable or expires before `now + buffer`.
pub fn is_expired(token: &str, buffer: Duration) -> bool {
    is_expired_at(token, buffer, Utc::now())
}

/// [`is_expired`] against an explicit clock.
pub fn is_expired_at(token: &str, buffer: Duration, now: DateTime<Utc>) -> bool {
    match decode(token) {
        Ok(claims) => claims.is_expired_at(buffer, now),
        Err(e) => {
            debug!(error = %e, "Treating undecodable token as expired");
            true
        }
    }
}
