//! Bearer credential codec.
//!
//! A credential is an opaque `header.payload.signature` string. Only the
//! payload is read here, to learn when the credential expires; signatures are
//! the server's business. Decoding never fails loudly: anything malformed
//! yields `None`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Claims carried in a credential's payload segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Expiration time in whole seconds since epoch. Fractional values are
    /// floored; a missing or non-numeric `exp` is `None`.
    #[serde(default, deserialize_with = "numeric_date", skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    /// Every other claim, untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    /// Seconds left until expiry at `now`; zero or negative once expired.
    /// `None` when the credential carries no expiry.
    pub fn seconds_remaining(&self, now: DateTime<Utc>) -> Option<i64> {
        self.exp.map(|exp| exp.saturating_sub(now.timestamp()))
    }

    /// A credential without an expiry counts as expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.seconds_remaining(now).is_none_or(|remaining| remaining <= 0)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| DateTime::from_timestamp(exp, 0))
    }
}

fn numeric_date<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let exp = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.floor() as i64)),
        _ => None,
    };
    Ok(exp)
}

/// Decode the payload segment of `credential`.
///
/// Returns `None` when there are fewer than three dot-separated segments,
/// when the payload contains characters outside the base64 alphabets
/// (standard or URL-safe, `=` padding allowed), or when it does not decode to
/// a JSON object.
pub fn decode(credential: &str) -> Option<Claims> {
    let segments: Vec<&str> = credential.split('.').collect();
    if segments.len() < 3 {
        return None;
    }
    let payload = segments[1];
    if payload.is_empty() || !payload.chars().all(is_payload_char) {
        return None;
    }

    let normalized: String = payload
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();
    let bytes = URL_SAFE_NO_PAD.decode(normalized).ok()?;
    serde_json::from_slice(&bytes).ok()
}

fn is_payload_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '/' | '+' | '=')
}
