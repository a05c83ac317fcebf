// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unverified JWT claim decoding. Only the expiry is read; signature checks
//! belong to the backend.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

/// Read the `exp` claim (epoch seconds) from a JWT.
pub fn expiry(token: &str) -> anyhow::Result<u64> {
    let mut parts = token.split('.');
    let (Some(_header), Some(body), Some(_signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        anyhow::bail!("token is not a three-part JWT");
    };
    let bytes = URL_SAFE_NO_PAD.decode(body.trim_end_matches('='))?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes)?;
    let exp = claims
        .get("exp")
        .and_then(serde_json::Value::as_f64)
        .filter(|exp| exp.is_finite() && *exp >= 0.0)
        .ok_or_else(|| anyhow::anyhow!("token has no numeric exp claim"))?;
    Ok(exp as u64)
}

/// Whether `token` expired before `now` (epoch seconds). Undecodable tokens
/// count as expired.
pub fn is_expired(token: &str, now: u64) -> bool {
    match expiry(token) {
        Ok(exp) => exp < now,
        Err(e) => {
            tracing::debug!(err = %e, "unreadable token treated as expired");
            true
        }
    }
}

/// Milliseconds from `now_ms` until the token's expiry; negative once expired.
pub fn millis_until_expiry(token: &str, now_ms: u64) -> anyhow::Result<i64> {
    let exp_ms = expiry(token)?.saturating_mul(1000);
    let now_ms = i64::try_from(now_ms).unwrap_or(i64::MAX);
    Ok(i64::try_from(exp_ms).unwrap_or(i64::MAX).saturating_sub(now_ms))
}

#[cfg(test)]
#[path = "claims_tests.rs"]
mod tests;
