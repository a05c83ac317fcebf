// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Proactive refresh scheduling after a login or refresh.

use std::time::Duration;

use crate::session::claims;

/// How long before access-token expiry the proactive refresh fires.
pub const REFRESH_LEAD: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPlan {
    /// Refresh after this delay.
    At(Duration),
    /// Already inside the lead window.
    Now,
    /// The access token has no readable expiry.
    Unknown,
}

impl RefreshPlan {
    pub fn for_token(access: &str, now_ms: u64) -> Self {
        match claims::millis_until_expiry(access, now_ms) {
            Ok(remaining) => {
                let delay = remaining.saturating_sub(REFRESH_LEAD.as_millis() as i64);
                if delay > 0 {
                    Self::At(Duration::from_millis(delay as u64))
                } else {
                    Self::Now
                }
            }
            Err(_) => Self::Unknown,
        }
    }
}
