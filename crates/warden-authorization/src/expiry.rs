//! Grant expiry policy for user shares

use crate::errors::{DenialReason, WardenError, WardenResult};

/// Check a requested grant expiry against the maximum share lifetime
///
/// Times are epoch milliseconds and `0` means never. With `max_lifetime_ms`
/// of `0` an absent expiry becomes `0`, otherwise `now + max`. An explicit
/// expiry past `now + max` always conflicts.
pub fn validate_grant_expiry(
    grant_expiry: Option<&str>,
    max_lifetime_ms: i64,
    now_ms: i64,
) -> WardenResult<i64> {
    let granted_time = now_ms.saturating_add(max_lifetime_ms);
    let Some(raw) = grant_expiry else {
        return Ok(if max_lifetime_ms == 0 { 0 } else { granted_time });
    };

    let expiry: i64 = raw
        .trim()
        .parse()
        .map_err(|_| WardenError::invalid_request(format!("invalid grant expiry: {raw}")))?;

    let conflict = || {
        WardenError::permission_denied(
            DenialReason::GrantExpiryPolicy,
            "share expiration policy conflict",
        )
    };
    if expiry > granted_time || (expiry == 0 && max_lifetime_ms > 0) {
        return Err(conflict());
    }
    Ok(expiry)
}

/// [`validate_grant_expiry`] against the wall clock
pub fn validate_grant_expiry_now(grant_expiry: Option<&str>, max_lifetime_ms: i64) -> WardenResult<i64> {
    validate_grant_expiry(
        grant_expiry,
        max_lifetime_ms,
        chrono::Utc::now().timestamp_millis(),
    )
}
