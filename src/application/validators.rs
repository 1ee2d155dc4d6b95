pub const MIN_PHONE_NUMBER_LEN: usize = 10;
pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 128;

/// Strips all whitespace from a payer MSISDN.
/// Returns `None` when fewer than 10 characters remain.
pub fn normalize_phone_number(raw: &str) -> Option<String> {
    let normalized: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if normalized.chars().count() < MIN_PHONE_NUMBER_LEN {
        return None;
    }
    Some(normalized)
}

/// Validates a client-supplied idempotency key.
/// Rules:
/// - 1-128 characters after trimming
/// - No control characters
pub fn is_valid_idempotency_key(key: &str) -> bool {
    let key = key.trim();
    if key.is_empty() || key.len() > MAX_IDEMPOTENCY_KEY_LEN {
        return false;
    }
    !key.chars().any(|c| c.is_control())
}
