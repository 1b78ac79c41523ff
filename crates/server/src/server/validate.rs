//! Path-parameter validation. Nothing invalid crosses into the key service.

/// Maximum accepted tenant identifier length.
const TENANT_ID_MAX_LEN: usize = 64;

/// Whether `tenant_id` matches `^[A-Za-z0-9_-]{1,64}$`.
pub fn tenant_id_is_valid(tenant_id: &str) -> bool {
    !tenant_id.is_empty()
        && tenant_id.len() <= TENANT_ID_MAX_LEN
        && tenant_id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// Parse a generation path segment: an unsigned decimal integer >= 1.
pub fn parse_generation(raw: &str) -> Option<i64> {
    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse::<i64>().ok().filter(|g| *g >= 1)
}
