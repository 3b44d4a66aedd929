use sha2::{Digest, Sha256};

/// Longest id the data plane accepts.
pub const MAX_ID_LEN: usize = 64;

/// Hex digits of the digest suffix used for shortened ids.
const DIGEST_LEN: usize = 16;

fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
}

/// Whether `id` matches `[A-Za-z0-9._-]{1,64}`.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= MAX_ID_LEN && id.chars().all(is_id_char)
}

/// Join `parts` with `.` into a resource id.
///
/// Ids that would be invalid keep a sanitized, truncated prefix and end in
/// the first 16 hex digits of the SHA-256 of the joined parts, so distinct
/// inputs stay distinct.
///
/// ```
/// use gantry_transform::make_id;
///
/// assert_eq!(make_id(&["payments", "prod", "users"]), "payments.prod.users");
/// assert_eq!(make_id(&["gw", "prod", &"x".repeat(80)]).len(), 64);
/// ```
pub fn make_id(parts: &[&str]) -> String {
    let raw = parts.join(".");
    if is_valid_id(&raw) {
        return raw;
    }
    let digest = hex::encode(Sha256::digest(raw.as_bytes()));
    let keep = MAX_ID_LEN - DIGEST_LEN - 1;
    let prefix: String = raw
        .chars()
        .map(|c| if is_id_char(c) { c } else { '_' })
        .take(keep)
        .collect();
    format!("{prefix}.{}", &digest[..DIGEST_LEN])
}
