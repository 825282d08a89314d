//! Wall-clock time and the MD5-based credential hashing used for session
//! establishment.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in seconds since the Unix epoch.
pub fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Lowercase hex MD5 digest of `bytes`.
pub fn md5_hex(bytes: impl AsRef<[u8]>) -> String {
    format!("{:x}", md5::compute(bytes))
}

/// Derive the AudioScrobbler 1.2 session token from a password and a
/// handshake timestamp.
///
/// If `password` is already a 32-character lowercase hex string it is
/// treated as pre-hashed; otherwise it is MD5-hashed first. The result is
/// always `md5_hex(password_md5 || timestamp)`. This nesting is mandated by
/// the protocol and must not change.
pub fn session_token(password: &str, timestamp: &str) -> String {
    let password_md5 = if is_hex32(password) {
        password.to_string()
    } else {
        md5_hex(password)
    };

    md5_hex(format!("{password_md5}{timestamp}"))
}

fn is_hex32(s: &str) -> bool {
    s.len() == 32 && s.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn md5_hex_matches_known_vector() {
        assert_eq!(md5_hex("secret"), "5ebe2294ecd0e0f08eab7690d2a6ee69");
    }

    #[test]
    fn session_token_hashes_plaintext_password() {
        let expected = md5_hex(format!("{}{}", md5_hex("secret"), "1700000000"));
        assert_eq!(session_token("secret", "1700000000"), expected);
    }

    #[test]
    fn session_token_skips_inner_hash_for_prehashed_password() {
        let prehashed = md5_hex("secret");
        let expected = md5_hex(format!("{prehashed}1700000000"));
        assert_eq!(session_token(&prehashed, "1700000000"), expected);
    }

    #[test]
    fn is_hex32_rejects_uppercase_and_wrong_length() {
        assert!(!is_hex32("5EBE2294ECD0E0F08EAB7690D2A6EE69"));
        assert!(!is_hex32("abc"));
        assert!(is_hex32(&md5_hex("anything")));
    }
}
