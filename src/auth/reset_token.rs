use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use time::{Duration, OffsetDateTime};

pub const RESET_TOKEN_TTL: Duration = Duration::minutes(20);

/// A freshly minted reset secret. `plain` goes to the user by email, only
/// `hashed` is stored.
#[derive(Debug, Clone)]
pub struct PasswordResetToken {
    pub plain: String,
    pub hashed: String,
    /// Epoch milliseconds.
    pub expires_at: i64,
}

pub fn create_password_reset_token(now: OffsetDateTime) -> PasswordResetToken {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    let plain = hex::encode(bytes);
    let hashed = hash_reset_token(&plain);
    PasswordResetToken {
        plain,
        hashed,
        expires_at: epoch_millis(now + RESET_TOKEN_TTL),
    }
}

pub fn hash_reset_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn epoch_millis(at: OffsetDateTime) -> i64 {
    (at.unix_timestamp_nanos() / 1_000_000) as i64
}

/// Whole minutes left until `expires_at`, truncated.
pub fn minutes_left(expires_at: i64, now_ms: i64) -> i64 {
    (expires_at - now_ms).max(0) / 60_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_256_bits_and_hash_matches() {
        let now = OffsetDateTime::now_utc();
        let t = create_password_reset_token(now);
        assert_eq!(t.plain.len(), 64);
        assert_eq!(t.hashed, hash_reset_token(&t.plain));
        assert_ne!(t.plain, t.hashed);
        assert_eq!(t.expires_at - epoch_millis(now), 20 * 60 * 1000);
    }

    #[test]
    fn tokens_are_unique() {
        let now = OffsetDateTime::now_utc();
        assert_ne!(
            create_password_reset_token(now).plain,
            create_password_reset_token(now).plain
        );
    }

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(hash_reset_token("abc"), hash_reset_token("abc"));
        assert_ne!(hash_reset_token("abc"), hash_reset_token("abd"));
    }

    #[test]
    fn minutes_left_truncates() {
        assert_eq!(minutes_left(20 * 60_000, 0), 20);
        assert_eq!(minutes_left(20 * 60_000, 61_000), 18);
        assert_eq!(minutes_left(0, 5), 0);
    }
}
