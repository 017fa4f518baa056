use sqlx::FromRow;
use time::OffsetDateTime;

use super::reset_token::epoch_millis;
use super::roles::Role;

/// User record in the database. Never serialized directly; see
/// `users::dto::PublicProfile` for what leaves the server.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password: String, // Argon2 hash
    pub role: Role,
    pub full_name: String,
    pub job_title: String,
    pub linkedin: String,
    pub bio: String,
    pub avatar_url: String,
    pub cover_url: String,
    pub password_updated_at: OffsetDateTime,
    pub reset_token: Option<String>, // sha256 of the emailed secret
    pub reset_token_expires_in: Option<i64>, // epoch ms
    pub created_at: OffsetDateTime,
}

impl User {
    /// A password change after `issued_at_ms` (epoch ms) invalidates the token.
    pub fn changed_password_after(&self, issued_at_ms: i64) -> bool {
        issued_at_ms < epoch_millis(self.password_updated_at)
    }

    /// True while a reset token is outstanding and not yet expired.
    pub fn has_pending_reset(&self, now_ms: i64) -> bool {
        matches!(self.reset_token_expires_in, Some(exp) if now_ms < exp)
    }
}

/// Profile columns a user may edit. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub job_title: Option<String>,
    pub linkedin: Option<String>,
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileImage {
    Avatar,
    Cover,
}
