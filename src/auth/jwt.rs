use std::time::Duration;

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::OffsetDateTime;
use tracing::debug;

use super::claims::{Claims, TokenKind};
use super::reset_token::epoch_millis;
use crate::config::JwtConfig;
use crate::error::AppError;

/// Why a token was refused, most specific first.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Your token is not active yet. Please log in again.")]
    NotYetValid,
    #[error("Your token has expired! Please log in again.")]
    Expired,
    #[error("Invalid token. Please log in again.")]
    Invalid,
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        AppError::Unauthenticated(err.to_string())
    }
}

#[derive(Clone)]
struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl KeyPair {
    fn new(secret: &str, ttl_minutes: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::from_secs(ttl_minutes.max(0) as u64 * 60),
        }
    }
}

/// Not-before is reported ahead of expiry when both fail.
fn check_window(claims: &Claims, now: i64) -> Result<(), TokenError> {
    if claims.nbf > now {
        return Err(TokenError::NotYetValid);
    }
    if claims.exp <= now {
        return Err(TokenError::Expired);
    }
    Ok(())
}

/// Holds signing and verification keys for both token kinds.
#[derive(Clone)]
pub struct JwtKeys {
    access: KeyPair,
    refresh: KeyPair,
    issuer: String,
    audience: String,
}

impl JwtKeys {
    pub fn from_config(cfg: &JwtConfig) -> Self {
        Self {
            access: KeyPair::new(&cfg.access_secret, cfg.access_ttl_minutes),
            refresh: KeyPair::new(&cfg.refresh_secret, cfg.refresh_ttl_minutes),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
        }
    }

    fn pair(&self, kind: TokenKind) -> &KeyPair {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    pub(crate) fn sign_at(
        &self,
        user_id: i64,
        kind: TokenKind,
        issued_at: OffsetDateTime,
    ) -> anyhow::Result<String> {
        let pair = self.pair(kind);
        let iat = issued_at.unix_timestamp();
        let claims = Claims {
            user_id,
            iat,
            iat_ms: epoch_millis(issued_at),
            nbf: iat,
            exp: iat + pair.ttl.as_secs() as i64,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            kind,
        };
        let token = encode(&Header::default(), &claims, &pair.encoding)?;
        debug!(user_id, kind = ?kind, "jwt signed");
        Ok(token)
    }

    pub fn sign_access(&self, user_id: i64) -> anyhow::Result<String> {
        self.sign_at(user_id, TokenKind::Access, OffsetDateTime::now_utc())
    }

    pub fn sign_refresh(&self, user_id: i64) -> anyhow::Result<String> {
        self.sign_at(user_id, TokenKind::Refresh, OffsetDateTime::now_utc())
    }

    /// Verifies signature, audience and issuer against the secret of `kind`,
    /// then the validity window with no leeway.
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<Claims, TokenError> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        validation.set_required_spec_claims(&["exp", "nbf", "iss", "aud"]);
        validation.leeway = 0;
        // checked by check_window so not-before wins over expiry
        validation.validate_exp = false;
        validation.validate_nbf = false;

        let data = decode::<Claims>(token, &self.pair(kind).decoding, &validation)
            .map_err(|_| TokenError::Invalid)?;
        if data.claims.kind != kind {
            return Err(TokenError::Invalid);
        }
        check_window(&data.claims, OffsetDateTime::now_utc().unix_timestamp())?;
        debug!(user_id = data.claims.user_id, kind = ?kind, "jwt verified");
        Ok(data.claims)
    }
}
