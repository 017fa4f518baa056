use serde::{Deserialize, Serialize};

/// Type of JWT: access or refresh. Each kind is signed with its own secret.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT payload used for authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: i64,
    pub iat: i64,       // issued at (unix timestamp)
    #[serde(rename = "iatMs")]
    pub iat_ms: i64,    // issued at, epoch ms; compared against password changes
    pub nbf: i64,       // not before
    pub exp: i64,       // expires at
    pub iss: String,
    pub aud: String,
    pub kind: TokenKind,
}
