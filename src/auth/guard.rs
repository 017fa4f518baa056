//! Session guard and role gate.
//!
//! Protected routes are listed once in [`ROUTE_POLICIES`]. The [`authorize`]
//! middleware looks up the matched route, resolves the bearer token to a
//! [`CurrentUser`] and checks the role before the handler runs.

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, MatchedPath, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, Method},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use super::claims::TokenKind;
use super::roles::Role;
use crate::error::AppError;
use crate::state::AppState;

pub const NOT_LOGGED_IN: &str = "You are not logged in. Please log in to gain access";
pub const STALE_SESSION: &str = "You recently changed password! Please log in again";
pub const FORBIDDEN: &str = "You do not have permission to perform this action";

const ANY_ROLE: &[Role] = &[Role::User, Role::Tester];
const USER_ONLY: &[Role] = &[Role::User];

/// Identity resolved from an access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: i64,
    pub role: Role,
}

#[derive(Debug)]
pub struct RoutePolicy {
    pub method: Method,
    pub path: &'static str,
    pub roles: &'static [Role],
}

macro_rules! policy {
    ($method:ident, $path:literal, $roles:expr) => {
        RoutePolicy {
            method: Method::$method,
            path: $path,
            roles: $roles,
        }
    };
}

/// Every protected endpoint. Routes not listed are public.
pub static ROUTE_POLICIES: &[RoutePolicy] = &[
    policy!(POST, "/api/auth/updatePassword", USER_ONLY),
    policy!(GET, "/api/users/currentUser/userId", ANY_ROLE),
    policy!(PATCH, "/api/users/currentUser", ANY_ROLE),
    policy!(DELETE, "/api/users/currentUser", USER_ONLY),
    policy!(PATCH, "/api/users/currentUser/avatarImg", ANY_ROLE),
    policy!(DELETE, "/api/users/currentUser/avatarImg", ANY_ROLE),
    policy!(PATCH, "/api/users/currentUser/coverImg", ANY_ROLE),
    policy!(DELETE, "/api/users/currentUser/coverImg", ANY_ROLE),
    policy!(GET, "/api/projects/currentUser/technologies", ANY_ROLE),
    policy!(GET, "/api/projects/currentUser", ANY_ROLE),
    policy!(POST, "/api/projects/currentUser", ANY_ROLE),
    policy!(GET, "/api/projects/currentUser/:projectId", ANY_ROLE),
    policy!(PUT, "/api/projects/currentUser/:projectId", ANY_ROLE),
    policy!(DELETE, "/api/projects/currentUser/:projectId", USER_ONLY),
];

pub fn policy_for(method: &Method, path: &str) -> Option<&'static RoutePolicy> {
    ROUTE_POLICIES
        .iter()
        .find(|p| p.method == *method && p.path == path)
}

/// Role gate: pure membership check.
pub fn check_role(role: Role, allowed: &[Role]) -> Result<(), AppError> {
    if allowed.contains(&role) {
        Ok(())
    } else {
        Err(AppError::Forbidden(FORBIDDEN.into()))
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))?
        .trim();
    (!token.is_empty()).then_some(token)
}

/// Session guard: verifies the access token, loads its subject and rejects
/// tokens issued before the last password change.
pub async fn protect(state: &AppState, token: Option<&str>) -> Result<CurrentUser, AppError> {
    let token = token.ok_or_else(|| AppError::Unauthenticated(NOT_LOGGED_IN.into()))?;
    let claims = state.keys.verify(token, TokenKind::Access)?;

    let user = state
        .users
        .find_by_id(claims.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthenticated(NOT_LOGGED_IN.into()))?;

    if user.changed_password_after(claims.iat_ms) {
        warn!(user_id = user.id, "token issued before password change");
        return Err(AppError::Unauthenticated(STALE_SESSION.into()));
    }

    Ok(CurrentUser {
        id: user.id,
        role: user.role,
    })
}

/// Applied with `route_layer` so `MatchedPath` is available.
pub async fn authorize(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let policy = req
        .extensions()
        .get::<MatchedPath>()
        .and_then(|matched| policy_for(req.method(), matched.as_str()));

    if let Some(policy) = policy {
        let current = protect(&state, bearer_token(req.headers())).await?;
        check_role(current.role, policy.roles)?;
        debug!(user_id = current.id, role = %current.role, path = policy.path, "authorized");
        req.extensions_mut().insert(current);
    }

    Ok(next.run(req).await)
}

/// Handler-side access to the identity resolved by [`authorize`].
pub struct AuthUser(pub CurrentUser);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .copied()
            .map(AuthUser)
            .ok_or_else(|| AppError::Unauthenticated(NOT_LOGGED_IN.into()))
    }
}
