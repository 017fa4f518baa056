use time::OffsetDateTime;
use tracing::{info, instrument, warn};

use super::claims::TokenKind;
use super::guard::STALE_SESSION;
use super::password;
use super::repo::CreateUser;
use super::repo_types::User;
use super::reset_token::{
    create_password_reset_token, epoch_millis, hash_reset_token, minutes_left,
};
use crate::email::messages;
use crate::error::AppError;
use crate::state::AppState;

pub const INVALID_CREDENTIALS: &str = "Your user credentials don't match. Try again.";
pub const EMAIL_TAKEN: &str = "Email already exists. Please register with a different email";
pub const UNKNOWN_EMAIL: &str = "There is no user with the email you entered. Please try again.";
pub const EMAIL_FAILED: &str = "There was an error sending the email. Try again later!";
pub const RESET_INVALID: &str = "Token is invalid or has expired!";
pub const RESET_CHECK_INVALID: &str = "Reset token is invalid or has expired.";
pub const RESET_ALREADY_USED: &str = "You have already made a succesful request to reset your password. \
     If you want to change it again, go to the forgot password page and start again.";

/// Token pair handed out after register or login.
#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
}

fn issue_session(st: &AppState, user_id: i64) -> Result<Session, AppError> {
    Ok(Session {
        access_token: st.keys.sign_access(user_id)?,
        refresh_token: st.keys.sign_refresh(user_id)?,
    })
}

/// Inputs are expected to be validated already.
#[instrument(skip(st, plain_password))]
pub async fn register(
    st: &AppState,
    email: &str,
    plain_password: String,
) -> Result<(User, Session), AppError> {
    let hash = password::hash(plain_password).await?;
    let user = match st.users.create(email, &hash, OffsetDateTime::now_utc()).await? {
        CreateUser::Created(user) => user,
        CreateUser::EmailTaken => {
            warn!(email, "email already registered");
            return Err(AppError::Conflict(EMAIL_TAKEN.into()));
        }
    };
    let session = issue_session(st, user.id)?;
    info!(user_id = user.id, "user registered");

    let login_url = format!("{}/auth/login", st.config.frontend_url);
    if let Err(e) = st.mailer.send(messages::welcome(&user.email, &login_url)).await {
        warn!(error = %e, user_id = user.id, "welcome email failed");
    }
    Ok((user, session))
}

/// Unknown email and wrong password produce the same error.
#[instrument(skip(st, plain_password))]
pub async fn login(
    st: &AppState,
    email: &str,
    plain_password: String,
) -> Result<(User, Session), AppError> {
    let Some(user) = st.users.find_by_email(email).await? else {
        warn!(email, "login unknown email");
        return Err(AppError::InvalidCredentials(INVALID_CREDENTIALS.into()));
    };
    if !password::compare(plain_password, user.password.clone()).await? {
        warn!(user_id = user.id, "login invalid password");
        return Err(AppError::InvalidCredentials(INVALID_CREDENTIALS.into()));
    }
    let session = issue_session(st, user.id)?;
    info!(user_id = user.id, "user logged in");
    Ok((user, session))
}

/// Mints a new access token from a refresh token.
#[instrument(skip_all)]
pub async fn refresh(st: &AppState, refresh_token: Option<&str>) -> Result<String, AppError> {
    let token = refresh_token
        .ok_or_else(|| AppError::Unauthenticated(super::guard::NOT_LOGGED_IN.into()))?;
    let claims = st.keys.verify(token, TokenKind::Refresh)?;
    let user = st
        .users
        .find_by_id(claims.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthenticated(super::guard::NOT_LOGGED_IN.into()))?;
    if user.changed_password_after(claims.iat_ms) {
        return Err(AppError::Unauthenticated(STALE_SESSION.into()));
    }
    Ok(st.keys.sign_access(user.id)?)
}

/// Rehashes and bumps `password_updated_at`, which invalidates every token
/// issued before now. The caller gets a fresh session.
#[instrument(skip(st, new_password))]
pub async fn change_password(
    st: &AppState,
    user_id: i64,
    new_password: String,
) -> Result<Session, AppError> {
    if st.users.find_by_id(user_id).await?.is_none() {
        return Err(AppError::Unauthenticated(super::guard::NOT_LOGGED_IN.into()));
    }
    let hash = password::hash(new_password).await?;
    st.users
        .update_password(user_id, &hash, OffsetDateTime::now_utc())
        .await?;
    info!(user_id, "password changed");
    issue_session(st, user_id)
}

/// Read-then-write without a lock: two concurrent requests for the same
/// account can both pass the pending-token check.
#[instrument(skip(st))]
pub async fn forgot_password(st: &AppState, email: &str) -> Result<(), AppError> {
    let user = st
        .users
        .find_by_email(email)
        .await?
        .ok_or_else(|| AppError::NotFound(UNKNOWN_EMAIL.into()))?;

    let now = OffsetDateTime::now_utc();
    let now_ms = epoch_millis(now);
    if let (true, Some(expires_at)) = (user.has_pending_reset(now_ms), user.reset_token_expires_in) {
        let left = minutes_left(expires_at, now_ms);
        warn!(user_id = user.id, left, "reset already pending");
        return Err(AppError::RateLimited(format!(
            "You have already made a request to reset your password. \
             Check your email or try again in {left} minutes."
        )));
    }

    let token = create_password_reset_token(now);
    st.users
        .set_reset_token(user.id, &token.hashed, token.expires_at)
        .await?;

    let reset_url = format!("{}/auth/reset-password/{}", st.config.frontend_url, token.plain);
    let msg = messages::reset_password(&user.email, &user.full_name, &reset_url);
    if let Err(e) = st.mailer.send(msg).await {
        warn!(error = %e, user_id = user.id, "reset email failed");
        return Err(AppError::Server(EMAIL_FAILED.into()));
    }
    info!(user_id = user.id, "reset token issued");
    Ok(())
}

/// Does not consume the token.
#[instrument(skip_all)]
pub async fn check_reset_token(st: &AppState, plain_token: &str) -> Result<(), AppError> {
    let hashed = hash_reset_token(plain_token);
    let now_ms = epoch_millis(OffsetDateTime::now_utc());
    match st.users.find_by_reset_token(&hashed, now_ms).await? {
        Some(_) => Ok(()),
        None => Err(AppError::Unauthenticated(RESET_CHECK_INVALID.into())),
    }
}

#[instrument(skip_all)]
pub async fn reset_password(
    st: &AppState,
    plain_token: &str,
    new_password: String,
) -> Result<(), AppError> {
    let hashed = hash_reset_token(plain_token);
    let now = OffsetDateTime::now_utc();
    let user = st
        .users
        .find_by_reset_token(&hashed, epoch_millis(now))
        .await?
        .ok_or_else(|| AppError::BadRequest(RESET_INVALID.into()))?;

    let hash = password::hash(new_password).await?;
    if !st.users.consume_reset_token(&hashed, &hash, now).await? {
        warn!(user_id = user.id, "reset token consumed concurrently");
        return Err(AppError::RateLimited(RESET_ALREADY_USED.into()));
    }
    info!(user_id = user.id, "password reset");
    Ok(())
}

#[instrument(skip(st, message))]
pub async fn contact_us(
    st: &AppState,
    email: &str,
    name: &str,
    message: &str,
) -> Result<(), AppError> {
    let ack = messages::contact_us(email, name);
    let feedback = messages::feedback(&st.config.email.from, name, email, message);
    for msg in [ack, feedback] {
        st.mailer.send(msg).await.map_err(|e| {
            warn!(error = %e, "contact email failed");
            AppError::Server(EMAIL_FAILED.into())
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::guard::protect;
    use crate::test_support::harness;

    const EMAIL: &str = "alice@example.com";
    const PASSWORD: &str = "Password1!";

    async fn registered(st: &AppState) -> (User, Session) {
        register(st, EMAIL, PASSWORD.into()).await.expect("register")
    }

    #[tokio::test]
    async fn register_then_login_succeeds() {
        let h = harness();
        let st = h.state.clone();
        let (user, session) = registered(&st).await;
        assert_eq!(user.email, EMAIL);
        assert_ne!(user.password, PASSWORD);
        assert!(protect(&st, Some(&session.access_token)).await.is_ok());

        let (logged_in, session) = login(&st, EMAIL, PASSWORD.into()).await.expect("login");
        assert_eq!(logged_in.id, user.id);
        let claims = st.keys.verify(&session.refresh_token, TokenKind::Refresh).unwrap();
        assert_eq!(claims.user_id, user.id);
    }

    #[tokio::test]
    async fn register_sends_welcome_email() {
        let h = harness();
        let st = h.state.clone();
        registered(&st).await;
        let sent = h.mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, EMAIL);
        assert!(sent[0].body.contains("/auth/login"));
    }

    #[tokio::test]
    async fn register_survives_welcome_email_failure() {
        let h = harness();
        let st = h.state.clone();
        h.mailer.fail(true);
        assert!(register(&st, EMAIL, PASSWORD.into()).await.is_ok());
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let h = harness();
        let st = h.state.clone();
        registered(&st).await;
        let err = register(&st, EMAIL, PASSWORD.into()).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let h = harness();
        let st = h.state.clone();
        registered(&st).await;
        let wrong_pw = login(&st, EMAIL, "Wrong1!pass".into()).await.unwrap_err();
        let no_user = login(&st, "bob@example.com", PASSWORD.into()).await.unwrap_err();
        assert_eq!(wrong_pw.status(), no_user.status());
        assert_eq!(wrong_pw.to_string(), no_user.to_string());
    }

    #[tokio::test]
    async fn refresh_mints_access_token() {
        let h = harness();
        let st = h.state.clone();
        let (user, session) = registered(&st).await;
        let access = refresh(&st, Some(&session.refresh_token)).await.unwrap();
        assert_eq!(st.keys.verify(&access, TokenKind::Access).unwrap().user_id, user.id);

        assert!(refresh(&st, None).await.is_err());
        assert!(refresh(&st, Some(&session.access_token)).await.is_err());
    }

    #[tokio::test]
    async fn change_password_invalidates_older_tokens() {
        let h = harness();
        let st = h.state.clone();
        let (user, _) = registered(&st).await;
        let (_, old) = login(&st, EMAIL, PASSWORD.into()).await.unwrap();
        assert!(protect(&st, Some(&old.access_token)).await.is_ok());

        let fresh = change_password(&st, user.id, "NewPassw0rd!".into()).await.unwrap();

        let err = protect(&st, Some(&old.access_token)).await.unwrap_err();
        assert_eq!(err.to_string(), STALE_SESSION);
        assert!(protect(&st, Some(&fresh.access_token)).await.is_ok());
        let err = refresh(&st, Some(&old.refresh_token)).await.unwrap_err();
        assert_eq!(err.to_string(), STALE_SESSION);
        assert!(refresh(&st, Some(&fresh.refresh_token)).await.is_ok());
        assert!(login(&st, EMAIL, "NewPassw0rd!".into()).await.is_ok());
        assert!(login(&st, EMAIL, PASSWORD.into()).await.is_err());
    }

    #[tokio::test]
    async fn forgot_password_unknown_email_is_not_found() {
        let h = harness();
        let st = h.state.clone();
        let err = forgot_password(&st, "nobody@example.com").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn forgot_password_is_rate_limited_within_ttl() {
        let h = harness();
        let st = h.state.clone();
        let (user, _) = registered(&st).await;
        forgot_password(&st, EMAIL).await.unwrap();

        let err = forgot_password(&st, EMAIL).await.unwrap_err();
        assert!(matches!(err, AppError::RateLimited(_)));
        assert!(err.to_string().contains("19 minutes") || err.to_string().contains("20 minutes"));

        h.users.expire_reset_token(user.id);
        assert!(forgot_password(&st, EMAIL).await.is_ok());
    }

    #[tokio::test]
    async fn forgot_password_email_failure_keeps_token() {
        let h = harness();
        let st = h.state.clone();
        let (user, _) = registered(&st).await;
        h.mailer.fail(true);
        let err = forgot_password(&st, EMAIL).await.unwrap_err();
        assert_eq!(err.to_string(), EMAIL_FAILED);
        let stored = st.users.find_by_id(user.id).await.unwrap().unwrap();
        assert!(stored.reset_token.is_some());
        assert!(stored.reset_token_expires_in.is_some());
    }

    #[tokio::test]
    async fn reset_token_is_single_use() {
        let h = harness();
        let st = h.state.clone();
        let (user, _) = registered(&st).await;
        forgot_password(&st, EMAIL).await.unwrap();
        let plain = h.mailer.last_reset_token().expect("token in email");

        check_reset_token(&st, &plain).await.unwrap();
        check_reset_token(&st, &plain).await.unwrap();

        reset_password(&st, &plain, "Another1!".into()).await.unwrap();
        let stored = st.users.find_by_id(user.id).await.unwrap().unwrap();
        assert!(stored.reset_token.is_none());
        assert!(stored.reset_token_expires_in.is_none());
        assert!(login(&st, EMAIL, "Another1!".into()).await.is_ok());

        let err = reset_password(&st, &plain, "Third1!pw".into()).await.unwrap_err();
        assert_eq!(err.to_string(), RESET_INVALID);
        assert!(check_reset_token(&st, &plain).await.is_err());
    }

    #[tokio::test]
    async fn concurrent_reset_reports_already_used() {
        let h = harness();
        let st = h.state.clone();
        let (user, _) = registered(&st).await;
        forgot_password(&st, EMAIL).await.unwrap();
        let plain = h.mailer.last_reset_token().unwrap();

        h.users.lose_next_reset_race();
        let err = reset_password(&st, &plain, "Another1!".into()).await.unwrap_err();
        assert!(matches!(err, AppError::RateLimited(_)));
        assert_eq!(err.to_string(), RESET_ALREADY_USED);

        let stored = st.users.find_by_id(user.id).await.unwrap().unwrap();
        assert!(stored.reset_token.is_none());
        assert!(login(&st, EMAIL, PASSWORD.into()).await.is_ok());
    }

    #[tokio::test]
    async fn reset_token_rejected_after_expiry() {
        let h = harness();
        let st = h.state.clone();
        let (user, _) = registered(&st).await;
        forgot_password(&st, EMAIL).await.unwrap();
        let plain = h.mailer.last_reset_token().unwrap();
        h.users.expire_reset_token(user.id);

        assert!(check_reset_token(&st, &plain).await.is_err());
        assert!(matches!(
            reset_password(&st, &plain, "Another1!".into()).await,
            Err(AppError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn contact_us_sends_two_emails() {
        let h = harness();
        let st = h.state.clone();
        contact_us(&st, "carol@example.com", "Carol Smith", "hello").await.unwrap();
        let sent = h.mailer.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].to, "carol@example.com");
        assert_eq!(sent[1].to, st.config.email.from);
        assert!(sent[1].body.contains("hello"));
    }
}
