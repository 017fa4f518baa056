use axum::{
    extract::{Path, State},
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use super::cookies::{build_clear_cookie, build_refresh_cookie, refresh_cookie, CookieOptions};
use super::dto::{
    created_message, ok_message, ContactUsRequest, CredentialsRequest, ForgotPasswordRequest,
    LoginResponse, MessageResponse, MessageWithToken, NewPasswordRequest, RegisterResponse, TokenResponse,
};
use super::guard::AuthUser;
use super::services;
use crate::error::AppError;
use crate::extract::ApiJson;
use crate::state::AppState;
use crate::users::dto::PublicProfile;
use crate::validation;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/refreshToken", get(refresh_token))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/forgotPassword", post(forgot_password))
        .route("/api/auth/updatePassword", post(update_password))
        .route(
            "/api/auth/resetPassword/:resetToken",
            post(check_reset_token).patch(reset_password),
        )
        .route("/api/auth/contactUs", post(contact_us))
}

pub(crate) fn cookie_options(state: &AppState) -> CookieOptions {
    CookieOptions {
        secure: state.config.env.is_production(),
        max_age_days: state.config.jwt.cookie_expires_days,
    }
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CredentialsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = validation::email(&payload.email)?;
    let password = validation::password(&payload.password)?;

    let (user, session) = services::register(&state, &email, password).await?;

    let cookie = build_refresh_cookie(&session.refresh_token, cookie_options(&state));
    Ok((
        StatusCode::CREATED,
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(RegisterResponse {
            message: created_message("user", "created"),
            email: user.email,
            token: session.access_token,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CredentialsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = validation::email(&payload.email)?;
    let password = validation::password(&payload.password)?;

    let (user, session) = services::login(&state, &email, password).await?;

    let cookie = build_refresh_cookie(&session.refresh_token, cookie_options(&state));
    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(LoginResponse {
            message: ok_message("sign in", "Welcome back"),
            user: PublicProfile::from(&user),
            token: session.access_token,
        }),
    ))
}

#[instrument(skip_all)]
pub async fn refresh_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, AppError> {
    let cookie = refresh_cookie(&headers);
    let token = services::refresh(&state, cookie.as_deref()).await?;
    Ok(Json(TokenResponse { token }))
}

#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    if refresh_cookie(&headers).is_none() {
        warn!("logout without session cookie");
        return Err(AppError::Forbidden(
            "You are unauthorized to perform this action".into(),
        ));
    }
    Ok((
        AppendHeaders([(SET_COOKIE, build_clear_cookie(cookie_options(&state)))]),
        Json(MessageResponse::new("Log out Successful!")),
    ))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let email = validation::email(&payload.email)?;
    services::forgot_password(&state, &email).await?;
    Ok(Json(MessageResponse::new(ok_message(
        "forgot password",
        "The reset link was send to your email",
    ))))
}

#[instrument(skip(state, payload))]
pub async fn update_password(
    State(state): State<AppState>,
    AuthUser(current): AuthUser,
    ApiJson(payload): ApiJson<NewPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    let password = validation::password_pair(&payload.password, &payload.confirm_password)?;
    let session = services::change_password(&state, current.id, password).await?;

    let cookie = build_refresh_cookie(&session.refresh_token, cookie_options(&state));
    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(MessageWithToken {
            message: ok_message("update password", "Your new password was updated successfully"),
            token: session.access_token,
        }),
    ))
}

#[instrument(skip_all)]
pub async fn check_reset_token(
    State(state): State<AppState>,
    Path(reset_token): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    services::check_reset_token(&state, &reset_token).await?;
    Ok(Json(MessageResponse::new(ok_message(
        "reset token",
        "Your reset token is valid",
    ))))
}

#[instrument(skip_all)]
pub async fn reset_password(
    State(state): State<AppState>,
    Path(reset_token): Path<String>,
    ApiJson(payload): ApiJson<NewPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let password = validation::password_pair(&payload.password, &payload.confirm_password)?;
    services::reset_password(&state, &reset_token, password).await?;
    Ok(Json(MessageResponse::new(ok_message(
        "reset password",
        "Your new password was saved successfully",
    ))))
}

#[instrument(skip(state, payload))]
pub async fn contact_us(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<ContactUsRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let email = validation::email(&payload.email)?;
    let name = validation::name(&payload.name)?;
    let message = validation::contact_message(&payload.message)?;
    services::contact_us(&state, &email, &name, &message).await?;
    Ok(Json(MessageResponse::new("Your message has been received")))
}
