use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::header::SET_COOKIE,
    response::{AppendHeaders, IntoResponse},
    routing::{get, patch},
    Json, Router,
};
use tracing::instrument;

use super::dto::{
    AvatarResponse, CoverResponse, DeleteAccountRequest, PublicProfile, UpdateProfileRequest,
    UpdateProfileResponse, UserWithProjects,
};
use super::services;
use crate::auth::cookies::build_clear_cookie;
use crate::auth::dto::{ok_message, MessageResponse};
use crate::auth::guard::AuthUser;
use crate::auth::handlers::cookie_options;
use crate::auth::repo_types::ProfileImage;
use crate::error::AppError;
use crate::extract::ApiJson;
use crate::images::form::read_image_form;
use crate::images::services::MAX_IMAGE_BYTES;
use crate::projects::dto::ProjectView;
use crate::state::AppState;
use crate::validation;

const PROFILE_UPDATED: &str = "Your profile information has been updated successfully";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/users/currentUser/userId", get(my_user_id))
        .route(
            "/api/users/currentUser",
            patch(update_me).delete(delete_me),
        )
        .route(
            "/api/users/currentUser/avatarImg",
            patch(update_avatar).delete(delete_avatar),
        )
        .route(
            "/api/users/currentUser/coverImg",
            patch(update_cover).delete(delete_cover),
        )
        .route("/api/users/projects/:userId", get(user_with_projects))
        .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + 64 * 1024))
}

#[instrument(skip(state))]
pub async fn user_with_projects(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserWithProjects>, AppError> {
    let user_id = validation::id_param(&user_id)?;
    let (user, projects) = services::profile_with_projects(&state, user_id).await?;
    Ok(Json(UserWithProjects {
        profile: PublicProfile::from(&user),
        projects: projects.into_iter().map(ProjectView::from).collect(),
    }))
}

pub async fn my_user_id(AuthUser(current): AuthUser) -> String {
    current.id.to_string()
}

#[instrument(skip(state, payload))]
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(current): AuthUser,
    ApiJson(payload): ApiJson<UpdateProfileRequest>,
) -> Result<Json<UpdateProfileResponse>, AppError> {
    let changes = payload.validate()?;
    let user = services::update_profile(&state, current.id, changes).await?;
    Ok(Json(UpdateProfileResponse {
        message: ok_message("update", PROFILE_UPDATED),
        user: PublicProfile::from(&user),
    }))
}

#[instrument(skip(state, payload))]
pub async fn delete_me(
    State(state): State<AppState>,
    AuthUser(current): AuthUser,
    ApiJson(payload): ApiJson<DeleteAccountRequest>,
) -> Result<impl IntoResponse, AppError> {
    let password = validation::password(&payload.password)?;
    services::delete_account(&state, current.id, password).await?;
    Ok((
        AppendHeaders([(SET_COOKIE, build_clear_cookie(cookie_options(&state)))]),
        Json(MessageResponse::new(ok_message(
            "delete",
            "Your Account has been deleted",
        ))),
    ))
}

async fn set_image(
    state: &AppState,
    user_id: i64,
    image: ProfileImage,
    mp: Multipart,
) -> Result<String, AppError> {
    let (file_field, url_field) = match image {
        ProfileImage::Avatar => ("avatarFile", "avatarURL"),
        ProfileImage::Cover => ("coverFile", "coverURL"),
    };
    let form = read_image_form(mp, file_field).await?;
    let url = form.text(url_field).map(str::to_string);
    services::set_image(state, user_id, image, form.file, url.as_deref()).await
}

#[instrument(skip(state, mp))]
pub async fn update_avatar(
    State(state): State<AppState>,
    AuthUser(current): AuthUser,
    mp: Multipart,
) -> Result<Json<AvatarResponse>, AppError> {
    let avatar_url = set_image(&state, current.id, ProfileImage::Avatar, mp).await?;
    Ok(Json(AvatarResponse {
        message: ok_message("update", PROFILE_UPDATED),
        avatar_url,
    }))
}

#[instrument(skip(state, mp))]
pub async fn update_cover(
    State(state): State<AppState>,
    AuthUser(current): AuthUser,
    mp: Multipart,
) -> Result<Json<CoverResponse>, AppError> {
    let cover_url = set_image(&state, current.id, ProfileImage::Cover, mp).await?;
    Ok(Json(CoverResponse {
        message: ok_message("update", PROFILE_UPDATED),
        cover_url,
    }))
}

#[instrument(skip(state))]
pub async fn delete_avatar(
    State(state): State<AppState>,
    AuthUser(current): AuthUser,
) -> Result<Json<MessageResponse>, AppError> {
    services::remove_image(&state, current.id, ProfileImage::Avatar).await?;
    Ok(Json(MessageResponse::new(ok_message(
        "delete",
        "Your avatar image has been deleted",
    ))))
}

#[instrument(skip(state))]
pub async fn delete_cover(
    State(state): State<AppState>,
    AuthUser(current): AuthUser,
) -> Result<Json<MessageResponse>, AppError> {
    services::remove_image(&state, current.id, ProfileImage::Cover).await?;
    Ok(Json(MessageResponse::new(ok_message(
        "delete",
        "Your cover image has been deleted",
    ))))
}
