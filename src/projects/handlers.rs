use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;

use super::dto::{ProjectBody, ProjectView};
use super::repo_types::{ProjectDraft, Technology};
use super::services;
use crate::auth::dto::{created_message, ok_message, MessageResponse};
use crate::auth::guard::AuthUser;
use crate::error::AppError;
use crate::images::form::read_image_form;
use crate::images::services::{UploadItem, MAX_IMAGE_BYTES};
use crate::state::AppState;
use crate::validation;

const IMAGE_FIELD: &str = "imageFile";
const BODY_FIELD: &str = "body";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/projects/currentUser/technologies", get(list_technologies))
        .route(
            "/api/projects/currentUser",
            get(list_projects).post(create_project),
        )
        .route(
            "/api/projects/currentUser/:projectId",
            get(get_project).put(update_project).delete(delete_project),
        )
        .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + 64 * 1024))
}

async fn read_project_form(mp: Multipart) -> Result<(ProjectDraft, Option<UploadItem>), AppError> {
    let form = read_image_form(mp, IMAGE_FIELD).await?;
    let raw = form
        .text(BODY_FIELD)
        .ok_or_else(|| AppError::Validation("Project data is missing".into()))?;
    let draft = ProjectBody::parse(raw)?.validate()?;
    Ok((draft, form.file))
}

#[instrument(skip(state))]
pub async fn list_technologies(
    State(state): State<AppState>,
) -> Result<Json<Vec<Technology>>, AppError> {
    Ok(Json(services::technologies(&state).await?))
}

#[instrument(skip(state))]
pub async fn list_projects(
    State(state): State<AppState>,
    AuthUser(current): AuthUser,
) -> Result<Json<Vec<ProjectView>>, AppError> {
    let projects = services::list_mine(&state, current.id).await?;
    Ok(Json(projects.into_iter().map(ProjectView::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_project(
    State(state): State<AppState>,
    AuthUser(current): AuthUser,
    Path(project_id): Path<String>,
) -> Result<Json<ProjectView>, AppError> {
    let project_id = validation::id_param(&project_id)?;
    let project = services::get_mine(&state, current.id, project_id).await?;
    Ok(Json(project.into()))
}

#[instrument(skip(state, mp))]
pub async fn create_project(
    State(state): State<AppState>,
    AuthUser(current): AuthUser,
    mp: Multipart,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    let (draft, image) = read_project_form(mp).await?;
    services::create(&state, current.id, draft, image).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new(created_message("project", "created"))),
    ))
}

#[instrument(skip(state, mp))]
pub async fn update_project(
    State(state): State<AppState>,
    AuthUser(current): AuthUser,
    Path(project_id): Path<String>,
    mp: Multipart,
) -> Result<Json<MessageResponse>, AppError> {
    let project_id = validation::id_param(&project_id)?;
    let (draft, image) = read_project_form(mp).await?;
    let project = services::update(&state, current.id, project_id, draft, image).await?;
    Ok(Json(MessageResponse::new(ok_message(
        "update",
        &format!("Project {} has been updated successfully", project.name),
    ))))
}

#[instrument(skip(state))]
pub async fn delete_project(
    State(state): State<AppState>,
    AuthUser(current): AuthUser,
    Path(project_id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let project_id = validation::id_param(&project_id)?;
    let project = services::delete(&state, current.id, project_id).await?;
    Ok(Json(MessageResponse::new(ok_message(
        "delete",
        &format!("Project {} has been deleted", project.name),
    ))))
}
