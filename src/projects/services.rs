use tracing::{info, instrument};

use super::repo_types::{Project, ProjectDraft, Technology};
use crate::error::AppError;
use crate::images::services::{self as images, ImageKind, UploadItem};
use crate::state::AppState;

pub const PROJECT_NOT_FOUND: &str = "The project you are looking for does not exist";
pub const DELETE_NOT_FOUND: &str = "The project you tried to delete does not exist";

pub async fn technologies(st: &AppState) -> Result<Vec<Technology>, AppError> {
    Ok(st.projects.technologies().await?)
}

pub async fn list_mine(st: &AppState, user_id: i64) -> Result<Vec<Project>, AppError> {
    Ok(st.projects.list_by_user(user_id).await?)
}

pub async fn get_mine(st: &AppState, user_id: i64, project_id: i64) -> Result<Project, AppError> {
    st.projects
        .find(user_id, project_id)
        .await?
        .ok_or_else(|| AppError::NotFound(PROJECT_NOT_FOUND.into()))
}

/// An uploaded image wins over a `imageURL` given in the body.
#[instrument(skip(st, draft, image))]
pub async fn create(
    st: &AppState,
    user_id: i64,
    mut draft: ProjectDraft,
    image: Option<UploadItem>,
) -> Result<Project, AppError> {
    let uploaded = match image {
        Some(item) => Some(images::upload(st, ImageKind::Project, user_id, item).await?),
        None => None,
    };
    if let Some(url) = &uploaded {
        draft.image_url = Some(url.clone());
    }
    let project = match st.projects.create(user_id, &draft).await {
        Ok(project) => project,
        Err(e) => {
            if let Some(url) = &uploaded {
                images::discard(st, url).await;
            }
            return Err(e.into());
        }
    };
    info!(project_id = project.id, "project created");
    Ok(project)
}

#[instrument(skip(st, draft, image))]
pub async fn update(
    st: &AppState,
    user_id: i64,
    project_id: i64,
    mut draft: ProjectDraft,
    image: Option<UploadItem>,
) -> Result<Project, AppError> {
    let current = get_mine(st, user_id, project_id).await?;
    let uploaded = match image {
        Some(item) => Some(images::upload(st, ImageKind::Project, user_id, item).await?),
        None => None,
    };
    if let Some(url) = &uploaded {
        draft.image_url = Some(url.clone());
    }
    let project = match st.projects.update(user_id, project_id, &draft).await {
        Ok(Some(project)) => project,
        outcome => {
            if let Some(url) = &uploaded {
                images::discard(st, url).await;
            }
            return Err(match outcome {
                Err(e) => e.into(),
                _ => AppError::NotFound(PROJECT_NOT_FOUND.into()),
            });
        }
    };
    if uploaded.is_some() {
        images::discard(st, &current.image_url).await;
    }
    info!(project_id, "project updated");
    Ok(project)
}

/// Removes the stored image before the row, so a failed delete leaves the
/// project intact.
#[instrument(skip(st))]
pub async fn delete(st: &AppState, user_id: i64, project_id: i64) -> Result<Project, AppError> {
    let current = st
        .projects
        .find(user_id, project_id)
        .await?
        .ok_or_else(|| AppError::NotFound(DELETE_NOT_FOUND.into()))?;
    images::remove(st, &current.image_url).await?;
    let deleted = st
        .projects
        .delete(user_id, project_id)
        .await?
        .ok_or_else(|| AppError::NotFound(DELETE_NOT_FOUND.into()))?;
    info!(project_id, "project deleted");
    Ok(deleted)
}
