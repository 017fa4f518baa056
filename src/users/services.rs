use tracing::{info, instrument, warn};

use crate::auth::guard::NOT_LOGGED_IN;
use crate::auth::password;
use crate::auth::repo::UpdateProfile;
use crate::auth::repo_types::{ProfileChanges, ProfileImage, User};
use crate::auth::services::EMAIL_TAKEN;
use crate::error::AppError;
use crate::images::services::{self as images, UploadItem};
use crate::projects::repo_types::Project;
use crate::state::AppState;
use crate::validation;

pub const USER_NOT_FOUND: &str = "There is no user with this id.";
pub const WRONG_PASSWORD: &str = "Hmm, your passwords don't match. Try again.";

async fn current_user(st: &AppState, user_id: i64) -> Result<User, AppError> {
    st.users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::Unauthenticated(NOT_LOGGED_IN.into()))
}

/// Public profile of any user together with their projects.
pub async fn profile_with_projects(
    st: &AppState,
    user_id: i64,
) -> Result<(User, Vec<Project>), AppError> {
    let user = st
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND.into()))?;
    let projects = st.projects.list_by_user(user_id).await?;
    Ok((user, projects))
}

#[instrument(skip(st, changes))]
pub async fn update_profile(
    st: &AppState,
    user_id: i64,
    changes: ProfileChanges,
) -> Result<User, AppError> {
    match st.users.update_profile(user_id, &changes).await? {
        UpdateProfile::Updated(user) => {
            info!(user_id, "profile updated");
            Ok(user)
        }
        UpdateProfile::EmailTaken => {
            warn!(user_id, "profile email already taken");
            Err(AppError::Conflict(EMAIL_TAKEN.into()))
        }
        UpdateProfile::Missing => Err(AppError::Unauthenticated(NOT_LOGGED_IN.into())),
    }
}

/// Deletes the account after re-checking the password. Stored images are
/// cleaned up afterwards on a best-effort basis.
#[instrument(skip(st, plain_password))]
pub async fn delete_account(
    st: &AppState,
    user_id: i64,
    plain_password: String,
) -> Result<(), AppError> {
    let user = current_user(st, user_id).await?;
    if !password::compare(plain_password, user.password.clone()).await? {
        warn!(user_id, "account delete with wrong password");
        return Err(AppError::InvalidCredentials(WRONG_PASSWORD.into()));
    }
    let projects = st.projects.list_by_user(user_id).await?;

    if !st.users.delete(user_id).await? {
        return Err(AppError::Unauthenticated(NOT_LOGGED_IN.into()));
    }
    info!(user_id, "account deleted");

    images::discard(st, &user.avatar_url).await;
    images::discard(st, &user.cover_url).await;
    for project in projects {
        images::discard(st, &project.image_url).await;
    }
    Ok(())
}

/// Sets an avatar or cover image. A file is uploaded and replaces the stored
/// object; otherwise a given URL is stored as is. With neither, the current
/// URL is kept.
#[instrument(skip(st, file, url))]
pub async fn set_image(
    st: &AppState,
    user_id: i64,
    image: ProfileImage,
    file: Option<UploadItem>,
    url: Option<&str>,
) -> Result<String, AppError> {
    let user = current_user(st, user_id).await?;
    let current = match image {
        ProfileImage::Avatar => user.avatar_url,
        ProfileImage::Cover => user.cover_url,
    };

    let (new_url, uploaded) = match (file, url.filter(|u| !u.trim().is_empty())) {
        (Some(item), _) => (images::upload(st, image.into(), user_id, item).await?, true),
        (None, Some(url)) => (validation::url(url)?, false),
        (None, None) => return Ok(current),
    };

    if let Err(e) = st.users.set_image_url(user_id, image, &new_url).await {
        if uploaded {
            images::discard(st, &new_url).await;
        }
        return Err(e.into());
    }
    if new_url != current {
        images::discard(st, &current).await;
    }
    info!(user_id, ?image, "profile image set");
    Ok(new_url)
}

#[instrument(skip(st))]
pub async fn remove_image(st: &AppState, user_id: i64, image: ProfileImage) -> Result<(), AppError> {
    let user = current_user(st, user_id).await?;
    let current = match image {
        ProfileImage::Avatar => user.avatar_url,
        ProfileImage::Cover => user.cover_url,
    };
    images::remove(st, &current).await?;
    st.users.set_image_url(user_id, image, "").await?;
    info!(user_id, ?image, "profile image removed");
    Ok(())
}
