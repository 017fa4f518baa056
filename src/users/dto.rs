use serde::{Deserialize, Serialize};

use crate::auth::repo_types::{ProfileChanges, User};
use crate::error::AppError;
use crate::projects::dto::ProjectView;
use crate::validation;

/// What other people may see of a user. Credentials, ids, role and
/// internal timestamps never leave the server.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub email: String,
    pub full_name: String,
    pub job_title: String,
    pub linkedin: String,
    pub bio: String,
    #[serde(rename = "avatarURL")]
    pub avatar_url: String,
    #[serde(rename = "coverURL")]
    pub cover_url: String,
}

impl From<&User> for PublicProfile {
    fn from(u: &User) -> Self {
        Self {
            email: u.email.clone(),
            full_name: u.full_name.clone(),
            job_title: u.job_title.clone(),
            linkedin: u.linkedin.clone(),
            bio: u.bio.clone(),
            avatar_url: u.avatar_url.clone(),
            cover_url: u.cover_url.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserWithProjects {
    #[serde(flatten)]
    pub profile: PublicProfile,
    pub projects: Vec<ProjectView>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateProfileRequest {
    pub email: String,
    pub full_name: String,
    pub job_title: String,
    pub linkedin: String,
    pub bio: String,
}

impl UpdateProfileRequest {
    /// Empty fields are left unchanged.
    pub fn validate(&self) -> Result<ProfileChanges, AppError> {
        Ok(ProfileChanges {
            email: validation::optional(&self.email, validation::email)?,
            full_name: validation::optional(&self.full_name, validation::name)?,
            job_title: validation::optional(&self.job_title, validation::job_title)?,
            linkedin: validation::optional(&self.linkedin, validation::url)?,
            bio: validation::optional(&self.bio, validation::bio)?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct DeleteAccountRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UpdateProfileResponse {
    pub message: String,
    pub user: PublicProfile,
}

#[derive(Debug, Serialize)]
pub struct AvatarResponse {
    pub message: String,
    #[serde(rename = "avatarURL")]
    pub avatar_url: String,
}

#[derive(Debug, Serialize)]
pub struct CoverResponse {
    pub message: String,
    #[serde(rename = "coverURL")]
    pub cover_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_update_skips_empty_fields() {
        let req: UpdateProfileRequest =
            serde_json::from_str(r#"{"email":"","fullName":"Grace Hopper","bio":""}"#).unwrap();
        let changes = req.validate().unwrap();
        assert_eq!(changes.email, None);
        assert_eq!(changes.full_name.as_deref(), Some("Grace Hopper"));
        assert_eq!(changes.linkedin, None);
    }

    #[test]
    fn profile_update_rejects_bad_values() {
        let req = UpdateProfileRequest {
            linkedin: "linkedin".into(),
            ..Default::default()
        };
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn user_with_projects_is_flat() {
        let out = UserWithProjects {
            profile: PublicProfile {
                email: "a@b.co".into(),
                full_name: "Ada Lovelace".into(),
                job_title: String::new(),
                linkedin: String::new(),
                bio: String::new(),
                avatar_url: String::new(),
                cover_url: String::new(),
            },
            projects: vec![],
        };
        let json = serde_json::to_value(out).unwrap();
        assert_eq!(json["fullName"], "Ada Lovelace");
        assert!(json["projects"].as_array().unwrap().is_empty());
        assert!(json.get("password").is_none());
        assert!(json.get("id").is_none());
        assert!(json.get("role").is_none());
    }
}
