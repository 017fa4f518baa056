use serde::{Deserialize, Serialize};

use super::repo_types::{Project, ProjectDraft};
use crate::error::AppError;
use crate::validation;

/// JSON carried in the `body` part of the project multipart form.
#[derive(Debug, Deserialize)]
pub struct ProjectBody {
    pub name: String,
    #[serde(rename = "imageURL", default)]
    pub image_url: Option<String>,
    #[serde(rename = "demoURL")]
    pub demo_url: String,
    #[serde(rename = "repositoryURL")]
    pub repository_url: String,
    pub technologies: Vec<String>,
    pub description: String,
}

impl ProjectBody {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        serde_json::from_str(raw)
            .map_err(|e| AppError::Validation(format!("Invalid project data: {e}")))
    }

    pub fn validate(self) -> Result<ProjectDraft, AppError> {
        Ok(ProjectDraft {
            name: validation::name(&self.name)?,
            image_url: self.image_url.as_deref().map(validation::url).transpose()?,
            demo_url: validation::url(&self.demo_url)?,
            repository_url: validation::url(&self.repository_url)?,
            technologies: validation::technologies(&self.technologies)?,
            description: validation::description(&self.description)?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ProjectView {
    pub id: i64,
    pub name: String,
    #[serde(rename = "imageURL")]
    pub image_url: String,
    #[serde(rename = "demoURL")]
    pub demo_url: String,
    #[serde(rename = "repositoryURL")]
    pub repository_url: String,
    pub technologies: Vec<String>,
    pub description: String,
}

impl From<Project> for ProjectView {
    fn from(p: Project) -> Self {
        Self {
            id: p.id,
            name: p.name,
            image_url: p.image_url,
            demo_url: p.demo_url,
            repository_url: p.repository_url,
            technologies: p.technologies,
            description: p.description,
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_body() -> String {
    serde_json::json!({
        "name": "Portfolio Site",
        "imageURL": null,
        "demoURL": "https://demo.example.com",
        "repositoryURL": "https://github.com/me/portfolio",
        "technologies": ["Rust", "Postgres"],
        "description": "A".repeat(130),
    })
    .to_string()
}
