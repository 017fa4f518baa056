use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

#[derive(Debug, Clone, FromRow)]
pub struct Project {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub image_url: String,
    pub demo_url: String,
    pub repository_url: String,
    pub technologies: Vec<String>,
    pub description: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Technology {
    pub id: i64,
    pub name: String,
}

/// Validated project fields. `image_url: None` keeps the stored image on
/// update and stores no image on insert.
#[derive(Debug, Clone)]
pub struct ProjectDraft {
    pub name: String,
    pub image_url: Option<String>,
    pub demo_url: String,
    pub repository_url: String,
    pub technologies: Vec<String>,
    pub description: String,
}
