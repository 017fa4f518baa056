use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;

use super::repo_types::{Project, ProjectDraft, Technology};

/// Project rows. Every lookup is scoped to the owning user.
#[async_trait]
pub trait ProjectRepo: Send + Sync {
    async fn technologies(&self) -> anyhow::Result<Vec<Technology>>;
    async fn list_by_user(&self, user_id: i64) -> anyhow::Result<Vec<Project>>;
    async fn find(&self, user_id: i64, project_id: i64) -> anyhow::Result<Option<Project>>;
    async fn create(&self, user_id: i64, draft: &ProjectDraft) -> anyhow::Result<Project>;
    async fn update(
        &self,
        user_id: i64,
        project_id: i64,
        draft: &ProjectDraft,
    ) -> anyhow::Result<Option<Project>>;
    /// Returns the deleted row.
    async fn delete(&self, user_id: i64, project_id: i64) -> anyhow::Result<Option<Project>>;
}

const PROJECT_COLUMNS: &str =
    "id, user_id, name, image_url, demo_url, repository_url, technologies, description, created_at";

#[derive(Clone)]
pub struct PgProjectRepo {
    db: PgPool,
}

impl PgProjectRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProjectRepo for PgProjectRepo {
    async fn technologies(&self) -> anyhow::Result<Vec<Technology>> {
        sqlx::query_as::<_, Technology>("SELECT id, name FROM technologies ORDER BY id")
            .fetch_all(&self.db)
            .await
            .context("list technologies")
    }

    async fn list_by_user(&self, user_id: i64) -> anyhow::Result<Vec<Project>> {
        sqlx::query_as::<_, Project>(&format!(
            r#"
            SELECT {PROJECT_COLUMNS}
              FROM projects
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("list projects")
    }

    async fn find(&self, user_id: i64, project_id: i64) -> anyhow::Result<Option<Project>> {
        sqlx::query_as::<_, Project>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1 AND user_id = $2"
        ))
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .context("find project")
    }

    async fn create(&self, user_id: i64, draft: &ProjectDraft) -> anyhow::Result<Project> {
        sqlx::query_as::<_, Project>(&format!(
            r#"
            INSERT INTO projects
                (user_id, name, image_url, demo_url, repository_url, technologies, description)
            VALUES ($1, $2, COALESCE($3, ''), $4, $5, $6, $7)
            RETURNING {PROJECT_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(&draft.name)
        .bind(draft.image_url.as_deref())
        .bind(&draft.demo_url)
        .bind(&draft.repository_url)
        .bind(&draft.technologies)
        .bind(&draft.description)
        .fetch_one(&self.db)
        .await
        .context("insert project")
    }

    async fn update(
        &self,
        user_id: i64,
        project_id: i64,
        draft: &ProjectDraft,
    ) -> anyhow::Result<Option<Project>> {
        sqlx::query_as::<_, Project>(&format!(
            r#"
            UPDATE projects
               SET name = $3,
                   image_url = COALESCE($4, image_url),
                   demo_url = $5,
                   repository_url = $6,
                   technologies = $7,
                   description = $8
             WHERE id = $1 AND user_id = $2
            RETURNING {PROJECT_COLUMNS}
            "#
        ))
        .bind(project_id)
        .bind(user_id)
        .bind(&draft.name)
        .bind(draft.image_url.as_deref())
        .bind(&draft.demo_url)
        .bind(&draft.repository_url)
        .bind(&draft.technologies)
        .bind(&draft.description)
        .fetch_optional(&self.db)
        .await
        .context("update project")
    }

    async fn delete(&self, user_id: i64, project_id: i64) -> anyhow::Result<Option<Project>> {
        sqlx::query_as::<_, Project>(&format!(
            "DELETE FROM projects WHERE id = $1 AND user_id = $2 RETURNING {PROJECT_COLUMNS}"
        ))
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .context("delete project")
    }
}
