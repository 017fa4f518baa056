use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;

use super::repo_types::{ProfileChanges, ProfileImage, User};

/// Outcome of inserting a user.
#[derive(Debug)]
pub enum CreateUser {
    Created(User),
    EmailTaken,
}

/// Outcome of a profile update.
#[derive(Debug)]
pub enum UpdateProfile {
    Updated(User),
    EmailTaken,
    Missing,
}

/// Durable storage of user records.
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn create(
        &self,
        email: &str,
        password_hash: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<CreateUser>;
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<User>>;
    async fn update_password(
        &self,
        id: i64,
        password_hash: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<()>;
    /// Stores a reset token hash and its expiry (epoch ms).
    async fn set_reset_token(&self, id: i64, hashed: &str, expires_at: i64) -> anyhow::Result<()>;
    /// User holding `hashed` whose token expires after `now_ms`.
    async fn find_by_reset_token(&self, hashed: &str, now_ms: i64) -> anyhow::Result<Option<User>>;
    /// Sets the new password and clears both reset fields, but only if the
    /// row still holds `hashed`. Returns false when nothing matched.
    async fn consume_reset_token(
        &self,
        hashed: &str,
        password_hash: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<bool>;
    async fn update_profile(&self, id: i64, changes: &ProfileChanges) -> anyhow::Result<UpdateProfile>;
    /// An empty `url` clears the image.
    async fn set_image_url(&self, id: i64, image: ProfileImage, url: &str) -> anyhow::Result<()>;
    async fn delete(&self, id: i64) -> anyhow::Result<bool>;
}

const USER_COLUMNS: &str = "id, email, password, role, full_name, job_title, linkedin, bio, \
     avatar_url, cover_url, password_updated_at, reset_token, reset_token_expires_in, created_at";

#[derive(Clone)]
pub struct PgUserRepo {
    db: PgPool,
}

impl PgUserRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn create(
        &self,
        email: &str,
        password_hash: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<CreateUser> {
        let res = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, password, password_updated_at)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(email)
        .bind(password_hash)
        .bind(now)
        .fetch_one(&self.db)
        .await;

        match res {
            Ok(user) => Ok(CreateUser::Created(user)),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Ok(CreateUser::EmailTaken),
            Err(e) => Err(e).context("insert user"),
        }
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.db)
            .await
            .context("find user by email")
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("find user by id")
    }

    async fn update_password(
        &self,
        id: i64,
        password_hash: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET password = $2, password_updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .bind(now)
            .execute(&self.db)
            .await
            .context("update password")?;
        Ok(())
    }

    async fn set_reset_token(&self, id: i64, hashed: &str, expires_at: i64) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE users SET reset_token = $2, reset_token_expires_in = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(hashed)
        .bind(expires_at)
        .execute(&self.db)
        .await
        .context("set reset token")?;
        Ok(())
    }

    async fn find_by_reset_token(&self, hashed: &str, now_ms: i64) -> anyhow::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
              FROM users
             WHERE reset_token = $1
               AND reset_token_expires_in > $2
            "#
        ))
        .bind(hashed)
        .bind(now_ms)
        .fetch_optional(&self.db)
        .await
        .context("find user by reset token")
    }

    async fn consume_reset_token(
        &self,
        hashed: &str,
        password_hash: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE users
               SET password = $2,
                   password_updated_at = $3,
                   reset_token = NULL,
                   reset_token_expires_in = NULL
             WHERE reset_token = $1
            "#,
        )
        .bind(hashed)
        .bind(password_hash)
        .bind(now)
        .execute(&self.db)
        .await
        .context("consume reset token")?;
        Ok(res.rows_affected() == 1)
    }

    async fn update_profile(&self, id: i64, changes: &ProfileChanges) -> anyhow::Result<UpdateProfile> {
        let res = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET email = COALESCE($2, email),
                   full_name = COALESCE($3, full_name),
                   job_title = COALESCE($4, job_title),
                   linkedin = COALESCE($5, linkedin),
                   bio = COALESCE($6, bio)
             WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.email.as_deref())
        .bind(changes.full_name.as_deref())
        .bind(changes.job_title.as_deref())
        .bind(changes.linkedin.as_deref())
        .bind(changes.bio.as_deref())
        .fetch_optional(&self.db)
        .await;

        match res {
            Ok(Some(user)) => Ok(UpdateProfile::Updated(user)),
            Ok(None) => Ok(UpdateProfile::Missing),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Ok(UpdateProfile::EmailTaken),
            Err(e) => Err(e).context("update profile"),
        }
    }

    async fn set_image_url(&self, id: i64, image: ProfileImage, url: &str) -> anyhow::Result<()> {
        let sql = match image {
            ProfileImage::Avatar => "UPDATE users SET avatar_url = $2 WHERE id = $1",
            ProfileImage::Cover => "UPDATE users SET cover_url = $2 WHERE id = $1",
        };
        sqlx::query(sql)
            .bind(id)
            .bind(url)
            .execute(&self.db)
            .await
            .with_context(|| format!("set {image:?} url"))?;
        Ok(())
    }

    async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete user")?;
        Ok(res.rows_affected() == 1)
    }
}
