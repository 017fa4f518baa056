use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::jwt::JwtKeys;
use crate::auth::repo::{PgUserRepo, UserRepo};
use crate::config::AppConfig;
use crate::email::{self, Mailer};
use crate::projects::repo::{PgProjectRepo, ProjectRepo};
use crate::storage::{Storage, StorageClient};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub keys: Arc<JwtKeys>,
    pub users: Arc<dyn UserRepo>,
    pub projects: Arc<dyn ProjectRepo>,
    pub storage: Arc<dyn StorageClient>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub async fn init(config: AppConfig, db: PgPool) -> anyhow::Result<Self> {
        let storage = Arc::new(Storage::new(&config.storage).await?) as Arc<dyn StorageClient>;
        let mailer = email::from_config(&config.email)?;
        if config.email.smtp.is_none() {
            tracing::warn!("SMTP_HOST not set; outgoing email is only logged");
        }

        Ok(Self {
            keys: Arc::new(JwtKeys::from_config(&config.jwt)),
            users: Arc::new(PgUserRepo::new(db.clone())),
            projects: Arc::new(PgProjectRepo::new(db)),
            storage,
            mailer,
            config: Arc::new(config),
        })
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        crate::test_support::harness().state
    }
}
