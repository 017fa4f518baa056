use std::str::FromStr;

use anyhow::{bail, Context};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn is_production(self) -> bool {
        self == AppEnv::Production
    }
}

impl FromStr for AppEnv {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(AppEnv::Development),
            "production" | "prod" => Ok(AppEnv::Production),
            other => bail!("unknown APP_ENV {other:?}"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub issuer: String,
    pub audience: String,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
    pub cookie_expires_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub public_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    pub from: String,
    /// `None` means outgoing mail is only logged.
    pub smtp: Option<SmtpConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub env: AppEnv,
    pub database_url: String,
    pub frontend_url: String,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
    pub email: EmailConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let env = var_or("APP_ENV", "development").parse::<AppEnv>()?;
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL")?;

        let jwt = JwtConfig {
            access_secret: std::env::var("JWT_ACCESS_SECRET").context("JWT_ACCESS_SECRET")?,
            refresh_secret: std::env::var("JWT_REFRESH_SECRET").context("JWT_REFRESH_SECRET")?,
            issuer: var_or("JWT_ISSUER", "devport"),
            audience: var_or("JWT_AUDIENCE", "devport-users"),
            access_ttl_minutes: parsed_or("JWT_ACCESS_TTL_MINUTES", 15),
            refresh_ttl_minutes: parsed_or("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 14),
            cookie_expires_days: parsed_or("JWT_COOKIE_EXPIRES_DAYS", 14),
        };
        jwt.check()?;

        let storage = StorageConfig {
            endpoint: std::env::var("STORAGE_ENDPOINT").context("STORAGE_ENDPOINT")?,
            bucket: std::env::var("STORAGE_BUCKET").context("STORAGE_BUCKET")?,
            access_key: std::env::var("STORAGE_ACCESS_KEY").context("STORAGE_ACCESS_KEY")?,
            secret_key: std::env::var("STORAGE_SECRET_KEY").context("STORAGE_SECRET_KEY")?,
            region: var_or("STORAGE_REGION", "us-east-1"),
            public_url: std::env::var("STORAGE_PUBLIC_URL").context("STORAGE_PUBLIC_URL")?,
        };

        let smtp = match std::env::var("SMTP_HOST") {
            Ok(host) if !host.trim().is_empty() => Some(SmtpConfig {
                host,
                port: parsed_or("SMTP_PORT", 587),
                username: var_or("SMTP_USERNAME", ""),
                password: var_or("SMTP_PASSWORD", ""),
            }),
            _ => None,
        };
        let email = EmailConfig {
            from: var_or("EMAIL_FROM", "noreply@devport.local"),
            smtp,
        };

        Ok(Self {
            env,
            database_url,
            frontend_url: var_or("FRONTEND_URL", "http://localhost:5173")
                .trim_end_matches('/')
                .to_string(),
            jwt,
            storage,
            email,
        })
    }
}

impl JwtConfig {
    fn check(&self) -> anyhow::Result<()> {
        if self.access_secret.is_empty() || self.refresh_secret.is_empty() {
            bail!("jwt secrets must not be empty");
        }
        if self.access_secret == self.refresh_secret {
            bail!("JWT_ACCESS_SECRET and JWT_REFRESH_SECRET must differ");
        }
        if self.access_ttl_minutes <= 0 || self.refresh_ttl_minutes <= 0 {
            bail!("jwt ttl values must be positive");
        }
        Ok(())
    }
}

fn var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parsed_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
