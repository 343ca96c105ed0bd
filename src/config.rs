use std::env;
use std::str::FromStr;

use anyhow::{Context, Result};
use dotenvy::dotenv;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    /// Admin account ensured at startup, when both email and password are set
    pub seed_admin: Option<SeedAdmin>,
}

#[derive(Clone)]
pub struct SeedAdmin {
    pub name: String,
    pub email: String,
    pub password: String,
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn parsed_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let seed_admin = match (env::var("SEED_ADMIN_EMAIL"), env::var("SEED_ADMIN_PASSWORD")) {
            (Ok(email), Ok(password)) if !email.trim().is_empty() && !password.is_empty() => {
                Some(SeedAdmin {
                    name: env::var("SEED_ADMIN_NAME").unwrap_or_else(|_| "Administrator".to_string()),
                    email: email.trim().to_lowercase(),
                    password,
                })
            }
            _ => None,
        };

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: parsed_or("ACCESS_TOKEN_TTL", 900)?, // 15 min
            refresh_token_ttl: parsed_or("REFRESH_TOKEN_TTL", 604_800)?, // 7 days

            rate_login_per_min: parsed_or("RATE_LOGIN_PER_MIN", 60)?,
            rate_refresh_per_min: parsed_or("RATE_REFRESH_PER_MIN", 30)?,
            rate_protected_per_min: parsed_or("RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
            seed_admin,
        })
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            database_url: "mysql://localhost/ems_test".to_string(),
            jwt_secret: "test-secret".to_string(),
            server_addr: "127.0.0.1:0".to_string(),
            access_token_ttl: 900,
            refresh_token_ttl: 3600,
            rate_login_per_min: 60,
            rate_refresh_per_min: 30,
            rate_protected_per_min: 1000,
            api_prefix: "/api".to_string(),
            seed_admin: None,
        }
    }
}
