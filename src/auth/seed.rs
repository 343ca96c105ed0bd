use anyhow::{Context, Result, anyhow};
use sqlx::MySqlPool;
use tracing::info;

use crate::auth::password::hash_password;
use crate::config::SeedAdmin;
use crate::model::role::Role;
use crate::utils::{email_cache, email_filter};

/// Creates the configured admin account unless that email is already registered.
pub async fn ensure_admin(pool: &MySqlPool, admin: &SeedAdmin) -> Result<()> {
    // EXISTS comes back as BIGINT on MySQL
    let exists = sqlx::query_scalar::<_, i64>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE email = ? LIMIT 1)",
    )
    .bind(&admin.email)
    .fetch_one(pool)
    .await
    .context("Failed to check for seed admin")?;

    if exists != 0 {
        info!(email = %admin.email, "Seed admin already present");
        return Ok(());
    }

    let hashed = hash_password(&admin.password).map_err(|e| anyhow!("Failed to hash seed admin password: {e}"))?;

    sqlx::query("INSERT INTO users (name, email, password, role_id) VALUES (?, ?, ?, ?)")
        .bind(&admin.name)
        .bind(&admin.email)
        .bind(hashed)
        .bind(Role::Admin.id())
        .execute(pool)
        .await
        .context("Failed to insert seed admin")?;

    email_filter::insert(&admin.email);
    email_cache::mark_taken(&admin.email).await;

    info!(email = %admin.email, "Seed admin created");
    Ok(())
}
