use crate::db::{self, CompanyRole};
use anyhow::Result;
use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2,
};
use sqlx::PgPool;

/// Bootstraps a first admin account and company from SEED_ADMIN_EMAIL /
/// SEED_ADMIN_PASSWORD / SEED_COMPANY. A no-op when the vars are absent or
/// the account already exists, so it is safe to run on every start.
pub async fn seed_admin(pool: &PgPool) -> Result<()> {
    let (Ok(email), Ok(password)) = (
        std::env::var("SEED_ADMIN_EMAIL"),
        std::env::var("SEED_ADMIN_PASSWORD"),
    ) else {
        return Ok(());
    };

    if db::find_profile_by_email(pool, &email).await?.is_some() {
        return Ok(());
    }

    let company_name = std::env::var("SEED_COMPANY").unwrap_or_else(|_| "Pulsato".to_string());

    let salt = SaltString::generate(rand_core::OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("failed to hash seed password: {}", e))?
        .to_string();

    let company = db::create_company(pool, &company_name).await?;
    let profile = db::create_profile(pool, &email, &hash, Some("Admin")).await?;
    db::set_profile_company(pool, profile.id, company.id).await?;
    db::add_member(pool, company.id, profile.id, CompanyRole::Admin).await?;

    tracing::info!(email = %email, company = %company_name, "seeded admin account");
    Ok(())
}
