pub mod seed;

use crate::domain::aggregate::{DateRange, StoredAnalysis};
use crate::domain::conversation::{ConversationAnalysis, ConversationMetadata, ConversationStatus};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// Role of a user inside one company. A user with no membership has no role
/// anywhere; roles are never a global user attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "company_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CompanyRole {
    Employee,
    Hr,
    Admin,
}

#[derive(Debug, FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub hash: String,
    pub username: Option<String>,
    pub company_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow, Serialize)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
pub struct CompanyInvite {
    pub id: Uuid,
    pub company_id: Uuid,
    pub email: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, FromRow, Serialize)]
pub struct CompanyMember {
    pub user_id: Uuid,
    pub email: String,
    pub username: Option<String>,
    pub role: CompanyRole,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
pub struct AnalysisRow {
    pub id: Uuid,
    pub conversation_id: String,
    pub user_id: Uuid,
    pub company_id: Option<Uuid>,
    pub status: ConversationStatus,
    pub analysis: Option<Json<ConversationAnalysis>>,
    pub enc_transcript: Option<String>,
    pub created_at: DateTime<Utc>,
    pub username: Option<String>,
}

impl AnalysisRow {
    pub fn into_stored(self) -> StoredAnalysis {
        StoredAnalysis {
            id: self.id,
            conversation_id: self.conversation_id,
            user_id: self.user_id,
            company_id: self.company_id,
            status: self.status,
            analysis: self.analysis.map(|json| json.0),
            created_at: self.created_at,
            username: self.username,
        }
    }
}

const ANALYSIS_COLUMNS: &str = "ca.id, ca.conversation_id, ca.user_id, ca.company_id, ca.status, \
     ca.analysis, ca.enc_transcript, ca.created_at, p.username";

// ---- profiles ----

pub async fn create_profile(
    pool: &PgPool,
    email: &str,
    hash: &str,
    username: Option<&str>,
) -> Result<Profile, sqlx::Error> {
    sqlx::query_as::<_, Profile>(
        r#"
        INSERT INTO profiles (email, hash, username)
        VALUES ($1, $2, $3)
        RETURNING id, email, hash, username, company_id, created_at
        "#,
    )
    .bind(email)
    .bind(hash)
    .bind(username)
    .fetch_one(pool)
    .await
}

pub async fn find_profile_by_email(pool: &PgPool, email: &str) -> Result<Option<Profile>> {
    let profile = sqlx::query_as::<_, Profile>(
        "SELECT id, email, hash, username, company_id, created_at FROM profiles WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;
    Ok(profile)
}

pub async fn find_profile_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Profile>> {
    let profile = sqlx::query_as::<_, Profile>(
        "SELECT id, email, hash, username, company_id, created_at FROM profiles WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(profile)
}

pub async fn set_profile_company(pool: &PgPool, user_id: Uuid, company_id: Uuid) -> Result<()> {
    sqlx::query("UPDATE profiles SET company_id = $2, updated_at = NOW() WHERE id = $1")
        .bind(user_id)
        .bind(company_id)
        .execute(pool)
        .await?;
    Ok(())
}

// ---- companies & membership ----

pub async fn create_company(pool: &PgPool, name: &str) -> Result<Company> {
    let company = sqlx::query_as::<_, Company>(
        "INSERT INTO companies (name) VALUES ($1) RETURNING id, name, created_at",
    )
    .bind(name)
    .fetch_one(pool)
    .await?;
    Ok(company)
}

pub async fn find_company(pool: &PgPool, id: Uuid) -> Result<Option<Company>> {
    let company = sqlx::query_as::<_, Company>(
        "SELECT id, name, created_at FROM companies WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(company)
}

pub async fn add_member(
    pool: &PgPool,
    company_id: Uuid,
    user_id: Uuid,
    role: CompanyRole,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO company_members (company_id, user_id, role)
        VALUES ($1, $2, $3)
        ON CONFLICT (company_id, user_id) DO NOTHING
        "#,
    )
    .bind(company_id)
    .bind(user_id)
    .bind(role)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn member_role(
    pool: &PgPool,
    user_id: Uuid,
    company_id: Uuid,
) -> Result<Option<CompanyRole>> {
    let role = sqlx::query_scalar::<_, CompanyRole>(
        "SELECT role FROM company_members WHERE user_id = $1 AND company_id = $2",
    )
    .bind(user_id)
    .bind(company_id)
    .fetch_optional(pool)
    .await?;
    Ok(role)
}

/// Mirrors the original row-policy check: HR reports are visible to `hr`
/// and `admin` members of the company, nobody else.
pub async fn has_hr_access(pool: &PgPool, user_id: Uuid, company_id: Uuid) -> Result<bool> {
    let role = member_role(pool, user_id, company_id).await?;
    Ok(matches!(role, Some(CompanyRole::Hr | CompanyRole::Admin)))
}

pub async fn list_members(pool: &PgPool, company_id: Uuid) -> Result<Vec<CompanyMember>> {
    let members = sqlx::query_as::<_, CompanyMember>(
        r#"
        SELECT cm.user_id, p.email, p.username, cm.role, cm.created_at AS joined_at
        FROM company_members cm
        JOIN profiles p ON p.id = cm.user_id
        WHERE cm.company_id = $1
        ORDER BY cm.created_at ASC
        "#,
    )
    .bind(company_id)
    .fetch_all(pool)
    .await?;
    Ok(members)
}

// ---- invites ----

pub async fn create_invite(
    pool: &PgPool,
    company_id: Uuid,
    email: &str,
    token: &str,
    expires_at: DateTime<Utc>,
) -> Result<CompanyInvite> {
    let invite = sqlx::query_as::<_, CompanyInvite>(
        r#"
        INSERT INTO company_invites (company_id, email, token, expires_at)
        VALUES ($1, $2, $3, $4)
        RETURNING id, company_id, email, token, expires_at
        "#,
    )
    .bind(company_id)
    .bind(email)
    .bind(token)
    .bind(expires_at)
    .fetch_one(pool)
    .await?;
    Ok(invite)
}

pub async fn find_valid_invite(pool: &PgPool, token: &str) -> Result<Option<CompanyInvite>> {
    let invite = sqlx::query_as::<_, CompanyInvite>(
        r#"
        SELECT id, company_id, email, token, expires_at
        FROM company_invites
        WHERE token = $1 AND expires_at > NOW()
        "#,
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;
    Ok(invite)
}

pub async fn delete_invite(pool: &PgPool, id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM company_invites WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

// ---- stored analyses ----

pub struct NewAnalysis<'a> {
    pub conversation_id: &'a str,
    pub user_id: Uuid,
    pub company_id: Option<Uuid>,
    pub status: ConversationStatus,
    pub analysis: Option<&'a ConversationAnalysis>,
    pub enc_transcript: Option<String>,
    pub metadata: Option<&'a ConversationMetadata>,
}

pub async fn insert_analysis(pool: &PgPool, new: NewAnalysis<'_>) -> Result<AnalysisRow> {
    let row = sqlx::query_as::<_, AnalysisRow>(
        r#"
        INSERT INTO conversation_analyses
            (conversation_id, user_id, company_id, status, analysis, enc_transcript, metadata)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, conversation_id, user_id, company_id, status, analysis,
                  enc_transcript, created_at, NULL::text AS username
        "#,
    )
    .bind(new.conversation_id)
    .bind(new.user_id)
    .bind(new.company_id)
    .bind(new.status)
    .bind(new.analysis.map(Json))
    .bind(new.enc_transcript)
    .bind(new.metadata.map(Json))
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// The caller's own submitted reports, newest first, optionally bounded by an
/// inclusive created-at window (both ends in SQL, matching the aggregation
/// semantics).
pub async fn analyses_for_user(
    pool: &PgPool,
    user_id: Uuid,
    range: Option<&DateRange>,
) -> Result<Vec<AnalysisRow>> {
    let rows = sqlx::query_as::<_, AnalysisRow>(&format!(
        r#"
        SELECT {ANALYSIS_COLUMNS}
        FROM conversation_analyses ca
        JOIN profiles p ON p.id = ca.user_id
        WHERE ca.user_id = $1
          AND ca.status = 'done'
          AND ($2::timestamptz IS NULL OR ca.created_at >= $2)
          AND ($3::timestamptz IS NULL OR ca.created_at <= $3)
        ORDER BY ca.created_at DESC
        "#
    ))
    .bind(user_id)
    .bind(range.map(|r| r.start))
    .bind(range.map(|r| r.end))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Every completed report submitted to a company. Date filtering for the HR
/// view happens in the aggregation flow, not here.
pub async fn analyses_for_company(pool: &PgPool, company_id: Uuid) -> Result<Vec<AnalysisRow>> {
    let rows = sqlx::query_as::<_, AnalysisRow>(&format!(
        r#"
        SELECT {ANALYSIS_COLUMNS}
        FROM conversation_analyses ca
        JOIN profiles p ON p.id = ca.user_id
        WHERE ca.company_id = $1
          AND ca.status = 'done'
        ORDER BY ca.created_at DESC
        "#
    ))
    .bind(company_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn find_analysis_for_user(
    pool: &PgPool,
    id: Uuid,
    user_id: Uuid,
) -> Result<Option<AnalysisRow>> {
    let row = sqlx::query_as::<_, AnalysisRow>(&format!(
        r#"
        SELECT {ANALYSIS_COLUMNS}
        FROM conversation_analyses ca
        JOIN profiles p ON p.id = ca.user_id
        WHERE ca.id = $1 AND ca.user_id = $2
        "#
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn count_company_analyses(pool: &PgPool, company_id: Uuid) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM conversation_analyses WHERE company_id = $1",
    )
    .bind(company_id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}
