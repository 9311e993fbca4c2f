use crate::db::{self, Company, CompanyMember, CompanyRole};
use crate::state::SharedState;
use crate::web::session::UserSession;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

const INVITE_DAYS: i64 = 7;

#[derive(Deserialize)]
pub struct CreateCompanyRequest {
    pub name: String,
}

#[derive(Deserialize)]
pub struct InviteRequest {
    pub email: String,
}

#[derive(Serialize)]
pub struct InviteResponse {
    pub email: String,
    pub sent: bool,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", post(create_company))
        .route("/invites", post(create_invite))
        .route("/members", get(members))
        .with_state(state)
}

/// Company onboarding: the creator becomes the company's first admin.
async fn create_company(
    UserSession(profile): UserSession,
    State(state): State<SharedState>,
    Json(payload): Json<CreateCompanyRequest>,
) -> Result<(StatusCode, Json<Company>), StatusCode> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }
    if profile.company_id.is_some() {
        return Err(StatusCode::CONFLICT);
    }

    let company = db::create_company(&state.pool, name).await.map_err(|e| {
        tracing::error!("company insert failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    db::set_profile_company(&state.pool, profile.id, company.id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    db::add_member(&state.pool, company.id, profile.id, CompanyRole::Admin)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    tracing::info!(company = %company.id, owner = %profile.id, "company created");
    Ok((StatusCode::CREATED, Json(company)))
}

/// Creates an invite and emails the join link. Dispatch is fire-and-forget
/// beyond reporting success or failure back to the caller.
async fn create_invite(
    UserSession(profile): UserSession,
    State(state): State<SharedState>,
    Json(payload): Json<InviteRequest>,
) -> Result<Json<InviteResponse>, StatusCode> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }

    let company_id = profile.company_id.ok_or(StatusCode::FORBIDDEN)?;
    let allowed = db::has_hr_access(&state.pool, profile.id, company_id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    if !allowed {
        return Err(StatusCode::FORBIDDEN);
    }

    let company = db::find_company(&state.pool, company_id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    let token: String = (0..32)
        .map(|_| format!("{:02x}", rand::random::<u8>()))
        .collect();
    let expires_at = Utc::now() + Duration::days(INVITE_DAYS);

    db::create_invite(&state.pool, company_id, &email, &token, expires_at)
        .await
        .map_err(|e| {
            tracing::error!("invite insert failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let invite_link = format!("{}/auth?invite={}", state.app_base_url, token);
    state
        .email
        .send_invite(&email, &company.name, &invite_link)
        .await
        .map_err(|e| {
            tracing::error!(to = %email, error = %e, "invite email failed");
            StatusCode::BAD_GATEWAY
        })?;

    Ok(Json(InviteResponse { email, sent: true }))
}

async fn members(
    UserSession(profile): UserSession,
    State(state): State<SharedState>,
) -> Result<Json<Vec<CompanyMember>>, StatusCode> {
    let company_id = profile.company_id.ok_or(StatusCode::FORBIDDEN)?;
    let allowed = db::has_hr_access(&state.pool, profile.id, company_id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    if !allowed {
        return Err(StatusCode::FORBIDDEN);
    }

    let members = db::list_members(&state.pool, company_id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(members))
}
