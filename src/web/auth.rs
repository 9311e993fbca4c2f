use crate::db::{self, CompanyRole, Profile};
use crate::middleware::RateLimiter;
use crate::state::SharedState;
use crate::web::session::{self, UserSession};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, SaltString},
    Argon2, PasswordVerifier,
};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Brute-force guards for the anonymous endpoints, keyed by email.
static LOGIN_LIMITER: Lazy<RateLimiter> = Lazy::new(|| RateLimiter::new(5, 60));
static SIGNUP_LIMITER: Lazy<RateLimiter> = Lazy::new(|| RateLimiter::new(3, 300));

/// Evicts expired limiter windows. Called from the background housekeeping
/// task in `main`.
pub async fn sweep_limiters() {
    LOGIN_LIMITER.sweep().await;
    SIGNUP_LIMITER.sweep().await;
}

#[derive(Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub username: Option<String>,
    pub invite_token: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub user_id: Uuid,
    pub email: String,
    pub username: Option<String>,
    pub company_id: Option<Uuid>,
    pub role: Option<CompanyRole>,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/me", get(me))
        .with_state(state)
}

async fn profile_response(
    state: &SharedState,
    profile: Profile,
) -> Result<SessionResponse, StatusCode> {
    let role = match profile.company_id {
        Some(company_id) => db::member_role(&state.pool, profile.id, company_id)
            .await
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?,
        None => None,
    };
    Ok(SessionResponse {
        user_id: profile.id,
        email: profile.email,
        username: profile.username,
        company_id: profile.company_id,
        role,
    })
}

async fn signup(
    State(state): State<SharedState>,
    Json(payload): Json<SignupRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') || payload.password.len() < 8 {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }

    if !SIGNUP_LIMITER.allow(&email).await {
        tracing::warn!(email = %email, "signup rate limit exceeded");
        return Err(StatusCode::TOO_MANY_REQUESTS);
    }

    // resolve the invite before creating anything so a bad token costs nothing
    let invite = match &payload.invite_token {
        Some(token) => Some(
            db::find_valid_invite(&state.pool, token)
                .await
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
                .ok_or(StatusCode::UNPROCESSABLE_ENTITY)?,
        ),
        None => None,
    };

    let salt = SaltString::generate(rand_core::OsRng);
    let hash = Argon2::default()
        .hash_password(payload.password.as_bytes(), &salt)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .to_string();

    let mut profile = db::create_profile(&state.pool, &email, &hash, payload.username.as_deref())
        .await
        .map_err(|e| {
            if e.as_database_error()
                .is_some_and(|db_err| db_err.is_unique_violation())
            {
                StatusCode::CONFLICT
            } else {
                tracing::error!("profile insert failed: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        })?;

    if let Some(invite) = invite {
        db::set_profile_company(&state.pool, profile.id, invite.company_id)
            .await
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        db::add_member(
            &state.pool,
            invite.company_id,
            profile.id,
            CompanyRole::Employee,
        )
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        db::delete_invite(&state.pool, invite.id)
            .await
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        profile.company_id = Some(invite.company_id);
        tracing::info!(user = %profile.id, company = %invite.company_id, "invite accepted at signup");
    }

    let token = session::sign_session(profile.id, &state.session_key)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let mut headers = HeaderMap::new();
    headers.insert(
        axum::http::header::SET_COOKIE,
        session::session_cookie(&token)
            .parse()
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?,
    );

    let body = profile_response(&state, profile).await?;
    Ok((StatusCode::CREATED, headers, Json(body)))
}

async fn login(
    State(state): State<SharedState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let email = payload.email.trim().to_lowercase();

    if !LOGIN_LIMITER.allow(&email).await {
        tracing::warn!(email = %email, "login rate limit exceeded");
        return Err(StatusCode::TOO_MANY_REQUESTS);
    }

    let profile = db::find_profile_by_email(&state.pool, &email)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let parsed_hash = PasswordHash::new(&profile.hash).map_err(|_| StatusCode::UNAUTHORIZED)?;
    Argon2::default()
        .verify_password(payload.password.as_bytes(), &parsed_hash)
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let token = session::sign_session(profile.id, &state.session_key)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let mut headers = HeaderMap::new();
    headers.insert(
        axum::http::header::SET_COOKIE,
        session::session_cookie(&token)
            .parse()
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?,
    );

    let body = profile_response(&state, profile).await?;
    Ok((headers, Json(body)))
}

async fn me(
    UserSession(profile): UserSession,
    State(state): State<SharedState>,
) -> Result<Json<SessionResponse>, StatusCode> {
    let body = profile_response(&state, profile).await?;
    Ok(Json(body))
}
