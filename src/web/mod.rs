pub mod assessment;
pub mod auth;
pub mod company;
pub mod reports;
pub mod session;

use crate::domain::aggregate::DateRange;
use crate::state::SharedState;
use axum::{http::StatusCode, routing::get, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Optional inclusive date window, as the history and report endpoints accept
/// it. Both ends or neither; a half-open or inverted window is a client error.
#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl RangeQuery {
    pub fn into_range(self) -> Result<Option<DateRange>, StatusCode> {
        match (self.start, self.end) {
            (Some(start), Some(end)) if start <= end => Ok(Some(DateRange { start, end })),
            (None, None) => Ok(None),
            _ => Err(StatusCode::UNPROCESSABLE_ENTITY),
        }
    }
}

async fn health() -> &'static str {
    "OK"
}

pub fn routes(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/auth", auth::router(state.clone()))
        .nest("/api/assessments", assessment::router(state.clone()))
        .nest("/api/reports", reports::router(state.clone()))
        .nest("/api/companies", company::router(state))
}
