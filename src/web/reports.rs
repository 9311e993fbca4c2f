use crate::db::{self, CompanyRole};
use crate::domain::aggregate::{aggregate, DateRange, StoredAnalysis};
use crate::domain::report::{cards_for_aggregate, IndividualReport, ScoreCard};
use crate::state::SharedState;
use crate::web::session::UserSession;
use crate::web::RangeQuery;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

/// The HR view: the team aggregate plus the per-record breakdown, both over
/// the same filtered window.
#[derive(Serialize)]
pub struct TeamReport {
    pub company_id: Uuid,
    pub range: Option<DateRange>,
    /// Records feeding the aggregate ("based on reports from N team
    /// members"). Counts records, not distinct users.
    pub report_count: usize,
    pub overview: Vec<ScoreCard>,
    pub individual: Vec<IndividualReport>,
}

#[derive(Serialize)]
pub struct CompanyStats {
    pub total_assessments: i64,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/team", get(team_report))
        .route("/stats", get(company_stats))
        .with_state(state)
}

async fn team_report(
    UserSession(profile): UserSession,
    State(state): State<SharedState>,
    Query(range): Query<RangeQuery>,
) -> Result<Json<TeamReport>, StatusCode> {
    let range = range.into_range()?;
    let company_id = profile.company_id.ok_or(StatusCode::FORBIDDEN)?;

    let allowed = db::has_hr_access(&state.pool, profile.id, company_id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    if !allowed {
        tracing::warn!(user = %profile.id, company = %company_id, "team report denied");
        return Err(StatusCode::FORBIDDEN);
    }

    let records: Vec<StoredAnalysis> = db::analyses_for_company(&state.pool, company_id)
        .await
        .map_err(|e| {
            tracing::error!("company analyses query failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .into_iter()
        .map(db::AnalysisRow::into_stored)
        .collect();

    let team = aggregate(&records, range.as_ref());
    let individual: Vec<IndividualReport> = records
        .iter()
        .filter(|r| range.as_ref().map_or(true, |w| w.contains(r.created_at)))
        .map(IndividualReport::from_stored)
        .collect();

    Ok(Json(TeamReport {
        company_id,
        range,
        report_count: team.report_count,
        overview: cards_for_aggregate(&team),
        individual,
    }))
}

/// Total submitted assessments for the admin dashboard card.
async fn company_stats(
    UserSession(profile): UserSession,
    State(state): State<SharedState>,
) -> Result<Json<CompanyStats>, StatusCode> {
    let company_id = profile.company_id.ok_or(StatusCode::FORBIDDEN)?;

    let role = db::member_role(&state.pool, profile.id, company_id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    if role != Some(CompanyRole::Admin) {
        return Err(StatusCode::FORBIDDEN);
    }

    let total_assessments = db::count_company_analyses(&state.pool, company_id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(CompanyStats { total_assessments }))
}
