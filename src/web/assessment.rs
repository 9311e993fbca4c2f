use crate::db::{self, NewAnalysis};
use crate::domain::conversation::{ConversationRecord, ConversationStatus, ConversationTurn};
use crate::domain::report::{cards_for_analysis, IndividualReport, ScoreCard};
use crate::state::SharedState;
use crate::web::session::UserSession;
use crate::web::RangeQuery;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A conversation as the results screen shows it: summary, transcript, and
/// one score card per catalog topic.
#[derive(Serialize)]
pub struct AssessmentView {
    pub conversation_id: String,
    pub status: ConversationStatus,
    pub summary: Option<String>,
    pub call_duration_secs: Option<i64>,
    pub termination_reason: Option<String>,
    pub transcript: Vec<ConversationTurn>,
    pub scores: Vec<ScoreCard>,
}

impl AssessmentView {
    fn from_record(record: ConversationRecord) -> Self {
        let scores = cards_for_analysis(record.analysis.as_ref());
        let summary = record
            .analysis
            .as_ref()
            .and_then(|a| a.transcript_summary.clone());
        let metadata = record.metadata.unwrap_or_default();
        Self {
            conversation_id: record.conversation_id,
            status: record.status,
            summary,
            call_duration_secs: metadata.call_duration_secs,
            termination_reason: metadata.termination_reason,
            transcript: record.transcript,
            scores,
        }
    }
}

#[derive(Serialize)]
pub struct SubmitResponse {
    pub id: Uuid,
    pub conversation_id: String,
    pub status: ConversationStatus,
    pub created_at: DateTime<Utc>,
    pub scores: Vec<ScoreCard>,
}

#[derive(Serialize)]
pub struct AssessmentDetail {
    pub id: Uuid,
    pub conversation_id: String,
    pub created_at: DateTime<Utc>,
    pub status: ConversationStatus,
    pub summary: Option<String>,
    pub scores: Vec<ScoreCard>,
    pub transcript: Option<Vec<ConversationTurn>>,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/history", get(history))
        .route("/history/:id", get(history_detail))
        .route("/:conversation_id", get(peek))
        .route("/:conversation_id/analysis", get(analysis))
        .route("/:conversation_id/submit", post(submit))
        .with_state(state)
}

/// One remote fetch, whatever the current status. The client uses this for
/// the first paint before deciding to wait on `/analysis`.
async fn peek(
    UserSession(_profile): UserSession,
    State(state): State<SharedState>,
    Path(conversation_id): Path<String>,
) -> Result<Json<AssessmentView>, StatusCode> {
    if conversation_id.trim().is_empty() {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }
    let record = state
        .voice
        .fetch_conversation(&conversation_id)
        .await
        .map_err(|e| {
            tracing::error!(conversation = %conversation_id, error = %e, "conversation fetch failed");
            StatusCode::BAD_GATEWAY
        })?;
    Ok(Json(AssessmentView::from_record(record)))
}

/// The retrieval flow: responds once the remote record leaves `processing`.
/// A dropped request (client navigated away) aborts the underlying watcher,
/// so nothing keeps polling for an audience that left.
async fn analysis(
    UserSession(_profile): UserSession,
    State(state): State<SharedState>,
    Path(conversation_id): Path<String>,
) -> Result<Json<AssessmentView>, StatusCode> {
    if conversation_id.trim().is_empty() {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }
    let record = state
        .voice
        .poll_until_terminal(&conversation_id)
        .await
        .map_err(|e| {
            tracing::error!(conversation = %conversation_id, error = %e, "analysis retrieval failed");
            StatusCode::BAD_GATEWAY
        })?;
    Ok(Json(AssessmentView::from_record(record)))
}

/// "Send to employer": copies the completed conversation's analysis into a
/// stored record, exactly once, owned by the caller.
async fn submit(
    UserSession(profile): UserSession,
    State(state): State<SharedState>,
    Path(conversation_id): Path<String>,
) -> Result<(StatusCode, Json<SubmitResponse>), StatusCode> {
    if conversation_id.trim().is_empty() {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }
    let record = state
        .voice
        .fetch_conversation(&conversation_id)
        .await
        .map_err(|e| {
            tracing::error!(conversation = %conversation_id, error = %e, "conversation fetch failed");
            StatusCode::BAD_GATEWAY
        })?;

    match record.status {
        ConversationStatus::Processing => return Err(StatusCode::CONFLICT),
        ConversationStatus::Error => return Err(StatusCode::UNPROCESSABLE_ENTITY),
        ConversationStatus::Done => {}
    }

    // transcripts are sealed before they touch the database
    let enc_transcript = if record.transcript.is_empty() {
        None
    } else {
        let raw = serde_json::to_string(&record.transcript)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        Some(
            state
                .cipher
                .seal(&raw)
                .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?,
        )
    };

    let row = db::insert_analysis(
        &state.pool,
        NewAnalysis {
            conversation_id: &record.conversation_id,
            user_id: profile.id,
            company_id: profile.company_id,
            status: record.status,
            analysis: record.analysis.as_ref(),
            enc_transcript,
            metadata: record.metadata.as_ref(),
        },
    )
    .await
    .map_err(|e| {
        tracing::error!("analysis insert failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    tracing::info!(user = %profile.id, conversation = %row.conversation_id, "assessment submitted");

    let stored = row.into_stored();
    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            id: stored.id,
            conversation_id: stored.conversation_id,
            status: stored.status,
            created_at: stored.created_at,
            scores: cards_for_analysis(stored.analysis.as_ref()),
        }),
    ))
}

async fn history(
    UserSession(profile): UserSession,
    State(state): State<SharedState>,
    Query(range): Query<RangeQuery>,
) -> Result<Json<Vec<IndividualReport>>, StatusCode> {
    let range = range.into_range()?;
    let rows = db::analyses_for_user(&state.pool, profile.id, range.as_ref())
        .await
        .map_err(|e| {
            tracing::error!("history query failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let reports = rows
        .into_iter()
        .map(|row| IndividualReport::from_stored(&row.into_stored()))
        .collect();
    Ok(Json(reports))
}

async fn history_detail(
    UserSession(profile): UserSession,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AssessmentDetail>, StatusCode> {
    let row = db::find_analysis_for_user(&state.pool, id, profile.id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    let transcript = row.enc_transcript.as_deref().and_then(|sealed| {
        let raw = state
            .cipher
            .open(sealed)
            .map_err(|e| tracing::warn!(record = %row.id, error = %e, "transcript decrypt failed"))
            .ok()?;
        serde_json::from_str::<Vec<ConversationTurn>>(&raw).ok()
    });

    let stored = row.into_stored();
    let summary = stored
        .analysis
        .as_ref()
        .and_then(|a| a.transcript_summary.clone());
    Ok(Json(AssessmentDetail {
        id: stored.id,
        conversation_id: stored.conversation_id,
        created_at: stored.created_at,
        status: stored.status,
        summary,
        scores: cards_for_analysis(stored.analysis.as_ref()),
        transcript,
    }))
}
