use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{LeaderboardQuery, SubmitScoreRequest, SubmitScoreResponse},
    repo_types::{LeaderboardEntry, Recorded},
    services::ScoreService,
};
use crate::{auth::extractors::AuthUser, body::parse_optional_json, error::ApiError, state::AppState};

pub fn read_routes() -> Router<AppState> {
    Router::new().route("/api/scores/leaderboard/", get(leaderboard))
}

pub fn write_routes() -> Router<AppState> {
    Router::new().route("/api/scores/submit/", post(submit_score))
}

/// 201 when a new best was stored, 200 when the previous best stands.
#[instrument(skip_all)]
pub async fn submit_score(
    State(service): State<ScoreService>,
    AuthUser(user): AuthUser,
    body: Bytes,
) -> Result<(StatusCode, Json<SubmitScoreResponse>), ApiError> {
    let payload: SubmitScoreRequest = parse_optional_json(&body)?;
    let recorded = service
        .submit(&user, payload.score.as_ref(), payload.time_played.as_ref())
        .await?;

    let (status, message) = match &recorded {
        Recorded::Created(_) => (StatusCode::CREATED, "High score saved successfully"),
        Recorded::Retained(_) => (StatusCode::OK, "Existing high score retained"),
    };
    let row = recorded.score();
    Ok((
        status,
        Json(SubmitScoreResponse {
            success: true,
            message,
            id: row.id,
            score: row.score,
        }),
    ))
}

#[instrument(skip(service))]
pub async fn leaderboard(
    State(service): State<ScoreService>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Vec<LeaderboardEntry>>, ApiError> {
    Ok(Json(service.leaderboard(query.limit()).await?))
}
