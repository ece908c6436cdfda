use std::sync::Arc;

use axum::extract::FromRef;
use serde_json::Value;
use tracing::{info, instrument};

use super::{
    repo::ScoreStore,
    repo_types::{LeaderboardEntry, Recorded},
};
use crate::{auth::repo_types::User, error::ApiError, state::AppState};

pub const DEFAULT_LEADERBOARD_LIMIT: i64 = 10;
pub const MAX_LEADERBOARD_LIMIT: i64 = 100;

/// Keep-best submission policy and leaderboard reads.
#[derive(Clone)]
pub struct ScoreService {
    store: Arc<dyn ScoreStore>,
}

impl FromRef<AppState> for ScoreService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.scores.clone())
    }
}

/// Reads a non-negative i32 out of a JSON number or a numeric string.
/// `Ok(None)` means the value was absent or blank.
fn non_negative_int(value: Option<&Value>) -> Result<Option<i32>, ()> {
    let parsed = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(Value::String(s)) => s.trim().parse::<i64>().map_err(|_| ())?,
        Some(Value::Number(n)) => n.as_i64().ok_or(())?,
        Some(_) => return Err(()),
    };
    i32::try_from(parsed)
        .ok()
        .filter(|v| *v >= 0)
        .map(Some)
        .ok_or(())
}

pub fn parse_score(value: Option<&Value>) -> Result<i32, ApiError> {
    non_negative_int(value)
        .map_err(|_| ApiError::InvalidScore)?
        .ok_or(ApiError::MissingScore)
}

pub fn parse_time_played(value: Option<&Value>) -> Result<i32, ApiError> {
    Ok(non_negative_int(value)
        .map_err(|_| ApiError::InvalidTimePlayed)?
        .unwrap_or(0))
}

impl ScoreService {
    pub fn new(store: Arc<dyn ScoreStore>) -> Self {
        Self { store }
    }

    /// Stores the submission only if it beats the caller's best; otherwise
    /// reports the retained best unchanged.
    #[instrument(skip(self, user), fields(user_id = user.id))]
    pub async fn submit(
        &self,
        user: &User,
        score: Option<&Value>,
        time_played: Option<&Value>,
    ) -> Result<Recorded, ApiError> {
        let score = parse_score(score)?;
        let time_played = parse_time_played(time_played)?;

        let recorded = self
            .store
            .record_if_best(user.id, score, time_played)
            .await?;
        match &recorded {
            Recorded::Created(row) => {
                info!(%user, score = row.score, time_played = row.time_played, "new high score")
            }
            Recorded::Retained(best) => info!(
                %user,
                best = best.score,
                submitted = score,
                "existing high score retained"
            ),
        }
        Ok(recorded)
    }

    pub async fn leaderboard(&self, limit: i64) -> Result<Vec<LeaderboardEntry>, ApiError> {
        let limit = limit.clamp(1, MAX_LEADERBOARD_LIMIT);
        let rows = self.store.top(limit).await?;
        info!(count = rows.len(), limit, "leaderboard served");
        Ok(rows)
    }
}
