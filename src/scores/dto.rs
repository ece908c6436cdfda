use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::services::DEFAULT_LEADERBOARD_LIMIT;

/// Raw submission body. Values stay untyped so that a missing score and a
/// malformed one can be told apart.
#[derive(Debug, Default, Deserialize)]
pub struct SubmitScoreRequest {
    pub score: Option<Value>,
    pub time_played: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct SubmitScoreResponse {
    pub success: bool,
    pub message: &'static str,
    pub id: i64,
    pub score: i32,
}

/// `limit` stays a raw string so a junk value falls back to the default
/// instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<String>,
}

impl LeaderboardQuery {
    pub fn limit(&self) -> i64 {
        self.limit
            .as_deref()
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .unwrap_or(DEFAULT_LEADERBOARD_LIMIT)
    }
}
