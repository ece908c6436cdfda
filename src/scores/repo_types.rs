use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

/// One accepted submission. Rows are append-only.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Score {
    pub id: i64,
    pub user_id: i64,
    pub score: i32,
    pub time_played: i32, // seconds
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Leaderboard row: a score joined with its owner's email.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LeaderboardEntry {
    pub id: i64,
    pub score: i32,
    pub time_played: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub username: String,
}

/// What a conditional insert did.
#[derive(Debug, Clone)]
pub enum Recorded {
    /// The submission beat the previous best and was stored.
    Created(Score),
    /// An equal or higher score already exists; nothing was written.
    Retained(Score),
}

impl Recorded {
    pub fn score(&self) -> &Score {
        match self {
            Recorded::Created(s) | Recorded::Retained(s) => s,
        }
    }
}
