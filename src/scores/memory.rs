use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use super::{
    repo::ScoreStore,
    repo_types::{LeaderboardEntry, Recorded, Score},
};
use crate::auth::repo::UserStore;

/// In-process [`ScoreStore`] used by tests. Usernames are resolved through
/// the paired user store, like the SQL join does.
pub struct MemoryScoreStore {
    rows: Mutex<Vec<Score>>,
    users: Arc<dyn UserStore>,
}

impl MemoryScoreStore {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            users,
        }
    }

    pub async fn rows_for(&self, user_id: i64) -> Vec<Score> {
        let rows = self.rows.lock().await;
        rows.iter().filter(|s| s.user_id == user_id).cloned().collect()
    }

    /// Appends unconditionally, for seeding leaderboard fixtures.
    pub async fn push(&self, user_id: i64, score: i32, time_played: i32) -> Score {
        let mut rows = self.rows.lock().await;
        Self::append(&mut rows, user_id, score, time_played)
    }

    fn append(rows: &mut Vec<Score>, user_id: i64, score: i32, time_played: i32) -> Score {
        let row = Score {
            id: rows.len() as i64 + 1,
            user_id,
            score,
            time_played,
            created_at: OffsetDateTime::now_utc(),
        };
        rows.push(row.clone());
        row
    }
}

#[async_trait]
impl ScoreStore for MemoryScoreStore {
    async fn record_if_best(
        &self,
        user_id: i64,
        score: i32,
        time_played: i32,
    ) -> anyhow::Result<Recorded> {
        let mut rows = self.rows.lock().await;
        let best = rows
            .iter()
            .filter(|s| s.user_id == user_id)
            .min_by(|a, b| b.score.cmp(&a.score).then(a.id.cmp(&b.id)))
            .cloned();
        match best {
            Some(best) if best.score >= score => Ok(Recorded::Retained(best)),
            _ => Ok(Recorded::Created(Self::append(
                &mut rows,
                user_id,
                score,
                time_played,
            ))),
        }
    }

    async fn top(&self, limit: i64) -> anyhow::Result<Vec<LeaderboardEntry>> {
        let mut ranked = self.rows.lock().await.clone();
        ranked.sort_by(|a, b| b.score.cmp(&a.score).then(a.id.cmp(&b.id)));
        let limit = limit.max(0) as usize;

        let mut entries = Vec::with_capacity(limit.min(ranked.len()));
        for row in ranked {
            if entries.len() == limit {
                break;
            }
            let Some(owner) = self.users.find_by_id(row.user_id).await? else {
                continue;
            };
            entries.push(LeaderboardEntry {
                id: row.id,
                score: row.score,
                time_played: row.time_played,
                created_at: row.created_at,
                username: owner.email,
            });
        }
        Ok(entries)
    }
}
