use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;

use super::repo_types::{LeaderboardEntry, Recorded, Score};

#[async_trait]
pub trait ScoreStore: Send + Sync {
    /// Appends a row only when `score` is strictly above the user's current
    /// best. Check and insert happen atomically per user.
    async fn record_if_best(
        &self,
        user_id: i64,
        score: i32,
        time_played: i32,
    ) -> anyhow::Result<Recorded>;

    /// Highest rows across all users, `score desc, id asc`.
    async fn top(&self, limit: i64) -> anyhow::Result<Vec<LeaderboardEntry>>;
}

#[derive(Clone)]
pub struct PgScoreStore {
    db: PgPool,
}

impl PgScoreStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ScoreStore for PgScoreStore {
    async fn record_if_best(
        &self,
        user_id: i64,
        score: i32,
        time_played: i32,
    ) -> anyhow::Result<Recorded> {
        let mut tx = self.db.begin().await.context("begin tx")?;

        // Held until commit/rollback; serializes submissions of one user.
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .context("lock user scores")?;

        let best = sqlx::query_as::<_, Score>(
            r#"
            SELECT id, user_id, score, time_played, created_at
              FROM scores
             WHERE user_id = $1
             ORDER BY score DESC, id ASC
             LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .context("select best score")?;

        if let Some(best) = best {
            if best.score >= score {
                tx.commit().await.context("commit tx")?;
                return Ok(Recorded::Retained(best));
            }
        }

        let created = sqlx::query_as::<_, Score>(
            r#"
            INSERT INTO scores (user_id, score, time_played)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, score, time_played, created_at
            "#,
        )
        .bind(user_id)
        .bind(score)
        .bind(time_played)
        .fetch_one(&mut *tx)
        .await
        .context("insert score")?;

        tx.commit().await.context("commit tx")?;
        Ok(Recorded::Created(created))
    }

    async fn top(&self, limit: i64) -> anyhow::Result<Vec<LeaderboardEntry>> {
        let rows = sqlx::query_as::<_, LeaderboardEntry>(
            r#"
            SELECT s.id, s.score, s.time_played, s.created_at, u.email AS username
              FROM scores s
              JOIN users u ON u.id = s.user_id
             ORDER BY s.score DESC, s.id ASC
             LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await
        .context("select leaderboard")?;
        Ok(rows)
    }
}
