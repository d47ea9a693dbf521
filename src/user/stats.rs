//! Read-only aggregation over a user's posts and comments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Postgres};

use crate::error::Result;

const RECENT_ACTIVITY_LIMIT: i64 = 10;

/// Post and comment counts for one user.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserStats {
    pub posts: i64,
    pub comments: i64,
}

/// One recent post or comment, most recent first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Activity {
    /// Either `post` or `comment`.
    pub kind: String,
    pub id: i64,
    pub excerpt: String,
    pub created_at: DateTime<Utc>,
}

/// Read-only view over one user's contribution history.
///
/// No mutation happens here; safe to call concurrently with any write.
#[derive(Clone)]
pub struct UserStatsManager {
    pool: Pool<Postgres>,
    user_id: i64,
}

impl UserStatsManager {
    /// Create a manager reading `user_id`'s history.
    pub fn new(pool: Pool<Postgres>, user_id: i64) -> Self {
        Self { pool, user_id }
    }

    /// Counts of posts and comments attributable to the user.
    pub async fn get_user_stats(&self) -> Result<UserStats> {
        let stats = sqlx::query_as::<_, UserStats>(
            r#"SELECT
                (SELECT COUNT(*) FROM posts WHERE author_id = $1) AS posts,
                (SELECT COUNT(*) FROM comments WHERE author_id = $1) AS comments"#,
        )
        .bind(self.user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }

    /// Bounded, time-ordered list of the user's recent posts and
    /// comments, most recent first.
    pub async fn get_recent_activity(&self) -> Result<Vec<Activity>> {
        let activity = sqlx::query_as::<_, Activity>(
            r#"SELECT 'post' AS kind, id, title AS excerpt, created_at
                FROM posts WHERE author_id = $1
               UNION ALL
               SELECT 'comment' AS kind, id, LEFT(content, 80) AS excerpt, created_at
                FROM comments WHERE author_id = $1
               ORDER BY created_at DESC
               LIMIT $2"#,
        )
        .bind(self.user_id)
        .bind(RECENT_ACTIVITY_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        Ok(activity)
    }
}
