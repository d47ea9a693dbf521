//! Handle database requests for direct messages.

use sqlx::{PgExecutor, Pool, Postgres, Transaction};

use crate::error::{Error, Result};
use crate::message::{ConversationHead, DirectMessage};

#[derive(Clone)]
pub struct MessageRepository {
    pool: Pool<Postgres>,
}

impl MessageRepository {
    /// Create a new [`MessageRepository`].
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Start a transaction for operations that read then write.
    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>> {
        Ok(self.pool.begin().await?)
    }

    /// Insert a new message, unread, timestamped by the database.
    pub async fn insert(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        sender_id: i64,
        recipient_id: i64,
        subject: &str,
        content: &str,
    ) -> Result<DirectMessage> {
        let message = sqlx::query_as::<_, DirectMessage>(
            r#"INSERT INTO direct_messages (sender_id, recipient_id, subject, content)
                VALUES ($1, $2, $3, $4)
                RETURNING *"#,
        )
        .bind(sender_id)
        .bind(recipient_id)
        .bind(subject)
        .bind(content)
        .fetch_one(&mut **tx)
        .await?;

        Ok(message)
    }

    /// Find one message by id.
    pub async fn find(&self, message_id: i64) -> Result<DirectMessage> {
        sqlx::query_as::<_, DirectMessage>(
            r#"SELECT * FROM direct_messages WHERE id = $1"#,
        )
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(Error::MessageNotFound)
    }

    /// Messages received by `user_id`, newest first, minus the ones the
    /// recipient deleted.
    pub async fn inbox(&self, user_id: i64) -> Result<Vec<DirectMessage>> {
        let messages = sqlx::query_as::<_, DirectMessage>(
            r#"SELECT * FROM direct_messages
                WHERE recipient_id = $1 AND NOT deleted_by_recipient
                ORDER BY sent_at DESC"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    /// Messages sent by `user_id`, newest first, minus the ones the
    /// sender deleted.
    pub async fn sent(&self, user_id: i64) -> Result<Vec<DirectMessage>> {
        let messages = sqlx::query_as::<_, DirectMessage>(
            r#"SELECT * FROM direct_messages
                WHERE sender_id = $1 AND NOT deleted_by_sender
                ORDER BY sent_at DESC"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    /// Both directions between `user_id` and `other_id`, in
    /// chronological reading order, from `user_id`'s point of view.
    pub async fn conversation(
        &self,
        user_id: i64,
        other_id: i64,
    ) -> Result<Vec<DirectMessage>> {
        let messages = sqlx::query_as::<_, DirectMessage>(
            r#"SELECT * FROM direct_messages
                WHERE (sender_id = $1 AND recipient_id = $2 AND NOT deleted_by_sender)
                   OR (sender_id = $2 AND recipient_id = $1 AND NOT deleted_by_recipient)
                ORDER BY sent_at ASC"#,
        )
        .bind(user_id)
        .bind(other_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    /// Mark every unread message from `sender_id` to `recipient_id` as
    /// read; returns how many rows changed.
    ///
    /// Copies the recipient already deleted are left untouched.
    pub async fn mark_read(
        &self,
        recipient_id: i64,
        sender_id: i64,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"UPDATE direct_messages
                SET is_read = TRUE
                WHERE recipient_id = $1 AND sender_id = $2
                  AND NOT is_read AND NOT deleted_by_recipient"#,
        )
        .bind(recipient_id)
        .bind(sender_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Hide a message from `user_id`'s side; the row disappears once
    /// both parties have deleted their copy.
    ///
    /// Runs as one transaction: the row is locked so two concurrent
    /// per-side deletions cannot miss the final removal.
    pub async fn delete_for(&self, message_id: i64, user_id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let message = sqlx::query_as::<_, DirectMessage>(
            r#"SELECT * FROM direct_messages WHERE id = $1 FOR UPDATE"#,
        )
        .bind(message_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(Error::MessageNotFound)?;

        if message.sender_id != user_id && message.recipient_id != user_id {
            return Err(Error::Forbidden(
                "only the sender or the recipient may delete a message",
            ));
        }

        let deleted_by_sender =
            message.deleted_by_sender || message.sender_id == user_id;
        let deleted_by_recipient =
            message.deleted_by_recipient || message.recipient_id == user_id;

        if deleted_by_sender && deleted_by_recipient {
            sqlx::query(r#"DELETE FROM direct_messages WHERE id = $1"#)
                .bind(message_id)
                .execute(&mut *tx)
                .await?;
        } else {
            sqlx::query(
                r#"UPDATE direct_messages
                    SET deleted_by_sender = $1, deleted_by_recipient = $2
                    WHERE id = $3"#,
            )
            .bind(deleted_by_sender)
            .bind(deleted_by_recipient)
            .bind(message_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Deduplicated, recency-ordered list of partners `user_id` has
    /// exchanged messages with.
    pub async fn recent_conversations(
        &self,
        user_id: i64,
        limit: i64,
    ) -> Result<Vec<ConversationHead>> {
        let conversations = sqlx::query_as::<_, ConversationHead>(
            r#"SELECT partner_id, partner_username, last_message_at FROM (
                SELECT DISTINCT ON (partner.id)
                       partner.id AS partner_id,
                       partner.username AS partner_username,
                       m.sent_at AS last_message_at
                FROM direct_messages m
                JOIN users partner ON partner.id =
                    CASE WHEN m.sender_id = $1 THEN m.recipient_id ELSE m.sender_id END
                WHERE (m.sender_id = $1 AND NOT m.deleted_by_sender)
                   OR (m.recipient_id = $1 AND NOT m.deleted_by_recipient)
                ORDER BY partner.id, m.sent_at DESC
               ) latest
               ORDER BY last_message_at DESC
               LIMIT $2"#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(conversations)
    }

    /// Whether `blocker_id` blocks `blocked_id`.
    pub async fn is_blocked(
        &self,
        blocker_id: i64,
        blocked_id: i64,
    ) -> Result<bool> {
        self.is_blocked_with(&self.pool, blocker_id, blocked_id).await
    }

    /// Same check on an explicit executor, for transactional callers.
    pub async fn is_blocked_with<'e>(
        &self,
        executor: impl PgExecutor<'e>,
        blocker_id: i64,
        blocked_id: i64,
    ) -> Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as(
            r#"SELECT 1::BIGINT FROM user_blocks
                WHERE blocker_id = $1 AND blocked_id = $2"#,
        )
        .bind(blocker_id)
        .bind(blocked_id)
        .fetch_optional(executor)
        .await?;

        Ok(row.is_some())
    }

    /// Record a block; idempotent.
    pub async fn block(&self, blocker_id: i64, blocked_id: i64) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO user_blocks (blocker_id, blocked_id)
                VALUES ($1, $2)
                ON CONFLICT DO NOTHING"#,
        )
        .bind(blocker_id)
        .bind(blocked_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Remove a block; idempotent.
    pub async fn unblock(&self, blocker_id: i64, blocked_id: i64) -> Result<()> {
        sqlx::query(
            r#"DELETE FROM user_blocks
                WHERE blocker_id = $1 AND blocked_id = $2"#,
        )
        .bind(blocker_id)
        .bind(blocked_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
