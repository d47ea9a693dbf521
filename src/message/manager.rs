//! Messaging operations scoped to one acting user.

use sqlx::{Pool, Postgres};
use validator::Validate;

use crate::error::{Error, Result};
use crate::message::{ConversationHead, DirectMessage, MessageRepository};
use crate::user::{User, UserRepository};

const RECENT_CONVERSATIONS_LIMIT: i64 = 20;

/// Subject and content bounds checked before any row is written.
#[derive(Debug, Validate)]
struct Draft<'a> {
    #[validate(length(
        min = 1,
        max = 200,
        message = "Subject must be 1 to 200 characters long."
    ))]
    subject: &'a str,
    #[validate(length(
        min = 10,
        max = 5000,
        message = "Content must be 10 to 5000 characters long."
    ))]
    content: &'a str,
}

/// Orchestrates sending, retrieval, read-state and deletion of direct
/// messages on behalf of one acting user.
#[derive(Clone)]
pub struct MessageManager {
    repo: MessageRepository,
    users: UserRepository,
    user_id: i64,
}

impl MessageManager {
    /// Create a manager acting on behalf of `user_id`.
    pub fn new(pool: Pool<Postgres>, user_id: i64) -> Self {
        Self {
            repo: MessageRepository::new(pool.clone()),
            users: UserRepository::new(pool),
            user_id,
        }
    }

    /// Whether the acting user may message `recipient`.
    ///
    /// Denied when the recipient is the acting user, has deactivated
    /// their account, or blocks the sender.
    pub async fn can_send_message_to(&self, recipient: &User) -> Result<()> {
        Self::check_recipient(self.user_id, recipient)?;

        if self.repo.is_blocked(recipient.id, self.user_id).await? {
            return Err(Error::Forbidden(
                "recipient does not accept your messages",
            ));
        }

        Ok(())
    }

    fn check_recipient(sender_id: i64, recipient: &User) -> Result<()> {
        if recipient.id == sender_id {
            return Err(Error::Forbidden("cannot message yourself"));
        }

        if !recipient.is_active {
            return Err(Error::Forbidden("recipient account is deactivated"));
        }

        Ok(())
    }

    /// Resolve the recipient, validate the draft and create the message.
    ///
    /// Fails with a distinct reason for an unknown recipient, invalid
    /// content, and a denied permission; nothing is written on failure.
    /// The permission checks and the insert run in one transaction, with
    /// the recipient row locked until commit.
    pub async fn send_message(
        &self,
        recipient_username: &str,
        subject: &str,
        content: &str,
    ) -> Result<DirectMessage> {
        Draft { subject, content }.validate()?;

        let mut tx = self.repo.begin().await?;

        let recipient = self
            .users
            .find_by_username_for_update(&mut tx, recipient_username)
            .await?;
        Self::check_recipient(self.user_id, &recipient)?;

        if self
            .repo
            .is_blocked_with(&mut *tx, recipient.id, self.user_id)
            .await?
        {
            return Err(Error::Forbidden(
                "recipient does not accept your messages",
            ));
        }

        let message = self
            .repo
            .insert(&mut tx, self.user_id, recipient.id, subject, content)
            .await?;
        tx.commit().await?;

        tracing::info!(
            message_id = message.id,
            sender_id = self.user_id,
            recipient_id = recipient.id,
            "message sent"
        );

        Ok(message)
    }

    /// Messages where the acting user is recipient, newest first.
    pub async fn get_inbox(&self) -> Result<Vec<DirectMessage>> {
        self.repo.inbox(self.user_id).await
    }

    /// Messages where the acting user is sender, newest first.
    pub async fn get_sent_messages(&self) -> Result<Vec<DirectMessage>> {
        self.repo.sent(self.user_id).await
    }

    /// All messages between the acting user and `other_id`, in
    /// chronological reading order.
    pub async fn get_conversation_with(
        &self,
        other_id: i64,
    ) -> Result<Vec<DirectMessage>> {
        self.repo.conversation(self.user_id, other_id).await
    }

    /// Mark every unread message from `other_id` to the acting user as
    /// read. Unrelated conversations are unaffected.
    pub async fn mark_conversation_as_read(&self, other_id: i64) -> Result<u64> {
        let marked = self.repo.mark_read(self.user_id, other_id).await?;

        if marked > 0 {
            tracing::debug!(
                user_id = self.user_id,
                partner_id = other_id,
                marked,
                "conversation marked as read"
            );
        }

        Ok(marked)
    }

    /// Delete the acting user's copy of a message.
    ///
    /// The caller must be sender or recipient; the row itself is removed
    /// once both sides have deleted.
    pub async fn delete_message(&self, message_id: i64) -> Result<()> {
        self.repo.delete_for(message_id, self.user_id).await
    }

    /// Deduplicated, recency-ordered partners the acting user has
    /// exchanged messages with.
    pub async fn get_recent_conversations(
        &self,
    ) -> Result<Vec<ConversationHead>> {
        self.repo
            .recent_conversations(self.user_id, RECENT_CONVERSATIONS_LIMIT)
            .await
    }

    /// Refuse future messages from `other_id`.
    pub async fn block_user(&self, other_id: i64) -> Result<()> {
        self.repo.block(self.user_id, other_id).await
    }

    /// Accept messages from `other_id` again.
    pub async fn unblock_user(&self, other_id: i64) -> Result<()> {
        self.repo.unblock(self.user_id, other_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: i64 = 1;
    const BOB: i64 = 2;
    const ADMIN: i64 = 3;
    const DAVE: i64 = 4; // deactivated in the fixture.

    #[sqlx::test(fixtures("../../fixtures/users.sql"))]
    async fn test_send_then_inbox_and_sent(pool: Pool<Postgres>) {
        let alice = MessageManager::new(pool.clone(), ALICE);
        let bob = MessageManager::new(pool, BOB);

        let sent = alice
            .send_message("bob", "Hello", "Hello Bob, long time no see!")
            .await
            .unwrap();
        assert!(!sent.is_read);

        let inbox = bob.get_inbox().await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].id, sent.id);
        assert!(!inbox[0].is_read);

        let outbox = alice.get_sent_messages().await.unwrap();
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox[0].id, sent.id);
    }

    #[sqlx::test(fixtures("../../fixtures/users.sql"))]
    async fn test_send_rejects_short_content(pool: Pool<Postgres>) {
        let alice = MessageManager::new(pool.clone(), ALICE);

        let result = alice.send_message("bob", "Hi", "short").await;
        assert!(matches!(result, Err(Error::Validation(_))));

        // No row was created.
        let bob = MessageManager::new(pool, BOB);
        assert!(bob.get_inbox().await.unwrap().is_empty());
    }

    #[sqlx::test(fixtures("../../fixtures/users.sql"))]
    async fn test_send_distinct_failures(pool: Pool<Postgres>) {
        let alice = MessageManager::new(pool, ALICE);

        let result = alice
            .send_message("nobody", "Hi", "A perfectly fine content.")
            .await;
        assert!(matches!(result, Err(Error::UserNotFound)));

        let result = alice
            .send_message("alice", "Hi", "A perfectly fine content.")
            .await;
        assert!(matches!(result, Err(Error::Forbidden(_))));

        let result = alice
            .send_message("dave", "Hi", "A perfectly fine content.")
            .await;
        assert!(matches!(result, Err(Error::Forbidden(_))));
    }

    #[sqlx::test(fixtures("../../fixtures/users.sql"))]
    async fn test_block_denies_then_unblock(pool: Pool<Postgres>) {
        let alice = MessageManager::new(pool.clone(), ALICE);
        let bob = MessageManager::new(pool, BOB);

        bob.block_user(ALICE).await.unwrap();
        let result = alice
            .send_message("bob", "Hi", "A perfectly fine content.")
            .await;
        assert!(matches!(result, Err(Error::Forbidden(_))));
        assert!(bob.get_inbox().await.unwrap().is_empty());

        bob.unblock_user(ALICE).await.unwrap();
        alice
            .send_message("bob", "Hi", "A perfectly fine content.")
            .await
            .unwrap();
    }

    #[sqlx::test(fixtures("../../fixtures/users.sql", "../../fixtures/messages.sql"))]
    async fn test_mark_conversation_as_read_is_scoped(pool: Pool<Postgres>) {
        let alice = MessageManager::new(pool, ALICE);

        let marked = alice.mark_conversation_as_read(BOB).await.unwrap();
        assert_eq!(marked, 2);

        let inbox = alice.get_inbox().await.unwrap();
        for message in &inbox {
            if message.sender_id == BOB {
                assert!(message.is_read);
            }
        }
        // The unrelated conversation stays unread.
        assert!(
            inbox
                .iter()
                .any(|m| m.sender_id == ADMIN && !m.is_read)
        );

        // Second call finds nothing left to mark.
        assert_eq!(alice.mark_conversation_as_read(BOB).await.unwrap(), 0);
    }

    #[sqlx::test(fixtures("../../fixtures/users.sql", "../../fixtures/messages.sql"))]
    async fn test_mark_read_skips_deleted_messages(pool: Pool<Postgres>) {
        let alice = MessageManager::new(pool.clone(), ALICE);

        // Message 1 is bob -> alice; alice deletes her copy first.
        alice.delete_message(1).await.unwrap();

        // Only the surviving message from bob (id 3) gets marked.
        let marked = alice.mark_conversation_as_read(BOB).await.unwrap();
        assert_eq!(marked, 1);

        let repo = MessageRepository::new(pool);
        assert!(!repo.find(1).await.unwrap().is_read);
        assert!(repo.find(3).await.unwrap().is_read);
    }

    #[sqlx::test(fixtures("../../fixtures/users.sql", "../../fixtures/messages.sql"))]
    async fn test_conversation_is_chronological(pool: Pool<Postgres>) {
        let alice = MessageManager::new(pool, ALICE);

        let conversation = alice.get_conversation_with(BOB).await.unwrap();
        assert_eq!(conversation.len(), 3);
        assert!(
            conversation
                .windows(2)
                .all(|pair| pair[0].sent_at <= pair[1].sent_at)
        );
        // Both directions appear.
        assert!(conversation.iter().any(|m| m.sender_id == ALICE));
        assert!(conversation.iter().any(|m| m.sender_id == BOB));
    }

    #[sqlx::test(fixtures("../../fixtures/users.sql", "../../fixtures/messages.sql"))]
    async fn test_delete_is_per_side(pool: Pool<Postgres>) {
        let alice = MessageManager::new(pool.clone(), ALICE);
        let bob = MessageManager::new(pool.clone(), BOB);

        // Message 1 is bob -> alice. A third party may not delete it.
        let admin = MessageManager::new(pool.clone(), ADMIN);
        assert!(matches!(
            admin.delete_message(1).await,
            Err(Error::Forbidden(_))
        ));

        // Recipient-side deletion hides it from alice only.
        alice.delete_message(1).await.unwrap();
        assert!(alice.get_inbox().await.unwrap().iter().all(|m| m.id != 1));
        assert!(bob.get_sent_messages().await.unwrap().iter().any(|m| m.id == 1));

        // Once the sender deletes too, the row is gone.
        bob.delete_message(1).await.unwrap();
        let repo = MessageRepository::new(pool);
        assert!(matches!(repo.find(1).await, Err(Error::MessageNotFound)));
    }

    #[sqlx::test(fixtures("../../fixtures/users.sql", "../../fixtures/messages.sql"))]
    async fn test_recent_conversations(pool: Pool<Postgres>) {
        let alice = MessageManager::new(pool, ALICE);

        let conversations = alice.get_recent_conversations().await.unwrap();
        let partners: Vec<i64> =
            conversations.iter().map(|c| c.partner_id).collect();

        // Deduplicated, most recent partner first.
        assert_eq!(partners, vec![ADMIN, BOB]);
        assert_eq!(conversations[1].partner_username, "bob");
        assert!(
            conversations[0].last_message_at
                >= conversations[1].last_message_at
        );
    }

    #[sqlx::test(fixtures("../../fixtures/users.sql"))]
    async fn test_messages_survive_sender_deactivation(pool: Pool<Postgres>) {
        let alice = MessageManager::new(pool.clone(), ALICE);
        alice
            .send_message("bob", "Hi", "A perfectly fine content.")
            .await
            .unwrap();

        let users = UserRepository::new(pool.clone());
        users.set_active(ALICE, false).await.unwrap();

        let bob = MessageManager::new(pool, BOB);
        assert_eq!(bob.get_inbox().await.unwrap().len(), 1);
    }
}
