//! Handle database requests for users.

use sqlx::{Pool, Postgres, Transaction};

use crate::error::{Error, Result};
use crate::user::{ProfileUpdate, SettingsUpdate, User};

#[derive(Clone)]
pub struct UserRepository {
    pool: Pool<Postgres>,
}

impl UserRepository {
    /// Create a new [`UserRepository`].
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Start a transaction for operations that read then write.
    pub async fn begin(&self) -> Result<Transaction<'static, Postgres>> {
        Ok(self.pool.begin().await?)
    }

    /// Find a user using the `id` column.
    pub async fn find_by_id(&self, user_id: i64) -> Result<User> {
        sqlx::query_as::<_, User>(r#"SELECT * FROM users WHERE id = $1"#)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(Error::UserNotFound)
    }

    /// Find a user using the `username` column.
    pub async fn find_by_username(&self, username: &str) -> Result<User> {
        sqlx::query_as::<_, User>(
            r#"SELECT * FROM users WHERE username = $1"#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(Error::UserNotFound)
    }

    /// Find and lock a user row until `tx` ends.
    pub async fn find_by_id_for_update(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        user_id: i64,
    ) -> Result<User> {
        sqlx::query_as::<_, User>(
            r#"SELECT * FROM users WHERE id = $1 FOR UPDATE"#,
        )
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(Error::UserNotFound)
    }

    /// Find and lock a user row by username until `tx` ends.
    pub async fn find_by_username_for_update(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        username: &str,
    ) -> Result<User> {
        sqlx::query_as::<_, User>(
            r#"SELECT * FROM users WHERE username = $1 FOR UPDATE"#,
        )
        .bind(username)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(Error::UserNotFound)
    }

    /// Whether a user other than `user_id` already claimed this email.
    pub async fn email_taken_by_other(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        email: &str,
        user_id: i64,
    ) -> Result<bool> {
        let taken: Option<(i64,)> = sqlx::query_as(
            r#"SELECT id FROM users WHERE email = $1 AND id <> $2"#,
        )
        .bind(email)
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(taken.is_some())
    }

    /// Persist the present fields of a profile update, untouched columns
    /// keep their prior value.
    pub async fn update_profile(
        &self,
        user_id: i64,
        update: &ProfileUpdate,
    ) -> Result<()> {
        sqlx::query(
            r#"UPDATE users
                SET first_name = COALESCE($1, first_name),
                    last_name = COALESCE($2, last_name),
                    bio = COALESCE($3, bio),
                    profile_picture_url = COALESCE($4, profile_picture_url)
                WHERE id = $5"#,
        )
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(&update.bio)
        .bind(&update.profile_picture_url)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Persist the present fields of a settings update.
    pub async fn update_settings(
        &self,
        user_id: i64,
        update: &SettingsUpdate,
    ) -> Result<()> {
        sqlx::query(
            r#"UPDATE users
                SET show_email_publicly = COALESCE($1, show_email_publicly),
                    receive_notifications = COALESCE($2, receive_notifications),
                    theme_preference = COALESCE($3, theme_preference)
                WHERE id = $4"#,
        )
        .bind(update.show_email_publicly)
        .bind(update.receive_notifications)
        .bind(&update.theme_preference)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Replace the email and reset the verification flag.
    pub async fn update_email(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        user_id: i64,
        email: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"UPDATE users
                SET email = $1, email_verified = FALSE
                WHERE id = $2"#,
        )
        .bind(email)
        .bind(user_id)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Replace the stored password hash.
    pub async fn update_password(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        user_id: i64,
        password_hash: &str,
    ) -> Result<()> {
        sqlx::query(r#"UPDATE users SET password_hash = $1 WHERE id = $2"#)
            .bind(password_hash)
            .bind(user_id)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    /// Flip the activation flag. Data is never deleted.
    pub async fn set_active(&self, user_id: i64, is_active: bool) -> Result<()> {
        let result =
            sqlx::query(r#"UPDATE users SET is_active = $1 WHERE id = $2"#)
                .bind(is_active)
                .bind(user_id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(Error::UserNotFound);
        }

        Ok(())
    }

    /// Record activity on the account.
    pub async fn touch_last_seen(&self, user_id: i64) -> Result<()> {
        sqlx::query(r#"UPDATE users SET last_seen = NOW() WHERE id = $1"#)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
