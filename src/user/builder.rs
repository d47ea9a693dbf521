//! Typed builder for account registration.

use sqlx::{Pool, Postgres};
use validator::Validate;

use crate::crypto::PasswordManager;
use crate::error::Result;
use crate::user::User;

/// Value is missing on [`UserBuilder`].
#[derive(Debug, Clone)]
pub struct Missing;

/// Value is present on [`UserBuilder`].
#[derive(Debug, Clone)]
pub struct Present<T>(pub T);

/// [`User`] registration builder.
///
/// Username and email are required at the type level; `register` is only
/// reachable once both are present.
#[derive(Debug, Clone)]
pub struct UserBuilder<Username, Email> {
    username: Username,
    email: Email,
    password: String,
    is_admin: bool,
}

#[derive(Debug, Validate)]
struct Registration {
    #[validate(custom(
        function = "crate::validation::validate_username",
        message = "Username must be 2 to 30 alphanumeric characters."
    ))]
    username: String,
    #[validate(email(message = "Email must be formatted."))]
    email: String,
    #[validate(custom(
        function = "crate::validation::validate_password",
        message = "Password is too weak."
    ))]
    password: String,
}

impl UserBuilder<Missing, Missing> {
    /// Create a new [`UserBuilder`].
    pub fn new() -> Self {
        Self {
            username: Missing,
            email: Missing,
            password: String::default(),
            is_admin: false,
        }
    }
}

impl Default for UserBuilder<Missing, Missing> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Email> UserBuilder<Missing, Email> {
    /// Update `username` field on [`UserBuilder`].
    pub fn username(
        self,
        username: impl Into<String>,
    ) -> UserBuilder<Present<String>, Email> {
        UserBuilder {
            username: Present(username.into()),
            email: self.email,
            password: self.password,
            is_admin: self.is_admin,
        }
    }
}

impl<Username> UserBuilder<Username, Missing> {
    /// Update `email` field on [`UserBuilder`].
    pub fn email(
        self,
        email: impl Into<String>,
    ) -> UserBuilder<Username, Present<String>> {
        UserBuilder {
            username: self.username,
            email: Present(email.into().to_lowercase()),
            password: self.password,
            is_admin: self.is_admin,
        }
    }
}

impl<Username, Email> UserBuilder<Username, Email> {
    /// Update `password` field on [`UserBuilder`].
    pub fn password(mut self, password: impl ToString) -> Self {
        self.password = password.to_string();
        self
    }

    /// Grant the administrator flag at creation.
    pub fn admin(mut self, is_admin: bool) -> Self {
        self.is_admin = is_admin;
        self
    }
}

impl UserBuilder<Present<String>, Present<String>> {
    /// Validate, hash the password and insert the row.
    ///
    /// Uniqueness of username and email is arbitrated by the database
    /// constraints; a violation surfaces as [`crate::Error::Conflict`]
    /// so two simultaneous registrations can never both succeed.
    pub async fn register(
        self,
        pool: &Pool<Postgres>,
        pwd: &PasswordManager,
    ) -> Result<User> {
        let registration = Registration {
            username: self.username.0,
            email: self.email.0,
            password: self.password,
        };
        registration.validate()?;

        let password_hash = pwd.hash_password(&registration.password)?;

        let user = sqlx::query_as::<_, User>(
            r#"INSERT INTO users (username, email, password_hash, is_admin)
                VALUES ($1, $2, $3, $4)
                RETURNING *"#,
        )
        .bind(&registration.username)
        .bind(&registration.email)
        .bind(&password_hash)
        .bind(self.is_admin)
        .fetch_one(pool)
        .await?;

        tracing::info!(user_id = user.id, username = %user.username, "user registered");

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Argon2 as ArgonConfig;
    use crate::error::Error;

    fn cheap_manager() -> PasswordManager {
        PasswordManager::new(Some(ArgonConfig {
            memory_cost: 1024,
            iterations: 1,
            parallelism: 1,
            hash_length: 32,
        }))
        .unwrap()
    }

    #[sqlx::test]
    async fn test_register(pool: Pool<Postgres>) {
        let pwd = cheap_manager();

        let user = User::builder()
            .username("alice")
            .email("Alice@Example.org")
            .password("correct horse 1")
            .register(&pool, &pwd)
            .await
            .unwrap();

        assert_eq!(user.username, "alice");
        // Emails are stored lowercased.
        assert_eq!(user.email, "alice@example.org");
        assert!(user.is_active);
        assert!(!user.email_verified);
        assert_eq!(user.theme_preference, "light");
        assert!(pwd.verify_password("correct horse 1", &user.password_hash));
    }

    #[sqlx::test]
    async fn test_register_duplicate_email_conflicts(pool: Pool<Postgres>) {
        let pwd = cheap_manager();

        User::builder()
            .username("alice")
            .email("alice@example.org")
            .password("correct horse 1")
            .register(&pool, &pwd)
            .await
            .unwrap();

        let result = User::builder()
            .username("alice2")
            .email("alice@example.org")
            .password("correct horse 1")
            .register(&pool, &pwd)
            .await;

        assert!(matches!(result, Err(Error::Conflict(_))));
    }

    #[sqlx::test]
    async fn test_register_rejects_weak_password(pool: Pool<Postgres>) {
        let pwd = cheap_manager();

        let result = User::builder()
            .username("alice")
            .email("alice@example.org")
            .password("lettersonly")
            .register(&pool, &pwd)
            .await;

        assert!(matches!(result, Err(Error::Validation(_))));
    }
}
