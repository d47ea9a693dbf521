//! Profile, settings and account-status mutations.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sqlx::{Pool, Postgres};
use validator::{Validate, ValidationErrors};

use crate::crypto::PasswordManager;
use crate::error::{Error, Result};
use crate::user::{Actor, UserRepository};

/// Partial profile mutation; absent fields keep their stored value.
#[derive(Debug, Default, Validate, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[validate(custom(
        function = "crate::validation::validate_name",
        message = "Name must be non-empty and at most 100 characters long."
    ))]
    pub first_name: Option<String>,
    #[validate(custom(
        function = "crate::validation::validate_name",
        message = "Name must be non-empty and at most 100 characters long."
    ))]
    pub last_name: Option<String>,
    #[validate(length(
        max = 500,
        message = "Biography must be 0 to 500 characters long."
    ))]
    pub bio: Option<String>,
    #[validate(custom(
        function = "crate::validation::validate_picture_url",
        message = "Profile picture must be a valid http(s) URL."
    ))]
    pub profile_picture_url: Option<String>,
}

/// Partial settings mutation; absent fields keep their stored value.
#[derive(Debug, Default, Validate, Serialize, Deserialize)]
pub struct SettingsUpdate {
    pub show_email_publicly: Option<bool>,
    pub receive_notifications: Option<bool>,
    #[validate(custom(
        function = "crate::validation::validate_theme",
        message = "Theme must be 'light' or 'dark'."
    ))]
    pub theme_preference: Option<String>,
}

/// Orchestrates every mutation of one user's account.
///
/// Each operation validates its whole input before touching the
/// database, so a failed call leaves prior state unchanged.
#[derive(Clone)]
pub struct UserSettingsManager {
    repo: UserRepository,
    pwd: Arc<PasswordManager>,
    user_id: i64,
}

impl UserSettingsManager {
    /// Create a manager acting on behalf of `user_id`.
    pub fn new(
        pool: Pool<Postgres>,
        pwd: Arc<PasswordManager>,
        user_id: i64,
    ) -> Self {
        Self {
            repo: UserRepository::new(pool),
            pwd,
            user_id,
        }
    }

    /// Validate and persist a partial profile update.
    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<()> {
        update.validate()?;
        self.repo.update_profile(self.user_id, &update).await?;

        tracing::debug!(user_id = self.user_id, "profile updated");
        Ok(())
    }

    /// Validate and persist a partial settings update.
    pub async fn update_settings(&self, update: SettingsUpdate) -> Result<()> {
        update.validate()?;
        self.repo.update_settings(self.user_id, &update).await?;

        tracing::debug!(user_id = self.user_id, "settings updated");
        Ok(())
    }

    /// Replace the account email.
    ///
    /// Resets `email_verified`. The uniqueness check and the write run
    /// in one transaction, backed by the database constraint.
    pub async fn update_email(&self, new_email: &str) -> Result<()> {
        #[derive(Validate)]
        struct EmailUpdate {
            #[validate(email(message = "Email must be formatted."))]
            email: String,
        }
        let update = EmailUpdate {
            email: new_email.to_lowercase(),
        };
        update.validate()?;

        let mut tx = self.repo.begin().await?;

        if self
            .repo
            .email_taken_by_other(&mut tx, &update.email, self.user_id)
            .await?
        {
            return Err(Error::Conflict("email"));
        }

        self.repo
            .update_email(&mut tx, self.user_id, &update.email)
            .await?;
        tx.commit().await?;

        tracing::info!(user_id = self.user_id, "email replaced, verification reset");
        Ok(())
    }

    /// Re-hash and persist a new password.
    ///
    /// Fails with [`Error::WrongPassword`] when the old password does not
    /// match, and with a validation error when the new one is too weak.
    pub async fn change_password(
        &self,
        old_password: &str,
        new_password: &str,
    ) -> Result<()> {
        // The row stays locked between the verification read and the
        // write, so a caller holding a stale password cannot clobber a
        // concurrent change.
        let mut tx = self.repo.begin().await?;
        let user =
            self.repo.find_by_id_for_update(&mut tx, self.user_id).await?;

        if !self.pwd.verify_password(old_password, &user.password_hash) {
            return Err(Error::WrongPassword);
        }

        if let Err(reason) =
            crate::validation::validate_password(new_password)
        {
            let mut errors = ValidationErrors::new();
            errors.add("new_password", reason);
            return Err(Error::Validation(errors));
        }

        let hash = self.pwd.hash_password(new_password)?;
        self.repo
            .update_password(&mut tx, self.user_id, &hash)
            .await?;
        tx.commit().await?;

        tracing::info!(user_id = self.user_id, "password changed");
        Ok(())
    }

    /// Set `is_active` to false. No data is deleted.
    pub async fn deactivate_account(&self) -> Result<()> {
        self.repo.set_active(self.user_id, false).await?;

        tracing::info!(user_id = self.user_id, "account deactivated");
        Ok(())
    }

    /// Set `is_active` back to true. Requires the admin capability.
    pub async fn reactivate_account(&self, actor: Actor) -> Result<()> {
        if !actor.is_admin {
            return Err(Error::Forbidden(
                "reactivation requires the administrator capability",
            ));
        }

        self.repo.set_active(self.user_id, true).await?;

        tracing::info!(
            user_id = self.user_id,
            admin_id = actor.user_id,
            "account reactivated"
        );
        Ok(())
    }

    /// Borrow the underlying repository for read access.
    pub fn repository(&self) -> &UserRepository {
        &self.repo
    }
}
