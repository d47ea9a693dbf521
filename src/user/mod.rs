mod builder;
mod repository;
mod settings;
mod stats;

pub use builder::*;
pub use repository::*;
pub use settings::*;
pub use stats::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User as saved on database.
///
/// Never hard-deleted; deactivation flips `is_active` and leaves every
/// other field, post and message in place.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip)]
    pub password_hash: String,
    pub email: String,
    pub is_admin: bool,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub profile_picture_url: Option<String>,
    pub show_email_publicly: bool,
    pub receive_notifications: bool,
    pub theme_preference: String,
    pub is_active: bool,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub last_seen: Option<DateTime<Utc>>,
}

impl User {
    /// Start building a new account registration.
    pub fn builder() -> UserBuilder<Missing, Missing> {
        UserBuilder::new()
    }
}

/// Identity of the caller performing a privileged operation.
///
/// Supplied by the authentication layer of the embedding application.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Actor {
    pub user_id: i64,
    pub is_admin: bool,
}
