//! Tribune is the account subsystem of a forum: user profiles and
//! settings, direct messaging, and public/private post visibility,
//! persisted on PostgreSQL.
//!
//! There is no HTTP surface here. The managers ([`UserSettingsManager`],
//! [`UserStatsManager`], [`MessageManager`]) and the repositories are the
//! entire contract offered to callers; route handlers, sessions and the
//! rest of the request lifecycle belong to the embedding application.

#![forbid(unsafe_code)]
#![deny(unused_mut)]

pub mod config;
pub mod crypto;
pub mod database;
pub mod error;
pub mod message;
pub mod post;
pub mod telemetry;
pub mod user;
pub mod validation;

pub use database::Database;
pub use error::{Error, Result};
pub use message::MessageManager;
pub use user::{UserSettingsManager, UserStatsManager};
