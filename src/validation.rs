//! Field validation rules shared by every manager.
//!
//! Each function is a pure, deterministic predicate over one untrusted
//! value; failures come back as [`ValidationError`] with a field reason
//! and never as a panic.

use std::sync::LazyLock;

use regex_lite::Regex;
use validator::ValidationError;

pub const NAME_MAX: usize = 100;
pub const BIO_MAX: u64 = 500;
pub const SUBJECT_MAX: u64 = 200;
pub const CONTENT_MIN: u64 = 10;
pub const CONTENT_MAX: u64 = 5000;
pub const PASSWORD_MIN: usize = 8;
pub const PASSWORD_MAX: usize = 128;

/// Accepted values for `theme_preference`.
pub const THEMES: [&str; 2] = ["light", "dark"];

static USERNAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9_]{2,30}$").expect("username regex is valid")
});

/// Usernames are 2 to 30 word characters.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if USERNAME.is_match(username) {
        Ok(())
    } else {
        Err(ValidationError::new("username").with_message(
            "Username must be 2 to 30 alphanumeric characters.".into(),
        ))
    }
}

/// First and last names are non-empty bounded text.
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() || name.chars().count() > NAME_MAX {
        Err(ValidationError::new("name").with_message(
            "Name must be non-empty and at most 100 characters long.".into(),
        ))
    } else {
        Ok(())
    }
}

/// Theme must belong to the enumerated set.
pub fn validate_theme(theme: &str) -> Result<(), ValidationError> {
    if THEMES.contains(&theme) {
        Ok(())
    } else {
        Err(ValidationError::new("theme")
            .with_message("Theme must be 'light' or 'dark'.".into()))
    }
}

/// Profile pictures must be absolute http(s) URLs.
pub fn validate_picture_url(value: &str) -> Result<(), ValidationError> {
    match url::Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        _ => Err(ValidationError::new("url")
            .with_message("Profile picture must be a valid http(s) URL.".into())),
    }
}

/// Minimum strength policy: 8 to 128 characters, at least one letter and
/// one digit.
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    let length = password.chars().count();
    let has_alpha = password.chars().any(|c| c.is_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());

    if (PASSWORD_MIN..=PASSWORD_MAX).contains(&length) && has_alpha && has_digit
    {
        Ok(())
    } else {
        Err(ValidationError::new("password").with_message(
            "Password must be 8 to 128 characters with at least one letter and one digit."
                .into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username() {
        assert!(validate_username("alice_01").is_ok());
        assert!(validate_username("a").is_err());
        assert!(validate_username("").is_err());
        assert!(validate_username("white space").is_err());
    }

    #[test]
    fn test_name() {
        assert!(validate_name("Ada").is_ok());
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"x".repeat(NAME_MAX + 1)).is_err());
    }

    #[test]
    fn test_theme() {
        assert!(validate_theme("light").is_ok());
        assert!(validate_theme("dark").is_ok());
        assert!(validate_theme("purple").is_err());
    }

    #[test]
    fn test_picture_url() {
        assert!(validate_picture_url("https://cdn.example.org/a.png").is_ok());
        assert!(validate_picture_url("ftp://example.org/a.png").is_err());
        assert!(validate_picture_url("not a url").is_err());
    }

    #[test]
    fn test_password_policy() {
        assert!(validate_password("correct horse 1").is_ok());
        assert!(validate_password("short1").is_err());
        assert!(validate_password("lettersonly").is_err());
        assert!(validate_password("1234567890").is_err());
        assert!(validate_password(&format!("a1{}", "x".repeat(PASSWORD_MAX)))
            .is_err());
    }
}
