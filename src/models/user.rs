// src/models/user.rs

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_]+$").expect("username pattern compiles"));

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\w\-.]+@([\w-]+\.)+[\w-]{2,4}$").expect("email pattern compiles")
});

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,

    /// Unique username, 3 to 12 word characters.
    pub username: String,

    /// Unique, always stored lowercase.
    pub email: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    /// Sum of correct answers over every submitted quiz.
    pub mana: i64,

    /// Accuracy of the most recent quiz, 0..=100.
    pub mage_meter: i32,

    /// Ids of befriended users. Never contains `id`, never repeats.
    pub friends: Vec<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_friend(&self, other: Uuid) -> bool {
        self.friends.contains(&other)
    }
}

/// Public stats for `GET /user/stats/{id}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub mana: i64,
    pub mage_meter: i32,
}

impl From<&User> for UserStats {
    fn from(user: &User) -> Self {
        Self {
            mana: user.mana,
            mage_meter: user.mage_meter,
        }
    }
}

/// Fields the store needs to create an account. `password` is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// DTO for creating a new user (Registration).
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(custom(function = validate_username))]
    pub username: String,
    #[validate(custom(function = validate_email))]
    pub email: String,
    #[validate(custom(function = validate_password))]
    pub password: String,
}

impl CreateUserRequest {
    /// Trims both identifiers and lowercases the email, as stored.
    pub fn normalized(self) -> Self {
        Self {
            username: self.username.trim().to_string(),
            email: normalize_email(&self.email),
            password: self.password,
        }
    }
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 254))]
    pub email: String,
    #[validate(length(min = 1, max = 1024))]
    pub password: String,
}

/// DTO for `PUT /user/me`. Absent fields are left untouched.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    #[validate(custom(function = validate_password))]
    pub new_password: String,
}

/// Body of the friend add/remove endpoints.
#[derive(Debug, Deserialize, Validate)]
pub struct FriendRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    let len = username.chars().count();
    if !(3..=12).contains(&len) {
        return Err(ValidationError::new("username_length")
            .with_message("Username must be between 3 and 12 characters.".into()));
    }
    if !USERNAME_RE.is_match(username) {
        return Err(ValidationError::new("username_charset").with_message(
            "Username can only contain letters, numbers, and underscores.".into(),
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if !EMAIL_RE.is_match(email) {
        return Err(
            ValidationError::new("email_format").with_message("Invalid email format.".into())
        );
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    let len = password.chars().count();
    if !(6..=1024).contains(&len) {
        return Err(ValidationError::new("password_length")
            .with_message("Password must be between 6 and 1024 characters.".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames_follow_length_and_charset_rules() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("abc").is_ok());
        assert!(validate_username("twelve_chars").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("thirteen_char").is_err());
        assert!(validate_username("bad-name").is_err());
        assert!(validate_username("with space").is_err());
    }

    #[test]
    fn emails_follow_the_pattern() {
        assert!(validate_email("alice@x.com").is_ok());
        assert!(validate_email("first.last@mail.example.org").is_ok());
        assert!(validate_email("no-at-sign.com").is_err());
        assert!(validate_email("alice@x").is_err());
        assert!(validate_email("alice@x.toolongtld").is_err());
    }

    #[test]
    fn registration_is_normalized_before_validation() {
        let req = CreateUserRequest {
            username: "  alice ".into(),
            email: " Alice@X.COM ".into(),
            password: "secret1".into(),
        }
        .normalized();

        assert_eq!(req.username, "alice");
        assert_eq!(req.email, "alice@x.com");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn short_password_is_rejected() {
        let req = CreateUserRequest {
            username: "alice".into(),
            email: "alice@x.com".into(),
            password: "12345".into(),
        };
        assert!(req.validate().is_err());
    }
}
