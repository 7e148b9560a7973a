// src/models/user.rs

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Usernames end up inside stored filenames, so keep them path-safe.
pub static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.-]+$").expect("valid username regex"));

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    /// Unique username.
    pub username: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password_hash: String,

    pub display_name: String,

    pub bio: String,

    /// Stored filename inside the profiles upload directory.
    pub profile_picture: Option<String>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for creating a new user (Registration).
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(
        length(
            min = 3,
            max = 32,
            message = "Username length must be between 3 and 32 characters."
        ),
        regex(
            path = *USERNAME_RE,
            message = "Username may only contain letters, digits, '.', '_' and '-'."
        )
    )]
    pub username: String,

    #[validate(length(
        min = 2,
        max = 64,
        message = "Display name length must be between 2 and 64 characters."
    ))]
    pub display_name: String,

    #[validate(length(min = 4, message = "Password must be at least 4 characters."))]
    pub password: String,

    #[validate(must_match(other = "password", message = "Passwords must match"))]
    pub confirm: String,
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required."))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required."))]
    pub password: String,
}

/// Text fields of the edit-profile form. The file fields are read separately
/// from the multipart stream.
#[derive(Debug, Default, Validate)]
pub struct ProfileUpdate {
    #[validate(length(
        min = 2,
        max = 64,
        message = "Display name length must be between 2 and 64 characters."
    ))]
    pub display_name: String,

    #[validate(length(max = 300, message = "Bio must be at most 300 characters."))]
    pub bio: String,

    pub remove_picture: bool,
}
