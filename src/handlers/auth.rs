// src/handlers/auth.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::{LoginRequest, RegisterRequest, User},
    utils::{
        hash::{hash_password, verify_password},
        session::{
            CurrentUser, SESSION_COOKIE, create_session, destroy_session, removal_cookie,
            session_cookie,
        },
    },
};

/// What the register and login pages get to see: who is logged in, if anyone.
pub async fn session_info(Extension(current): Extension<CurrentUser>) -> impl IntoResponse {
    Json(json!({ "user": current.0 }))
}

/// Registers a new user.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created and the user object (excluding password).
pub async fn register(
    State(pool): State<SqlitePool>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let taken = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE username = ?")
        .bind(&payload.username)
        .fetch_optional(&pool)
        .await?;
    if taken.is_some() {
        return Err(duplicate_username(&payload.username));
    }

    let hashed_password = hash_password(&payload.password)?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (username, password_hash, display_name)
        VALUES (?, ?, ?)
        RETURNING id, username, password_hash, display_name, bio, profile_picture, created_at
        "#,
    )
    .bind(&payload.username)
    .bind(&hashed_password)
    .bind(&payload.display_name)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        // A concurrent registration can still win the race past the pre-check.
        if e.as_database_error().is_some_and(|db| db.is_unique_violation()) {
            duplicate_username(&payload.username)
        } else {
            tracing::error!("Failed to register user: {:?}", e);
            AppError::from(e)
        }
    })?;

    tracing::info!(user_id = user.id, username = %user.username, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Registration successful! Please log in.",
            "user": user,
        })),
    ))
}

/// Authenticates a user and starts a session.
///
/// Unknown usernames and wrong passwords get the same answer.
pub async fn login(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, password_hash, display_name, bio, profile_picture, created_at
        FROM users
        WHERE username = ?
        "#,
    )
    .bind(&payload.username)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Login DB error: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let user = match user {
        Some(user) if verify_password(&payload.password, &user.password_hash)? => user,
        _ => {
            tracing::info!(username = %payload.username, "rejected login");
            return Err(AppError::AuthError("Incorrect credentials.".to_string()));
        }
    };

    // Drop whatever session this client was carrying before.
    if let Some(previous) = jar.get(SESSION_COOKIE) {
        destroy_session(&pool, previous.value()).await?;
    }

    let token = create_session(&pool, user.id, config.session_ttl_seconds).await?;
    let jar = jar.add(session_cookie(token, &config));

    tracing::info!(user_id = user.id, "user logged in");

    Ok((
        jar,
        Json(json!({
            "message": "Logged in successfully!",
            "user": user,
        })),
    ))
}

/// Ends the current session. Succeeds even without one.
pub async fn logout(
    State(pool): State<SqlitePool>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        destroy_session(&pool, cookie.value()).await?;
    }

    Ok((
        jar.remove(removal_cookie()),
        Json(json!({ "message": "Logged out." })),
    ))
}

fn duplicate_username(username: &str) -> AppError {
    AppError::Conflict(format!("Username '{}' already exists", username))
}
