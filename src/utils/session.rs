// src/utils/session.rs

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{config::Config, error::AppError, models::user::User};

/// Name of the cookie carrying the opaque session token.
pub const SESSION_COOKIE: &str = "session_id";

/// The user resolved from the request's session cookie, if any.
///
/// Inserted into request extensions by [`session_middleware`] on every route.
#[derive(Debug, Clone, Default)]
pub struct CurrentUser(pub Option<User>);

impl CurrentUser {
    /// Returns the logged-in user or `401 Unauthorized`.
    pub fn require(self) -> Result<User, AppError> {
        self.0.ok_or_else(AppError::unauthorized)
    }

    pub fn id(&self) -> Option<i64> {
        self.0.as_ref().map(|user| user.id)
    }
}

/// Creates a session row for `user_id` and returns its token.
pub async fn create_session(
    pool: &SqlitePool,
    user_id: i64,
    ttl_seconds: i64,
) -> Result<String, AppError> {
    let token = Uuid::new_v4().simple().to_string();
    let expires_at = chrono::Utc::now().timestamp() + ttl_seconds;

    sqlx::query("INSERT INTO sessions (token, user_id, expires_at) VALUES (?, ?, ?)")
        .bind(&token)
        .bind(user_id)
        .bind(expires_at)
        .execute(pool)
        .await?;

    Ok(token)
}

pub async fn destroy_session(pool: &SqlitePool, token: &str) -> Result<(), AppError> {
    sqlx::query("DELETE FROM sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}

/// Looks up the user behind a session token.
///
/// Unknown tokens resolve to `None`; expired ones are deleted and also
/// resolve to `None`.
pub async fn resolve_session(pool: &SqlitePool, token: &str) -> Result<Option<User>, AppError> {
    let row: Option<(i64, i64)> =
        sqlx::query_as("SELECT user_id, expires_at FROM sessions WHERE token = ?")
            .bind(token)
            .fetch_optional(pool)
            .await?;

    let Some((user_id, expires_at)) = row else {
        return Ok(None);
    };

    if expires_at <= chrono::Utc::now().timestamp() {
        tracing::debug!(user_id, "session expired");
        destroy_session(pool, token).await?;
        return Ok(None);
    }

    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, password_hash, display_name, bio, profile_picture, created_at
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// Builds the session cookie sent after a successful login.
pub fn session_cookie(token: String, config: &Config) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.cookie_secure)
        .build()
}

/// A cookie matching [`session_cookie`]'s path, used to remove it.
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}

/// Axum Middleware: Session resolution.
///
/// Reads the session cookie (if present), resolves it to a user and injects
/// [`CurrentUser`] into the request extensions. Never rejects: handlers that
/// need a login call [`CurrentUser::require`].
pub async fn session_middleware(
    State(pool): State<SqlitePool>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = match jar.get(SESSION_COOKIE) {
        Some(cookie) => resolve_session(&pool, cookie.value()).await?,
        None => None,
    };

    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}
