use axum::{
    Extension, Json,
    extract::{Multipart, Path, State},
    response::IntoResponse,
};
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    handlers::{form::FormData, posts::load_posts},
    models::user::{ProfileUpdate, User},
    utils::{
        html::plain_text,
        session::CurrentUser,
        storage::{FileStore, UploadDir},
    },
};

/// Public profile of a user, with their posts.
pub async fn view_profile(
    State(pool): State<SqlitePool>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, password_hash, display_name, bio, profile_picture, created_at
        FROM users
        WHERE username = ?
        "#,
    )
    .bind(&username)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("User not found".to_string()))?;

    let posts = load_posts(&pool, Some(user.id)).await?;

    Ok(Json(json!({
        "user": user,
        "posts": posts,
    })))
}

/// Current user's editable profile.
pub async fn get_profile(
    Extension(current): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(current.require()?))
}

/// Update display name and bio, and remove or replace the profile picture.
///
/// A new upload wins over `remove_picture`. Uploads without an allowed
/// extension are ignored. The old picture file is only deleted once the row
/// no longer points at it; a failed update discards the new file instead.
pub async fn edit_profile(
    State(pool): State<SqlitePool>,
    State(storage): State<FileStore>,
    Extension(current): Extension<CurrentUser>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut user = current.require()?;
    let mut form = FormData::read(multipart).await?;

    let update = ProfileUpdate {
        display_name: form.text("display_name"),
        bio: plain_text(&form.text("bio")),
        remove_picture: form.flag("remove_picture"),
    };
    update.validate()?;

    let uploaded = match form.take_files("profile_picture").into_iter().next() {
        Some(file) => {
            storage
                .store(UploadDir::Profiles, &user.username, &file.file_name, &file.bytes)
                .await?
        }
        None => None,
    };

    let previous = user.profile_picture.clone();
    let picture = match (&uploaded, update.remove_picture) {
        (Some(new), _) => Some(new.clone()),
        (None, true) => None,
        (None, false) => previous.clone(),
    };

    let result = sqlx::query(
        "UPDATE users SET display_name = ?, bio = ?, profile_picture = ? WHERE id = ?",
    )
    .bind(&update.display_name)
    .bind(&update.bio)
    .bind(&picture)
    .bind(user.id)
    .execute(&pool)
    .await;

    if let Err(e) = result {
        tracing::error!("Failed to update profile: {:?}", e);
        if let Some(new) = &uploaded {
            if let Err(e) = storage.delete(UploadDir::Profiles, new).await {
                tracing::warn!(filename = %new, "failed to discard upload: {}", e);
            }
        }
        return Err(AppError::from(e));
    }

    if let Some(old) = previous.filter(|old| picture.as_ref() != Some(old)) {
        if let Err(e) = storage.delete(UploadDir::Profiles, &old).await {
            tracing::warn!(filename = %old, "failed to remove replaced picture: {}", e);
        }
    }

    user.display_name = update.display_name;
    user.bio = update.bio;
    user.profile_picture = picture;

    tracing::info!(user_id = user.id, "profile updated");

    Ok(Json(json!({
        "message": "Profile updated.",
        "user": user,
    })))
}
