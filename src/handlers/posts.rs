use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    handlers::form::FormData,
    models::post::{DeleteImagesRequest, NewPost, Post, PostImage, PostResponse, PostWithAuthor},
    utils::{
        html::plain_text,
        session::CurrentUser,
        storage::{FileStore, UploadDir},
    },
};

const POST_WITH_AUTHOR: &str = r#"
    SELECT
        p.id, p.user_id, p.title, p.content, p.created_at,
        u.username AS author_username,
        u.display_name AS author_display_name
    FROM posts p
    JOIN users u ON u.id = p.user_id
"#;

/// List all posts, newest first, with their images.
pub async fn list_posts(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let posts = load_posts(&pool, None).await.map_err(|e| {
        tracing::error!("Failed to list posts: {:?}", e);
        e
    })?;

    Ok(Json(posts))
}

/// Create a new post with optional image attachments.
///
/// Attachments without an allowed extension are skipped. Stored files are
/// removed again if the database write fails.
pub async fn create_post(
    State(pool): State<SqlitePool>,
    State(storage): State<FileStore>,
    Extension(current): Extension<CurrentUser>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let user = current.require()?;
    let mut form = FormData::read(multipart).await?;

    let new_post = NewPost {
        title: form.text("title"),
        content: plain_text(&form.text("content")),
    };
    new_post.validate()?;

    let mut stored = Vec::new();
    for file in form.take_files("images") {
        match storage
            .store(UploadDir::Posts, &user.username, &file.file_name, &file.bytes)
            .await
        {
            Ok(Some(filename)) => stored.push(filename),
            Ok(None) => {}
            Err(e) => {
                discard_files(&storage, &stored).await;
                return Err(e);
            }
        }
    }

    let post_id = match insert_post(&pool, user.id, &new_post, &stored).await {
        Ok(id) => id,
        Err(e) => {
            tracing::error!("Failed to create post: {:?}", e);
            discard_files(&storage, &stored).await;
            return Err(e);
        }
    };

    tracing::info!(post_id, user_id = user.id, images = stored.len(), "post created");

    let post = fetch_post(&pool, post_id)
        .await?
        .ok_or(AppError::NotFound("Post not found".to_string()))?;

    Ok((StatusCode::CREATED, Json(post)))
}

/// Get a single post by ID, with author and images.
pub async fn view_post(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let post = fetch_post(&pool, id)
        .await?
        .ok_or(AppError::NotFound("Post not found".to_string()))?;

    Ok(Json(post))
}

/// Delete selected images of a post.
/// Requires: Login + Author. Ids that do not belong to the post are ignored,
/// repeated ids count once.
pub async fn delete_post_images(
    State(pool): State<SqlitePool>,
    State(storage): State<FileStore>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(payload): Json<DeleteImagesRequest>,
) -> Result<impl IntoResponse, AppError> {
    let post = fetch_owned_post(&pool, &current, id).await?;

    let mut image_ids = payload.image_ids;
    image_ids.sort_unstable();
    image_ids.dedup();

    let mut images = Vec::new();
    for image_id in image_ids {
        let image = sqlx::query_as::<_, PostImage>(
            "SELECT id, post_id, filename FROM post_images WHERE id = ? AND post_id = ?",
        )
        .bind(image_id)
        .bind(post.id)
        .fetch_optional(&pool)
        .await?;
        images.extend(image);
    }

    // Records go in one transaction; files are removed only once it commits.
    let mut tx = pool.begin().await?;
    for image in &images {
        sqlx::query("DELETE FROM post_images WHERE id = ?")
            .bind(image.id)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await.map_err(|e| {
        tracing::error!("Failed to delete post images: {:?}", e);
        AppError::from(e)
    })?;

    for image in &images {
        if let Err(e) = storage.delete(UploadDir::Posts, &image.filename).await {
            tracing::warn!(filename = %image.filename, "failed to remove deleted image: {}", e);
        }
    }

    let deleted = images.len();
    tracing::info!(post_id = post.id, deleted, "post images deleted");

    Ok(Json(json!({
        "message": "Image(s) deleted.",
        "deleted": deleted,
    })))
}

/// Delete a post together with its image records and files.
/// Requires: Login + Author.
pub async fn delete_post(
    State(pool): State<SqlitePool>,
    State(storage): State<FileStore>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let post = fetch_owned_post(&pool, &current, id).await?;

    let images = sqlx::query_as::<_, PostImage>(
        "SELECT id, post_id, filename FROM post_images WHERE post_id = ?",
    )
    .bind(post.id)
    .fetch_all(&pool)
    .await?;

    // Image rows go with the post via ON DELETE CASCADE.
    sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(post.id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete post: {:?}", e);
            AppError::from(e)
        })?;

    for image in &images {
        if let Err(e) = storage.delete(UploadDir::Posts, &image.filename).await {
            tracing::warn!(filename = %image.filename, "failed to remove image of deleted post: {}", e);
        }
    }

    tracing::info!(post_id = post.id, images = images.len(), "post deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Posts with author and images, newest first. `author` restricts to one user.
pub(crate) async fn load_posts(
    pool: &SqlitePool,
    author: Option<i64>,
) -> Result<Vec<PostResponse>, AppError> {
    let query = format!("{POST_WITH_AUTHOR} WHERE (? IS NULL OR p.user_id = ?) ORDER BY p.id DESC");
    let posts = sqlx::query_as::<_, PostWithAuthor>(&query)
        .bind(author)
        .bind(author)
        .fetch_all(pool)
        .await?;

    let images = sqlx::query_as::<_, PostImage>(
        r#"
        SELECT i.id, i.post_id, i.filename
        FROM post_images i
        JOIN posts p ON p.id = i.post_id
        WHERE (? IS NULL OR p.user_id = ?)
        ORDER BY i.id
        "#,
    )
    .bind(author)
    .bind(author)
    .fetch_all(pool)
    .await?;

    let mut by_post: HashMap<i64, Vec<PostImage>> = HashMap::new();
    for image in images {
        by_post.entry(image.post_id).or_default().push(image);
    }

    Ok(posts
        .into_iter()
        .map(|post| PostResponse {
            images: by_post.remove(&post.id).unwrap_or_default(),
            post,
        })
        .collect())
}

async fn fetch_post(pool: &SqlitePool, id: i64) -> Result<Option<PostResponse>, AppError> {
    let query = format!("{POST_WITH_AUTHOR} WHERE p.id = ?");
    let Some(post) = sqlx::query_as::<_, PostWithAuthor>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?
    else {
        return Ok(None);
    };

    let images = sqlx::query_as::<_, PostImage>(
        "SELECT id, post_id, filename FROM post_images WHERE post_id = ? ORDER BY id",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    Ok(Some(PostResponse { post, images }))
}

/// Loads a post and checks that the current user wrote it.
async fn fetch_owned_post(
    pool: &SqlitePool,
    current: &CurrentUser,
    id: i64,
) -> Result<Post, AppError> {
    let post = sqlx::query_as::<_, Post>(
        "SELECT id, user_id, title, content, created_at FROM posts WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Post not found".to_string()))?;

    match current.id() {
        None => Err(AppError::unauthorized()),
        Some(user_id) if user_id != post.user_id => Err(AppError::AuthError(
            "You are not authorized to modify this post".to_string(),
        )),
        Some(_) => Ok(post),
    }
}

async fn insert_post(
    pool: &SqlitePool,
    user_id: i64,
    new_post: &NewPost,
    filenames: &[String],
) -> Result<i64, AppError> {
    let mut tx = pool.begin().await?;

    let post_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO posts (user_id, title, content)
        VALUES (?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(&new_post.title)
    .bind(&new_post.content)
    .fetch_one(&mut *tx)
    .await?;

    for filename in filenames {
        sqlx::query("INSERT INTO post_images (post_id, filename) VALUES (?, ?)")
            .bind(post_id)
            .bind(filename)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(post_id)
}

async fn discard_files(storage: &FileStore, filenames: &[String]) {
    for filename in filenames {
        if let Err(e) = storage.delete(UploadDir::Posts, filename).await {
            tracing::warn!(%filename, "failed to discard upload: {}", e);
        }
    }
}
