use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

/// Represents the 'posts' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub content: String,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'post_images' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PostImage {
    pub id: i64,
    pub post_id: i64,
    pub filename: String,
}

/// A post row joined with its author's public fields.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PostWithAuthor {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub content: String,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub author_username: String,
    pub author_display_name: String,
}

/// DTO for displaying a post with its attachments.
#[derive(Debug, Clone, Serialize)]
pub struct PostResponse {
    #[serde(flatten)]
    pub post: PostWithAuthor,
    pub images: Vec<PostImage>,
}

/// Text fields of the new-post form. Attachments are read separately from the
/// multipart stream.
#[derive(Debug, Default, Validate)]
pub struct NewPost {
    #[validate(
        length(min = 1, max = 100, message = "Title length must be between 1 and 100 chars"),
        custom(function = not_blank, message = "Title is required")
    )]
    pub title: String,

    #[validate(
        length(min = 1, max = 10000, message = "Content length must be between 1 and 10000 chars"),
        custom(function = not_blank, message = "Content is required")
    )]
    pub content: String,
}

/// DTO for removing selected attachments from a post.
#[derive(Debug, Deserialize)]
pub struct DeleteImagesRequest {
    #[serde(default)]
    pub image_ids: Vec<i64>,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}
