// tests/common/mod.rs
#![allow(dead_code)]

use std::path::PathBuf;

use blog::{config::Config, db, routes, state::AppState, utils::storage::FileStore};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

/// A running server on a random port, backed by an in-memory database and a
/// throwaway upload directory.
pub struct TestApp {
    pub address: String,
    pub pool: SqlitePool,
    pub upload_root: PathBuf,
}

/// Spawns the app on a random port for testing.
pub async fn spawn_app() -> TestApp {
    // One connection only: every `:memory:` connection is a separate database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory SQLite");

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await
        .unwrap();

    db::MIGRATOR
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let upload_root =
        std::env::temp_dir().join(format!("blog-test-{}", uuid::Uuid::new_v4().simple()));
    let storage = FileStore::open(&upload_root).expect("Failed to create upload dirs");

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        upload_root: upload_root.clone(),
        max_upload_bytes: 1024 * 1024,
        session_ttl_seconds: 600,
        cookie_secure: false,
        rust_log: "error".to_string(),
    };

    let state = AppState {
        pool: pool.clone(),
        config,
        storage,
    };
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address,
        pool,
        upload_root,
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub fn post_file(&self, filename: &str) -> PathBuf {
        self.upload_root.join("posts").join(filename)
    }

    pub fn profile_file(&self, filename: &str) -> PathBuf {
        self.upload_root.join("profiles").join(filename)
    }

    /// Registers `username` with password "password123".
    pub async fn register(&self, client: &reqwest::Client, username: &str) -> reqwest::Response {
        client
            .post(self.url("/register"))
            .json(&serde_json::json!({
                "username": username,
                "display_name": format!("{} Display", username),
                "password": "password123",
                "confirm": "password123",
            }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn login(&self, client: &reqwest::Client, username: &str, password: &str) -> reqwest::Response {
        client
            .post(self.url("/login"))
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// A fresh cookie-keeping client, registered and logged in as `username`.
    pub async fn logged_in_client(&self, username: &str) -> reqwest::Client {
        let client = cookie_client();
        assert_eq!(self.register(&client, username).await.status().as_u16(), 201);
        assert_eq!(
            self.login(&client, username, "password123").await.status().as_u16(),
            200
        );
        client
    }

    pub async fn count(&self, sql: &str) -> i64 {
        sqlx::query_scalar::<_, i64>(sql)
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }
}

pub fn cookie_client() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .build()
        .unwrap()
}

pub fn unique_name(prefix: &str) -> String {
    format!("{}_{}", prefix, &uuid::Uuid::new_v4().simple().to_string()[..8])
}

/// A few bytes that start like a PNG; content is never inspected.
pub fn png_part(filename: &str) -> reqwest::multipart::Part {
    reqwest::multipart::Part::bytes(b"\x89PNG\r\n\x1a\nfake".to_vec())
        .file_name(filename.to_string())
        .mime_str("image/png")
        .unwrap()
}

pub fn binary_part(filename: &str) -> reqwest::multipart::Part {
    reqwest::multipart::Part::bytes(b"MZ\x90\x00".to_vec())
        .file_name(filename.to_string())
        .mime_str("application/octet-stream")
        .unwrap()
}
