// tests/api_tests.rs

mod common;

use common::{cookie_client, spawn_app, unique_name};

#[tokio::test]
async fn health_check_404() {
    // Arrange
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    // Act
    let response = client
        .get(app.url("/random_path_that_does_not_exist"))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn register_works() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let username = unique_name("u");

    let response = app.register(&client, &username).await;

    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["user"]["username"], username.as_str());
    assert!(
        body["user"].get("password_hash").is_none(),
        "password hash must never be serialized"
    );

    let stored: String = sqlx::query_scalar("SELECT password_hash FROM users WHERE username = ?")
        .bind(&username)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_ne!(stored, "password123");
    assert!(stored.starts_with("$argon2"));
}

#[tokio::test]
async fn duplicate_username_is_rejected() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let username = unique_name("dup");

    assert_eq!(app.register(&client, &username).await.status().as_u16(), 201);
    let second = app.register(&client, &username).await;

    assert_eq!(second.status().as_u16(), 409);
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ?")
        .bind(&username)
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn register_fails_validation() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let cases = [
        // Username too short
        serde_json::json!({
            "username": "yo", "display_name": "Yo Yo",
            "password": "password123", "confirm": "password123"
        }),
        // Passwords do not match
        serde_json::json!({
            "username": "mismatch", "display_name": "Mismatch",
            "password": "password123", "confirm": "password321"
        }),
        // Display name too short
        serde_json::json!({
            "username": "shortname", "display_name": "x",
            "password": "password123", "confirm": "password123"
        }),
        // Username with a path separator
        serde_json::json!({
            "username": "../evil", "display_name": "Evil",
            "password": "password123", "confirm": "password123"
        }),
        // Password too short
        serde_json::json!({
            "username": "tinypass", "display_name": "Tiny",
            "password": "abc", "confirm": "abc"
        }),
    ];

    for case in cases {
        let response = client
            .post(app.url("/register"))
            .json(&case)
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status().as_u16(), 400, "payload: {}", case);
    }

    assert_eq!(app.count("SELECT COUNT(*) FROM users").await, 0);
}

#[tokio::test]
async fn login_establishes_session() {
    let app = spawn_app().await;
    let client = cookie_client();
    let username = unique_name("login");
    app.register(&client, &username).await;

    // Not logged in yet
    let before = client.get(app.url("/edit-profile")).send().await.unwrap();
    assert_eq!(before.status().as_u16(), 401);

    let login = app.login(&client, &username, "password123").await;
    assert_eq!(login.status().as_u16(), 200);

    let me: serde_json::Value = client
        .get(app.url("/edit-profile"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["username"], username.as_str());

    let info: serde_json::Value = client
        .get(app.url("/login"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(info["user"]["username"], username.as_str());
}

#[tokio::test]
async fn second_login_replaces_session() {
    let app = spawn_app().await;
    let username = unique_name("twice");
    let client = app.logged_in_client(&username).await;

    let old_token: String = sqlx::query_scalar("SELECT token FROM sessions")
        .fetch_one(&app.pool)
        .await
        .unwrap();

    let again = app.login(&client, &username, "password123").await;
    assert_eq!(again.status().as_u16(), 200);

    assert_eq!(app.count("SELECT COUNT(*) FROM sessions").await, 1);
    let new_token: String = sqlx::query_scalar("SELECT token FROM sessions")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_ne!(new_token, old_token);

    // The replaced cookie no longer authenticates anyone.
    let stale = reqwest::Client::new()
        .get(app.url("/edit-profile"))
        .header("Cookie", format!("session_id={}", old_token))
        .send()
        .await
        .unwrap();
    assert_eq!(stale.status().as_u16(), 401);

    let me = client.get(app.url("/edit-profile")).send().await.unwrap();
    assert_eq!(me.status().as_u16(), 200);
}

#[tokio::test]
async fn wrong_password_never_creates_session() {
    let app = spawn_app().await;
    let client = cookie_client();
    let username = unique_name("wrong");
    app.register(&client, &username).await;

    let bad_password = app.login(&client, &username, "not-the-password").await;
    assert_eq!(bad_password.status().as_u16(), 401);
    let bad_password: serde_json::Value = bad_password.json().await.unwrap();

    let unknown_user = app.login(&client, "nobody_here", "password123").await;
    assert_eq!(unknown_user.status().as_u16(), 401);
    let unknown_user: serde_json::Value = unknown_user.json().await.unwrap();

    // Same message whichever field was wrong.
    assert_eq!(bad_password["error"], unknown_user["error"]);

    assert_eq!(app.count("SELECT COUNT(*) FROM sessions").await, 0);
    let me = client.get(app.url("/edit-profile")).send().await.unwrap();
    assert_eq!(me.status().as_u16(), 401);
}

#[tokio::test]
async fn logout_clears_session() {
    let app = spawn_app().await;
    let client = app.logged_in_client(&unique_name("bye")).await;
    assert_eq!(app.count("SELECT COUNT(*) FROM sessions").await, 1);

    let response = client.get(app.url("/logout")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 200);

    assert_eq!(app.count("SELECT COUNT(*) FROM sessions").await, 0);
    let me = client.get(app.url("/edit-profile")).send().await.unwrap();
    assert_eq!(me.status().as_u16(), 401);

    // Logging out twice is harmless.
    let again = client.get(app.url("/logout")).send().await.unwrap();
    assert_eq!(again.status().as_u16(), 200);
}

#[tokio::test]
async fn expired_session_is_ignored_and_removed() {
    let app = spawn_app().await;
    let client = app.logged_in_client(&unique_name("old")).await;

    sqlx::query("UPDATE sessions SET expires_at = 0")
        .execute(&app.pool)
        .await
        .unwrap();

    let me = client.get(app.url("/edit-profile")).send().await.unwrap();
    assert_eq!(me.status().as_u16(), 401);
    assert_eq!(app.count("SELECT COUNT(*) FROM sessions").await, 0);
}

#[tokio::test]
async fn forged_cookie_is_anonymous() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(app.url("/edit-profile"))
        .header("Cookie", "session_id=deadbeef")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn startup_purge_drops_only_expired_sessions() {
    let app = spawn_app().await;
    app.logged_in_client(&unique_name("fresh")).await;
    app.logged_in_client(&unique_name("stale")).await;

    sqlx::query("UPDATE sessions SET expires_at = 0 WHERE rowid = (SELECT MIN(rowid) FROM sessions)")
        .execute(&app.pool)
        .await
        .unwrap();

    let purged = blog::db::purge_expired_sessions(&app.pool).await.unwrap();

    assert_eq!(purged, 1);
    assert_eq!(app.count("SELECT COUNT(*) FROM sessions").await, 1);
}
