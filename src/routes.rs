// src/routes.rs

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware,
    routing::get,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::{
    handlers::{auth, posts, profile},
    state::AppState,
    utils::session::session_middleware,
};

/// Assembles the main application router.
///
/// * Every route sees the session-resolved `CurrentUser`.
/// * Uploaded files are served under `/static/uploads`.
/// * Request bodies are capped at `config.max_upload_bytes`.
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);

    let post_routes = Router::new()
        .route("/", get(posts::list_posts).post(posts::create_post))
        .route(
            "/post/{id}",
            get(posts::view_post)
                .post(posts::delete_post_images)
                .delete(posts::delete_post),
        );

    let auth_routes = Router::new()
        .route("/register", get(auth::session_info).post(auth::register))
        .route("/login", get(auth::session_info).post(auth::login))
        .route("/logout", get(auth::logout));

    let profile_routes = Router::new()
        .route("/user/{username}", get(profile::view_profile))
        .route(
            "/edit-profile",
            get(profile::get_profile).post(profile::edit_profile),
        );

    Router::new()
        .merge(post_routes)
        .merge(auth_routes)
        .merge(profile_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session_middleware,
        ))
        .nest_service("/static/uploads", ServeDir::new(state.storage.root()))
        // Global Middleware (applied from outside in)
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
