// src/config.rs

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use dotenvy::dotenv;

/// Largest request body accepted by any route (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Default session lifetime: 7 days.
pub const DEFAULT_SESSION_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    /// Root of the upload area; holds the `profiles/` and `posts/` directories.
    pub upload_root: PathBuf,
    pub max_upload_bytes: usize,
    pub session_ttl_seconds: i64,
    /// Marks the session cookie `Secure`. Enable behind HTTPS.
    pub cookie_secure: bool,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://blog.db".to_string());

        let bind_addr = parse_var("BIND_ADDR").unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

        let upload_root = env::var("UPLOAD_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("static/uploads"));

        let max_upload_bytes = parse_var("MAX_UPLOAD_BYTES").unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

        let session_ttl_seconds =
            parse_var("SESSION_TTL_SECONDS").unwrap_or(DEFAULT_SESSION_TTL_SECONDS);

        let cookie_secure = flag_var("COOKIE_SECURE").unwrap_or(false);

        let rust_log = log_filter();

        Self {
            database_url,
            bind_addr,
            upload_root,
            max_upload_bytes,
            session_ttl_seconds,
            cookie_secure,
            rust_log,
        }
    }
}

/// Log filter directives from `RUST_LOG`, `info` when unset.
///
/// Readable before a subscriber exists, so logging can be set up before the
/// rest of the configuration is parsed (and warned about).
pub fn log_filter() -> String {
    env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string())
}

/// Reads and parses an environment variable, ignoring unset or malformed values.
fn parse_var<T: FromStr>(key: &str) -> Option<T> {
    match env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring malformed {}={:?}, using default", key, raw);
                None
            }
        },
        Err(_) => None,
    }
}

fn flag_var(key: &str) -> Option<bool> {
    let raw = env::var(key).ok()?;
    let value = parse_flag(&raw);
    if value.is_none() {
        tracing::warn!("Ignoring malformed {}={:?}, using default", key, raw);
    }
    value
}

/// Boolean spellings accepted for flags: 1/0, true/false, yes/no, on/off.
fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
