// src/handlers/mod.rs

pub mod auth;
pub mod form;
pub mod posts;
pub mod profile;
