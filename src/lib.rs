//! Library crate for progress-board-back, exposing modules for the server binary and integration tests.

/// Runtime configuration loading.
pub mod config;
/// Storage backends, entities, and repositories.
pub mod dao;
/// Request and response payloads.
pub mod dto;
/// Service and HTTP error types.
pub mod error;
/// HTTP route trees.
pub mod routes;
/// Business operations over the shared state.
pub mod services;
/// Shared application state.
pub mod state;
