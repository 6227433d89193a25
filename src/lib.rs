// Public API for the server binary, the migration tool and integration tests

pub mod answer;
pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod games;
pub mod migrate;
pub mod protocol;
pub mod session;
pub mod state;
pub mod store;
pub mod types;
pub mod ws;

// Re-export broadcast for testing
pub mod broadcast;
