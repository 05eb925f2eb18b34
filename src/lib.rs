//! Chorus Controller: token authentication core.
//!
//! Re-exports modules needed by the binary and by integration tests in `tests/`.

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod state;
pub mod store;
pub mod vault;

pub use state::AppState;
