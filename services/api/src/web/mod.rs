pub mod action;
pub mod auth;
pub mod extract;
pub mod middleware;
pub mod pomodoro;
pub mod progress;
pub mod rest;
pub mod state;
pub mod study_logs;
pub mod timer;

// Re-export the router and state so the binary and the tests can build the app.
pub use middleware::require_auth;
pub use rest::{create_router, ApiDoc};
pub use state::AppState;
