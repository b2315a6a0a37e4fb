//! Read-only HTTP view of the alert registry

pub mod handlers;
pub mod server;

pub use handlers::{AlertSource, ApiError, AppState};
pub use server::{build_router, run_server, ServerConfig};
