//! Web UI: axum server, session-cookie auth, and embedded templates.

pub mod server;
pub mod templates;

pub use server::{WebServer, start_server};
