//! # nbstream HTTP Server Module
//!
//! Serves generated notebooks as progressively streamed HTML pages.
//!
//! # Endpoints
//!
//! - `/health` - Health check
//! - `/sessions` - Generation sessions and render cache counters
//! - `POST /gen` - Start generating a locator without streaming it
//! - anything else - The notebook for that path and query, streamed

pub mod config;
pub mod generation_routes;
pub mod notebook_routes;
pub mod observability_routes;
pub mod server;

pub use config::HttpServerConfig;
pub use notebook_routes::{locator_for, NotebookState};
pub use server::HttpServer;
