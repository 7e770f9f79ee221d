//! nbstream - Progressive streaming of generated notebooks
//!
//! A token producer writes a notebook document piece by piece. Each
//! prefix is repaired into a valid document and published to a snapshot
//! store; HTTP clients receive the rendered page cell by cell as cells
//! settle.
//!
//! - [`notebook`]: document model and prefix repair
//! - [`writer`]: incremental writer publishing snapshots
//! - [`store`]: snapshot artifacts shared by writer and streams
//! - [`render`]: markup rendering, render cache, fragment extraction
//! - [`stream`]: per-client fragment streaming
//! - [`generation`]: token producers and session bookkeeping
//! - [`http_server`]: axum server

pub mod cli;
pub mod config;
pub mod generation;
pub mod http_server;
pub mod notebook;
pub mod observability;
pub mod render;
pub mod store;
pub mod stream;
pub mod writer;
