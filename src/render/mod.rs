//! Markup rendering
//!
//! The renderer itself is an external program treated as a pure
//! function from notebook bytes to page markup. This module wraps it
//! with a shared content-hash cache and splits its pages into the
//! preamble and per-cell fragments the streamer delivers.

mod cache;
mod errors;
mod fragments;
mod renderer;

pub use cache::{content_digest, CacheStats, RenderCache};
pub use errors::{RenderError, RenderResult};
pub use fragments::{error_fragment, escape_html, FragmentExtractor};
pub use renderer::{NbconvertRenderer, Renderer, RendererConfig};
