//! Notebook document model and partial-document repair
//!
//! The document is the unit being reconstructed from a token stream:
//! an ordered list of cells, each with source and outputs. `validate`
//! turns any sparse parse into something a renderer accepts, and
//! `repair` turns any prefix of a serialization into a valid document.

mod multiline;
mod repair;
mod types;

pub use multiline::MultilineString;
pub use repair::{repair, repair_notebook, Repair, CLOSING_SUFFIXES};
pub use types::{
    Author, Cell, CellMetadata, Jupyter, KernelSpec, LanguageInfo, Metadata, MimeBundle, Notebook,
    Output, DEFAULT_CELL_NAME, NBFORMAT, NBFORMAT_MINOR,
};
