//! Notebook document types
//!
//! Field names follow nbformat 4. Every field reads `null` or absence as
//! its zero value and unknown fields are ignored, so a document completed
//! by appending closers (including a dangling `"key":null`) still parses.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::multiline::MultilineString;

/// Major format version written when a document does not declare one.
pub const NBFORMAT: i64 = 4;

/// Minor format version paired with [`NBFORMAT`] when it is defaulted.
pub const NBFORMAT_MINOR: i64 = 5;

/// Placeholder for a cell whose metadata carries no name.
pub const DEFAULT_CELL_NAME: &str = "cell";

/// MIME type to payload.
pub type MimeBundle = BTreeMap<String, MultilineString>;

/// Reads `null` as the type's default.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn is_zero(n: &i64) -> bool {
    *n == 0
}

/// A notebook: ordered cells plus document metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Notebook {
    #[serde(default, deserialize_with = "nullable")]
    pub metadata: Metadata,
    #[serde(default, deserialize_with = "nullable")]
    pub nbformat_minor: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub nbformat: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub cells: Vec<Cell>,
}

impl Notebook {
    /// Fill in defaults so the document serializes to a complete,
    /// renderer-acceptable form.
    ///
    /// Never fails and is idempotent: a second call changes nothing.
    pub fn validate(&mut self) {
        self.metadata.validate();
        if self.nbformat == 0 {
            self.nbformat = NBFORMAT;
            if self.nbformat_minor == 0 {
                self.nbformat_minor = NBFORMAT_MINOR;
            }
        }
        for cell in &mut self.cells {
            cell.validate();
        }
    }
}

/// Document-level metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kernelspec: Option<KernelSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_info: Option<LanguageInfo>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "is_zero")]
    pub orig_nbformat: i64,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<Author>,
}

impl Metadata {
    pub fn validate(&mut self) {}
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KernelSpec {
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "String::is_empty")]
    pub display_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LanguageInfo {
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codemirror_mode: Option<Value>,
    #[serde(default, deserialize_with = "nullable")]
    pub file_extension: String,
    #[serde(default, deserialize_with = "nullable")]
    pub mimetype: String,
    #[serde(default, deserialize_with = "nullable")]
    pub pygments_lexer: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Author {
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
}

/// One executable or prose entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,
    /// `"code"`, `"markdown"`, `"raw"`.
    #[serde(default, deserialize_with = "nullable")]
    pub cell_type: String,
    #[serde(default)]
    pub metadata: Option<CellMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<MultilineString>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "BTreeMap::is_empty")]
    pub attachments: BTreeMap<String, MimeBundle>,
    #[serde(default, deserialize_with = "nullable")]
    pub outputs: Vec<Output>,
    #[serde(default)]
    pub execution_count: Option<i64>,
}

impl Cell {
    pub fn validate(&mut self) {
        self.metadata
            .get_or_insert_with(CellMetadata::default)
            .validate();
        for output in &mut self.outputs {
            output.validate();
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CellMetadata {
    #[serde(default, deserialize_with = "nullable")]
    pub format: String,
    #[serde(default, deserialize_with = "nullable")]
    pub jupyter: Jupyter,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "BTreeMap::is_empty")]
    pub execution: BTreeMap<String, Value>,
    #[serde(default, deserialize_with = "nullable")]
    pub collapsed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scrolled: Option<Value>,
}

impl CellMetadata {
    pub fn validate(&mut self) {
        if self.name.is_empty() {
            self.name = DEFAULT_CELL_NAME.to_string();
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jupyter {
    #[serde(default, deserialize_with = "nullable")]
    pub source_hidden: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub outputs_hidden: bool,
}

/// A cell output. Error outputs use `ename`/`evalue`/`traceback`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Output {
    #[serde(default, deserialize_with = "nullable")]
    pub output_type: String,
    #[serde(default)]
    pub execution_count: Option<i64>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "BTreeMap::is_empty")]
    pub data: MimeBundle,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default)]
    pub text: MultilineString,
    #[serde(default, deserialize_with = "nullable")]
    pub ename: String,
    #[serde(default, deserialize_with = "nullable")]
    pub evalue: String,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Vec::is_empty")]
    pub traceback: Vec<String>,
}

impl Output {
    pub fn validate(&mut self) {}

    pub fn is_error(&self) -> bool {
        self.output_type == "error"
    }
}
