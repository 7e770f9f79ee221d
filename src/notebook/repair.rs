//! Best-effort completion of a truncated notebook serialization.
//!
//! A generator streaming a notebook token by token is almost always cut
//! off inside an object, a cell list, a string or a key. Rather than an
//! incremental parser, the repairer appends each candidate closing suffix
//! in turn and keeps the first one that parses as a [`Notebook`].

use super::types::Notebook;

/// Closing suffixes tried in order, from "already complete" to the most
/// aggressive completion of the `{"cells":[{"source":["...` shape.
pub const CLOSING_SUFFIXES: [&str; 9] = [
    "",
    "}",
    "}]}",
    "\"]}}",
    "\"]}]}",
    "]}]}",
    "\"\"]}]}",
    "\":null}]}",
    "null}]}",
];

/// Outcome of [`repair`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repair {
    /// Canonical serialization of the repaired, validated document.
    pub json: String,
    /// True only when the input parsed without any suffix and holds at
    /// least one cell.
    pub definite: bool,
}

/// Parse `prefix` as a possibly truncated notebook.
///
/// Never fails: input no suffix can rescue yields an empty notebook. The
/// result is always validated and re-serialized canonically.
pub fn repair(prefix: &str) -> Repair {
    let mut parsed = None;
    for (index, suffix) in CLOSING_SUFFIXES.iter().enumerate() {
        let candidate = format!("{}{}", prefix, suffix);
        if let Ok(notebook) = serde_json::from_str::<Notebook>(&candidate) {
            parsed = Some((notebook, index == 0));
            break;
        }
    }

    let (mut notebook, exact) = parsed.unwrap_or_default();
    notebook.validate();
    let definite = exact && !notebook.cells.is_empty();

    match serde_json::to_string(&notebook) {
        Ok(json) => Repair { json, definite },
        Err(e) => {
            tracing::warn!(error = %e, "repaired notebook failed to serialize");
            Repair {
                json: prefix.to_string(),
                definite: false,
            }
        }
    }
}

/// Repair and return the parsed document alongside the flag.
pub fn repair_notebook(prefix: &str) -> (Notebook, bool) {
    let repaired = repair(prefix);
    let notebook = serde_json::from_str(&repaired.json).unwrap_or_default();
    (notebook, repaired.definite)
}
