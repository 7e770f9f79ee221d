//! Session keys and artifact naming

use std::fmt;

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Hex characters of the locator digest kept in a key.
const DIGEST_HEX_LEN: usize = 32;

/// Stable identity of one generated document, derived from the request
/// locator. Safe to use as a file name stem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SessionKey(String);

impl SessionKey {
    /// Key for a resource locator (request path plus query).
    pub fn for_locator(locator: &str) -> Self {
        let digest = format!("{:x}", Sha256::digest(locator.as_bytes()));
        SessionKey(format!("gen-{}", &digest[..DIGEST_HEX_LEN]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The named snapshots a session publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Artifact {
    /// Concatenation of every chunk received so far.
    Raw,
    /// Latest repaired, canonical document.
    Current,
    /// Document frozen by `finish`; never rewritten within a session.
    Final,
    /// Markup rendered from the final document.
    Rendered,
    /// Producer failure message.
    Error,
}

impl Artifact {
    /// File name of this artifact for `key`.
    pub fn file_name(&self, key: &SessionKey) -> String {
        match self {
            Artifact::Raw => format!("{}-raw.ipynb", key),
            Artifact::Current => format!("{}.ipynb", key),
            Artifact::Final => format!("{}-final.ipynb", key),
            Artifact::Rendered => format!("{}.html", key),
            Artifact::Error => format!("{}-error.txt", key),
        }
    }
}
