//! Document to markup rendering
//!
//! Rendering is a blocking, out-of-process call. Callers on an async
//! runtime go through `spawn_blocking`.

use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use wait_timeout::ChildExt;

use super::errors::{RenderError, RenderResult};

/// Turns a serialized notebook into full-page markup.
pub trait Renderer: Send + Sync {
    fn render(&self, document: &[u8]) -> RenderResult<String>;
}

/// Renderer process configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RendererConfig {
    /// Program to run (default: "jupyter")
    #[serde(default = "default_program")]
    pub program: String,

    /// Arguments placed before the notebook path
    #[serde(default = "default_args")]
    pub args: Vec<String>,

    /// Seconds before the renderer is killed (default: 60)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Rendered documents kept in the shared cache (default: 256)
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

fn default_program() -> String {
    "jupyter".to_string()
}

fn default_args() -> Vec<String> {
    vec!["nbconvert".to_string(), "--to".to_string(), "html".to_string()]
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_cache_capacity() -> usize {
    256
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
            timeout_secs: default_timeout_secs(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

impl RendererConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Renders through `jupyter nbconvert --to html`, or any program with the
/// same contract: given `<dir>/<name>.ipynb`, write `<dir>/<name>.html`.
#[derive(Debug, Clone)]
pub struct NbconvertRenderer {
    config: RendererConfig,
}

impl NbconvertRenderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    fn wait(&self, child: &mut Child) -> RenderResult<ExitStatus> {
        let timeout = self.config.timeout();
        match child.wait_timeout(timeout)? {
            Some(status) => Ok(status),
            None => {
                tracing::warn!(program = %self.config.program, ?timeout, "renderer timed out, killing");
                let _ = child.kill();
                let _ = child.wait();
                Err(RenderError::Timeout(timeout))
            }
        }
    }
}

/// The renderer's sibling output file, removed however the render ends.
struct OutputFile(PathBuf);

impl Drop for OutputFile {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.0);
    }
}

impl Default for NbconvertRenderer {
    fn default() -> Self {
        Self::new(RendererConfig::default())
    }
}

impl Renderer for NbconvertRenderer {
    fn render(&self, document: &[u8]) -> RenderResult<String> {
        let mut input = tempfile::Builder::new()
            .prefix("notebook-")
            .suffix(".ipynb")
            .tempfile()?;
        input.write_all(document)?;
        input.as_file().sync_all()?;

        let output = OutputFile(input.path().with_extension("html"));
        // stderr goes to a file so a chatty renderer cannot fill a pipe
        let mut stderr_file: File = tempfile::tempfile()?;

        tracing::debug!(program = %self.config.program, path = %input.path().display(), "running renderer");
        let mut child = Command::new(&self.config.program)
            .args(&self.config.args)
            .arg(input.path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(stderr_file.try_clone()?))
            .spawn()
            .map_err(|source| RenderError::Spawn {
                program: self.config.program.clone(),
                source,
            })?;

        let status = self.wait(&mut child)?;
        if !status.success() {
            let mut stderr = String::new();
            stderr_file.seek(SeekFrom::Start(0))?;
            let _ = stderr_file.read_to_string(&mut stderr);
            return Err(RenderError::Failed {
                status: status.code(),
                stderr: stderr.trim().to_string(),
            });
        }

        let markup =
            fs::read_to_string(&output.0).map_err(|_| RenderError::MissingOutput(output.0.clone()))?;
        Ok(markup)
    }
}
