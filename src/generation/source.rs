//! Token producers
//!
//! A producer streams the text of one notebook for a locator. Chunks are
//! arbitrary slices of the final text; only their concatenation matters.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::mpsc;

use super::config::GenerationConfig;
use super::errors::{GenerationError, GenerationResult};

const READ_BUFFER: usize = 4096;

/// Produces the text of a notebook, chunk by chunk.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Stream the document for `locator` into `chunks`. Returning `Ok`
    /// means the text is complete; the sender is dropped either way.
    async fn generate(&self, locator: &str, chunks: mpsc::Sender<String>) -> GenerationResult<()>;
}

/// Runs an external program and forwards its stdout.
#[derive(Debug, Clone)]
pub struct CommandTokenSource {
    program: String,
    args: Vec<String>,
}

impl CommandTokenSource {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_config(config: &GenerationConfig) -> Self {
        Self::new(config.command.clone(), config.args.clone())
    }
}

#[async_trait]
impl TokenSource for CommandTokenSource {
    async fn generate(&self, locator: &str, chunks: mpsc::Sender<String>) -> GenerationResult<()> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(locator)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| GenerationError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| GenerationError::Producer("stdout not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| GenerationError::Producer("stderr not captured".to_string()))?;
        let stderr_task = tokio::spawn(read_all(stderr));

        if !forward_utf8(stdout, &chunks).await? {
            // nobody is listening any more; kill_on_drop reaps the child
            return Err(GenerationError::Producer("chunk receiver closed".to_string()));
        }

        let status = child.wait().await?;
        let stderr = stderr_task.await.unwrap_or_default();
        if !status.success() {
            return Err(GenerationError::ExitStatus {
                code: status.code(),
                stderr: stderr.trim().to_string(),
            });
        }
        Ok(())
    }
}

/// Forward `reader` as text chunks, never splitting a UTF-8 sequence.
/// Returns `false` when the receiver went away.
async fn forward_utf8<R>(mut reader: R, chunks: &mpsc::Sender<String>) -> GenerationResult<bool>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; READ_BUFFER];
    let mut pending = Vec::new();
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        pending.extend_from_slice(&buf[..n]);
        let text = take_utf8(&mut pending);
        if !text.is_empty() && chunks.send(text).await.is_err() {
            return Ok(false);
        }
    }
    if !pending.is_empty() {
        let text = String::from_utf8_lossy(&pending).into_owned();
        if chunks.send(text).await.is_err() {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Drain the longest decodable prefix of `pending`. An incomplete
/// trailing sequence stays behind; invalid bytes are replaced.
fn take_utf8(pending: &mut Vec<u8>) -> String {
    let valid = match std::str::from_utf8(pending) {
        Ok(_) => pending.len(),
        Err(e) if e.error_len().is_none() => e.valid_up_to(),
        Err(_) => {
            let text = String::from_utf8_lossy(pending).into_owned();
            pending.clear();
            return text;
        }
    };
    let text = String::from_utf8_lossy(&pending[..valid]).into_owned();
    pending.drain(..valid);
    text
}

async fn read_all<R>(mut reader: R) -> String
where
    R: AsyncRead + Unpin,
{
    let mut bytes = Vec::new();
    let _ = reader.read_to_end(&mut bytes).await;
    String::from_utf8_lossy(&bytes).into_owned()
}
