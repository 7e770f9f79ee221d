//! CLI command implementations
//!
//! `serve` and `generate` build the same pipeline: filesystem snapshot
//! store, nbconvert renderer behind a shared cache, and the configured
//! token producer.

use std::path::Path;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::generation::{CommandTokenSource, SessionRegistry, SessionState};
use crate::http_server::{HttpServer, NotebookState};
use crate::notebook;
use crate::observability::init_logging;
use crate::render::{NbconvertRenderer, RenderCache};
use crate::store::{Artifact, FsSnapshotStore, SessionKey, SnapshotStore};
use crate::stream::FragmentStreamer;

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_input, write_line};

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Serve {
            config,
            port,
            gen_dir,
        } => serve(config.as_deref(), port, gen_dir.as_deref()),
        Command::Repair { input } => repair(input.as_deref()),
        Command::Generate {
            locator,
            config,
            gen_dir,
        } => generate(&locator, config.as_deref(), gen_dir.as_deref()),
    }
}

/// Load configuration and apply command-line overrides.
pub fn resolve_config(
    config_path: Option<&Path>,
    port: Option<u16>,
    gen_dir: Option<&Path>,
) -> CliResult<AppConfig> {
    let mut config = AppConfig::load_or_default(config_path)?;
    if let Some(port) = port {
        config.http.port = port;
    }
    if let Some(dir) = gen_dir {
        config.data_dir = dir.to_path_buf();
    }
    Ok(config)
}

/// Wire store, renderer, producer and streamer for `config`.
pub fn build_state(config: &AppConfig) -> CliResult<Arc<NotebookState>> {
    let store: Arc<dyn SnapshotStore> = Arc::new(FsSnapshotStore::new(config.data_dir.clone()));
    let cache = render_cache(config);
    let registry = build_registry(config, store.clone(), cache.clone());

    let streamer = FragmentStreamer::new(store, cache.clone(), config.stream.clone())
        .map_err(|e| CliError::config_error(format!("Invalid stream config: {}", e)))?
        .with_trigger(Arc::new(registry.clone()));

    Ok(Arc::new(NotebookState::new(registry, streamer, cache)))
}

fn render_cache(config: &AppConfig) -> Arc<RenderCache> {
    let renderer = Arc::new(NbconvertRenderer::new(config.renderer.clone()));
    Arc::new(RenderCache::new(renderer, config.renderer.cache_capacity))
}

fn build_registry(
    config: &AppConfig,
    store: Arc<dyn SnapshotStore>,
    cache: Arc<RenderCache>,
) -> SessionRegistry {
    let source = Arc::new(CommandTokenSource::from_config(&config.generation));
    SessionRegistry::new(store, source, Some(cache), config.generation.clone())
}

/// Start the HTTP server and serve until it fails.
pub fn serve(config_path: Option<&Path>, port: Option<u16>, gen_dir: Option<&Path>) -> CliResult<()> {
    let config = resolve_config(config_path, port, gen_dir)?;
    init_logging(&config.log_filter);
    tracing::info!(data_dir = %config.data_dir.display(), "starting nbstream");

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async {
        let state = build_state(&config)?;
        HttpServer::with_config(config.http.clone(), state)
            .start()
            .await
            .map_err(|e| CliError::boot_failed(format!("HTTP server failed: {}", e)))
    })
}

/// Repair a notebook prefix and print the canonical document.
///
/// Fails with `NBSTREAM_CLI_INCOMPLETE` when the input needed completion,
/// after printing the repaired document.
pub fn repair(input: Option<&Path>) -> CliResult<()> {
    let text = read_input(input)?;
    let repaired = notebook::repair(&text);
    write_line(&repaired.json)?;

    if repaired.definite {
        Ok(())
    } else {
        Err(CliError::incomplete())
    }
}

/// Run one generation session to completion and print the final
/// document's path.
pub fn generate(locator: &str, config_path: Option<&Path>, gen_dir: Option<&Path>) -> CliResult<()> {
    let config = resolve_config(config_path, None, gen_dir)?;
    init_logging(&config.log_filter);

    let store = FsSnapshotStore::new(config.data_dir.clone());
    let final_path = store.path(&SessionKey::for_locator(locator), Artifact::Final);
    let registry = build_registry(&config, Arc::new(store), render_cache(&config));

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))?;
    let info = rt
        .block_on(registry.run_to_completion(locator))
        .ok_or_else(|| CliError::generation_failed("Session already running"))?;

    write_line(&final_path.display().to_string())?;
    match info.state {
        SessionState::Completed => Ok(()),
        _ => Err(CliError::generation_failed(
            info.error.unwrap_or_else(|| "Generation did not complete".to_string()),
        )),
    }
}
