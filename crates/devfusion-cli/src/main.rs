//! # devfusion-cli
//!
//! Binary entry point for DevFusion.
//!
//! This crate provides:
//! - CLI argument parsing using `clap`
//! - Configuration loading with `key=value` overrides
//! - Room, file, run and assistant commands over a live room session
//! - Keychain management for service API keys via `devfusion auth`

mod ai_cli;
mod auth_cli;
mod completions;
mod display;
mod file_cli;
mod room_cli;

use std::io::{IsTerminal, stdout};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use devfusion_core::{DevFusionConfig, RoomSession};
use devfusion_proto::{DocumentStore, RoomId};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "devfusion.yml";

/// Color output mode for terminal display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorMode {
    /// Automatically detect if stdout is a TTY
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl ColorMode {
    /// Returns true if colors should be used based on mode and terminal detection.
    fn should_use_colors(self) -> bool {
        match self {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => stdout().is_terminal(),
        }
    }
}

/// Source for configuration: a file path or a single `section.field=value` override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Override { key: String, value: String },
}

impl ConfigSource {
    /// Parse a config source string into its variant.
    ///
    /// Only strings whose key names a config section are treated as
    /// overrides, so file paths containing `=` still load as files.
    fn parse(s: &str) -> Self {
        if let Some((key, value)) = s.split_once('=')
            && ["store.", "assistant.", "runner."]
                .iter()
                .any(|section| key.starts_with(section))
        {
            return ConfigSource::Override {
                key: key.trim().to_string(),
                value: value.trim().to_string(),
            };
        }
        ConfigSource::File(PathBuf::from(s))
    }
}

/// Loads configuration from the first file source, then applies overrides in order.
pub(crate) fn load_config(sources: &[ConfigSource]) -> Result<DevFusionConfig> {
    let path = sources
        .iter()
        .find_map(|source| match source {
            ConfigSource::File(path) => Some(path.clone()),
            ConfigSource::Override { .. } => None,
        })
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));

    let mut config = if path.exists() {
        DevFusionConfig::from_file(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?
    } else {
        if path != PathBuf::from(DEFAULT_CONFIG) {
            warn!("Config file {} not found, using defaults", path.display());
        }
        DevFusionConfig::default()
    };

    for source in sources {
        if let ConfigSource::Override { key, value } = source {
            config
                .apply_override(key, value)
                .with_context(|| format!("Invalid override {key}={value}"))?;
        }
    }
    config.normalize();
    debug!(backend = ?config.store.backend, "Configuration loaded");
    Ok(config)
}

/// Opens the configured document store.
pub(crate) fn open_store(config: &DevFusionConfig) -> Result<Arc<dyn DocumentStore>> {
    devfusion_adapters::build_store(config).context("Failed to open document store")
}

/// Joins `room` and waits for its first snapshot.
pub(crate) async fn open_session(config: &DevFusionConfig, room: &RoomId) -> Result<RoomSession> {
    let store = open_store(config)?;
    RoomSession::open(store, room.clone())
        .await
        .with_context(|| format!("Failed to join room {room}"))
}

/// DevFusion - collaborative rooms with remote execution and an AI assistant
#[derive(Parser, Debug)]
#[command(name = "devfusion", version, about, disable_help_subcommand = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path or section.field=value override.
    /// Can be specified multiple times. Overrides apply after the file is loaded.
    #[arg(short, long, default_value = DEFAULT_CONFIG, global = true, action = ArgAction::Append)]
    config: Vec<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Color output mode (auto, always, never)
    #[arg(long, value_enum, default_value_t = ColorMode::Auto, global = true)]
    color: ColorMode,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create or inspect rooms
    Room(room_cli::RoomArgs),

    /// Follow a room and print its file tree whenever it changes
    Watch(room_cli::WatchArgs),

    /// Create, rename, delete, read and write files in a room
    File(file_cli::FileArgs),

    /// Execute a file on the remote runner
    Run(file_cli::RunArgs),

    /// Ask the AI assistant about a file
    Ai(ai_cli::AiArgs),

    /// Manage API keys stored in the OS keychain
    Auth(auth_cli::AuthArgs),

    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    colored::control::set_override(cli.color.should_use_colors());

    let config_sources: Vec<ConfigSource> =
        cli.config.iter().map(|s| ConfigSource::parse(s)).collect();

    match cli.command {
        Commands::Room(args) => room_cli::execute(&load_config(&config_sources)?, args).await,
        Commands::Watch(args) => room_cli::watch(&load_config(&config_sources)?, args).await,
        Commands::File(args) => file_cli::execute(&load_config(&config_sources)?, args).await,
        Commands::Run(args) => file_cli::run(&load_config(&config_sources)?, args).await,
        Commands::Ai(args) => ai_cli::execute(&load_config(&config_sources)?, args).await,
        Commands::Auth(args) => auth_cli::execute(args),
        Commands::Completions(args) => {
            completions::generate_completions(&args);
            Ok(())
        }
    }
}
