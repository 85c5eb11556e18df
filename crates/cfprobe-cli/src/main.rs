//! cfprobe: inspect what the smudge filter sees on this host
//!
//! Commands:
//!   normalize <pattern>...     - strip the shell root prefix from patterns
//!   line-ending                - print the native line ending
//!   sync-root [<path>]         - is the directory a registered sync root?
//!   placeholder <path>...      - classify files as placeholder / resident
//!   config show                - display the effective configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};

use cfprobe_core::ProbeConfig;
use cfprobe_platform::Platform;

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "cfprobe",
    version,
    about = "Shell path rewriting and cloud placeholder probes",
    long_about = "cfprobe: run the path normalization, sync-root and placeholder checks the smudge filter uses"
)]
struct Cli {
    /// Path to cfprobe.toml configuration file
    #[arg(long, short = 'c', env = "CFPROBE_CONFIG", default_value = "cfprobe.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, env = "CFPROBE_LOG")]
    log: Option<String>,

    /// Log format (json, text); overrides the config file
    #[arg(long, env = "CFPROBE_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Strip the POSIX shell's root prefix from drive-letter patterns
    Normalize {
        /// Patterns as received from the shell (e.g. "C:/Program Files/Git/foo")
        #[arg(required = true)]
        patterns: Vec<String>,
    },

    /// Print the host's native line ending as an escaped string
    #[command(name = "line-ending")]
    LineEnding,

    /// Check whether a directory is registered as a managed sync root
    ///
    /// Exits 0 when it is, 1 when it is not.
    #[command(name = "sync-root")]
    SyncRoot {
        /// Directory to check (default: current directory)
        path: Option<PathBuf>,
    },

    /// Classify files as placeholders (must be fetched) or resident
    Placeholder {
        /// Files to check
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Working-tree root used to decide the sync-root flag
        /// (default: current directory)
        #[arg(long)]
        root: Option<PathBuf>,

        /// Treat the working tree as a sync root without asking the registry
        #[arg(long)]
        sync_root: bool,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let loaded = ProbeConfig::load(&cli.config)
        .with_context(|| format!("loading config: {}", cli.config.display()))?;
    let found = loaded.is_some();
    let config = loaded.unwrap_or_default();

    let (level, format) = log_settings(&cli, &config);
    init_logging(&level, &format);
    if !found {
        warn!("config file not found: {}  (using defaults)", cli.config.display());
    }

    let platform = cfprobe_platform::init_global(&config);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        platform = ?platform.kind(),
        config = %cli.config.display(),
        "cfprobe starting"
    );

    match cli.command {
        Commands::Normalize { patterns } => Ok(cmd_normalize(platform, &patterns)),
        Commands::LineEnding => Ok(cmd_line_ending(platform)),
        Commands::SyncRoot { path } => cmd_sync_root(platform, path.as_deref()),
        Commands::Placeholder {
            paths,
            root,
            sync_root,
        } => cmd_placeholder(platform, &paths, root.as_deref(), sync_root),
        Commands::Config {
            action: ConfigAction::Show,
        } => cmd_config_show(&config, &cli.config),
    }
}

/// Command-line and environment settings win over the config file.
fn log_settings(cli: &Cli, config: &ProbeConfig) -> (String, LogFormat) {
    let level = cli.log.clone().unwrap_or_else(|| config.log.level.clone());
    let format = cli.log_format.clone().unwrap_or(match config.log.format.as_str() {
        "json" => LogFormat::Json,
        _ => LogFormat::Text,
    });
    (level, format)
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries command output; logs go to stderr
    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

/// Resolve an optional path argument, defaulting to the current directory.
fn path_or_cwd(path: Option<&Path>) -> Result<PathBuf> {
    match path {
        Some(p) => Ok(p.to_path_buf()),
        None => std::env::current_dir().context("reading current directory"),
    }
}

// ── `cfprobe normalize` ───────────────────────────────────────────────────────

fn cmd_normalize(platform: &dyn Platform, patterns: &[String]) -> ExitCode {
    for pattern in patterns {
        println!("{}", platform.normalize_root_path(pattern));
    }
    ExitCode::SUCCESS
}

// ── `cfprobe line-ending` ─────────────────────────────────────────────────────

fn cmd_line_ending(platform: &dyn Platform) -> ExitCode {
    println!("{}", platform.native_line_ending().as_str().escape_default());
    ExitCode::SUCCESS
}

// ── `cfprobe sync-root` ───────────────────────────────────────────────────────

fn cmd_sync_root(platform: &dyn Platform, path: Option<&Path>) -> Result<ExitCode> {
    let dir = path_or_cwd(path)?;
    if platform.is_managed_sync_root(&dir) {
        println!("{}: managed sync root", dir.display());
        Ok(ExitCode::SUCCESS)
    } else {
        println!("{}: not a managed sync root", dir.display());
        Ok(ExitCode::from(1))
    }
}

// ── `cfprobe placeholder` ─────────────────────────────────────────────────────

fn cmd_placeholder(
    platform: &dyn Platform,
    paths: &[PathBuf],
    root: Option<&Path>,
    force_sync_root: bool,
) -> Result<ExitCode> {
    let sync_root = if force_sync_root {
        platform.set_sync_root(true);
        platform.sync_root()
    } else {
        platform.init_sync_root(&path_or_cwd(root)?)
    };
    info!(sync_root, files = paths.len(), "classifying files");

    let states = platform.scan(paths);
    let width = states.iter().map(|s| s.as_str().len()).max().unwrap_or(0);
    for (path, state) in paths.iter().zip(&states) {
        println!("{:<width$}  {}", state.as_str(), path.display());
    }

    let placeholders = states.iter().filter(|s| s.is_placeholder()).count();
    println!();
    println!("{} of {} files must be fetched", placeholders, paths.len());
    Ok(ExitCode::SUCCESS)
}

// ── `cfprobe config show` ─────────────────────────────────────────────────────

fn cmd_config_show(config: &ProbeConfig, path: &Path) -> Result<ExitCode> {
    println!("# config: {}", path.display());
    println!("{}", config.to_toml().context("serializing config")?);
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_placeholder_command() {
        let cli = Cli::try_parse_from([
            "cfprobe",
            "placeholder",
            "--sync-root",
            "a.psd",
            "b.psd",
        ])
        .unwrap();
        match cli.command {
            Commands::Placeholder {
                paths,
                sync_root,
                root,
            } => {
                assert_eq!(paths, vec![PathBuf::from("a.psd"), PathBuf::from("b.psd")]);
                assert!(sync_root);
                assert!(root.is_none());
            }
            other => panic!("expected Placeholder, got: {other:?}"),
        }
    }

    #[test]
    fn placeholder_root_defaults_to_registry_lookup() {
        let cli =
            Cli::try_parse_from(["cfprobe", "placeholder", "--root", "/work/tree", "a.psd"]).unwrap();
        match cli.command {
            Commands::Placeholder {
                sync_root, root, ..
            } => {
                assert!(!sync_root);
                assert_eq!(root, Some(PathBuf::from("/work/tree")));
            }
            other => panic!("expected Placeholder, got: {other:?}"),
        }
    }

    #[test]
    fn log_settings_come_from_config_file() {
        let cli = Cli::try_parse_from(["cfprobe", "line-ending"]).unwrap();
        let mut config = ProbeConfig::default();
        config.log.level = "debug".into();
        config.log.format = "json".into();

        let (level, format) = log_settings(&cli, &config);
        if std::env::var_os("CFPROBE_LOG").is_none() {
            assert_eq!(level, "debug");
        }
        if std::env::var_os("CFPROBE_LOG_FORMAT").is_none() {
            assert!(matches!(format, LogFormat::Json));
        }
    }

    #[test]
    fn log_flags_override_config_file() {
        let cli = Cli::try_parse_from([
            "cfprobe",
            "--log",
            "trace",
            "--log-format",
            "text",
            "line-ending",
        ])
        .unwrap();
        let mut config = ProbeConfig::default();
        config.log.format = "json".into();

        let (level, format) = log_settings(&cli, &config);
        assert_eq!(level, "trace");
        assert!(matches!(format, LogFormat::Text));
    }

    #[test]
    fn normalize_requires_a_pattern() {
        assert!(Cli::try_parse_from(["cfprobe", "normalize"]).is_err());
    }

    #[test]
    fn explicit_path_is_kept() {
        assert_eq!(
            path_or_cwd(Some(Path::new("/tmp/x"))).unwrap(),
            PathBuf::from("/tmp/x")
        );
    }
}
