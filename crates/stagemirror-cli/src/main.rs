//! Stagemirror CLI
//!
//! Mirrors a project tree into a flat staging directory, once or continuously.

mod signals;

use signals::ShutdownReason;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use stagemirror_core::{MirrorConfig, OutputOptions, Project};
use stagemirror_sync::{
    ChangeWatcher, RefreshScheduler, RefreshSummary, SchedulerHandle, SyncSession, Trigger,
    TriggerOutcome, WatcherOptions,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stagemirror")]
#[command(about = "Stagemirror - Flatten a project into a staging folder for AI assistants")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one refresh pass and exit
    Sync(SyncArgs),

    /// Refresh once, then keep refreshing on changes and on each stdin line (`q` quits)
    Watch {
        #[command(flatten)]
        sync: SyncArgs,

        /// Disable automatic refresh on file changes
        #[arg(long)]
        no_auto: bool,
    },
}

#[derive(Args, Debug, Clone)]
struct SyncArgs {
    /// Project path (default: current directory)
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Display name of the project
    #[arg(long)]
    name: Option<String>,

    /// Text written to prompt.txt
    #[arg(long)]
    prompt: Option<String>,

    /// Staging directory (overrides config)
    #[arg(long)]
    staging: Option<PathBuf>,

    /// Config file (default: ~/.stagemirror/config.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Skip the content snapshot
    #[arg(long)]
    no_content: bool,

    /// Write the structure-only file tree
    #[arg(long)]
    tree: bool,

    /// Skip the path manifest
    #[arg(long)]
    no_manifest: bool,

    /// Leave function signatures out of the manifest
    #[arg(long)]
    no_functions: bool,

    /// Copy accepted files into the staging directory
    #[arg(long)]
    copy: bool,

    /// Add a .txt suffix to copied files
    #[arg(long)]
    txt: bool,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

impl SyncArgs {
    fn load_config(&self) -> Result<MirrorConfig> {
        let mut config = match &self.config {
            Some(path) => MirrorConfig::load_from(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => MirrorConfig::load(),
        };

        if let Some(staging) = &self.staging {
            config.staging_dir = staging.clone();
        }
        config.outputs = self.outputs(config.outputs);
        Ok(config)
    }

    /// Apply command-line toggles on top of the configured outputs.
    fn outputs(&self, mut outputs: OutputOptions) -> OutputOptions {
        if self.no_content {
            outputs.content_snapshot = false;
        }
        if self.tree {
            outputs.file_tree = true;
        }
        if self.no_manifest {
            outputs.manifest = false;
        }
        if self.no_functions {
            outputs.extract_functions = false;
        }
        if self.copy {
            outputs.copy_files = true;
        }
        if self.txt {
            outputs.convert_to_txt = true;
        }
        outputs
    }

    fn project(&self) -> Project {
        let mut project = Project::new(&self.path);
        if let Some(name) = &self.name {
            project = project.with_name(name.clone());
        }
        if let Some(prompt) = &self.prompt {
            project = project.with_metadata(prompt.clone());
        }
        project
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = match &cli.command {
        Commands::Sync(args) => args,
        Commands::Watch { sync, .. } => sync,
    };
    let config = args.load_config()?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Sync(args) => cmd_sync(&config, &args),
        Commands::Watch { sync, no_auto } => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            let result = runtime.block_on(cmd_watch(config, sync, !no_auto));
            // A pending stdin read would otherwise hold the runtime open.
            runtime.shutdown_timeout(Duration::from_millis(500));
            result
        }
    }
}

fn cmd_sync(config: &MirrorConfig, args: &SyncArgs) -> Result<()> {
    let mut session = SyncSession::new(args.project(), config);
    let summary = session
        .run()
        .with_context(|| format!("Refresh of {} failed", session.project().root.display()))?;

    print_summary(&summary, session.staging_dir(), args.json)
}

async fn cmd_watch(config: MirrorConfig, args: SyncArgs, auto: bool) -> Result<()> {
    let session = SyncSession::new(args.project(), &config);
    let root = session.project().root.clone();
    let staging = session.staging_dir().to_path_buf();
    let scheduler = Arc::new(RefreshScheduler::new(session));

    let initial = {
        let scheduler = Arc::clone(&scheduler);
        tokio::task::spawn_blocking(move || scheduler.trigger(Trigger::Manual)).await?
    };
    match initial {
        TriggerOutcome::Completed(summary) => print_summary(&summary, &staging, args.json)?,
        TriggerOutcome::Failed(e) => println!("✗ Initial refresh failed: {}", e),
        TriggerOutcome::Skipped => {}
    }

    let (handle, rx) = RefreshScheduler::channel();
    let (shutdown_tx, _) = broadcast::channel(1);

    let scheduler_task = tokio::spawn(Arc::clone(&scheduler).run(rx, shutdown_tx.subscribe()));

    let watcher = if auto {
        let watcher = ChangeWatcher::start(
            &root,
            &staging,
            WatcherOptions::from(&config),
            handle.clone(),
        )
        .context("Failed to start file watcher")?;
        Some(watcher)
    } else {
        None
    };

    let quit_rx = shutdown_tx.subscribe();
    let stdin_task = tokio::spawn(read_stdin_commands(handle, shutdown_tx.clone()));

    println!(
        "Watching {} ({}). Press Enter to refresh, q to quit.",
        root.display(),
        if auto { "auto refresh on" } else { "manual refresh only" }
    );

    let reason = signals::wait_for_shutdown(quit_rx).await;
    if reason != ShutdownReason::Quit {
        // The stdin task sends its own stop on quit.
        let _ = shutdown_tx.send(());
    }
    if let Some(watcher) = watcher {
        watcher.stop();
    }
    stdin_task.abort();

    // Lets a running pass finish before exit.
    if let Err(e) = scheduler_task.await {
        tracing::error!(error = %e, "Scheduler task failed");
    }

    if let Some(summary) = scheduler.last_summary() {
        println!("Last refresh: {}", summary);
    }
    println!("✓ Stopped.");

    Ok(())
}

/// A line typed while watching.
#[derive(Debug, PartialEq, Eq)]
enum StdinCommand {
    Refresh,
    Quit,
}

impl StdinCommand {
    fn parse(line: &str) -> Self {
        match line.trim() {
            "q" | "quit" => Self::Quit,
            _ => Self::Refresh,
        }
    }
}

/// Turn stdin lines into refresh requests until `q` or end of input.
async fn read_stdin_commands(handle: SchedulerHandle, quit_tx: broadcast::Sender<()>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match StdinCommand::parse(&line) {
                StdinCommand::Refresh => {
                    if !handle.request(Trigger::Manual) {
                        println!("Refresh already pending.");
                    }
                }
                StdinCommand::Quit => {
                    let _ = quit_tx.send(());
                    break;
                }
            },
            Ok(None) => {
                tracing::debug!("stdin closed, manual refresh disabled");
                break;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read stdin");
                break;
            }
        }
    }
}

fn print_summary(summary: &RefreshSummary, staging: &std::path::Path, json: bool) -> Result<()> {
    if json {
        let text = serde_json::to_string_pretty(summary).context("Failed to encode summary")?;
        println!("{}", text);
    } else {
        println!("✓ Refreshed {}", staging.display());
        println!("  {}", summary);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_sync_defaults() {
        let cli = parse(&["stagemirror", "sync"]);
        let Commands::Sync(args) = cli.command else {
            panic!("expected sync");
        };
        assert_eq!(args.path, PathBuf::from("."));
        assert_eq!(args.outputs(OutputOptions::default()), OutputOptions::default());
    }

    #[test]
    fn test_output_overrides() {
        let cli = parse(&[
            "stagemirror",
            "sync",
            "proj",
            "--no-content",
            "--tree",
            "--no-functions",
            "--copy",
            "--txt",
        ]);
        let Commands::Sync(args) = cli.command else {
            panic!("expected sync");
        };

        let outputs = args.outputs(OutputOptions::default());
        assert!(!outputs.content_snapshot);
        assert!(outputs.file_tree);
        assert!(outputs.manifest);
        assert!(!outputs.extract_functions);
        assert!(outputs.converts());
    }

    #[test]
    fn test_watch_flags() {
        let cli = parse(&["stagemirror", "watch", "proj", "--no-auto", "--name", "Demo"]);
        let Commands::Watch { sync, no_auto } = cli.command else {
            panic!("expected watch");
        };
        assert!(no_auto);
        assert_eq!(sync.project().name, "Demo");
    }

    #[test]
    fn test_stdin_command_parse() {
        assert_eq!(StdinCommand::parse("q"), StdinCommand::Quit);
        assert_eq!(StdinCommand::parse(" quit \r"), StdinCommand::Quit);
        assert_eq!(StdinCommand::parse(""), StdinCommand::Refresh);
        assert_eq!(StdinCommand::parse("refresh"), StdinCommand::Refresh);
        assert_eq!(StdinCommand::parse("quitting"), StdinCommand::Refresh);
    }

    #[tokio::test]
    async fn test_quit_line_stops_watch_wait() {
        let (shutdown_tx, _) = broadcast::channel(1);
        let mut scheduler_rx = shutdown_tx.subscribe();
        let quit_rx = shutdown_tx.subscribe();

        if StdinCommand::parse("q") == StdinCommand::Quit {
            shutdown_tx.send(()).unwrap();
        }

        assert_eq!(
            signals::wait_for_shutdown(quit_rx).await,
            ShutdownReason::Quit
        );
        // The scheduler loop sees the same stop.
        assert!(scheduler_rx.recv().await.is_ok());
    }

    #[test]
    fn test_config_file_and_staging_override() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        std::fs::write(&config_path, "debounce_ms: 250\noutputs:\n  copy_files: true\n").unwrap();

        let cli = parse(&[
            "stagemirror",
            "sync",
            "--config",
            config_path.to_str().unwrap(),
            "--staging",
            "/tmp/elsewhere",
            "--no-manifest",
        ]);
        let Commands::Sync(args) = cli.command else {
            panic!("expected sync");
        };

        let config = args.load_config().unwrap();
        assert_eq!(config.debounce_ms, 250);
        assert_eq!(config.staging_dir, PathBuf::from("/tmp/elsewhere"));
        assert!(config.outputs.copy_files);
        assert!(!config.outputs.manifest);
    }
}
