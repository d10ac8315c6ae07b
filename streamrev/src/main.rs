//! streamrev: streams a structured code review over a unified diff.
//!
//! Wires together the CLI, logging, config, diff and analysis sources, and
//! one of two front ends: plain NDJSON output or the TUI.
//!
//! # TUI startup sequence
//!
//! 1. `install_panic_hook()` first, so the terminal is restored before any
//!    panic message prints.
//! 2. `register_sigterm()` returns a flag polled by the 50 ms heartbeat.
//! 3. `init_tui()` enters the alternate screen and raw mode.
//! 4. The event task and the diff loader (git worker thread or one-shot task)
//!    start; every loaded diff starts a fresh analysis request.
//!
//! The event loop exits only via `break`, so `restore_tui()` always runs.

mod analysis;
mod app;
mod config;
mod event;
mod git;
mod highlight;
mod plain;
mod source;
mod theme;
mod tui;
mod ui;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Parser;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

use crate::app::{AppState, RequestStatus};
use crate::config::Config;
use crate::event::AppEvent;
use crate::git::types::{DiffMode, DiffPayload, GitRequest};
use crate::source::{AnalysisSource, DiffSource, GeneratorClient, Replay, ReplayInput, SourceError};
use crate::theme::Theme;
use crate::ui::keybindings::{handle_key, KeyAction};

const LOG_DIR: &str = ".streamrev";

#[derive(Debug, Parser)]
#[command(
    name = "streamrev",
    version,
    about = "Streams a structured code review over a unified diff"
)]
struct Cli {
    /// Unified diff to review: a file path, or `-` for stdin
    #[arg(long, value_name = "PATH", conflicts_with_all = ["diff_url", "repo"])]
    diff: Option<String>,

    /// Fetch the diff to review over HTTP
    #[arg(long, value_name = "URL", conflicts_with = "repo")]
    diff_url: Option<String>,

    /// Git repository to diff when no --diff or --diff-url is given
    #[arg(long, value_name = "PATH", default_value = ".")]
    repo: PathBuf,

    /// Which git comparison to review
    #[arg(long, value_enum, default_value_t = DiffMode::Unstaged)]
    mode: DiffMode,

    /// Recorded generator response to replay: a file path, or `-` for stdin.
    /// Without it the [generator] endpoint from the config file is used.
    #[arg(long, value_name = "PATH")]
    analysis: Option<String>,

    /// Bytes per replayed chunk
    #[arg(long, default_value_t = 64)]
    chunk_size: usize,

    /// Delay before each replayed chunk, in milliseconds
    #[arg(long, default_value_t = 0)]
    chunk_delay_ms: u64,

    /// Print snapshots as JSON lines instead of starting the TUI
    #[arg(long)]
    plain: bool,

    /// Config file (default: $XDG_CONFIG_HOME/streamrev/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

impl Cli {
    fn diff_source(&self) -> DiffSource {
        match (&self.diff, &self.diff_url) {
            (Some(path), _) if path == "-" => DiffSource::Stdin,
            (Some(path), _) => DiffSource::File(PathBuf::from(path)),
            (None, Some(url)) => DiffSource::Url(url.clone()),
            (None, None) => DiffSource::Git {
                repo: self.repo.clone(),
                mode: self.mode,
            },
        }
    }

    fn analysis_source(&self, config: &Config) -> Result<AnalysisSource, SourceError> {
        let delay = Duration::from_millis(self.chunk_delay_ms);
        match (&self.analysis, &config.generator) {
            (Some(path), _) => {
                let input = if path == "-" {
                    ReplayInput::Stdin
                } else {
                    ReplayInput::File(PathBuf::from(path))
                };
                Ok(AnalysisSource::Replay(Replay::new(input, self.chunk_size, delay)))
            }
            (None, Some(generator)) => {
                let client = GeneratorClient::from_config(generator)?;
                tracing::info!(endpoint = client.endpoint(), "using generator");
                Ok(AnalysisSource::Generator(client))
            }
            (None, None) => Err(SourceError::NoAnalysisSource),
        }
    }
}

/// Logs go to stderr in plain mode. The TUI owns stderr, so there they go to
/// `.streamrev/streamrev.log`.
fn init_logging(plain: bool) -> std::io::Result<()> {
    let filter =
        EnvFilter::try_from_env("STREAMREV_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    if plain {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    } else {
        std::fs::create_dir_all(LOG_DIR)?;
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(PathBuf::from(LOG_DIR).join("streamrev.log"))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_logging(cli.plain) {
        eprintln!("streamrev: cannot set up logging: {e}");
        return ExitCode::from(2);
    }

    let config_file = cli.config.clone().unwrap_or_else(config::config_path);
    let config = match config::load_config(&config_file) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "falling back to default config");
            Config::default()
        }
    };

    let diff = cli.diff_source();
    let analysis = match cli.analysis_source(&config) {
        Ok(analysis) => analysis,
        Err(e) => {
            eprintln!("streamrev: {e}");
            return ExitCode::from(2);
        }
    };
    if diff.reads_stdin() && analysis.reads_stdin() {
        eprintln!("streamrev: the diff and the analysis cannot both be read from stdin");
        return ExitCode::from(2);
    }

    if cli.plain {
        return match plain::run_plain(&diff, &analysis).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("streamrev: {e}");
                ExitCode::from(e.exit_code())
            }
        };
    }

    let theme = Theme::from_name(&config.theme);
    match run_tui(diff, Arc::new(analysis), theme).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("streamrev: {e}");
            ExitCode::from(2)
        }
    }
}

async fn run_tui(
    diff: DiffSource,
    analysis: Arc<AnalysisSource>,
    theme: Theme,
) -> std::io::Result<()> {
    highlight::warm_up();
    let mut state = AppState::default();

    tui::install_panic_hook();
    let term_flag = tui::register_sigterm()?;
    let mut terminal = tui::init_tui()?;

    let handler = event::EventHandler::new();
    event::spawn_event_task(handler.tx.clone());
    let tx = handler.tx;
    let mut rx = handler.rx;

    let git_tx = start_diff_loader(&diff, &tx);
    state.status = RequestStatus::LoadingDiff;
    let mut running: Option<JoinHandle<()>> = None;

    let result = 'event_loop: loop {
        tokio::select! {
            // Heartbeat: SIGTERM is checked at least every 50 ms even when
            // no other event arrives.
            _ = tokio::time::sleep(Duration::from_millis(50)) => {}
            maybe_event = rx.recv() => match maybe_event {
                Some(AppEvent::Render) => {
                    if let Err(e) = terminal.draw(|frame| ui::render(frame, &mut state, &theme)) {
                        break 'event_loop Err(e);
                    }
                }
                Some(AppEvent::Tick) => state.tick(),
                Some(AppEvent::Resize(_, _)) => {}
                Some(AppEvent::Key(key)) => match handle_key(key, &mut state) {
                    KeyAction::Continue => {}
                    KeyAction::Quit => break 'event_loop Ok(()),
                    KeyAction::RestartAnalysis => {
                        start_request(&mut state, &mut running, &analysis, &tx);
                    }
                    KeyAction::CycleDiffMode => {
                        if let (Some(mode), Some(git_tx)) = (state.diff_mode, &git_tx) {
                            abort(&mut running);
                            state.status = RequestStatus::LoadingDiff;
                            let _ = git_tx.send(GitRequest::LoadDiff(mode.next()));
                        }
                    }
                },
                Some(AppEvent::DiffLoaded(payload)) => {
                    tracing::info!(source = %payload.label, bytes = payload.text.len(), "diff loaded");
                    abort(&mut running);
                    state.apply_diff(*payload);
                    start_request(&mut state, &mut running, &analysis, &tx);
                }
                Some(AppEvent::DiffFailed(error)) => {
                    tracing::warn!(%error, "diff load failed");
                    state.status = RequestStatus::Failed(error);
                }
                Some(AppEvent::Snapshot { request, snapshot }) => {
                    state.apply_snapshot(request, *snapshot);
                }
                Some(AppEvent::AnalysisFailed { request, error }) => {
                    state.fail_request(request, error);
                }
                None => break 'event_loop Ok(()),
            },
        }
        if term_flag.load(Ordering::Relaxed) {
            break 'event_loop Ok(());
        }
    };

    abort(&mut running);
    drop(git_tx);
    tui::restore_tui()?;
    result
}

/// Starts loading `diff`. Git diffs get a worker thread and return its
/// request channel; other sources are read once by a task.
fn start_diff_loader(
    diff: &DiffSource,
    tx: &UnboundedSender<AppEvent>,
) -> Option<crossbeam_channel::Sender<GitRequest>> {
    match diff {
        DiffSource::Git { repo, mode } => {
            let (git_tx, git_rx) = crossbeam_channel::unbounded();
            let path = repo.display().to_string();
            let event_tx = tx.clone();
            std::thread::spawn(move || git::worker::git_worker_loop(path, git_rx, event_tx));
            let _ = git_tx.send(GitRequest::LoadDiff(*mode));
            Some(git_tx)
        }
        other => {
            let source = other.clone();
            let event_tx = tx.clone();
            tokio::spawn(async move {
                let event = match source.load_text().await {
                    Ok(text) => AppEvent::DiffLoaded(Box::new(DiffPayload {
                        label: source.label(),
                        mode: None,
                        text,
                    })),
                    Err(e) => AppEvent::DiffFailed(e.to_string()),
                };
                let _ = event_tx.send(event);
            });
            None
        }
    }
}

fn start_request(
    state: &mut AppState,
    running: &mut Option<JoinHandle<()>>,
    analysis: &Arc<AnalysisSource>,
    tx: &UnboundedSender<AppEvent>,
) {
    abort(running);
    let request = state.begin_request();
    *running = Some(analysis::spawn_analysis(
        request,
        state.lines.clone(),
        state.diff_text.clone(),
        Arc::clone(analysis),
        tx.clone(),
    ));
}

fn abort(running: &mut Option<JoinHandle<()>>) {
    if let Some(handle) = running.take() {
        handle.abort();
    }
}
