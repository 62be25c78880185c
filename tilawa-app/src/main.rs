//! Tilawa console host entry point.
//!
//! ## Modes
//!
//! - Interactive (default): stdin lines are commands or recognizer input for
//!   the console recognizer adapter.
//! - Replay (`--replay <file>`): each line is one utterance, either plain
//!   text (replayed as a single final result) or a JSON array of
//!   `RecognitionEvent`s, fed through a `ScriptedRecognizer` until the pass
//!   completes or the script runs out.

mod commands;
mod console;
mod settings;
mod state;

use std::path::{Path, PathBuf};
use std::sync::{atomic::Ordering, Arc};
use std::time::Duration;

use anyhow::{bail, Context};
use settings::{default_settings_path, load_settings};
use state::AppState;
use tilawa_core::{
    event_channel,
    recognizer::stub::{utterance, ScriptedRecognizer},
    text::passage::AL_FATIHA,
    RecitationSession, RecognitionEvent, RecognizerHandle, ReferenceText,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const REPLAY_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Default)]
struct Args {
    settings: Option<PathBuf>,
    passage: Option<PathBuf>,
    replay: Option<PathBuf>,
    json: bool,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--settings" => {
                let Some(v) = it.next() else {
                    bail!("missing value for --settings");
                };
                args.settings = Some(PathBuf::from(v));
            }
            "--passage" => {
                let Some(v) = it.next() else {
                    bail!("missing value for --passage");
                };
                args.passage = Some(PathBuf::from(v));
            }
            "--replay" => {
                let Some(v) = it.next() else {
                    bail!("missing value for --replay");
                };
                args.replay = Some(PathBuf::from(v));
            }
            "--json" => args.json = true,
            "--help" | "-h" => {
                println!(
                    "Usage: tilawa [--settings <file>] [--passage <file>] [--replay <file>] [--json]\n\n{}",
                    commands::HELP
                );
                std::process::exit(0);
            }
            other => bail!("unknown argument: {other}"),
        }
    }
    Ok(args)
}

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_replay(path: &Path) -> anyhow::Result<Vec<Vec<RecognitionEvent>>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read replay file {}", path.display()))?;

    let mut utterances = Vec::new();
    for (idx, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with('[') {
            let events: Vec<RecognitionEvent> = serde_json::from_str(line)
                .with_context(|| format!("invalid event array on line {}", idx + 1))?;
            utterances.push(events);
        } else {
            utterances.push(utterance(line));
        }
    }
    Ok(utterances)
}

fn spawn_event_forwarders(state: &Arc<AppState>) {
    let mut progress_rx = state.session.subscribe_progress();
    let progress_state = Arc::clone(state);
    tokio::spawn(async move {
        loop {
            match progress_rx.recv().await {
                Ok(event) => {
                    if progress_state.json_output {
                        match serde_json::to_string(&event) {
                            Ok(json) => println!("{json}"),
                            Err(e) => warn!("failed to serialize progress event: {e}"),
                        }
                    } else {
                        println!("{}", progress_state.render(&event.progress));
                    }
                }
                Err(RecvError::Lagged(n)) => warn!(skipped = n, "progress forwarder lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut status_rx = state.session.subscribe_status();
    let status_state = Arc::clone(state);
    tokio::spawn(async move {
        loop {
            match status_rx.recv().await {
                Ok(event) => {
                    if status_state.json_output {
                        match serde_json::to_string(&event) {
                            Ok(json) => println!("{json}"),
                            Err(e) => warn!("failed to serialize status event: {e}"),
                        }
                    } else if !event.message.is_empty() {
                        println!("» {}", event.message);
                    }
                }
                Err(RecvError::Lagged(n)) => warn!(skipped = n, "status forwarder lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });
}

async fn run_interactive(state: &Arc<AppState>) -> anyhow::Result<()> {
    println!("{}", state.render(&state.session.progress()));
    println!("type `toggle` to start listening, `help` for commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        match commands::parse_command(&line) {
            Ok(command) => {
                if commands::execute(state, command) == commands::Flow::Quit {
                    break;
                }
            }
            Err(e) => println!("! {e}"),
        }
    }
    Ok(())
}

async fn run_replay(state: &Arc<AppState>, utterance_count: usize, starts: impl Fn() -> usize) {
    if let Err(e) = state.session.toggle_listening() {
        warn!("replay could not start listening: {e}");
        return;
    }
    while state.session.is_listening() && starts() <= utterance_count {
        tokio::time::sleep(REPLAY_POLL).await;
    }
    // Let the dispatcher drain the last utterance's events.
    tokio::time::sleep(state.session.config().dispatch_poll_interval * 2).await;
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = parse_args()?;

    let settings_path = args.settings.clone().unwrap_or_else(default_settings_path);
    let mut settings = load_settings(&settings_path);
    if let Some(passage) = args.passage.clone() {
        settings.passage_path = Some(passage);
    }
    init_tracing(&settings.log_filter);
    info!(settings = %settings_path.display(), "tilawa starting");

    let passage = match &settings.passage_path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read passage {}", path.display()))?,
        None => AL_FATIHA.to_string(),
    };
    let reference = ReferenceText::new(&passage).context("invalid reference passage")?;

    let (sink, stream) = event_channel();
    let mut replay = None;
    let (recognizer, feed) = match &args.replay {
        Some(path) => {
            let utterances = load_replay(path)?;
            let count = utterances.len();
            let scripted = ScriptedRecognizer::new(sink, utterances);
            replay = Some((count, scripted.counters()));
            (RecognizerHandle::new(scripted), None)
        }
        None => {
            let (recognizer, feed) = console::console_recognizer(sink);
            (RecognizerHandle::new(recognizer), Some(feed))
        }
    };

    let session = Arc::new(RecitationSession::new(
        settings.session_config(),
        reference,
        recognizer,
        stream,
    ));
    let dispatcher = session.spawn_dispatcher()?;
    let state = Arc::new(AppState::new(
        Arc::clone(&session),
        feed,
        settings,
        settings_path,
        args.json,
    ));
    spawn_event_forwarders(&state);

    match replay {
        Some((count, counters)) => {
            run_replay(&state, count, || counters.starts.load(Ordering::SeqCst)).await
        }
        None => run_interactive(&state).await?,
    }

    session.shutdown();
    tokio::task::spawn_blocking(move || dispatcher.join())
        .await
        .context("dispatcher join task failed")?
        .map_err(|_| anyhow::anyhow!("dispatcher thread panicked"))?;

    let progress = session.progress();
    let diagnostics = session.diagnostics();
    info!(
        matched = progress.matched_words,
        total = progress.total_words,
        partials = diagnostics.partials_fed,
        finals = diagnostics.finals_fed,
        recognizer_errors = diagnostics.recognizer_errors,
        auto_restarts = diagnostics.auto_restarts,
        commands = state.commands_executed.load(Ordering::Relaxed),
        dropped_lines = state.recognizer_lines_dropped.load(Ordering::Relaxed),
        "session finished"
    );
    println!("{}", state.render(&progress));
    println!("{}", session.status_message());
    Ok(())
}
