//! Console command handlers.
//!
//! Every stdin line is either a host command (`toggle`, `restart`, …) or
//! recognizer input forwarded through the console adapter.

use std::sync::atomic::Ordering;

use tilawa_core::RecognitionEvent;
use tracing::{info, warn};

use crate::console::parse_recognizer_line;
use crate::settings::save_settings;
use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start or stop listening.
    Toggle,
    /// Rewind to the first word.
    Restart,
    /// Print status and progress.
    Status,
    /// Show or hide the unrecited reference text.
    ToggleText,
    Help,
    Quit,
    Recognizer(RecognitionEvent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub const HELP: &str = "\
commands:
  toggle | t          start/stop listening
  restart             start over from the first word
  status | s          print status and progress
  hide                show/hide the remaining reference text
  quit | q            exit
recognizer input (while listening):
  partial <text>      partial hypothesis
  final <text>        final hypothesis
  error <code|name>   recognizer error (7, no-match, network, audio, ...)
  ready | begin | end lifecycle notifications";

pub fn parse_command(line: &str) -> Result<Command, String> {
    let trimmed = line.trim();
    let command = match trimmed.to_ascii_lowercase().as_str() {
        "toggle" | "t" => Command::Toggle,
        "restart" => Command::Restart,
        "status" | "s" => Command::Status,
        "hide" | "show" => Command::ToggleText,
        "help" | "h" | "?" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        _ => match parse_recognizer_line(trimmed) {
            Some(event) => Command::Recognizer(event?),
            None => return Err(format!("unknown command: {trimmed} (try `help`)")),
        },
    };
    Ok(command)
}

/// Run one command against the session, printing its outcome.
pub fn execute(state: &AppState, command: Command) -> Flow {
    state.commands_executed.fetch_add(1, Ordering::Relaxed);

    match command {
        Command::Toggle => match state.session.toggle_listening() {
            Ok(listening) => info!(listening, "listening toggled"),
            Err(e) => println!("! {e}"),
        },
        Command::Restart => state.session.restart(),
        Command::Status => {
            let progress = state.session.progress();
            println!(
                "{} | listening: {}",
                state.session.status_message(),
                state.session.is_listening()
            );
            println!("{}", state.render(&progress));
        }
        Command::ToggleText => toggle_text_visibility(state),
        Command::Help => println!("{HELP}"),
        Command::Quit => return Flow::Quit,
        Command::Recognizer(event) => match &state.feed {
            Some(feed) => {
                if !feed.deliver(event) {
                    state.recognizer_lines_dropped.fetch_add(1, Ordering::Relaxed);
                    println!("! recognizer is not listening (use `toggle`)");
                }
            }
            None => println!("! recognizer input is disabled in replay mode"),
        },
    }
    Flow::Continue
}

fn toggle_text_visibility(state: &AppState) {
    let visible = !state.text_visible.fetch_xor(true, Ordering::SeqCst);
    println!("{}", state.render(&state.session.progress()));

    let mut settings = state.settings.lock();
    settings.show_reference_text = visible;
    if let Err(e) = save_settings(&state.settings_path, &settings) {
        warn!("failed to persist text visibility: {e}");
    }
}
