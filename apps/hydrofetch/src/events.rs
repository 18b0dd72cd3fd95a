//! Event handling and progress display

use crate::logging::log_event_with_tracing;
use console::{style, Term};
use hydrofetch_events::{AppEvent, FetchEvent, GeneralEvent};
use tracing::Level;

/// Prints progress lines and forwards every event to tracing
pub struct EventHandler {
    term: Term,
    colors_enabled: bool,
    debug_enabled: bool,
    /// Progress lines are suppressed in JSON mode
    quiet: bool,
}

impl EventHandler {
    pub fn new(colors_enabled: bool, debug_enabled: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            colors_enabled,
            debug_enabled,
            quiet,
        }
    }

    /// Handle incoming event
    pub fn handle_event(&mut self, event: AppEvent) {
        log_event_with_tracing(&event);

        if self.quiet {
            return;
        }

        let level = event.log_level();
        if level == Level::DEBUG {
            if self.debug_enabled {
                if let Some(line) = debug_line(&event) {
                    self.show_dim(&line);
                }
            }
            return;
        }

        let Some(line) = display_line(&event) else {
            return;
        };
        if level == Level::ERROR {
            self.show_error(&line);
        } else if level == Level::WARN {
            self.show_warning(&line);
        } else {
            self.show_status(&line);
        }
    }

    fn show_status(&self, line: &str) {
        let _ = self.term.write_line(line);
    }

    fn show_dim(&self, line: &str) {
        let line = if self.colors_enabled {
            style(line).dim().to_string()
        } else {
            line.to_string()
        };
        let _ = self.term.write_line(&line);
    }

    fn show_warning(&self, line: &str) {
        let line = if self.colors_enabled {
            style(line).yellow().to_string()
        } else {
            line.to_string()
        };
        let _ = self.term.write_line(&line);
    }

    fn show_error(&self, line: &str) {
        let line = if self.colors_enabled {
            style(line).red().bold().to_string()
        } else {
            line.to_string()
        };
        let _ = self.term.write_line(&line);
    }
}

/// Warnings without a progress line of their own still reach the user
fn display_line(event: &AppEvent) -> Option<String> {
    match event {
        AppEvent::Fetch(FetchEvent::ResolutionFallback { identifier, reason }) => Some(format!(
            "Warning: could not resolve {identifier} ({reason}), using it as a URL"
        )),
        AppEvent::Fetch(FetchEvent::CleanupFailed { path, error }) => Some(format!(
            "Warning: failed to remove scratch directory {path}: {error}"
        )),
        other => other.progress_line(),
    }
}

/// Lines shown only with `--debug`
fn debug_line(event: &AppEvent) -> Option<String> {
    match event {
        AppEvent::General(GeneralEvent::DebugLog { message, .. }) => Some(message.clone()),
        AppEvent::Fetch(FetchEvent::ResolutionStarted { identifier }) => {
            Some(format!("Resolving {identifier}"))
        }
        AppEvent::Fetch(FetchEvent::EntryRelocated { name }) => Some(format!("Moved {name}")),
        _ => None,
    }
}
