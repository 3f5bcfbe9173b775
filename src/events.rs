//! Supervisor IPC
//!
//! When the daemon runs under a supervising shell (`--ipc`), it reports
//! lifecycle events on stdout and receives updater progress on stdin, both as
//! JSON Lines:
//!
//! ```json
//! {"type":"server:ready"}
//! {"type":"action:open-window"}
//! ```
//!
//! Incoming lines look the same, e.g. `{"type":"database:updating"}`.

use std::io::{self, Write};

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::status::UpdaterEvent;

/// Writes events to stdout when enabled
#[derive(Debug, Clone, Copy)]
pub struct EventEmitter {
    enabled: bool,
}

impl EventEmitter {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Emit an event to stdout as one JSON line
    pub fn emit<E: SupervisorEvent>(&self, event: &E) {
        if !self.enabled {
            return;
        }

        if let Some(json) = encode(event) {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            // The supervisor may already be gone
            let _ = writeln!(handle, "{}", json);
            let _ = handle.flush();
        }
    }
}

#[derive(Serialize)]
struct EventWrapper<'a, P: Serialize> {
    #[serde(rename = "type")]
    event_type: &'static str,
    #[serde(flatten)]
    payload: &'a P,
}

/// An event the supervisor understands
pub trait SupervisorEvent: Serialize {
    fn event_type() -> &'static str;
}

/// Serialize an event with its `type` tag
pub fn encode<E: SupervisorEvent>(event: &E) -> Option<String> {
    let wrapper = EventWrapper {
        event_type: E::event_type(),
        payload: event,
    };
    serde_json::to_string(&wrapper).ok()
}

/// Both listeners are bound, or another instance already holds the port
#[derive(Debug, Clone, Serialize)]
pub struct ServerReadyEvent {}

impl SupervisorEvent for ServerReadyEvent {
    fn event_type() -> &'static str {
        "server:ready"
    }
}

/// A client asked for the presenter window to be shown
#[derive(Debug, Clone, Serialize)]
pub struct OpenWindowEvent {}

impl SupervisorEvent for OpenWindowEvent {
    fn event_type() -> &'static str {
        "action:open-window"
    }
}

#[derive(Deserialize)]
struct IncomingEvent {
    #[serde(rename = "type")]
    event: UpdaterEvent,
}

/// Read updater events line by line until `reader` closes.
///
/// Lines that are not updater events are skipped.
pub async fn read_updater_events<R, F>(reader: R, mut on_event: F) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    F: FnMut(UpdaterEvent),
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<IncomingEvent>(line) {
            Ok(incoming) => on_event(incoming.event),
            Err(e) => tracing::debug!("Ignoring supervisor message '{}': {}", line, e),
        }
    }
    Ok(())
}
