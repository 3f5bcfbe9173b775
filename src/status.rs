//! Transient status line shown on every display
//!
//! A status message is broadcast when set and cleared again after its
//! duration, unless another message replaced it first. Connection and
//! updater notifications are gated by the global `notifications` settings.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Deserialize;

use crate::settings::ServerSettings;
use crate::socket_server::{ClientEvent, SocketServer};

/// How long a status message stays up by default
pub const DEFAULT_STATUS_DURATION: Duration = Duration::from_secs(30);

/// How long connect/disconnect notices stay up
pub const CONNECTION_STATUS_DURATION: Duration = Duration::from_secs(3);

/// Progress reported by the supervising shell's updater
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum UpdaterEvent {
    #[serde(rename = "application:updating")]
    ApplicationUpdating,
    #[serde(rename = "application:updated")]
    ApplicationUpdated,
    #[serde(rename = "database:updating")]
    DatabaseUpdating,
    #[serde(rename = "database:updated")]
    DatabaseUpdated,
}

impl UpdaterEvent {
    pub fn message(&self) -> &'static str {
        match self {
            Self::ApplicationUpdating => "Downloading app update",
            Self::ApplicationUpdated => "Close to install app update",
            Self::DatabaseUpdating => "Downloading database update",
            Self::DatabaseUpdated => "Database updated",
        }
    }

    /// Whether the user wants to hear about this event
    pub fn is_enabled(&self, settings: &ServerSettings) -> bool {
        match self {
            Self::ApplicationUpdating | Self::DatabaseUpdating => settings.notifications.download_events,
            Self::ApplicationUpdated | Self::DatabaseUpdated => settings.notifications.downloaded_events,
        }
    }
}

#[derive(Default)]
struct Slot {
    /// Bumped on every change so stale expiries can tell they lost
    generation: u64,
    message: Option<String>,
}

pub struct StatusBoard {
    server: Arc<SocketServer>,
    slot: Mutex<Slot>,
}

impl StatusBoard {
    pub fn new(server: Arc<SocketServer>) -> Self {
        Self {
            server,
            slot: Mutex::new(Slot::default()),
        }
    }

    /// Current message
    pub fn get(&self) -> Option<String> {
        self.slot.lock().message.clone()
    }

    /// Show `message` for `duration`, then clear it if it is still showing.
    pub fn notify(self: &Arc<Self>, message: impl Into<String>, duration: Duration) {
        let message = message.into();
        tracing::info!("Status: {}", message);

        let generation = {
            let mut slot = self.slot.lock();
            slot.generation += 1;
            slot.message = Some(message.clone());
            self.server.broadcast_event(&ClientEvent::Status(Some(message)));
            slot.generation
        };

        let board = Arc::downgrade(self);
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            if let Some(board) = board.upgrade() {
                board.expire(generation);
            }
        });
    }

    fn expire(&self, generation: u64) {
        let mut slot = self.slot.lock();
        if slot.generation != generation {
            return;
        }
        slot.generation += 1;
        slot.message = None;
        self.server.broadcast_event(&ClientEvent::Status(None));
    }

    pub fn host_connected(self: &Arc<Self>, host: &str, settings: &ServerSettings) {
        if settings.notifications.connection_events {
            self.notify(format!("{} connected", host), CONNECTION_STATUS_DURATION);
        }
    }

    pub fn host_disconnected(self: &Arc<Self>, host: &str, settings: &ServerSettings) {
        if settings.notifications.disconnection_events {
            self.notify(format!("{} disconnected", host), CONNECTION_STATUS_DURATION);
        }
    }

    pub fn updater_event(self: &Arc<Self>, event: UpdaterEvent, settings: &ServerSettings) {
        if event.is_enabled(settings) {
            self.notify(event.message(), DEFAULT_STATUS_DURATION);
        } else {
            tracing::debug!("Updater event {:?} muted by settings", event);
        }
    }
}
