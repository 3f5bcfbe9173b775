//! Per-client and global settings
//!
//! Each host has one local settings tree (`display`, `layout`, `theme`,
//! `vishraams`, `sources`, `hotkeys`, `security`, `search`, ...). Every
//! client receives its own view of the settings:
//!
//! ```text
//! SettingsView {
//!     local:   <the recipient's own tree>,
//!     clients: <every other host whose security.private is not true>,
//!     global:  <server-wide settings>,
//! }
//! ```
//!
//! [`client_view`] computes that view as a pure function so the broadcaster
//! can call it once per recipient.

pub mod global;
pub mod merge;

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use global::{GlobalSettingsStore, ServerSettings};
pub use merge::deep_merge;

/// Settings trees keyed by host
pub type ClientSettingsMap = BTreeMap<String, Value>;

/// Payload of an incoming `settings:all`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsUpdate {
    /// Replaces the sender's own settings
    #[serde(default)]
    pub local: Option<Value>,
    /// Partial update merged into the global settings
    #[serde(default)]
    pub global: Option<Value>,
    /// Partial updates for other hosts
    #[serde(default)]
    pub clients: Option<ClientSettingsMap>,
}

/// Payload of an outgoing `settings:all`, personalized per recipient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsView {
    pub local: Option<Value>,
    pub clients: ClientSettingsMap,
    pub global: ServerSettings,
}

/// What a [`SettingsState::set_settings`] call changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettingsChange {
    /// The aggregate of public client settings changed
    pub public: bool,
    /// The sender's own settings changed
    pub local: bool,
    /// Global settings changed
    pub global: bool,
}

/// Whether a settings tree opts out of being shared
pub fn is_private(settings: &Value) -> bool {
    settings.pointer("/security/private") == Some(&Value::Bool(true))
}

/// Every host whose settings are not private
pub fn public_settings(all: &ClientSettingsMap) -> ClientSettingsMap {
    all.iter()
        .filter(|(_, settings)| !is_private(settings))
        .map(|(host, settings)| (host.clone(), settings.clone()))
        .collect()
}

/// The settings view sent to `host`.
pub fn client_view(host: &str, all: &ClientSettingsMap, global: &ServerSettings) -> SettingsView {
    let mut clients = public_settings(all);
    clients.remove(host);

    SettingsView {
        local: all.get(host).cloned(),
        clients,
        global: global.clone(),
    }
}

/// Live settings for every connected host
pub struct SettingsState {
    clients: RwLock<ClientSettingsMap>,
    global: Arc<GlobalSettingsStore>,
}

impl SettingsState {
    pub fn new(global: Arc<GlobalSettingsStore>) -> Self {
        Self {
            clients: RwLock::new(ClientSettingsMap::new()),
            global,
        }
    }

    pub fn global(&self) -> &Arc<GlobalSettingsStore> {
        &self.global
    }

    /// Apply an update from `host`.
    ///
    /// Batch `clients` updates are merged only into hosts that are connected
    /// and not private; anything else is discarded.
    pub fn set_settings(&self, host: &str, update: SettingsUpdate) -> SettingsChange {
        let mut change = SettingsChange::default();

        if let Some(patch) = update.global {
            match self.global.save(patch) {
                Ok(changed) => change.global = changed,
                Err(e) => tracing::error!(host = %host, "Global settings not saved: {}", e),
            }
        }

        let mut clients = self.clients.write();
        let before = public_settings(&clients);

        for (target, patch) in update.clients.unwrap_or_default() {
            match clients.get_mut(&target) {
                Some(existing) if !is_private(existing) => deep_merge(existing, patch),
                Some(_) => {
                    tracing::warn!(host = %host, "Discarding settings update for private host {}", target)
                }
                None => tracing::debug!(host = %host, "Discarding settings update for unknown host {}", target),
            }
        }

        if let Some(local) = update.local {
            let previous = clients.insert(host.to_string(), local);
            change.local = previous.as_ref() != clients.get(host);
        }

        change.public = before != public_settings(&clients);
        change
    }

    /// Settings view for `host`
    pub fn client_view(&self, host: &str) -> SettingsView {
        let global = self.global.get();
        client_view(host, &self.clients.read(), &global)
    }

    /// Forget `host`. Returns whether the public aggregate changed.
    pub fn remove_host(&self, host: &str) -> bool {
        match self.clients.write().remove(host) {
            Some(settings) => !is_private(&settings),
            None => false,
        }
    }

    /// Hosts with settings
    pub fn hosts(&self) -> Vec<String> {
        self.clients.read().keys().cloned().collect()
    }
}
