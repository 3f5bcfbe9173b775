//! Server-wide settings, persisted to `settings.json`
//!
//! [`GlobalSettingsStore`] is created once at startup and shared by handle.
//! Its only mutation surface is `load`, `save` and `on_change` subscribers.
//! The file is merged over the compiled-in defaults on load, so keys added in
//! newer versions appear without clobbering what the user changed.

use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::merge::merged;
use crate::fs_utils::{read_json, write_json_atomic};
use crate::{PresenterError, Result};

/// Version stamped into the settings file
pub const SETTINGS_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerSettings {
    pub version: String,
    pub system: SystemSettings,
    pub notifications: NotificationSettings,
    pub overlay: OverlaySettings,
    pub closed_captions: ClosedCaptionSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemSettings {
    pub launch_on_startup: bool,
    pub multiple_displays: bool,
    pub fullscreen_on_launch: bool,
    pub server_analytics: bool,
    pub automatic_updates: bool,
    pub beta_opt_in: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    pub connection_events: bool,
    pub disconnection_events: bool,
    pub download_events: bool,
    pub downloaded_events: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlaySettings {
    pub overlay_name: String,
    pub larivaar_gurbani: bool,
    pub larivaar_assist: bool,
    pub english_translation: bool,
    pub spanish_translation: bool,
    pub punjabi_translation: bool,
    pub english_transliteration: bool,
    pub hindi_transliteration: bool,
    pub urdu_transliteration: bool,
    pub line_ending: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosedCaptionSettings {
    pub zoom_api_token: Option<String>,
    pub larivaar_gurbani: bool,
    pub english_translation: bool,
    pub spanish_translation: bool,
    pub punjabi_translation: bool,
    pub english_transliteration: bool,
    pub hindi_transliteration: bool,
    pub urdu_transliteration: bool,
    pub line_ending: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION.to_string(),
            system: SystemSettings {
                launch_on_startup: false,
                multiple_displays: true,
                fullscreen_on_launch: false,
                server_analytics: true,
                automatic_updates: true,
                beta_opt_in: false,
            },
            notifications: NotificationSettings {
                connection_events: false,
                disconnection_events: false,
                download_events: true,
                downloaded_events: true,
            },
            overlay: OverlaySettings {
                overlay_name: "Floating Top Captions".to_string(),
                larivaar_gurbani: false,
                larivaar_assist: false,
                english_translation: true,
                spanish_translation: false,
                punjabi_translation: false,
                english_transliteration: false,
                hindi_transliteration: false,
                urdu_transliteration: false,
                line_ending: true,
            },
            closed_captions: ClosedCaptionSettings {
                zoom_api_token: None,
                larivaar_gurbani: false,
                english_translation: true,
                spanish_translation: false,
                punjabi_translation: false,
                english_transliteration: false,
                hindi_transliteration: false,
                urdu_transliteration: false,
                line_ending: true,
            },
        }
    }
}

impl ServerSettings {
    fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Apply a partial update, rejecting values of the wrong shape.
    pub fn merged_with(&self, patch: Value) -> Result<Self> {
        serde_json::from_value(merged(self.to_value()?, patch)).map_err(|e| PresenterError::Settings {
            message: format!("rejected settings update: {}", e),
        })
    }
}

/// Pointer to the first key of `patch` that `shape` does not have
fn unknown_key(shape: &Value, patch: &Value, path: &str) -> Option<String> {
    let (Value::Object(shape), Value::Object(patch)) = (shape, patch) else {
        return None;
    };

    patch.iter().find_map(|(key, value)| {
        let pointer = format!("{}/{}", path, key);
        match shape.get(key) {
            Some(inner) => unknown_key(inner, value, &pointer),
            None => Some(pointer),
        }
    })
}

type Subscriber = Box<dyn Fn(&ServerSettings) + Send + Sync>;

/// Owner of the persisted global settings
pub struct GlobalSettingsStore {
    path: PathBuf,
    current: RwLock<ServerSettings>,
    subscribers: RwLock<Vec<Subscriber>>,
}

impl GlobalSettingsStore {
    /// Store backed by `path`, holding defaults until [`load`](Self::load) runs.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            current: RwLock::new(ServerSettings::default()),
            subscribers: RwLock::new(Vec::new()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the settings file. A missing or unreadable file is replaced with
    /// the defaults.
    pub fn load(&self) -> ServerSettings {
        tracing::info!("Loading settings from {}", self.path.display());

        let mut current = self.current.write();
        let loaded = read_json::<Value>(&self.path).and_then(|file| ServerSettings::default().merged_with(file));

        let settings = match loaded {
            Ok(mut settings) => {
                settings.version = SETTINGS_VERSION.to_string();
                settings
            }
            Err(e) => {
                tracing::warn!(
                    "Settings file {} is corrupt or missing ({}). Recreating",
                    self.path.display(),
                    e
                );
                let defaults = ServerSettings::default();
                if let Err(e) = write_json_atomic(&self.path, &defaults) {
                    tracing::error!("Failed to write default settings: {}", e);
                }
                defaults
            }
        };

        *current = settings.clone();
        settings
    }

    /// Current settings
    pub fn get(&self) -> ServerSettings {
        self.current.read().clone()
    }

    /// Merge a partial update, persist it and notify subscribers.
    ///
    /// Keys the settings do not have are rejected, as are values of the
    /// wrong type. Saves are serialized: the write lock is held from the merge until the
    /// file is replaced, so concurrent patches all land. Subscribers run after
    /// the lock is released and may call [`get`](Self::get).
    ///
    /// Returns `false` when the update changed nothing.
    pub fn save(&self, patch: Value) -> Result<bool> {
        let next = {
            let mut current = self.current.write();
            if let Some(pointer) = unknown_key(&current.to_value()?, &patch, "") {
                return Err(PresenterError::Settings {
                    message: format!("unknown setting {}", pointer),
                });
            }
            let next = current.merged_with(patch)?;
            if *current == next {
                return Ok(false);
            }

            write_json_atomic(&self.path, &next)?;
            *current = next.clone();
            next
        };
        tracing::info!("Saved global settings to {}", self.path.display());

        for subscriber in self.subscribers.read().iter() {
            subscriber(&next);
        }
        Ok(true)
    }

    /// Subscribe to successful saves.
    pub fn on_change<F>(&self, subscriber: F)
    where
        F: Fn(&ServerSettings) + Send + Sync + 'static,
    {
        self.subscribers.write().push(Box::new(subscriber));
    }
}
