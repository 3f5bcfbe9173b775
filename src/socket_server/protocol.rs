//! Socket server protocol message types
//!
//! Every frame is a JSON object `{"event": "...", "payload": ...}`. Incoming
//! frames are decoded in two stages: first the envelope, then the payload for
//! the named event. Both directions are closed enums so the dispatcher can
//! `match` exhaustively.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::corpus::{BaniSummary, Content, Line, SearchMode, SearchOptions};
use crate::history::{HistoryEntry, ViewedLines};
use crate::settings::{SettingsUpdate, SettingsView};

/// Wire envelope shared by both directions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub event: String,
    #[serde(default)]
    pub payload: Value,
}

/// Open a Shabad, optionally at a given line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenShabad {
    pub id: String,
    #[serde(default)]
    pub line_id: Option<String>,
}

/// Open a Bani (bookmark), optionally at a given line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenBookmark {
    pub id: i64,
    #[serde(default)]
    pub line_id: Option<String>,
}

/// Target of `content:line:set-current`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LineTarget {
    // Order id first: a missing `id` would otherwise match as `None`
    ByOrderId {
        #[serde(rename = "orderId")]
        order_id: i64,
    },
    ById {
        id: Option<String>,
    },
}

/// Search request payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub options: Option<SearchOptions>,
}

/// Client-to-server event
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    SetShabad(OpenShabad),
    SetBookmark(OpenBookmark),
    SetShabadByOrderId(i64),
    NextShabad,
    PreviousShabad,
    SetLine(LineTarget),
    NextLine,
    PreviousLine,
    ClearLine,
    SetTrackerMainLine(String),
    SetTrackerNextLine(String),
    ClearHistory,
    Settings(SettingsUpdate),
    Search {
        mode: SearchMode,
        request: SearchRequest,
    },
    OpenOverlayFolder,
    OpenLogsFolder,
    OpenWindow,
    OpenExternalUrl(String),
}

/// Why an incoming frame could not be turned into a [`ServerEvent`]
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed frame: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("unknown event '{0}'")]
    UnknownEvent(String),

    #[error("invalid payload for '{event}': {source}")]
    InvalidPayload {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}

fn payload<T: DeserializeOwned>(event: &str, value: Value) -> Result<T, DecodeError> {
    serde_json::from_value(value).map_err(|source| DecodeError::InvalidPayload {
        event: event.to_string(),
        source,
    })
}

impl ServerEvent {
    /// Decode a text frame.
    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        let Envelope { event, payload: value } =
            serde_json::from_str(text).map_err(DecodeError::Malformed)?;

        let decoded = match event.as_str() {
            "content:shabad:set-current" => Self::SetShabad(payload(&event, value)?),
            "content:bookmark:set" => Self::SetBookmark(payload(&event, value)?),
            "content:shabad:set-by-order-id" => Self::SetShabadByOrderId(payload(&event, value)?),
            "content:shabad:next" => Self::NextShabad,
            "content:shabad:previous" => Self::PreviousShabad,
            "content:line:set-current" => Self::SetLine(payload(&event, value)?),
            "content:line:set-next" => Self::NextLine,
            "content:line:set-previous" => Self::PreviousLine,
            "content:line:clear" => Self::ClearLine,
            "content:tracker:set-main-line" => Self::SetTrackerMainLine(payload(&event, value)?),
            "content:tracker:set-next-line" => Self::SetTrackerNextLine(payload(&event, value)?),
            "history:clear" => Self::ClearHistory,
            "settings:all" => Self::Settings(payload(&event, value)?),
            "search:first-letter" => Self::Search {
                mode: SearchMode::FirstLetter,
                request: payload(&event, value)?,
            },
            "search:full-word" => Self::Search {
                mode: SearchMode::FullWord,
                request: payload(&event, value)?,
            },
            "action:open-overlay-folder" => Self::OpenOverlayFolder,
            "action:open-logs-folder" => Self::OpenLogsFolder,
            "action:open-window" => Self::OpenWindow,
            "action:open-external-url" => Self::OpenExternalUrl(payload(&event, value)?),
            _ => return Err(DecodeError::UnknownEvent(event.clone())),
        };

        Ok(decoded)
    }
}

/// Server-to-client event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload")]
pub enum ClientEvent {
    #[serde(rename = "content:current")]
    Content(Option<Content>),
    #[serde(rename = "content:bani:list")]
    BaniList(Vec<BaniSummary>),
    #[serde(rename = "content:line:current")]
    Line(Option<String>),
    #[serde(rename = "content:tracker:main-line")]
    TrackerMainLine(Option<String>),
    #[serde(rename = "content:tracker:next-line")]
    TrackerNextLine(Option<String>),
    #[serde(rename = "history:transitions")]
    Transitions(Vec<HistoryEntry>),
    #[serde(rename = "history:latest-lines")]
    LatestLines(BTreeMap<String, HistoryEntry>),
    #[serde(rename = "history:viewed-lines")]
    ViewedLines(ViewedLines),
    #[serde(rename = "status")]
    Status(Option<String>),
    #[serde(rename = "settings:all")]
    Settings(SettingsView),
    #[serde(rename = "search:results")]
    SearchResults(Vec<Line>),
}

impl ClientEvent {
    /// Event name as it appears on the wire
    pub fn name(&self) -> &'static str {
        match self {
            Self::Content(_) => "content:current",
            Self::BaniList(_) => "content:bani:list",
            Self::Line(_) => "content:line:current",
            Self::TrackerMainLine(_) => "content:tracker:main-line",
            Self::TrackerNextLine(_) => "content:tracker:next-line",
            Self::Transitions(_) => "history:transitions",
            Self::LatestLines(_) => "history:latest-lines",
            Self::ViewedLines(_) => "history:viewed-lines",
            Self::Status(_) => "status",
            Self::Settings(_) => "settings:all",
            Self::SearchResults(_) => "search:results",
        }
    }

    /// State snapshots are deduplicated per connection; replies are not.
    pub fn is_deduplicated(&self) -> bool {
        !matches!(self, Self::SearchResults(_))
    }

    /// Serialize into a text frame.
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
