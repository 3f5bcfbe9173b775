//! Presenter Engine: real-time presentation state for Shabad and Bani displays
//!
//! One server process holds the single source of truth for what is being
//! shown (the current Shabad or Bani, the active line and the tracker
//! pointers), the per-display settings and the viewing history. Displays and
//! controllers connect over WebSocket, send intents, and receive every state
//! change as it happens.
//!
//! # Modules
//!
//! - [`socket_server`]: connections, heartbeat, typed wire protocol, fan-out
//! - [`content`]: content loading and the line/tracker pointers
//! - [`history`]: append-only log of viewed lines with a CSV writer
//! - [`settings`]: per-host and global settings with privacy filtering
//! - [`search`]: first-letter and full-word search answered per requester
//! - [`corpus`]: read-only access to the text corpus (SQLite or in-memory)
//! - [`app`]: the [`Presenter`](app::Presenter) that wires them together
//! - [`api`]: read-only HTTP endpoints
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use presenter_engine::app::{Presenter, PresenterOptions};
//! use presenter_engine::socket_server::{serve, SocketServer};
//!
//! let server = Arc::new(SocketServer::new());
//! let presenter = Presenter::start(Arc::clone(&server), options).await?;
//! serve(listener, server, presenter).await?;
//! ```

pub mod actions;
pub mod api;
pub mod app;
pub mod cli;
pub mod content;
pub mod corpus;
pub mod error;
pub mod events;
pub mod fs_utils;
pub mod history;
pub mod paths;
pub mod search;
pub mod settings;
pub mod socket_server;
pub mod status;
pub mod themes;

pub use app::{Presenter, PresenterOptions};
pub use error::{PresenterError, Result};
