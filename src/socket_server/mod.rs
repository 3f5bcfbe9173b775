//! Presenter Socket Server
//!
//! Keeps every display and controller in sync over persistent WebSocket
//! connections.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          SocketServer (Arc)                             │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  clients: RwLock<HashMap<Uuid, Arc<Client>>>                            │
//! │                                                                         │
//! │    Client {                                                             │
//! │      host, state, is_alive, outbound queue, last frame per event        │
//! │    }                                                                    │
//! │                                                                         │
//! │  connection middleware ──► host resolution (reverse DNS, 200ms)         │
//! │  heartbeat middleware ───► opt the client into liveness sweeps          │
//! │  heartbeat task ─────────► ping every 30s, terminate if no pong         │
//! │  broadcast(|client| ..) ─► per-recipient payloads                       │
//! │                                                                         │
//! │  One task per connection:                                               │
//! │    - decode frames, hand ServerEvents to the SocketHandler in order     │
//! │    - drain the outbound queue into the socket                           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol
//!
//! All messages are JSON text frames:
//!
//! ```json
//! // Client -> Server
//! {"event": "content:shabad:set-current", "payload": {"id": "DMP", "lineId": "1TJ"}}
//! {"event": "content:line:set-current", "payload": {"orderId": 12}}
//! {"event": "search:first-letter", "payload": {"query": "hhg", "options": {"translations": true}}}
//!
//! // Server -> Client
//! {"event": "content:line:current", "payload": "1TJ"}
//! {"event": "settings:all", "payload": {"local": {...}, "clients": {...}, "global": {...}}}
//! ```

pub mod client;
pub mod connection;
pub mod host;
pub mod protocol;
pub mod server;

pub use client::{Client, ConnectionState, Outbound};
pub use connection::{handle_connection, serve, CLOSE_TIMEOUT};
pub use host::{resolve_host, resolve_host_middleware, LOOKUP_TIMEOUT};
pub use protocol::{ClientEvent, DecodeError, LineTarget, OpenBookmark, OpenShabad, SearchRequest, ServerEvent};
pub use server::{heartbeat_middleware, ConnectionMiddleware, SocketHandler, SocketServer, HEARTBEAT_INTERVAL};
