//! Per-connection client handle
//!
//! A [`Client`] is shared between the connection task (which owns the
//! WebSocket) and the rest of the server (which only ever queues frames).
//! Outbound frames go through an unbounded channel so senders never block on
//! socket I/O.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use uuid::Uuid;

use super::protocol::ClientEvent;

/// Lifecycle of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Accepted, connection middleware still running
    Connecting,
    /// Ready: receives sends and broadcasts
    Connected,
    /// Close requested (by either side or by the heartbeat)
    Disconnecting,
    /// Gone
    Disconnected,
}

/// Work queued for the connection task
#[derive(Debug)]
pub enum Outbound {
    /// Write a frame
    Frame(Message),
    /// Close the socket and stop
    Terminate,
}

/// A connected display or controller
pub struct Client {
    id: Uuid,
    addr: SocketAddr,
    host: RwLock<String>,
    /// Checked by heartbeat sweeps once liveness is monitored
    monitored: AtomicBool,
    is_alive: AtomicBool,
    state: Mutex<ConnectionState>,
    outbound: mpsc::UnboundedSender<Outbound>,
    /// Last frame sent per event name
    last_sent: Mutex<HashMap<&'static str, String>>,
    /// Latest search request issued by this client
    search_seq: AtomicU64,
}

impl Client {
    /// Create a client in the `Connecting` state. Its host id starts out as
    /// the raw IP until connection middleware resolves a better one.
    pub fn new(addr: SocketAddr, outbound: mpsc::UnboundedSender<Outbound>) -> Self {
        Self {
            id: Uuid::new_v4(),
            addr,
            host: RwLock::new(addr.ip().to_string()),
            monitored: AtomicBool::new(false),
            is_alive: AtomicBool::new(false),
            state: Mutex::new(ConnectionState::Connecting),
            outbound,
            last_sent: Mutex::new(HashMap::new()),
            search_seq: AtomicU64::new(0),
        }
    }

    /// Unique id of this connection
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Human-readable host id; several connections may share one
    pub fn host(&self) -> String {
        self.host.read().clone()
    }

    pub fn set_host(&self, host: impl Into<String>) {
        *self.host.write() = host.into();
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    pub fn set_state(&self, state: ConnectionState) {
        *self.state.lock() = state;
    }

    pub fn is_ready(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Start answering to heartbeat sweeps, counting as alive until the first one.
    pub fn monitor_liveness(&self) {
        self.is_alive.store(true, Ordering::SeqCst);
        self.monitored.store(true, Ordering::SeqCst);
    }

    /// Whether heartbeat sweeps apply to this connection
    pub fn is_monitored(&self) -> bool {
        self.monitored.load(Ordering::SeqCst)
    }

    /// Record a pong.
    pub fn mark_alive(&self) {
        self.is_alive.store(true, Ordering::SeqCst);
    }

    /// Read and reset the liveness flag for a heartbeat sweep.
    pub fn take_alive(&self) -> bool {
        self.is_alive.swap(false, Ordering::SeqCst)
    }

    /// Send an event. Dropped with a warning unless the connection is ready;
    /// state snapshots identical to the previous one for the same event are
    /// suppressed.
    pub fn send(&self, event: &ClientEvent) {
        if !self.is_ready() {
            tracing::warn!(
                host = %self.host(),
                "Dropping '{}' for connection in state {:?}",
                event.name(),
                self.state()
            );
            return;
        }

        let frame = match event.encode() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!("Failed to encode '{}': {}", event.name(), e);
                return;
            }
        };

        if event.is_deduplicated() {
            let mut last_sent = self.last_sent.lock();
            if last_sent.get(event.name()) == Some(&frame) {
                tracing::trace!(host = %self.host(), "Suppressed duplicate '{}'", event.name());
                return;
            }
            last_sent.insert(event.name(), frame.clone());
        }

        self.push(Outbound::Frame(Message::Text(frame)));
    }

    /// Queue a heartbeat ping.
    pub fn ping(&self) {
        self.push(Outbound::Frame(Message::Ping(Vec::new())));
    }

    /// Ask the connection task to close the socket.
    pub fn terminate(&self) {
        self.set_state(ConnectionState::Disconnecting);
        self.push(Outbound::Terminate);
    }

    /// Start a new search and return its sequence number.
    pub fn next_search(&self) -> u64 {
        self.search_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Whether `seq` is still this client's most recent search.
    pub fn is_latest_search(&self, seq: u64) -> bool {
        self.search_seq.load(Ordering::SeqCst) == seq
    }

    fn push(&self, outbound: Outbound) {
        // The receiver is gone once the connection task has exited
        if self.outbound.send(outbound).is_err() {
            tracing::debug!(host = %self.host(), "Connection task already closed");
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("id", &self.id)
            .field("host", &self.host())
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> (Client, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = Client::new("127.0.0.1:5000".parse().unwrap(), tx);
        (client, rx)
    }

    fn text_frames(rx: &mut mpsc::UnboundedReceiver<Outbound>) -> Vec<String> {
        let mut frames = Vec::new();
        while let Ok(outbound) = rx.try_recv() {
            if let Outbound::Frame(Message::Text(text)) = outbound {
                frames.push(text);
            }
        }
        frames
    }

    #[test]
    fn test_send_before_ready_is_dropped() {
        let (client, mut rx) = client();
        client.send(&ClientEvent::Status(Some("hello".to_string())));
        assert!(text_frames(&mut rx).is_empty());
    }

    #[test]
    fn test_identical_consecutive_payloads_are_suppressed() {
        let (client, mut rx) = client();
        client.set_state(ConnectionState::Connected);

        client.send(&ClientEvent::Line(Some("L1".to_string())));
        client.send(&ClientEvent::Line(Some("L1".to_string())));
        client.send(&ClientEvent::Line(Some("L2".to_string())));
        client.send(&ClientEvent::Line(Some("L1".to_string())));

        assert_eq!(text_frames(&mut rx).len(), 3);
    }

    #[test]
    fn test_search_results_are_never_suppressed() {
        let (client, mut rx) = client();
        client.set_state(ConnectionState::Connected);

        client.send(&ClientEvent::SearchResults(Vec::new()));
        client.send(&ClientEvent::SearchResults(Vec::new()));

        assert_eq!(text_frames(&mut rx).len(), 2);
    }

    #[test]
    fn test_liveness_flag_resets_on_take() {
        let (client, _rx) = client();
        assert!(!client.is_monitored());

        client.monitor_liveness();
        assert!(client.is_monitored());
        assert!(client.take_alive());
        assert!(!client.take_alive());
        client.mark_alive();
        assert!(client.take_alive());
    }

    #[test]
    fn test_search_sequence_tracks_latest() {
        let (client, _rx) = client();
        let first = client.next_search();
        let second = client.next_search();
        assert!(!client.is_latest_search(first));
        assert!(client.is_latest_search(second));
    }

    #[test]
    fn test_host_defaults_to_ip() {
        let (client, _rx) = client();
        assert_eq!(client.host(), "127.0.0.1");
        client.set_host("studio-laptop");
        assert_eq!(client.host(), "studio-laptop");
    }
}
