//! Client registry, connection lifecycle and fan-out
//!
//! ```text
//!   accept ──► Client (Connecting)
//!                │  connection middleware, in registration order
//!                ▼
//!            Client (Connected) ──► SocketHandler::on_ready
//!                │
//!   text frame ──┴─► ServerEvent::decode ──► SocketHandler::on_event
//!                │
//!   close / missed heartbeat
//!                ▼
//!            Client (Disconnected) ──► SocketHandler::on_disconnect
//! ```
//!
//! The registry is only locked long enough to copy out the client list;
//! sends queue frames and never touch the socket directly.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use parking_lot::RwLock;
use uuid::Uuid;

use super::client::{Client, ConnectionState};
use super::protocol::{ClientEvent, DecodeError, ServerEvent};

/// Interval between heartbeat sweeps
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Async hook run on every new connection before it is marked ready
pub type ConnectionMiddleware = Arc<dyn Fn(Arc<Client>) -> BoxFuture<'static, ()> + Send + Sync>;

/// Connection middleware that subjects new clients to heartbeat sweeps.
///
/// Clients attached without it are never pinged or terminated.
pub fn heartbeat_middleware() -> ConnectionMiddleware {
    Arc::new(|client: Arc<Client>| {
        async move { client.monitor_liveness() }.boxed()
    })
}

/// Receiver of connection lifecycle and decoded client events
pub trait SocketHandler: Send + Sync + 'static {
    /// A connection finished its middleware and can be sent to.
    fn on_ready(&self, client: Arc<Client>) -> BoxFuture<'_, ()>;

    /// A decoded event from `client`. Events from one client are delivered in
    /// the order they were received.
    fn on_event(&self, client: Arc<Client>, event: ServerEvent) -> BoxFuture<'_, ()>;

    /// The connection is gone.
    fn on_disconnect(&self, client: Arc<Client>) -> BoxFuture<'_, ()>;
}

/// WebSocket server state shared by every connection
#[derive(Default)]
pub struct SocketServer {
    clients: RwLock<HashMap<Uuid, Arc<Client>>>,
    middleware: RwLock<Vec<ConnectionMiddleware>>,
}

impl SocketServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register connection middleware. Runs in registration order.
    pub fn on_connection(&self, middleware: ConnectionMiddleware) {
        self.middleware.write().push(middleware);
    }

    /// Run middleware, register the client and mark it ready.
    pub async fn attach(&self, client: Arc<Client>, handler: &dyn SocketHandler) {
        let middleware = self.middleware.read().clone();
        for step in middleware {
            step(Arc::clone(&client)).await;
        }

        // Closed while middleware was running
        if client.state() != ConnectionState::Connecting {
            return;
        }

        self.clients.write().insert(client.id(), Arc::clone(&client));
        client.set_state(ConnectionState::Connected);
        tracing::info!(host = %client.host(), "{} connected", client.host());

        handler.on_ready(client).await;
    }

    /// Decode a text frame from `client` and hand it to the handler.
    ///
    /// Frames that do not decode are logged at debug level and dropped.
    pub async fn dispatch(&self, client: Arc<Client>, text: &str, handler: &dyn SocketHandler) {
        if !client.is_ready() {
            tracing::debug!(host = %client.host(), "Ignoring frame from connection that is not ready");
            return;
        }

        match ServerEvent::decode(text) {
            Ok(event) => handler.on_event(client, event).await,
            Err(DecodeError::UnknownEvent(name)) => {
                tracing::debug!(host = %client.host(), "Ignoring unknown event '{}'", name);
            }
            Err(e) => {
                tracing::debug!(host = %client.host(), "Ignoring frame: {}", e);
            }
        }
    }

    /// Remove a client after its socket closed. Safe to call more than once.
    pub async fn detach(&self, client: Arc<Client>, handler: &dyn SocketHandler) {
        let was_registered = self.clients.write().remove(&client.id()).is_some();
        let previous = client.state();
        client.set_state(ConnectionState::Disconnected);

        if previous == ConnectionState::Disconnected {
            return;
        }
        // Never became ready: nothing downstream knows about it
        if previous == ConnectionState::Connecting && !was_registered {
            return;
        }

        tracing::info!(host = %client.host(), "{} disconnected", client.host());
        handler.on_disconnect(client).await;
    }

    /// Snapshot of the ready clients
    pub fn clients(&self) -> Vec<Arc<Client>> {
        self.clients
            .read()
            .values()
            .filter(|c| c.is_ready())
            .cloned()
            .collect()
    }

    /// Number of ready connections from `host`
    pub fn connections_from(&self, host: &str) -> usize {
        self.clients().iter().filter(|c| c.host() == host).count()
    }

    /// Send a per-recipient event to every ready client.
    pub fn broadcast<F>(&self, payload_for: F)
    where
        F: Fn(&Client) -> ClientEvent,
    {
        for client in self.clients() {
            client.send(&payload_for(&client));
        }
    }

    /// Send the same event to every ready client.
    pub fn broadcast_event(&self, event: &ClientEvent) {
        for client in self.clients() {
            client.send(event);
        }
    }

    /// One heartbeat pass over monitored clients: terminate those that missed
    /// the previous ping, ping the rest. Returns the terminated clients.
    pub fn sweep(&self) -> Vec<Arc<Client>> {
        let mut terminated = Vec::new();

        for client in self.clients().into_iter().filter(|c| c.is_monitored()) {
            if client.take_alive() {
                client.ping();
                continue;
            }

            tracing::info!(host = %client.host(), "Terminating unresponsive connection");
            self.clients.write().remove(&client.id());
            client.terminate();
            terminated.push(client);
        }

        terminated
    }

    /// Sweep every `interval` until the server is dropped.
    pub fn spawn_heartbeat(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let server = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(server) = server.upgrade() else {
                    break;
                };
                let terminated = server.sweep();
                if !terminated.is_empty() {
                    tracing::debug!("Heartbeat terminated {} connection(s)", terminated.len());
                }
            }
        })
    }
}
