//! In-process presenter harness
//!
//! Clients are attached straight to the `SocketServer` without a socket.
//! Everything the server queues for a client lands in its outbound channel,
//! where `TestClient` decodes it back into `ClientEvent`s.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use presenter_engine::app::{Presenter, PresenterOptions};
use presenter_engine::events::EventEmitter;
use presenter_engine::history::History;
use presenter_engine::paths::AppPaths;
use presenter_engine::settings::GlobalSettingsStore;
use presenter_engine::socket_server::{
    heartbeat_middleware, serve, Client, ClientEvent, Outbound, SocketHandler, SocketServer,
};

use super::fixtures;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

static NEXT_PORT: AtomicU16 = AtomicU16::new(40000);

pub struct TestServer {
    pub presenter: Arc<Presenter>,
    pub server: Arc<SocketServer>,
    pub paths: AppPaths,
    _dir: TempDir,
}

impl TestServer {
    pub async fn start() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let paths = AppPaths::new(dir.path().to_path_buf(), Utc::now());
        paths.ensure_app_folders().expect("Failed to create app folders");

        let global = Arc::new(GlobalSettingsStore::new(&paths.settings_file));
        global.load();

        let server = Arc::new(SocketServer::new());
        server.on_connection(heartbeat_middleware());
        let presenter = Presenter::start(
            Arc::clone(&server),
            PresenterOptions {
                corpus: fixtures::corpus(),
                global,
                history: History::in_memory(),
                paths: paths.clone(),
                events: EventEmitter::new(false),
            },
        )
        .await
        .expect("Failed to start presenter");

        Self {
            presenter,
            server,
            paths,
            _dir: dir,
        }
    }

    /// Attach a client identified as `host` and run the initial sync.
    pub async fn connect(&self, host: &str) -> TestClient {
        let port = NEXT_PORT.fetch_add(1, Ordering::SeqCst);
        let addr: SocketAddr = format!("10.0.0.1:{}", port).parse().unwrap();

        let (tx, rx) = mpsc::unbounded_channel();
        let client = Arc::new(Client::new(addr, tx));
        client.set_host(host);
        self.server
            .attach(Arc::clone(&client), self.presenter.as_ref())
            .await;

        TestClient { client, rx }
    }

    /// Connect and throw away the initial sync.
    pub async fn connect_quiet(&self, host: &str) -> TestClient {
        let mut client = self.connect(host).await;
        client.drain();
        client
    }

    /// Send `{event, payload}` from `client`.
    pub async fn send(&self, client: &TestClient, event: &str, payload: Value) {
        self.send_from(Arc::clone(&client.client), event, payload).await;
    }

    /// Like [`send`](Self::send), for callers that only hold the client handle
    pub async fn send_from(&self, client: Arc<Client>, event: &str, payload: Value) {
        let frame = json!({ "event": event, "payload": payload }).to_string();
        self.server
            .dispatch(client, &frame, self.presenter.as_ref())
            .await;
    }

    pub async fn send_raw(&self, client: &TestClient, frame: &str) {
        self.server
            .dispatch(Arc::clone(&client.client), frame, self.presenter.as_ref())
            .await;
    }

    /// Serve real WebSocket connections on a free loopback port.
    pub async fn listen(&self) -> SocketAddr {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Listener has no address");

        let handler: Arc<dyn SocketHandler> = self.presenter.clone();
        tokio::spawn(serve(listener, Arc::clone(&self.server), handler));
        addr
    }

    pub async fn disconnect(&self, client: &TestClient) {
        self.server
            .detach(Arc::clone(&client.client), self.presenter.as_ref())
            .await;
    }
}

pub struct TestClient {
    pub client: Arc<Client>,
    rx: mpsc::UnboundedReceiver<Outbound>,
}

fn decode(outbound: Outbound) -> Option<ClientEvent> {
    match outbound {
        Outbound::Frame(Message::Text(text)) => {
            Some(serde_json::from_str(&text).expect("Server sent an undecodable frame"))
        }
        _ => None,
    }
}

impl TestClient {
    /// Raw outbound items queued so far
    pub fn drain_outbound(&mut self) -> Vec<Outbound> {
        let mut items = Vec::new();
        while let Ok(item) = self.rx.try_recv() {
            items.push(item);
        }
        items
    }

    /// Events queued so far
    pub fn drain(&mut self) -> Vec<ClientEvent> {
        self.drain_outbound().into_iter().filter_map(decode).collect()
    }

    /// Names of the events queued so far
    pub fn drain_names(&mut self) -> Vec<&'static str> {
        self.drain().iter().map(ClientEvent::name).collect()
    }

    /// Last queued event called `name`, discarding everything queued
    pub fn latest(&mut self, name: &str) -> Option<ClientEvent> {
        self.drain().into_iter().filter(|e| e.name() == name).last()
    }

    /// Wait for the next event called `name`, skipping others.
    pub async fn next_event(&mut self, name: &str) -> ClientEvent {
        let wait = async {
            loop {
                let outbound = self.rx.recv().await.expect("Client channel closed");
                if let Some(event) = decode(outbound) {
                    if event.name() == name {
                        return event;
                    }
                }
            }
        };

        tokio::time::timeout(RECV_TIMEOUT, wait)
            .await
            .unwrap_or_else(|_| panic!("Timed out waiting for '{}'", name))
    }
}
