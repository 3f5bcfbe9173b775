//! WebSocket connection handler
//!
//! Owns one socket: performs the handshake, runs connection middleware via
//! [`SocketServer::attach`], then pumps frames in both directions until the
//! peer goes away or the heartbeat terminates it.

use std::fmt::Display;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{Sink, SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message, WebSocketStream};

use super::client::{Client, Outbound};
use super::server::{SocketHandler, SocketServer};

/// Longest wait for the close handshake of a peer that may already be gone
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Accept connections until the listener fails.
pub async fn serve(
    listener: TcpListener,
    server: Arc<SocketServer>,
    handler: Arc<dyn SocketHandler>,
) -> anyhow::Result<()> {
    tracing::info!("WebSocket server listening on ws://{}", listener.local_addr()?);

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let server = Arc::clone(&server);
                let handler = Arc::clone(&handler);
                tokio::spawn(async move {
                    handle_connection(stream, addr, server, handler).await;
                });
            }
            Err(e) => {
                tracing::error!("Failed to accept connection: {}", e);
            }
        }
    }
}

/// Handle a single WebSocket connection
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    server: Arc<SocketServer>,
    handler: Arc<dyn SocketHandler>,
) {
    tracing::debug!("New connection from {}", addr);

    let ws = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            tracing::error!("WebSocket handshake failed: {}", e);
            return;
        }
    };

    let (tx, rx) = mpsc::unbounded_channel();
    let client = Arc::new(Client::new(addr, tx));

    let mut conn = Connection {
        ws,
        outbound: rx,
        client: Arc::clone(&client),
        server: Arc::clone(&server),
        handler: Arc::clone(&handler),
    };

    server.attach(Arc::clone(&client), handler.as_ref()).await;
    conn.run().await;
    server.detach(client, handler.as_ref()).await;

    tracing::debug!("Connection closed from {}", addr);
}

struct Connection {
    ws: WebSocketStream<TcpStream>,
    outbound: mpsc::UnboundedReceiver<Outbound>,
    client: Arc<Client>,
    server: Arc<SocketServer>,
    handler: Arc<dyn SocketHandler>,
}

impl Connection {
    async fn run(&mut self) {
        loop {
            tokio::select! {
                msg = self.ws.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.server
                                .dispatch(Arc::clone(&self.client), &text, self.handler.as_ref())
                                .await;
                        }
                        Some(Ok(Message::Pong(_))) => {
                            self.client.mark_alive();
                        }
                        Some(Ok(Message::Close(_))) => {
                            tracing::debug!(host = %self.client.host(), "Client requested close");
                            break;
                        }
                        Some(Err(e)) => {
                            tracing::warn!(host = %self.client.host(), "WebSocket error: {}", e);
                            break;
                        }
                        None => break,
                        _ => {}
                    }
                }

                outbound = self.outbound.recv() => {
                    match outbound {
                        Some(Outbound::Frame(frame)) => {
                            if let Err(e) = self.ws.send(frame).await {
                                tracing::warn!(host = %self.client.host(), "Send failed: {}", e);
                                break;
                            }
                        }
                        Some(Outbound::Terminate) | None => {
                            if !close_within(&mut self.ws, CLOSE_TIMEOUT).await {
                                tracing::debug!(host = %self.client.host(), "Dropping socket without close handshake");
                            }
                            break;
                        }
                    }
                }
            }
        }
    }
}

/// Close `sink`, giving up after `limit`. Returns whether it closed cleanly.
async fn close_within<S>(sink: &mut S, limit: Duration) -> bool
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    match tokio::time::timeout(limit, sink.close()).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            tracing::debug!("Close failed: {}", e);
            false
        }
        Err(_) => {
            tracing::debug!("Close timed out after {:?}", limit);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    /// A peer that accepts frames but never finishes flushing
    struct Unresponsive;

    impl Sink<Message> for Unresponsive {
        type Error = std::io::Error;

        fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn start_send(self: Pin<&mut Self>, _item: Message) -> Result<(), Self::Error> {
            Ok(())
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Pending
        }

        fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Pending
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_gives_up_on_unresponsive_peer() {
        let started = tokio::time::Instant::now();

        assert!(!close_within(&mut Unresponsive, CLOSE_TIMEOUT).await);

        let waited = started.elapsed();
        assert!(waited >= CLOSE_TIMEOUT);
        assert!(waited < CLOSE_TIMEOUT * 2);
    }

    #[tokio::test]
    async fn test_close_succeeds_on_healthy_sink() {
        let mut sink = futures_util::sink::drain::<Message>();
        assert!(close_within(&mut sink, CLOSE_TIMEOUT).await);
    }
}
