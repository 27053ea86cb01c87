// Socket transport: one persistent bidirectional connection per session.
//
// The worker task owns the WebSocket. It authenticates on connect, announces
// the session with a `register` frame, pumps frames both ways, and retries
// with bounded backoff when the connection drops. Everything upstream talks
// to it through channels only.

use anyhow::{anyhow, Result};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::config::SessionConfig;

use super::events::{decode_frame, encode_frame, InboundEvent, OutboundEvent};
use super::ChatUpdate;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const BACKOFF_BASE_MS: u64 = 500;
const BACKOFF_CAP: Duration = Duration::from_secs(30);

/// Connection state as reported to the embedding application.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientState {
    Connecting,
    Connected,
    Disconnected,
}

/// Handle to the socket worker. Dropping the handle leaves the worker
/// running; call [`SocketTransport::shutdown`] at logout or the connection
/// and its event handlers leak into the next session.
pub struct SocketTransport {
    worker: JoinHandle<()>,
    shutdown_tx: watch::Sender<bool>,
    connected: Arc<AtomicBool>,
}

impl SocketTransport {
    /// Start the worker for one authenticated session. Fails closed when the
    /// session carries no bearer token.
    pub fn spawn(
        config: &SessionConfig,
        outbound_rx: mpsc::Receiver<OutboundEvent>,
        inbound_tx: mpsc::Sender<InboundEvent>,
        update_tx: mpsc::Sender<ChatUpdate>,
        connected: Arc<AtomicBool>,
    ) -> Result<Self> {
        let token = config
            .token()
            .ok_or_else(|| anyhow!("Refusing to open socket without a bearer token"))?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let worker = tokio::spawn(run_socket(
            config.socket_url.clone(),
            token,
            config.user_id.clone(),
            outbound_rx,
            inbound_tx,
            update_tx,
            connected.clone(),
            shutdown_rx,
        ));

        Ok(SocketTransport {
            worker,
            shutdown_tx,
            connected,
        })
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Close the connection and stop the worker. Safe to call with the
    /// worker already gone.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = (&mut self.worker).await {
            if !e.is_cancelled() {
                warn!("Socket worker ended abnormally: {}", e);
            }
        }
        info!("Socket transport shut down");
    }
}

#[derive(Debug)]
enum PumpExit {
    Shutdown,
    PeerClosed,
    Error,
}

#[allow(clippy::too_many_arguments)]
async fn run_socket(
    socket_url: String,
    token: String,
    user_id: String,
    mut outbound_rx: mpsc::Receiver<OutboundEvent>,
    inbound_tx: mpsc::Sender<InboundEvent>,
    update_tx: mpsc::Sender<ChatUpdate>,
    connected: Arc<AtomicBool>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut attempt: u32 = 0;

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        let _ = update_tx.try_send(ChatUpdate::Connection(ClientState::Connecting));
        match open_connection(&socket_url, &token).await {
            Ok(ws) => {
                info!("Socket connected for {}", user_id);
                attempt = 0;
                connected.store(true, Ordering::SeqCst);
                let _ = update_tx.try_send(ChatUpdate::Connection(ClientState::Connected));

                let exit = pump(ws, &mut outbound_rx, &inbound_tx, &user_id, &mut shutdown_rx).await;

                connected.store(false, Ordering::SeqCst);
                let _ = update_tx.try_send(ChatUpdate::Connection(ClientState::Disconnected));

                if matches!(exit, PumpExit::Shutdown) {
                    break;
                }
                warn!("Socket closed ({:?}); will reconnect", exit);
            }
            Err(e) => {
                error!("Socket connect failed: {}", e);
            }
        }

        attempt = attempt.saturating_add(1);
        let backoff = reconnect_backoff(attempt);
        debug!("Reconnecting in {:?} (attempt {})", backoff, attempt);
        tokio::select! {
            _ = tokio::time::sleep(backoff) => {}
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }

    info!("Socket worker stopped for {}", user_id);
}

/// Open the WebSocket. The token travels both ways the backend accepts it:
/// as a query parameter and as a handshake Authorization header.
async fn open_connection(socket_url: &str, token: &str) -> Result<WsStream> {
    let separator = if socket_url.contains('?') { '&' } else { '?' };
    let url = format!("{}{}token={}", socket_url, separator, token);

    let mut request = url.into_client_request()?;
    request.headers_mut().insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token))?,
    );

    let (ws, _response) = connect_async(request).await?;
    Ok(ws)
}

/// Run one live connection until it ends. Registers the session first so the
/// server can target frames at our user id, then relays frames both ways.
async fn pump(
    mut ws: WsStream,
    outbound_rx: &mut mpsc::Receiver<OutboundEvent>,
    inbound_tx: &mpsc::Sender<InboundEvent>,
    user_id: &str,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> PumpExit {
    let register = OutboundEvent::Register {
        user_id: user_id.to_string(),
    };
    if let Err(e) = ws.send(WsMessage::Text(encode_frame(&register))).await {
        error!("Failed to register session on socket: {}", e);
        return PumpExit::Error;
    }

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    let _ = ws.close(None).await;
                    return PumpExit::Shutdown;
                }
            }
            outbound = outbound_rx.recv() => match outbound {
                Some(event) => {
                    if let Err(e) = ws.send(WsMessage::Text(encode_frame(&event))).await {
                        error!("Failed to send socket frame: {}", e);
                        return PumpExit::Error;
                    }
                }
                None => {
                    // Client side of the session is gone
                    let _ = ws.close(None).await;
                    return PumpExit::Shutdown;
                }
            },
            frame = ws.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => {
                    if let Some(event) = decode_frame(&text) {
                        if inbound_tx.send(event).await.is_err() {
                            let _ = ws.close(None).await;
                            return PumpExit::Shutdown;
                        }
                    }
                }
                Some(Ok(WsMessage::Close(_))) | None => {
                    return PumpExit::PeerClosed;
                }
                Some(Ok(_)) => {
                    // Ping/pong handled by the protocol layer; binary ignored
                }
                Some(Err(e)) => {
                    error!("Socket read error: {}", e);
                    return PumpExit::Error;
                }
            }
        }
    }
}

fn reconnect_backoff(attempt: u32) -> Duration {
    let exp = attempt.min(6);
    let base = Duration::from_millis(BACKOFF_BASE_MS << exp).min(BACKOFF_CAP);
    base + Duration::from_millis(rand::random::<u64>() % 250)
}
