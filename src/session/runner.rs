//! Event loop binding a [`SessionCore`] to a WebSocket
//!
//! One task waits on whichever comes first: the next timer, the next socket
//! frame, the pending connect, or a shutdown request. Each event is handled
//! to completion before the next wait, so board I/O never interleaves.

use std::time::Duration;

use futures::future::{self, BoxFuture, FutureExt};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::machine::{Action, SessionCore};
use crate::error::SessionError;
use crate::message::Outbound;

/// Give up on a connect attempt after this long
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type PendingConnect = BoxFuture<'static, Result<WsStream, tungstenite::Error>>;

enum LoopEvent {
    Timer,
    Frame(Option<Result<Message, tungstenite::Error>>),
    Connected(Result<WsStream, tungstenite::Error>),
    Shutdown,
}

/// Run the session until a shutdown request arrives
///
/// A closed `shutdown` channel counts as a request. Board polling is driven
/// from here as well, so it stops when this returns.
pub async fn run(
    mut core: SessionCore,
    url: String,
    mut shutdown: mpsc::Receiver<()>,
) -> Result<(), SessionError> {
    let mut socket: Option<WsStream> = None;
    let mut connecting: Option<PendingConnect> = None;

    core.start();

    loop {
        for action in core.take_actions() {
            match action {
                Action::Connect => {
                    info!("Connecting to {}", url);
                    connecting = Some(connect(url.clone()));
                }
                Action::Close => {
                    connecting = None;
                    if let Some(mut ws) = socket.take() {
                        if let Err(e) = ws.close(None).await {
                            debug!("Close failed: {}", e);
                        }
                    }
                }
            }
        }
        if core.state().is_shutting_down() {
            info!("Session stopped");
            return Ok(());
        }

        flush(&mut core, &mut socket).await;

        let deadline = core.next_deadline();
        let event = tokio::select! {
            _ = sleep_until(deadline) => LoopEvent::Timer,
            frame = next_frame(&mut socket) => LoopEvent::Frame(frame),
            result = maybe(&mut connecting) => LoopEvent::Connected(result),
            _ = shutdown.recv() => LoopEvent::Shutdown,
        };

        match event {
            LoopEvent::Timer => core.run_due(Instant::now()).await,
            LoopEvent::Frame(Some(Ok(Message::Text(text)))) => core.on_text(&text),
            LoopEvent::Frame(Some(Ok(Message::Close(frame)))) => {
                info!("Upstream closed the connection: {:?}", frame);
                socket = None;
                core.on_disconnected();
            }
            LoopEvent::Frame(Some(Ok(other))) => debug!("Ignoring frame {:?}", other),
            LoopEvent::Frame(Some(Err(e))) => {
                warn!("Upstream receive failed: {}", e);
                socket = None;
                core.on_disconnected();
            }
            LoopEvent::Frame(None) => {
                socket = None;
                core.on_disconnected();
            }
            LoopEvent::Connected(Ok(ws)) => {
                connecting = None;
                socket = Some(ws);
                core.on_connected();
                if flush(&mut core, &mut socket).await {
                    core.on_connect_sent();
                }
            }
            LoopEvent::Connected(Err(e)) => {
                connecting = None;
                warn!("Connect failed: {}", e);
                core.on_disconnected();
            }
            LoopEvent::Shutdown => core.shutdown(),
        }
    }
}

fn connect(url: String) -> PendingConnect {
    async move {
        match tokio::time::timeout(CONNECT_TIMEOUT, connect_async(url)).await {
            Ok(result) => result.map(|(ws, _response)| ws),
            Err(_) => Err(tungstenite::Error::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "connect timed out",
            ))),
        }
    }
    .boxed()
}

/// Send the core's outbox; returns whether everything was written
///
/// Messages are dropped while there is no socket. A send failure drops the
/// socket and reports a disconnect.
async fn flush(core: &mut SessionCore, socket: &mut Option<WsStream>) -> bool {
    let messages = core.take_outbox();
    let Some(ws) = socket.as_mut() else {
        if !messages.is_empty() {
            debug!("Offline, dropping {} upstream messages", messages.len());
        }
        return false;
    };

    match send_all(ws, messages).await {
        Ok(()) => true,
        Err(e) => {
            warn!("Upstream send failed: {}", e);
            *socket = None;
            core.on_disconnected();
            false
        }
    }
}

async fn send_all(ws: &mut WsStream, messages: Vec<Outbound>) -> Result<(), SessionError> {
    for message in messages {
        let text = match message.to_json() {
            Ok(text) => text,
            Err(e) => {
                warn!("Cannot encode {:?}: {}", message, e);
                continue;
            }
        };
        debug!("-> {}", text);
        ws.send(Message::Text(text)).await?;
    }
    Ok(())
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => future::pending().await,
    }
}

async fn next_frame(socket: &mut Option<WsStream>) -> Option<Result<Message, tungstenite::Error>> {
    match socket {
        Some(ws) => ws.next().await,
        None => future::pending().await,
    }
}

async fn maybe<T>(pending: &mut Option<BoxFuture<'static, T>>) -> T {
    match pending {
        Some(fut) => fut.await,
        None => future::pending().await,
    }
}
