use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, timeout};

use crate::coordinator::Coordinator;
use crate::error::CoordinatorError;
use crate::shared::event::{ClientSignal, ServerEvent};
use crate::shared::ids::ConnectionId;

/// Ping interval: the server pings every 30 seconds so abruptly dropped
/// transports do not leak connections.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Pong timeout: if no pong arrives within 10 seconds of a ping, close.
const PONG_TIMEOUT: Duration = Duration::from_secs(10);

/// Handle the WebSocket upgrade (GET /ws) and hand the socket to the actor.
pub async fn ws_upgrade_handler(
    State(coordinator): State<Arc<Coordinator>>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| run_connection(socket, coordinator))
}

/// Run the actor for one accepted connection.
///
/// Splits the socket, registers the connection with the coordinator (state
/// `Anonymous`), then loops over inbound frames until the transport closes
/// or the ping supervisor declares the peer dead. Rejected signals are
/// answered with an `error` event on this connection only; the disconnect
/// transition runs exactly once when the loop exits.
pub async fn run_connection(socket: WebSocket, coordinator: Arc<Coordinator>) {
    let (ws_sender, mut ws_receiver) = socket.split();
    let (event_tx, event_rx) = mpsc::unbounded_channel::<ServerEvent>();
    let (control_tx, control_rx) = mpsc::unbounded_channel::<Message>();

    let connection = coordinator.connect(event_tx.clone());
    tracing::info!("[WS] Actor started for connection {}", connection);

    // Writer task: owns the sink, drains event and control channels
    let writer_handle = tokio::spawn(writer_task(ws_sender, event_rx, control_rx));

    // Ping supervisor: periodic pings with a pong deadline. A silently
    // dead peer never produces a frame for the reader to fail on, so the
    // supervisor owns a shutdown channel that unparks the reader loop.
    let (pong_tx, pong_rx) = mpsc::unbounded_channel::<()>();
    let (shutdown_tx, mut shutdown_rx) = mpsc::unbounded_channel::<()>();
    let ping_handle = tokio::spawn(ping_supervisor(
        control_tx.clone(),
        pong_rx,
        shutdown_tx,
        PING_INTERVAL,
        PONG_TIMEOUT,
    ));

    // Reader loop: decode signals and dispatch to the coordinator
    loop {
        tokio::select! {
            // Fires on reap, and also when the supervisor exits because
            // the writer died: the connection is gone either way
            _ = shutdown_rx.recv() => {
                tracing::warn!("[WS] Reaping unresponsive connection {}", connection);
                break;
            }
            frame = ws_receiver.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    handle_text_frame(&coordinator, connection, text.as_str(), &event_tx);
                }
                Some(Ok(Message::Binary(_))) => {
                    // Protocol is JSON text; reject so the client can notice
                    let error = CoordinatorError::malformed("binary frames are not supported");
                    let _ = event_tx.send(ServerEvent::from(&error));
                }
                Some(Ok(Message::Ping(data))) => {
                    let _ = control_tx.send(Message::Pong(data));
                }
                Some(Ok(Message::Pong(_))) => {
                    let _ = pong_tx.send(());
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!(
                        "[WS] Connection {} closed by client: {:?}",
                        connection,
                        frame
                    );
                    break;
                }
                Some(Err(e)) => {
                    tracing::warn!("[WS] Receive error on connection {}: {}", connection, e);
                    break;
                }
                None => {
                    tracing::info!("[WS] Stream ended for connection {}", connection);
                    break;
                }
            },
        }
    }

    writer_handle.abort();
    ping_handle.abort();

    // any -> Closed: graceful closes, transport errors, and reaped peers
    // all land here alike
    coordinator.disconnect(connection);
    tracing::info!("[WS] Actor stopped for connection {}", connection);
}

/// Periodically ping the peer and demand a pong within the deadline.
///
/// On timeout, queues a Close frame for the writer and fires `shutdown`
/// so the reader loop stops waiting on a stream that will never yield
/// another frame. Exits quietly when the writer is already gone, which
/// drops `shutdown` and unparks the reader just the same.
async fn ping_supervisor(
    control: mpsc::UnboundedSender<Message>,
    mut pong_rx: mpsc::UnboundedReceiver<()>,
    shutdown: mpsc::UnboundedSender<()>,
    ping_interval: Duration,
    pong_timeout: Duration,
) {
    let mut ping_timer = interval(ping_interval);
    // Skip the first immediate tick
    ping_timer.tick().await;
    loop {
        ping_timer.tick().await;
        if control.send(Message::Ping(Vec::new().into())).is_err() {
            break;
        }
        match timeout(pong_timeout, pong_rx.recv()).await {
            Ok(Some(())) => {}
            _ => {
                tracing::warn!("[WS] Pong timeout, closing connection");
                let _ = control.send(Message::Close(Some(CloseFrame {
                    code: 1001,
                    reason: "pong timeout".into(),
                })));
                let _ = shutdown.send(());
                break;
            }
        }
    }
}

/// Decode one text frame and dispatch it; answer rejections on this
/// connection only.
fn handle_text_frame(
    coordinator: &Coordinator,
    connection: ConnectionId,
    text: &str,
    event_tx: &mpsc::UnboundedSender<ServerEvent>,
) {
    let signal: ClientSignal = match serde_json::from_str(text) {
        Ok(signal) => signal,
        Err(e) => {
            tracing::debug!(
                "[WS] Malformed signal on connection {}: {}",
                connection,
                e
            );
            let error = CoordinatorError::malformed(e.to_string());
            let _ = event_tx.send(ServerEvent::from(&error));
            return;
        }
    };
    if let Err(error) = coordinator.handle_signal(connection, signal) {
        tracing::debug!(
            "[WS] Rejected signal on connection {}: {}",
            connection,
            error
        );
        let _ = event_tx.send(ServerEvent::from(&error));
    }
}

/// Writer task: forwards coordinator events (as JSON text) and control
/// frames to the WebSocket sink until either the sink or both channels die.
async fn writer_task(
    mut ws_sender: SplitSink<WebSocket, Message>,
    mut event_rx: mpsc::UnboundedReceiver<ServerEvent>,
    mut control_rx: mpsc::UnboundedReceiver<Message>,
) {
    loop {
        tokio::select! {
            event = event_rx.recv() => match event {
                Some(event) => {
                    let text = match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::error!("[WS] Failed to serialize event: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            frame = control_rx.recv() => match frame {
                Some(frame) => {
                    let closing = matches!(frame, Message::Close(_));
                    if ws_sender.send(frame).await.is_err() || closing {
                        break;
                    }
                }
                None => break,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_silent_peer_is_reaped() {
        let (control_tx, mut control_rx) = mpsc::unbounded_channel();
        // Pong sender stays alive but never sends: a silently dead peer
        let (_pong_tx, pong_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, mut shutdown_rx) = mpsc::unbounded_channel();
        tokio::spawn(ping_supervisor(
            control_tx,
            pong_rx,
            shutdown_tx,
            Duration::from_millis(5),
            Duration::from_millis(5),
        ));

        // The shutdown signal must arrive so the reader loop unparks
        shutdown_rx.recv().await.expect("shutdown never fired");

        assert!(matches!(control_rx.recv().await, Some(Message::Ping(_))));
        assert!(matches!(control_rx.recv().await, Some(Message::Close(_))));
    }

    #[tokio::test]
    async fn test_responsive_peer_is_not_reaped() {
        let (control_tx, mut control_rx) = mpsc::unbounded_channel();
        let (pong_tx, pong_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, mut shutdown_rx) = mpsc::unbounded_channel();
        tokio::spawn(ping_supervisor(
            control_tx,
            pong_rx,
            shutdown_tx,
            Duration::from_millis(5),
            Duration::from_millis(50),
        ));

        // Answer three pings in a row
        for _ in 0..3 {
            assert!(matches!(control_rx.recv().await, Some(Message::Ping(_))));
            pong_tx.send(()).unwrap();
        }
        assert!(shutdown_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_supervisor_exits_when_writer_is_gone() {
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (_pong_tx, pong_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, mut shutdown_rx) = mpsc::unbounded_channel();
        // Writer task already dead
        drop(control_rx);
        tokio::spawn(ping_supervisor(
            control_tx,
            pong_rx,
            shutdown_tx,
            Duration::from_millis(5),
            Duration::from_millis(5),
        ));

        // No explicit shutdown, but the dropped sender unparks the reader
        assert_eq!(shutdown_rx.recv().await, None);
    }
}
