//! WebSocket client with automatic reconnection

use super::reconnect::ReconnectPolicy;
use super::state::ConnectionStatus;
use super::types::{ConnectionState, WsCommand, WsConfig, WsError, WsMessage};
use crate::telemetry::{self, CounterMetric, GaugeMetric};
use futures_util::{Sink, SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{interval_at, sleep, sleep_until, timeout, Instant, MissedTickBehavior};
use std::time::Duration;
use tokio_tungstenite::{connect_async, tungstenite, tungstenite::Message};
use uuid::Uuid;

/// Reusable WebSocket client with automatic reconnection and ping/pong handling
pub struct WsClient {
    config: WsConfig,
    status: ConnectionStatus,
}

/// Handle for steering a running connection task
#[derive(Debug, Clone)]
pub struct WsControl {
    commands: mpsc::Sender<WsCommand>,
}

impl WsControl {
    /// Replace the current connection with a fresh one, without waiting for
    /// the reconnect delay
    pub async fn reconnect(&self) -> Result<(), WsError> {
        self.send(WsCommand::Reconnect).await
    }

    /// Close the current connection and stop reconnecting
    pub async fn shutdown(&self) -> Result<(), WsError> {
        self.send(WsCommand::Shutdown).await
    }

    async fn send(&self, command: WsCommand) -> Result<(), WsError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| WsError::ChannelClosed)
    }
}

/// How a single connection ended
#[derive(Debug)]
enum StreamEnd {
    Closed {
        connection_id: Uuid,
        code: Option<u16>,
        reason: String,
    },
    Failed {
        connection_id: Option<Uuid>,
        error: WsError,
    },
    Reconnect,
    Shutdown,
    ReceiverDropped,
}

impl WsClient {
    /// Create a new WebSocket client with the given configuration
    pub fn new(config: WsConfig) -> Self {
        Self {
            config,
            status: ConnectionStatus::new(),
        }
    }

    /// Create a new client with just a URL using default config
    pub fn with_url(url: impl Into<String>) -> Self {
        Self::new(WsConfig::new(url))
    }

    /// Get the configured URL
    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Shared view of the connection state
    pub fn status(&self) -> ConnectionStatus {
        self.status.clone()
    }

    /// Connect and return a receiver for events plus a control handle
    ///
    /// This spawns a background task that owns the socket. The task holds at
    /// most one connection at a time and, after every close or failure,
    /// waits for the reconnect delay before opening the next one.
    ///
    /// Events arrive in order; every frame of a connection is delivered
    /// before the `Connected` event of its successor. The channel closes
    /// once the task stops (shutdown, or the receiver is dropped).
    pub fn connect(&self) -> (mpsc::Receiver<WsMessage>, WsControl) {
        let (tx, rx) = mpsc::channel(1024);
        let (command_tx, command_rx) = mpsc::channel(8);
        let config = self.config.clone();
        let status = self.status.clone();

        tokio::spawn(async move {
            Self::run_connection_loop(config, status, tx, command_rx).await;
        });

        (
            rx,
            WsControl {
                commands: command_tx,
            },
        )
    }

    /// Run the connection loop with automatic reconnection
    async fn run_connection_loop(
        config: WsConfig,
        status: ConnectionStatus,
        tx: mpsc::Sender<WsMessage>,
        mut commands: mpsc::Receiver<WsCommand>,
    ) {
        let mut policy = ReconnectPolicy::new(config.reconnect.clone());

        loop {
            if tx.is_closed() {
                tracing::info!("Receiver dropped, stopping reconnection");
                break;
            }

            let end =
                Self::connect_and_stream(&config, &status, &tx, &mut commands, &mut policy).await;

            status.set(ConnectionState::Closed);
            telemetry::set_gauge(GaugeMetric::ConnectionOpen, 0.0);

            match end {
                StreamEnd::Shutdown => {
                    tracing::info!("WebSocket client shut down");
                    break;
                }
                StreamEnd::ReceiverDropped => {
                    tracing::info!("Receiver dropped, stopping reconnection");
                    break;
                }
                StreamEnd::Reconnect => {
                    tracing::info!("Reconnect requested, connecting immediately");
                    continue;
                }
                StreamEnd::Closed {
                    connection_id,
                    code,
                    reason,
                } => {
                    tracing::info!(%connection_id, ?code, %reason, "WebSocket closed");
                    let event = WsMessage::Disconnected {
                        connection_id,
                        code,
                        reason,
                    };
                    if tx.send(event).await.is_err() {
                        break;
                    }
                }
                StreamEnd::Failed {
                    connection_id,
                    error,
                } => {
                    tracing::warn!(error = %error, "WebSocket connection error");
                    if tx.send(WsMessage::Error(error.clone())).await.is_err() {
                        break;
                    }
                    if let Some(connection_id) = connection_id {
                        let event = WsMessage::Disconnected {
                            connection_id,
                            code: None,
                            reason: error.to_string(),
                        };
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                }
            }

            let delay = policy.next_delay();
            let attempt = policy.attempt_count();
            telemetry::increment(CounterMetric::Reconnects);
            tracing::warn!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Scheduling WebSocket reconnect"
            );

            if tx
                .send(WsMessage::Reconnecting { attempt, delay })
                .await
                .is_err()
            {
                break;
            }

            tokio::select! {
                _ = sleep(delay) => {}
                Some(command) = commands.recv() => match command {
                    WsCommand::Reconnect => {
                        tracing::info!("Reconnect requested during delay, connecting now");
                    }
                    WsCommand::Shutdown => {
                        tracing::info!("WebSocket client shut down");
                        break;
                    }
                },
            }
        }
    }

    /// Open one connection and stream it until it ends
    async fn connect_and_stream(
        config: &WsConfig,
        status: &ConnectionStatus,
        tx: &mpsc::Sender<WsMessage>,
        commands: &mut mpsc::Receiver<WsCommand>,
        policy: &mut ReconnectPolicy,
    ) -> StreamEnd {
        status.set(ConnectionState::Connecting);
        tracing::info!(url = %redact_url(&config.url), "Connecting to WebSocket");

        // A command arriving mid-handshake drops the pending attempt.
        let result = tokio::select! {
            result = timeout(config.connect_timeout, connect_async(config.url.as_str())) => result,
            Some(command) = commands.recv() => return command_end(command),
        };

        let ws_stream = match result {
            Ok(Ok((ws_stream, _response))) => ws_stream,
            Ok(Err(e)) => {
                return StreamEnd::Failed {
                    connection_id: None,
                    error: WsError::ConnectionFailed(e.to_string()),
                }
            }
            Err(_) => {
                return StreamEnd::Failed {
                    connection_id: None,
                    error: WsError::ConnectTimeout(config.connect_timeout),
                }
            }
        };

        let connection_id = Uuid::new_v4();
        let (mut write, mut read) = ws_stream.split();

        status.set(ConnectionState::Open);
        telemetry::set_gauge(GaugeMetric::ConnectionOpen, 1.0);
        policy.reset();
        tracing::info!(%connection_id, "WebSocket connected");

        for message in &config.on_connect {
            let frame = Message::Text(message.clone());
            if let Err(error) = send_bounded(&mut write, frame, config.pong_timeout).await {
                return StreamEnd::Failed {
                    connection_id: Some(connection_id),
                    error,
                };
            }
        }

        if tx.send(WsMessage::Connected { connection_id }).await.is_err() {
            return StreamEnd::ReceiverDropped;
        }

        let mut ping_interval = interval_at(
            Instant::now() + config.ping_interval,
            config.ping_interval,
        );
        ping_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut pong_deadline: Option<Instant> = None;

        let failed = |error: WsError| StreamEnd::Failed {
            connection_id: Some(connection_id),
            error,
        };

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if tx.send(WsMessage::Text(text)).await.is_err() {
                                return StreamEnd::ReceiverDropped;
                            }
                        }
                        Some(Ok(Message::Binary(data))) => {
                            if tx.send(WsMessage::Binary(data)).await.is_err() {
                                return StreamEnd::ReceiverDropped;
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            let pong = Message::Pong(data);
                            let sent = send_bounded(&mut write, pong, config.pong_timeout).await;
                            if let Err(e) = sent {
                                return failed(e);
                            }
                        }
                        Some(Ok(Message::Pong(_))) => {
                            pong_deadline = None;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = frame
                                .map(|f| (Some(u16::from(f.code)), f.reason.to_string()))
                                .unwrap_or((None, String::new()));
                            return StreamEnd::Closed { connection_id, code, reason };
                        }
                        Some(Ok(Message::Frame(_))) => {}
                        Some(Err(e)) => {
                            return failed(WsError::ConnectionFailed(e.to_string()));
                        }
                        None => {
                            return failed(WsError::ConnectionFailed(
                                "Stream ended unexpectedly".into(),
                            ));
                        }
                    }
                }

                Some(command) = commands.recv() => {
                    status.set(ConnectionState::Closing);
                    // Wait for the peer's close frame so the old connection is
                    // gone before the next one opens.
                    let handshake = async {
                        write.close().await?;
                        while let Some(frame) = read.next().await {
                            if let Message::Close(_) = frame? {
                                break;
                            }
                        }
                        Ok::<(), tungstenite::Error>(())
                    };
                    match timeout(config.pong_timeout, handshake).await {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => {
                            tracing::debug!(error = %e, "Close handshake failed, dropping socket");
                        }
                        Err(_) => {
                            tracing::warn!("Close handshake timed out, dropping socket");
                        }
                    }
                    return command_end(command);
                }

                _ = ping_interval.tick() => {
                    if pong_deadline.is_none() {
                        pong_deadline = Some(Instant::now() + config.pong_timeout);
                    }
                    let ping = Message::Ping(Vec::new());
                    if let Err(e) = send_bounded(&mut write, ping, config.pong_timeout).await {
                        return failed(e);
                    }
                }

                _ = sleep_until(pong_deadline.unwrap_or_else(Instant::now)), if pong_deadline.is_some() => {
                    return failed(WsError::PongTimeout);
                }
            }
        }
    }
}

/// Write one frame, giving up after `limit` when the peer stops reading
async fn send_bounded<S>(write: &mut S, message: Message, limit: Duration) -> Result<(), WsError>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    match timeout(limit, write.send(message)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(WsError::SendFailed(e.to_string())),
        Err(_) => Err(WsError::WriteTimeout(limit)),
    }
}

fn command_end(command: WsCommand) -> StreamEnd {
    match command {
        WsCommand::Reconnect => StreamEnd::Reconnect,
        WsCommand::Shutdown => StreamEnd::Shutdown,
    }
}

/// Mask credential-looking query parameters before a URL is logged
pub(crate) fn redact_url(url: &str) -> String {
    let Some((base, query)) = url.split_once('?') else {
        return url.to_string();
    };

    let params: Vec<String> = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((key, _)) if key.contains("token") || key.contains("key") => {
                format!("{key}=***")
            }
            _ => pair.to_string(),
        })
        .collect();

    format!("{base}?{}", params.join("&"))
}
