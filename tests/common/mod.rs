//! Local stand-in for the upstream websocket feed

#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_tungstenite::{accept_async, tungstenite::Message};

/// What the fake upstream observed
#[derive(Debug, Clone)]
pub enum ServerEvent {
    Accepted { index: usize, at: Instant },
    Subscribed { index: usize, text: String },
    ClosedByServer { index: usize, at: Instant },
    ClientClosed { index: usize },
    Ended { index: usize, at: Instant },
}

/// Per-connection behaviour, chosen by accept order
#[derive(Debug, Clone, Default)]
pub struct Script {
    /// Text frames sent after the subscribe request arrives
    pub frames: Vec<String>,
    /// Send a close frame after the frames
    pub close: bool,
    /// Stop reading after the frames, leaving any close frame unanswered
    pub go_silent: bool,
}

pub struct FakeUpstream {
    pub addr: SocketAddr,
    pub events: mpsc::UnboundedReceiver<ServerEvent>,
    pub max_open: Arc<AtomicUsize>,
}

impl FakeUpstream {
    /// Start a server; connection `i` follows `scripts[i]`, later ones hold open
    pub async fn start(scripts: Vec<Script>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (events_tx, events) = mpsc::unbounded_channel();
        let open = Arc::new(AtomicUsize::new(0));
        let max_open = Arc::new(AtomicUsize::new(0));

        let max_open_server = max_open.clone();
        tokio::spawn(async move {
            let mut index = 0;
            while let Ok((stream, _)) = listener.accept().await {
                let now_open = open.fetch_add(1, Ordering::SeqCst) + 1;
                max_open_server.fetch_max(now_open, Ordering::SeqCst);
                let _ = events_tx.send(ServerEvent::Accepted {
                    index,
                    at: Instant::now(),
                });

                let script = scripts.get(index).cloned().unwrap_or_default();
                let events_tx = events_tx.clone();
                let open = open.clone();
                tokio::spawn(async move {
                    let mut released = false;
                    if let Ok(mut ws) = accept_async(stream).await {
                        if let Some(Ok(Message::Text(text))) = ws.next().await {
                            let _ = events_tx.send(ServerEvent::Subscribed { index, text });
                        }
                        for frame in script.frames {
                            let _ = ws.send(Message::Text(frame)).await;
                        }
                        if script.close {
                            let _ = ws.close(None).await;
                            let _ = events_tx.send(ServerEvent::ClosedByServer {
                                index,
                                at: Instant::now(),
                            });
                        }
                        if script.go_silent {
                            tokio::time::sleep(Duration::from_secs(60)).await;
                        }
                        while let Some(Ok(msg)) = ws.next().await {
                            if msg.is_close() && !released {
                                // Counted as gone once the client's close
                                // arrives, before our reply goes out
                                open.fetch_sub(1, Ordering::SeqCst);
                                released = true;
                                let _ = events_tx.send(ServerEvent::ClientClosed { index });
                            }
                        }
                    }
                    if !released {
                        open.fetch_sub(1, Ordering::SeqCst);
                    }
                    let _ = events_tx.send(ServerEvent::Ended {
                        index,
                        at: Instant::now(),
                    });
                });

                index += 1;
            }
        });

        Self {
            addr,
            events,
            max_open,
        }
    }

    /// Base URL to hand to the client (endpoint path and token get appended)
    pub fn base_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Next observed event, failing the test after `wait`
    pub async fn next_event(&mut self, wait: Duration) -> ServerEvent {
        tokio::time::timeout(wait, self.events.recv())
            .await
            .expect("timed out waiting for upstream event")
            .expect("upstream event channel closed")
    }

    /// Skip events until one matches
    pub async fn wait_for<F>(&mut self, wait: Duration, mut matches: F) -> ServerEvent
    where
        F: FnMut(&ServerEvent) -> bool,
    {
        let deadline = Instant::now() + wait;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let event = self.next_event(remaining).await;
            if matches(&event) {
                return event;
            }
        }
    }

    /// Collect whatever arrives within `wait`
    pub async fn drain(&mut self, wait: Duration) -> Vec<ServerEvent> {
        let mut seen = Vec::new();
        let deadline = Instant::now() + wait;
        while let Ok(Some(event)) = tokio::time::timeout_at(deadline, self.events.recv()).await {
            seen.push(event);
        }
        seen
    }
}

/// Poll `check` until it holds or `wait` elapses
pub async fn eventually<F>(wait: Duration, mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + wait;
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
