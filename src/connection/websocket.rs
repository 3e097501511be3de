//! # WebSocket Link
//!
//! [`Connector`] backed by `tokio-tungstenite`.
//!
//! Each link runs in its own task. Outbound frames go through an unbounded
//! queue whose byte count is exposed as [`Link::buffered_amount`]: it rises
//! when a frame is queued and falls once the frame has been flushed to the
//! socket, which is what the manager's backpressure check reads.

use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::debug;

use super::{Connector, Generation, Link, LinkEvent, LinkEventKind, LinkEventSender};
use crate::error::{PadBridgeError, Result};

/// Default limit on the opening handshake
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(5000);

/// Spawns one tokio task per connection attempt.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    connect_timeout: Duration,
}

impl WebSocketConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for WebSocketConnector {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT)
    }
}

impl Connector for WebSocketConnector {
    fn connect(&mut self, url: &str, generation: Generation, events: LinkEventSender) -> Box<dyn Link> {
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let buffered = Arc::new(AtomicUsize::new(0));

        tokio::spawn(run_link(
            url.to_string(),
            generation,
            self.connect_timeout,
            outbound_rx,
            buffered.clone(),
            events,
        ));

        Box::new(WebSocketLink {
            outbound: Some(outbound),
            buffered,
        })
    }
}

struct WebSocketLink {
    outbound: Option<mpsc::UnboundedSender<String>>,
    buffered: Arc<AtomicUsize>,
}

impl Link for WebSocketLink {
    fn send(&mut self, frame: String) -> Result<()> {
        let Some(outbound) = &self.outbound else {
            return Err(PadBridgeError::Transport("link is closed".to_string()));
        };

        let len = frame.len();
        self.buffered.fetch_add(len, Ordering::SeqCst);
        outbound.send(frame).map_err(|_| {
            self.buffered.fetch_sub(len, Ordering::SeqCst);
            PadBridgeError::Transport("link task has stopped".to_string())
        })
    }

    fn buffered_amount(&self) -> usize {
        self.buffered.load(Ordering::SeqCst)
    }

    fn close(&mut self) {
        // dropping the sender ends the task's write loop, which sends a close frame
        self.outbound = None;
    }
}

async fn run_link(
    url: String,
    generation: Generation,
    connect_timeout: Duration,
    mut outbound: mpsc::UnboundedReceiver<String>,
    buffered: Arc<AtomicUsize>,
    events: LinkEventSender,
) {
    let emit = |kind: LinkEventKind| {
        // the session may already be gone during shutdown
        let _ = events.send(LinkEvent::new(generation, kind));
    };

    let stream = match tokio::time::timeout(connect_timeout, connect_async(url.as_str())).await {
        Ok(Ok((stream, _response))) => stream,
        Ok(Err(e)) => {
            emit(LinkEventKind::Error(e.to_string()));
            return;
        }
        Err(_) => {
            emit(LinkEventKind::Error(format!(
                "connect to {} timed out after {} ms",
                url,
                connect_timeout.as_millis()
            )));
            return;
        }
    };
    emit(LinkEventKind::Open);

    let (mut sink, mut source) = stream.split();
    loop {
        tokio::select! {
            frame = outbound.recv() => match frame {
                Some(frame) => {
                    let len = frame.len();
                    let result = sink.send(Message::Text(frame)).await;
                    buffered.fetch_sub(len, Ordering::SeqCst);
                    if let Err(e) = result {
                        emit(LinkEventKind::Error(e.to_string()));
                        return;
                    }
                }
                None => {
                    debug!("Link {} closed locally", generation);
                    let _ = sink.close().await;
                    return;
                }
            },
            message = source.next() => match message {
                Some(Ok(Message::Text(text))) => emit(LinkEventKind::Message(text)),
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame.map(|f| f.reason.to_string()).unwrap_or_default();
                    emit(LinkEventKind::Closed(reason));
                    return;
                }
                Some(Ok(Message::Binary(data))) => {
                    debug!("Ignoring binary frame ({} bytes)", data.len());
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    emit(LinkEventKind::Error(e.to_string()));
                    return;
                }
                None => {
                    emit(LinkEventKind::Closed("connection ended".to_string()));
                    return;
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<LinkEvent>) -> LinkEvent {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("event within timeout")
            .expect("channel open")
    }

    /// Accepts one client, acks every text frame, and returns what it received.
    async fn ack_server() -> (String, tokio::task::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            let mut received = Vec::new();
            while let Some(Ok(message)) = ws.next().await {
                match message {
                    Message::Text(text) => {
                        received.push(text);
                        ws.send(Message::Text(r#"{"action":"ack"}"#.to_string()))
                            .await
                            .unwrap();
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            received
        });

        (url, handle)
    }

    #[tokio::test]
    async fn test_round_trip_through_real_socket() {
        let (url, server) = ack_server().await;
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut connector = WebSocketConnector::default();

        let mut link = connector.connect(&url, 7, tx);
        assert_eq!(next_event(&mut rx).await, LinkEvent::new(7, LinkEventKind::Open));

        link.send(r#"{"action":"status"}"#.to_string()).unwrap();
        assert_eq!(
            next_event(&mut rx).await,
            LinkEvent::new(7, LinkEventKind::Message(r#"{"action":"ack"}"#.to_string()))
        );
        assert_eq!(link.buffered_amount(), 0);

        link.close();
        let received = tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received, vec![r#"{"action":"status"}"#.to_string()]);
    }

    #[tokio::test]
    async fn test_refused_connection_reports_error() {
        // bind then drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/", listener.local_addr().unwrap());
        drop(listener);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let _link = WebSocketConnector::default().connect(&url, 3, tx);

        let event = next_event(&mut rx).await;
        assert_eq!(event.generation, 3);
        assert!(matches!(event.kind, LinkEventKind::Error(_)));
    }

    #[tokio::test]
    async fn test_stalled_handshake_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/", listener.local_addr().unwrap());
        // accept the TCP connection but never answer the upgrade request
        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
            drop(tcp);
        });

        let (tx, mut rx) = mpsc::unbounded_channel();
        let _link = WebSocketConnector::new(Duration::from_millis(50)).connect(&url, 4, tx);

        let event = next_event(&mut rx).await;
        assert_eq!(event.generation, 4);
        match event.kind {
            LinkEventKind::Error(reason) => assert!(reason.contains("timed out"), "{}", reason),
            other => panic!("expected timeout error, got {:?}", other),
        }
        server.abort();
    }

    #[tokio::test]
    async fn test_send_after_close_is_an_error() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut link = WebSocketConnector::default().connect("ws://127.0.0.1:9/", 1, tx);

        link.close();

        assert!(link.send("{}".to_string()).is_err());
        assert_eq!(link.buffered_amount(), 0);
    }

    #[tokio::test]
    async fn test_server_close_reports_closed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/", listener.local_addr().unwrap());
        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            ws.close(None).await.unwrap();
            while ws.next().await.is_some() {}
        });

        let (tx, mut rx) = mpsc::unbounded_channel();
        let _link = WebSocketConnector::default().connect(&url, 1, tx);

        assert_eq!(next_event(&mut rx).await.kind, LinkEventKind::Open);
        assert!(matches!(next_event(&mut rx).await.kind, LinkEventKind::Closed(_)));
    }
}
