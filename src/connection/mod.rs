//! # Connection Module
//!
//! Owns the single logical connection to the remote endpoint.
//!
//! This module handles:
//! - The `CONNECTING → OPEN → CLOSED → (delay) → CONNECTING` state machine
//! - Fixed-delay reconnect with no backoff growth and no retry cap
//! - Outbound backpressure: only the newest controller state is kept, and it
//!   is only written while the link has nothing buffered
//! - Fire-and-forget control commands while open
//!
//! Link I/O happens elsewhere (see [`websocket`]); the manager only sees
//! [`LinkEvent`]s tagged with the generation of the link that produced them.
//! Every new attempt bumps the generation, so events from a replaced link
//! are ignored and two reconnect chains never coexist.

pub mod websocket;

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::notify::{SharedNotifier, STATUS_DISCONNECTED};
use crate::protocol::{Command, ControlState, Severity};

pub use websocket::WebSocketConnector;

/// Default delay between a close and the next attempt
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(3000);

/// Identifies one connection attempt.
pub type Generation = u64;

/// Connection lifecycle state. Exactly one holds at any instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

/// What a link reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEventKind {
    /// Handshake finished
    Open,
    /// One inbound text frame
    Message(String),
    /// Transport failure
    Error(String),
    /// Remote or local close
    Closed(String),
}

/// Generation-tagged link event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkEvent {
    pub generation: Generation,
    pub kind: LinkEventKind,
}

impl LinkEvent {
    pub fn new(generation: Generation, kind: LinkEventKind) -> Self {
        Self { generation, kind }
    }
}

/// Channel links report into
pub type LinkEventSender = mpsc::UnboundedSender<LinkEvent>;

/// One live connection attempt.
pub trait Link: Send {
    /// Queue one text frame for writing.
    fn send(&mut self, frame: String) -> Result<()>;

    /// Bytes queued but not yet flushed to the network.
    fn buffered_amount(&self) -> usize;

    /// Start closing. Further events from this link may still arrive.
    fn close(&mut self);
}

/// Factory for links.
pub trait Connector: Send {
    /// Begin connecting to `url`. Must return immediately; the outcome is
    /// reported on `events` under `generation`.
    fn connect(&mut self, url: &str, generation: Generation, events: LinkEventSender) -> Box<dyn Link>;
}

/// What [`ConnectionManager::handle_event`] did with an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    /// Event from a replaced or already closed link
    Stale,
    /// The connection is now open
    Opened,
    /// An inbound frame for the router
    Frame(String),
    /// The connection closed and a reconnect is scheduled
    Closed,
}

/// Result of trying to flush the pending controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The pending state was written and the slot cleared
    Sent,
    /// Nothing pending
    NothingPending,
    /// Not open; the state stays pending until superseded
    NotOpen,
    /// The link still has buffered data; the state stays pending until superseded
    Backpressure,
    /// The write failed and the connection was torn down
    Failed,
}

/// Single-connection owner with reconnect and backpressure.
pub struct ConnectionManager {
    url: String,
    reconnect_delay: Duration,
    connector: Box<dyn Connector>,
    events: LinkEventSender,
    notifier: SharedNotifier,
    state: ConnectionState,
    generation: Generation,
    link: Option<Box<dyn Link>>,
    pending: Option<ControlState>,
    reconnect_at: Option<Instant>,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("url", &self.url)
            .field("state", &self.state)
            .field("generation", &self.generation)
            .field("pending", &self.pending.is_some())
            .field("reconnect_at", &self.reconnect_at)
            .finish_non_exhaustive()
    }
}

impl ConnectionManager {
    /// Create a closed manager. Nothing happens until [`connect`](Self::connect).
    pub fn new(
        url: impl Into<String>,
        reconnect_delay: Duration,
        connector: Box<dyn Connector>,
        events: LinkEventSender,
        notifier: SharedNotifier,
    ) -> Self {
        Self {
            url: url.into(),
            reconnect_delay,
            connector,
            events,
            notifier,
            state: ConnectionState::Closed,
            generation: 0,
            link: None,
            pending: None,
            reconnect_at: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    /// Generation of the current (or most recent) attempt.
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// When the next reconnect attempt is due, if one is scheduled.
    pub fn reconnect_deadline(&self) -> Option<Instant> {
        self.reconnect_at
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Start a fresh attempt, replacing any previous link and cancelling
    /// any scheduled reconnect.
    pub fn connect(&mut self) {
        self.reconnect_at = None;
        if let Some(mut old) = self.link.take() {
            old.close();
        }

        self.generation += 1;
        self.state = ConnectionState::Connecting;
        info!("Connecting to {} (attempt {})", self.url, self.generation);
        self.link = Some(
            self.connector
                .connect(&self.url, self.generation, self.events.clone()),
        );
    }

    /// Run a scheduled reconnect if it is due. Returns whether one started.
    pub fn poll_reconnect(&mut self, now: Instant) -> bool {
        match self.reconnect_at {
            Some(due) if due <= now => {
                self.connect();
                true
            }
            _ => false,
        }
    }

    /// Apply one link event.
    pub fn handle_event(&mut self, event: LinkEvent) -> LinkOutcome {
        if event.generation != self.generation || self.state == ConnectionState::Closed {
            debug!(
                "Ignoring event from stale link {} (current {})",
                event.generation, self.generation
            );
            return LinkOutcome::Stale;
        }

        match event.kind {
            LinkEventKind::Open => {
                if self.state == ConnectionState::Open {
                    return LinkOutcome::Stale;
                }
                self.state = ConnectionState::Open;
                info!("Connected to {}", self.url);
                LinkOutcome::Opened
            }
            LinkEventKind::Message(frame) => {
                debug!("Received frame ({} bytes)", frame.len());
                LinkOutcome::Frame(frame)
            }
            LinkEventKind::Error(reason) => {
                warn!("WebSocket error: {}", reason);
                self.notifier
                    .message(Severity::Warning, &format!("WebSocket error: {}", reason));
                self.teardown();
                LinkOutcome::Closed
            }
            LinkEventKind::Closed(reason) => {
                warn!("WebSocket closed: {}", reason);
                self.notifier
                    .message(Severity::Warning, &format!("WebSocket closed: {}", reason));
                self.teardown();
                LinkOutcome::Closed
            }
        }
    }

    /// Replace the pending controller state. An unsent older state is dropped.
    pub fn offer_state(&mut self, state: ControlState) {
        if let Some(previous) = self.pending.replace(state) {
            debug!("Dropped superseded state serial={}", previous.serial);
        }
    }

    /// Write the pending controller state if the link can take it right now.
    pub fn flush_state(&mut self) -> SendOutcome {
        if self.pending.is_none() {
            return SendOutcome::NothingPending;
        }
        if self.state != ConnectionState::Open {
            return SendOutcome::NotOpen;
        }
        let Some(link) = self.link.as_mut() else {
            return SendOutcome::NotOpen;
        };
        if link.buffered_amount() > 0 {
            return SendOutcome::Backpressure;
        }

        let Some(state) = self.pending.take() else {
            return SendOutcome::NothingPending;
        };
        let serial = state.serial;
        let frame = match (Command::Input { state }).encode() {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Failed to encode controller state: {}", e);
                return SendOutcome::Failed;
            }
        };

        match link.send(frame) {
            Ok(()) => {
                debug!("Sent state serial={}", serial);
                SendOutcome::Sent
            }
            Err(e) => {
                self.send_failed(e);
                SendOutcome::Failed
            }
        }
    }

    /// Offer a state and flush it in one step.
    pub fn try_send_state(&mut self, state: ControlState) -> SendOutcome {
        self.offer_state(state);
        self.flush_state()
    }

    /// Send a control command. A silent no-op unless open.
    ///
    /// Returns whether the frame was handed to the link.
    pub fn send_command(&mut self, command: &Command) -> bool {
        if self.state != ConnectionState::Open {
            debug!("Not connected, dropping '{}'", command.action());
            return false;
        }
        let Some(link) = self.link.as_mut() else {
            return false;
        };

        let frame = match command.encode() {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Failed to encode '{}': {}", command.action(), e);
                return false;
            }
        };
        match link.send(frame) {
            Ok(()) => {
                debug!("Sent '{}'", command.action());
                true
            }
            Err(e) => {
                self.send_failed(e);
                false
            }
        }
    }

    /// Close for good: no reconnect is scheduled.
    pub fn shutdown(&mut self) {
        self.reconnect_at = None;
        if let Some(mut link) = self.link.take() {
            link.close();
        }
        self.state = ConnectionState::Closed;
        info!("Connection to {} shut down", self.url);
    }

    fn send_failed(&mut self, error: crate::error::PadBridgeError) {
        warn!("WebSocket error: {}", error);
        self.notifier
            .message(Severity::Warning, &format!("WebSocket error: {}", error));
        self.teardown();
    }

    fn teardown(&mut self) {
        if let Some(mut link) = self.link.take() {
            link.close();
        }
        self.state = ConnectionState::Closed;
        self.notifier.connection_status(STATUS_DISCONNECTED);

        let due = Instant::now() + self.reconnect_delay;
        self.reconnect_at = Some(due);
        info!("Reconnecting in {} ms", self.reconnect_delay.as_millis());
    }
}
