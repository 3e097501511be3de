//! # Session
//!
//! The single long-lived object that owns every piece of mutable state: the
//! enabled-device set (inside the sampler), the binding table, the handler
//! table and the one connection. It is built once per process and driven by
//! [`Session::run`].
//!
//! ## Event Loop
//!
//! `run` is one `tokio::select!` loop over:
//!
//! 1. **Frame tick** - only polled while the sampler is armed, so an idle
//!    sampler costs nothing
//! 2. **Hot-plug tick** - rescans the controller source and recomputes
//!    eligibility when devices come or go
//! 3. **Link events** - open/message/error/close from the current link
//! 4. **Reconnect deadline** - the fixed-delay retry after a close
//! 5. **Operator commands** - enable/disable devices, send control commands
//! 6. **Ctrl+C** - graceful shutdown
//!
//! Each branch runs to completion before the next is polled, so sampler and
//! connection state are never touched re-entrantly.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::binding::BindingRegistry;
use crate::config::Config;
use crate::connection::{
    ConnectionManager, Connector, LinkEvent, LinkOutcome, SendOutcome, WebSocketConnector,
};
use crate::error::Result;
use crate::input::{ControllerSource, InputSampler, RawControllerSnapshot};
use crate::notify::{SharedNotifier, STATUS_UNKNOWN};
use crate::protocol::{Command, Severity};
use crate::router::MessageRouter;

/// Number of frames between status log messages (~10 s at 60 Hz)
const LOG_INTERVAL_FRAMES: u64 = 600;

/// Status text shown once a controller-bridge connection opens
pub const STATUS_CONNECTED: &str = "connected";

/// Which front end the session serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Streams controller state
    Bridge,
    /// Sends script commands and queries status on connect
    Console,
}

/// Operator requests fed into the loop.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    /// Send a control command if connected
    Send(Command),
    /// Add a device to the enabled set
    Enable(String),
    /// Remove a device from the enabled set
    Disable(String),
    /// Report every known controller to the operator
    Devices,
    /// Leave the loop
    Shutdown,
}

/// Per-session counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub frames: u64,
    pub sent: u64,
    pub dropped: u64,
}

/// Long-lived owner of the core state.
pub struct Session {
    role: Role,
    registry: BindingRegistry,
    sampler: InputSampler,
    connection: ConnectionManager,
    router: MessageRouter,
    notifier: SharedNotifier,
    link_events: mpsc::UnboundedReceiver<LinkEvent>,
    frame_period: Duration,
    hotplug_interval: Duration,
    stats: SessionStats,
    last_log_frames: u64,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("role", &self.role)
            .field("connection", &self.connection)
            .field("sampler", &self.sampler)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Session talking WebSocket to the configured endpoint.
    pub fn new(config: &Config, role: Role, notifier: SharedNotifier) -> Self {
        let connector = WebSocketConnector::new(config.connection.connect_timeout());
        Self::with_connector(config, role, Box::new(connector), notifier)
    }

    /// Session over a custom connector.
    pub fn with_connector(
        config: &Config,
        role: Role,
        connector: Box<dyn Connector>,
        notifier: SharedNotifier,
    ) -> Self {
        let (events_tx, link_events) = mpsc::unbounded_channel();
        let connection = ConnectionManager::new(
            config.connection.url(),
            config.connection.reconnect_delay(),
            connector,
            events_tx,
            notifier.clone(),
        );

        Self {
            role,
            registry: config.binding_registry(),
            sampler: InputSampler::new(config.sampler.enabled_devices.iter().cloned()),
            connection,
            router: MessageRouter::with_default_handlers(notifier.clone()),
            notifier,
            link_events,
            frame_period: config.sampler.frame_period(),
            hotplug_interval: config.sampler.hotplug_interval(),
            stats: SessionStats::default(),
            last_log_frames: 0,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn registry(&self) -> &BindingRegistry {
        &self.registry
    }

    pub fn sampler(&self) -> &InputSampler {
        &self.sampler
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    /// Handler table, for front ends that want to add or replace handlers.
    pub fn router_mut(&mut self) -> &mut MessageRouter {
        &mut self.router
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Open the first connection.
    pub fn start(&mut self) {
        self.notifier.connection_status(crate::notify::STATUS_DISCONNECTED);
        self.connection.connect();
    }

    /// Recompute sampler eligibility from the source's current devices.
    pub fn refresh_eligibility<S: ControllerSource>(&mut self, source: &mut S) -> bool {
        let snapshots = source.snapshots();
        self.sampler.recompute(&snapshots, &self.registry)
    }

    /// One frame tick: sample, then try to send.
    pub fn on_frame<S: ControllerSource>(&mut self, source: &mut S) {
        let snapshots = source.snapshots();
        let Some(state) = self.sampler.sample(&snapshots, &self.registry) else {
            return;
        };

        self.stats.frames += 1;
        match self.connection.try_send_state(state) {
            SendOutcome::Sent => self.stats.sent += 1,
            SendOutcome::Backpressure | SendOutcome::NotOpen | SendOutcome::Failed => {
                self.stats.dropped += 1
            }
            SendOutcome::NothingPending => {}
        }

        if self.stats.frames - self.last_log_frames >= LOG_INTERVAL_FRAMES {
            info!(
                "Sampled {} frames, sent {}, superseded {}",
                self.stats.frames, self.stats.sent, self.stats.dropped
            );
            self.last_log_frames = self.stats.frames;
        }
    }

    /// Periodic rescan standing in for connect/disconnect events.
    pub fn on_hotplug<S: ControllerSource>(&mut self, source: &mut S) {
        match source.rescan() {
            Ok(true) => {
                debug!("Controller set changed");
                self.refresh_eligibility(source);
            }
            Ok(false) => {}
            Err(e) => warn!("Controller rescan failed: {}", e),
        }
    }

    /// Apply one link event.
    pub fn on_link_event(&mut self, event: LinkEvent) {
        match self.connection.handle_event(event) {
            LinkOutcome::Opened => match self.role {
                Role::Console => {
                    self.notifier.connection_status(STATUS_UNKNOWN);
                    self.connection.send_command(&Command::Status);
                }
                Role::Bridge => self.notifier.connection_status(STATUS_CONNECTED),
            },
            LinkOutcome::Frame(frame) => {
                self.router.dispatch_frame(&frame);
            }
            LinkOutcome::Closed | LinkOutcome::Stale => {}
        }
    }

    /// Apply one operator command. Returns `false` when the loop should stop.
    pub fn apply<S: ControllerSource>(&mut self, command: SessionCommand, source: &mut S) -> bool {
        match command {
            SessionCommand::Send(command) => {
                if !self.connection.send_command(&command) {
                    debug!("'{}' not sent: not connected", command.action());
                }
            }
            SessionCommand::Enable(device_id) => {
                if self.sampler.enable(device_id.clone()) {
                    info!("Enabled controller '{}'", device_id);
                }
                self.refresh_eligibility(source);
            }
            SessionCommand::Disable(device_id) => {
                if self.sampler.disable(&device_id) {
                    info!("Disabled controller '{}'", device_id);
                }
                self.refresh_eligibility(source);
            }
            SessionCommand::Devices => {
                let snapshots = source.snapshots();
                self.notifier.message(Severity::Info, &self.describe(&snapshots));
            }
            SessionCommand::Shutdown => return false,
        }
        true
    }

    fn describe(&self, snapshots: &[RawControllerSnapshot]) -> String {
        if snapshots.is_empty() {
            return "No controllers found".to_string();
        }
        snapshots
            .iter()
            .map(|s| {
                format!(
                    "connected={} enabled={} bound={} {}",
                    s.connected,
                    self.sampler.is_enabled(&s.id),
                    self.registry.contains(&s.id),
                    s.id
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Run until Ctrl+C, a `Shutdown` command, or the command channel closes.
    pub async fn run<S: ControllerSource>(
        mut self,
        mut source: S,
        mut commands: mpsc::UnboundedReceiver<SessionCommand>,
    ) -> Result<SessionStats> {
        self.start();
        self.refresh_eligibility(&mut source);

        let mut frames = interval(self.frame_period);
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut hotplug = interval(self.hotplug_interval);
        hotplug.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            "Session started ({:?}), frame period {} us",
            self.role,
            self.frame_period.as_micros()
        );

        loop {
            let reconnect_at = self.connection.reconnect_deadline();

            tokio::select! {
                _ = frames.tick(), if self.sampler.is_armed() => {
                    self.on_frame(&mut source);
                }

                _ = hotplug.tick() => {
                    self.on_hotplug(&mut source);
                }

                Some(event) = self.link_events.recv() => {
                    self.on_link_event(event);
                }

                _ = sleep_until(reconnect_at.unwrap_or_else(Instant::now)), if reconnect_at.is_some() => {
                    self.connection.poll_reconnect(Instant::now());
                }

                command = commands.recv() => match command {
                    Some(command) => {
                        if !self.apply(command, &mut source) {
                            info!("Shutdown requested");
                            break;
                        }
                    }
                    None => {
                        info!("Operator input closed, shutting down...");
                        break;
                    }
                },

                _ = tokio::signal::ctrl_c() => {
                    info!("Received Ctrl+C, shutting down...");
                    break;
                }
            }
        }

        self.connection.shutdown();
        info!(
            "Total frames sampled: {}, sent: {}",
            self.stats.frames, self.stats.sent
        );
        Ok(self.stats)
    }
}
