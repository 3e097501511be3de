//! # Control Protocol
//!
//! The message vocabulary shared by the controller bridge and the script
//! console. Every frame on the connection is one JSON object carrying an
//! `action` string plus action-specific fields:
//!
//! | action | direction | fields |
//! |--------|-----------|--------|
//! | `input` | out | `state` |
//! | `status` | out | - |
//! | `run-script` | out | `text` |
//! | `abort-script` | out | - |
//! | `restart` | out | - |
//! | `ack` | in | - |
//! | `message` | in | `severity`, `message` |
//! | `status` | in | `ok` |
//!
//! There is no schema version; the action string is the only dispatch key.

pub mod envelope;
pub mod state;

pub use envelope::{Command, Envelope, Notice, Severity};
pub use state::ControlState;

/// Port the remote endpoint listens on.
pub const DEFAULT_PORT: u16 = 6789;

/// Host used when none is configured.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Action names for semantic access.
pub mod actions {
    /// Controller state push (out)
    pub const INPUT: &str = "input";
    /// Status query (out) and status reply (in)
    pub const STATUS: &str = "status";
    /// Start a script on the remote (out)
    pub const RUN_SCRIPT: &str = "run-script";
    /// Stop the running script (out)
    pub const ABORT_SCRIPT: &str = "abort-script";
    /// Restart the remote backend (out)
    pub const RESTART: &str = "restart";
    /// Acknowledgement (in), ignored
    pub const ACK: &str = "ack";
    /// Operator-facing log line (in)
    pub const MESSAGE: &str = "message";
}

/// Build the endpoint URL for a host.
///
/// # Examples
///
/// ```
/// use pad_bridge::protocol::endpoint_url;
///
/// assert_eq!(endpoint_url("10.0.0.2", 6789, false), "ws://10.0.0.2:6789/");
/// assert_eq!(endpoint_url("", 6789, true), "wss://127.0.0.1:6789/");
/// ```
pub fn endpoint_url(host: &str, port: u16, secure: bool) -> String {
    let scheme = if secure { "wss" } else { "ws" };
    let host = if host.is_empty() { DEFAULT_HOST } else { host };
    format!("{}://{}:{}/", scheme, host, port)
}
