//! # Envelopes
//!
//! [`Envelope`] is the untyped wire unit used for inbound dispatch: the
//! `action` string plus whatever other fields arrived. [`Command`] and
//! [`Notice`] are the typed views of the outbound and inbound actions this
//! crate knows about.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use super::state::ControlState;
use crate::error::Result;

/// Action-tagged wire message.
///
/// # Examples
///
/// ```
/// use pad_bridge::protocol::Envelope;
///
/// let env = Envelope::decode(r#"{"action":"message","severity":"info","message":"hi"}"#)?;
/// assert_eq!(env.action, "message");
/// assert_eq!(env.str_field("message"), Some("hi"));
/// # Ok::<(), pad_bridge::error::PadBridgeError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Dispatch key
    pub action: String,
    /// Every other field of the frame
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Envelope {
    /// Create an envelope with no fields.
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            fields: Map::new(),
        }
    }

    /// Add a field, replacing any previous value under the same key.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Raw field access.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// String field access. Non-string values read as absent.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Parse one frame.
    ///
    /// # Errors
    ///
    /// Returns `Json` if the frame is not an object with a string `action`.
    pub fn decode(frame: &str) -> Result<Self> {
        Ok(serde_json::from_str(frame)?)
    }

    /// Serialize to one frame.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Outbound actions.
///
/// # Examples
///
/// ```
/// use pad_bridge::protocol::Command;
///
/// assert_eq!(Command::AbortScript.encode()?, r#"{"action":"abort-script"}"#);
/// assert_eq!(
///     Command::RunScript { text: "press A".into() }.encode()?,
///     r#"{"action":"run-script","text":"press A"}"#
/// );
/// # Ok::<(), pad_bridge::error::PadBridgeError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Command {
    /// Push one controller sample
    Input { state: ControlState },
    /// Ask for remote status
    Status,
    /// Start a script
    RunScript { text: String },
    /// Stop the running script
    AbortScript,
    /// Restart the remote backend
    Restart,
}

impl Command {
    /// Serialize to one frame.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// The wire action name.
    pub fn action(&self) -> &'static str {
        use super::actions;
        match self {
            Command::Input { .. } => actions::INPUT,
            Command::Status => actions::STATUS,
            Command::RunScript { .. } => actions::RUN_SCRIPT,
            Command::AbortScript => actions::ABORT_SCRIPT,
            Command::Restart => actions::RESTART,
        }
    }
}

/// Operator message severity.
///
/// Unknown severities read as `Info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    #[serde(other)]
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        };
        f.write_str(name)
    }
}

/// Inbound actions.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Notice {
    /// Receipt of a previous frame. Carries nothing.
    Ack,
    /// Log line for the operator
    Message { severity: Severity, message: String },
    /// Reply to a status query; the value is whatever the remote reports
    Status { ok: Value },
}

impl TryFrom<&Envelope> for Notice {
    type Error = crate::error::PadBridgeError;

    fn try_from(envelope: &Envelope) -> Result<Self> {
        let value = serde_json::to_value(envelope)?;
        Ok(serde_json::from_value(value)?)
    }
}
