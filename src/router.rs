//! # Message Router
//!
//! Dispatches inbound envelopes to per-action handlers. One handler per
//! action; registering again replaces the previous handler.
//!
//! Handlers run synchronously inside the inbound message's turn and must not
//! block. An envelope whose action has no handler is reported through the
//! notifier as an unhandled message and processing continues.
//!
//! ## Usage
//!
//! ```
//! use std::sync::Arc;
//! use pad_bridge::notify::TracingNotifier;
//! use pad_bridge::router::{Dispatch, MessageRouter};
//!
//! let mut router = MessageRouter::new(Arc::new(TracingNotifier));
//! router.register("ack", |_| {});
//!
//! assert_eq!(router.dispatch_frame(r#"{"action":"ack"}"#), Dispatch::Handled);
//! assert_eq!(router.dispatch_frame(r#"{"action":"nope"}"#), Dispatch::Unhandled);
//! ```

use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::notify::SharedNotifier;
use crate::protocol::{actions, Envelope, Notice, Severity};

/// Inbound envelope handler
pub type Handler = Box<dyn FnMut(&Envelope) + Send>;

/// Outcome of one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// A handler ran
    Handled,
    /// Malformed frame or no handler; the diagnostic has been raised
    Unhandled,
}

/// Action name → handler table.
pub struct MessageRouter {
    handlers: HashMap<String, Handler>,
    notifier: SharedNotifier,
}

impl std::fmt::Debug for MessageRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut actions: Vec<&String> = self.handlers.keys().collect();
        actions.sort();
        f.debug_struct("MessageRouter")
            .field("actions", &actions)
            .finish_non_exhaustive()
    }
}

impl MessageRouter {
    /// Router with no handlers.
    pub fn new(notifier: SharedNotifier) -> Self {
        Self {
            handlers: HashMap::new(),
            notifier,
        }
    }

    /// Router with the standard inbound handlers:
    ///
    /// - `ack` is ignored
    /// - `message` goes to the operator with its severity
    /// - `status` replaces the connection status display with `ok`
    pub fn with_default_handlers(notifier: SharedNotifier) -> Self {
        let mut router = Self::new(notifier.clone());

        router.register(actions::ACK, |_| {});

        let sink = notifier.clone();
        router.register(actions::MESSAGE, move |envelope| match Notice::try_from(envelope) {
            Ok(Notice::Message { severity, message }) => sink.message(severity, &message),
            _ => {
                warn!("Malformed message envelope: {:?}", envelope);
                sink.message(Severity::Error, "Malformed message from remote");
            }
        });

        let sink = notifier;
        router.register(actions::STATUS, move |envelope| {
            let text = match envelope.field("ok") {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => "undefined".to_string(),
            };
            sink.connection_status(&text);
        });

        router
    }

    /// Install `handler` for `action`. Returns `true` if it replaced one.
    pub fn register<F>(&mut self, action: impl Into<String>, handler: F) -> bool
    where
        F: FnMut(&Envelope) + Send + 'static,
    {
        self.handlers.insert(action.into(), Box::new(handler)).is_some()
    }

    pub fn has_handler(&self, action: &str) -> bool {
        self.handlers.contains_key(action)
    }

    /// Run the handler for `envelope.action`.
    pub fn dispatch(&mut self, envelope: &Envelope) -> Dispatch {
        match self.handlers.get_mut(&envelope.action) {
            Some(handler) => {
                debug!("Dispatching '{}'", envelope.action);
                handler(envelope);
                Dispatch::Handled
            }
            None => {
                let raw = envelope
                    .encode()
                    .unwrap_or_else(|_| format!("{:?}", envelope));
                self.unhandled(&raw);
                Dispatch::Unhandled
            }
        }
    }

    /// Parse one raw frame and dispatch it.
    pub fn dispatch_frame(&mut self, frame: &str) -> Dispatch {
        match Envelope::decode(frame) {
            Ok(envelope) => {
                if self.has_handler(&envelope.action) {
                    self.dispatch(&envelope)
                } else {
                    self.unhandled(frame);
                    Dispatch::Unhandled
                }
            }
            Err(e) => {
                debug!("Frame did not parse as an envelope: {}", e);
                self.unhandled(frame);
                Dispatch::Unhandled
            }
        }
    }

    fn unhandled(&self, raw: &str) {
        warn!("Unhandled message: {}", raw);
        self.notifier
            .message(Severity::Error, &format!("Unhandled message:\n{}", raw));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::mocks::RecordingNotifier;
    use crate::notify::MockNotifier;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn unhandled_expectation() -> MockNotifier {
        let mut mock = MockNotifier::new();
        mock.expect_message()
            .withf(|severity, text| *severity == Severity::Error && text.starts_with("Unhandled message:\n"))
            .times(1)
            .return_const(());
        mock
    }

    #[test]
    fn test_unknown_action_reports_unhandled() {
        let mut router = MessageRouter::new(Arc::new(unhandled_expectation()));

        let outcome = router.dispatch(&Envelope::new("teleport"));

        assert_eq!(outcome, Dispatch::Unhandled);
    }

    #[test]
    fn test_malformed_frame_reports_unhandled() {
        let mut router = MessageRouter::new(Arc::new(unhandled_expectation()));

        assert_eq!(router.dispatch_frame("{not json"), Dispatch::Unhandled);
    }

    #[test]
    fn test_frame_without_action_reports_unhandled() {
        let notifier = Arc::new(RecordingNotifier::default());
        let mut router = MessageRouter::with_default_handlers(notifier.clone());

        assert_eq!(router.dispatch_frame(r#"{"ok":true}"#), Dispatch::Unhandled);

        let messages = notifier.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].1, "Unhandled message:\n{\"ok\":true}");
    }

    #[test]
    fn test_last_registered_wins() {
        let mut router = MessageRouter::new(Arc::new(MockNotifier::new()));
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let counter = first.clone();
        assert!(!router.register("ping", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        let counter = second.clone();
        assert!(router.register("ping", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        assert_eq!(router.dispatch(&Envelope::new("ping")), Dispatch::Handled);
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handler_receives_envelope_fields() {
        let mut router = MessageRouter::new(Arc::new(MockNotifier::new()));
        let seen = Arc::new(std::sync::Mutex::new(None));

        let slot = seen.clone();
        router.register("echo", move |env| {
            *slot.lock().unwrap() = env.str_field("text").map(str::to_string);
        });
        router.dispatch_frame(r#"{"action":"echo","text":"hello"}"#);

        assert_eq!(seen.lock().unwrap().as_deref(), Some("hello"));
    }

    #[test]
    fn test_default_ack_is_silent() {
        let notifier = Arc::new(RecordingNotifier::default());
        let mut router = MessageRouter::with_default_handlers(notifier.clone());

        assert_eq!(router.dispatch_frame(r#"{"action":"ack"}"#), Dispatch::Handled);
        assert!(notifier.messages().is_empty());
        assert!(notifier.statuses().is_empty());
    }

    #[test]
    fn test_default_message_forwards_severity() {
        let mut mock = MockNotifier::new();
        mock.expect_message()
            .withf(|severity, text| *severity == Severity::Info && text == "script started")
            .times(1)
            .return_const(());
        let mut router = MessageRouter::with_default_handlers(Arc::new(mock));

        let outcome =
            router.dispatch_frame(r#"{"action":"message","severity":"info","message":"script started"}"#);
        assert_eq!(outcome, Dispatch::Handled);
    }

    #[test]
    fn test_default_status_updates_display() {
        let notifier = Arc::new(RecordingNotifier::default());
        let mut router = MessageRouter::with_default_handlers(notifier.clone());

        router.dispatch_frame(r#"{"action":"status","ok":true}"#);
        router.dispatch_frame(r#"{"action":"status","ok":"busy"}"#);

        assert_eq!(notifier.statuses(), vec!["true".to_string(), "busy".to_string()]);
    }

    #[test]
    fn test_malformed_message_is_reported_not_fatal() {
        let notifier = Arc::new(RecordingNotifier::default());
        let mut router = MessageRouter::with_default_handlers(notifier.clone());

        assert_eq!(router.dispatch_frame(r#"{"action":"message"}"#), Dispatch::Handled);
        assert_eq!(notifier.messages()[0].0, Severity::Error);
    }
}
