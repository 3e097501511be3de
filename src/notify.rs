//! # Operator Notifications
//!
//! The sinks the core reports into: operator-facing messages and the
//! connection status display. Rendering belongs to whoever implements
//! [`Notifier`].

use std::io::Write;
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

use crate::protocol::Severity;

/// Status text shown while not connected.
pub const STATUS_DISCONNECTED: &str = "disconnected";

/// Status text shown while a status query is outstanding.
pub const STATUS_UNKNOWN: &str = "???";

/// Operator message sink and connection status display.
#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync {
    /// Show a message to the operator.
    fn message(&self, severity: Severity, text: &str);

    /// Replace the connection status display.
    fn connection_status(&self, status: &str);
}

/// Shared notifier handle
pub type SharedNotifier = Arc<dyn Notifier>;

/// Notifier that writes everything to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn message(&self, severity: Severity, text: &str) {
        match severity {
            Severity::Error => error!("{}", text),
            Severity::Warning => warn!("{}", text),
            Severity::Info => info!("{}", text),
        }
    }

    fn connection_status(&self, status: &str) {
        info!("Connection status: {}", status);
    }
}

/// Notifier for the interactive console: prints to a writer (stdout by default).
pub struct ConsoleNotifier {
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleNotifier {
    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self { out: Mutex::new(out) }
    }

    fn line(&self, text: std::fmt::Arguments<'_>) {
        if let Ok(mut out) = self.out.lock() {
            let _ = writeln!(out, "{}", text);
            let _ = out.flush();
        }
    }
}

impl Notifier for ConsoleNotifier {
    fn message(&self, severity: Severity, text: &str) {
        self.line(format_args!("{}: {}", severity, text));
    }

    fn connection_status(&self, status: &str) {
        self.line(format_args!("[status] {}", status));
    }
}

#[cfg(test)]
pub mod mocks {
    use super::*;

    /// Notifier that keeps everything it was told
    #[derive(Default)]
    pub struct RecordingNotifier {
        pub messages: Mutex<Vec<(Severity, String)>>,
        pub statuses: Mutex<Vec<String>>,
    }

    impl RecordingNotifier {
        pub fn messages(&self) -> Vec<(Severity, String)> {
            self.messages.lock().unwrap().clone()
        }

        pub fn statuses(&self) -> Vec<String> {
            self.statuses.lock().unwrap().clone()
        }

        pub fn last_status(&self) -> Option<String> {
            self.statuses.lock().unwrap().last().cloned()
        }
    }

    impl Notifier for RecordingNotifier {
        fn message(&self, severity: Severity, text: &str) {
            self.messages.lock().unwrap().push((severity, text.to_string()));
        }

        fn connection_status(&self, status: &str) {
            self.statuses.lock().unwrap().push(status.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_console_notifier_output() {
        let buf = SharedBuf::default();
        let notifier = ConsoleNotifier::new(Box::new(buf.clone()));

        notifier.message(Severity::Warning, "Script aborted");
        notifier.connection_status(STATUS_DISCONNECTED);

        let text = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert_eq!(text, "warning: Script aborted\n[status] disconnected\n");
    }

    #[test]
    fn test_tracing_notifier_does_not_panic() {
        let notifier = TracingNotifier;
        notifier.message(Severity::Error, "boom");
        notifier.message(Severity::Info, "fine");
        notifier.connection_status("true");
    }
}
