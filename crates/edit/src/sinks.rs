#![forbid(unsafe_code)]

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Success,
    Error,
}

/// Fire-and-forget user notification (toast, status line, stderr...).
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str, severity: Severity);
}

/// Replaces the current location.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Notify { message: String, severity: Severity },
    Navigate(String),
}

/// Records notifications and navigations in one ordered log.
#[derive(Debug, Default)]
pub struct SinkLog {
    events: Mutex<Vec<SinkEvent>>,
}

impl SinkLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().map(|v| v.clone()).unwrap_or_default()
    }

    fn push(&self, ev: SinkEvent) {
        if let Ok(mut v) = self.events.lock() {
            v.push(ev);
        }
    }
}

impl Notifier for SinkLog {
    fn notify(&self, message: &str, severity: Severity) {
        self.push(SinkEvent::Notify { message: message.to_string(), severity });
    }
}

impl Navigator for SinkLog {
    fn navigate(&self, path: &str) {
        self.push(SinkEvent::Navigate(path.to_string()));
    }
}
