//! User-facing notifications.
//!
//! Workflows never fail loudly: every outcome the user should know about
//! (a document that failed to index, a deleted session, a backend error on
//! an answer) is reported as a short [`Notification`]. Notifications go to
//! **stderr** so stdout stays reserved for answers and listings.

use std::io::Write;
use std::sync::Mutex;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Level {
    Info,
    Error,
}

/// A short, non-blocking message for the user.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Notification {
    pub level: Level,
    pub title: String,
    pub description: String,
}

impl Notification {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            level: Level::Info,
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            title: title.into(),
            description: description.into(),
        }
    }
}

/// Sink for notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Human-friendly lines on stderr: `[error] Upload failed: file_type_not_supported`.
pub struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&self, n: Notification) {
        let tag = match n.level {
            Level::Info => "info",
            Level::Error => "error",
        };
        let line = format!("[{}] {}: {}\n", tag, n.title, n.description);
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// One JSON object per line on stderr.
pub struct JsonNotifier;

impl Notifier for JsonNotifier {
    fn notify(&self, n: Notification) {
        let obj = serde_json::json!({
            "event": "notification",
            "level": match n.level {
                Level::Info => "info",
                Level::Error => "error",
            },
            "title": n.title,
            "description": n.description,
        });
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
        }
    }
}

pub struct NoNotify;

impl Notifier for NoNotify {
    fn notify(&self, _notification: Notification) {}
}

/// Keeps every notification in memory. Used by tests and by callers that
/// want to render notifications themselves.
#[derive(Default)]
pub struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<Notification> {
        match self.seen.lock() {
            Ok(mut seen) => std::mem::take(&mut *seen),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    pub fn errors(&self) -> usize {
        match self.seen.lock() {
            Ok(seen) => seen.iter().filter(|n| n.level == Level::Error).count(),
            Err(_) => 0,
        }
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(notification);
        }
    }
}

/// Notification mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NotifyMode {
    Off,
    Human,
    Json,
}

impl NotifyMode {
    /// Human output when stderr is a TTY, JSON lines otherwise.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            NotifyMode::Human
        } else {
            NotifyMode::Json
        }
    }

    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "off" | "none" => Ok(NotifyMode::Off),
            "human" => Ok(NotifyMode::Human),
            "json" => Ok(NotifyMode::Json),
            other => Err(format!(
                "invalid notify mode '{}': expected human, json or off",
                other
            )),
        }
    }

    pub fn notifier(&self) -> Box<dyn Notifier> {
        match self {
            NotifyMode::Off => Box::new(NoNotify),
            NotifyMode::Human => Box::new(StderrNotifier),
            NotifyMode::Json => Box::new(JsonNotifier),
        }
    }
}
