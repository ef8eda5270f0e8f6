//! User-facing run notifications.

use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

/// Something the user should hear about once per run (or once per file)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// The source directory held no matching documents
    NoInputFiles,
    /// At least one image file or PDF was written
    Completed,
    /// Documents were processed but nothing was written
    NothingProduced,
    /// The run stopped on an unrecoverable error
    Fatal { message: String },
    DeletionFailed { path: PathBuf, message: String },
    /// An unreadable document was passed over
    DocumentSkipped { path: PathBuf, message: String },
}

impl Notification {
    /// Shown even when messages are suppressed
    pub fn is_mandatory(&self) -> bool {
        matches!(self, Notification::NoInputFiles)
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notification::NoInputFiles => write!(f, "No FDF files found in source directory"),
            Notification::Completed => write!(f, "Extracted successfully!"),
            Notification::NothingProduced => write!(f, "No processable images found"),
            Notification::Fatal { message } => write!(f, "Critical error: {}", message),
            Notification::DeletionFailed { path, message } => {
                write!(f, "Error deleting {}: {}", path.display(), message)
            }
            Notification::DocumentSkipped { path, message } => {
                write!(f, "Skipped {}: {}", path.display(), message)
            }
        }
    }
}

/// Receives run notifications
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes notifications as lines to a terminal stream
pub struct ConsoleNotifier<W> {
    out: Mutex<W>,
    suppress_messages: bool,
}

impl ConsoleNotifier<std::io::Stdout> {
    pub fn stdout(suppress_messages: bool) -> Self {
        Self::new(std::io::stdout(), suppress_messages)
    }
}

impl<W: Write + Send> ConsoleNotifier<W> {
    pub fn new(out: W, suppress_messages: bool) -> Self {
        Self {
            out: Mutex::new(out),
            suppress_messages,
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<W: Write + Send> Notifier for ConsoleNotifier<W> {
    fn notify(&self, notification: Notification) {
        if self.suppress_messages && !notification.is_mandatory() {
            return;
        }
        let mut out = self.out.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        // Nowhere left to report a broken terminal
        let _ = writeln!(out, "{}", notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn printed(suppress: bool, notifications: Vec<Notification>) -> String {
        let notifier = ConsoleNotifier::new(Vec::new(), suppress);
        for notification in notifications {
            notifier.notify(notification);
        }
        String::from_utf8(notifier.into_inner()).unwrap()
    }

    #[test]
    fn test_messages_are_printed() {
        let out = printed(
            false,
            vec![
                Notification::Completed,
                Notification::DeletionFailed {
                    path: PathBuf::from("/in/a.fdf"),
                    message: "denied".to_string(),
                },
            ],
        );
        assert_eq!(
            out,
            "Extracted successfully!\nError deleting /in/a.fdf: denied\n"
        );
    }

    #[test]
    fn test_suppression_keeps_only_missing_input_notice() {
        let out = printed(
            true,
            vec![
                Notification::Completed,
                Notification::Fatal {
                    message: "boom".to_string(),
                },
                Notification::NoInputFiles,
            ],
        );
        assert_eq!(out, "No FDF files found in source directory\n");
    }
}
