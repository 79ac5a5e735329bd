//! Transient user notifications
//!
//! Failures in background work are not fatal; they end up here as a short
//! notification that a UI can toast and the CLI prints.

use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::error::{GlimpseError, Result};

/// Severity of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

/// A short message for the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub level: NotificationLevel,
}

impl Notification {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        level: NotificationLevel,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            level,
        }
    }

    /// Build an error notification, appending the error's hint if it has one
    pub fn from_error(title: impl Into<String>, err: &GlimpseError) -> Self {
        let description = match err.user_hint() {
            Some(hint) => format!("{} ({})", err, hint),
            None => err.to_string(),
        };
        Self::new(title, description, NotificationLevel::Error)
    }
}

/// Broadcasts notifications to any number of listeners
#[derive(Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notification>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Listen for notifications sent from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    /// Log and broadcast a notification
    pub fn report(&self, notification: Notification) {
        match notification.level {
            NotificationLevel::Info => {
                info!("{}: {}", notification.title, notification.description)
            }
            NotificationLevel::Warning => {
                warn!("{}: {}", notification.title, notification.description)
            }
            NotificationLevel::Error => {
                error!("{}: {}", notification.title, notification.description)
            }
        }
        // No listeners is fine; the log line above is enough
        let _ = self.tx.send(notification);
    }

    /// Report an error under `title`
    pub fn report_error(&self, title: impl Into<String>, err: &GlimpseError) {
        self.report(Notification::from_error(title, err));
    }

    /// Spawn a task whose error or panic becomes a notification
    pub fn spawn_guarded<F>(&self, title: impl Into<String>, task: F) -> JoinHandle<()>
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let title = title.into();
        let notifier = self.clone();
        let inner = tokio::spawn(task);

        tokio::spawn(async move {
            match inner.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => notifier.report_error(title, &e),
                Err(join_err) if join_err.is_panic() => notifier.report(Notification::new(
                    title,
                    "Background task panicked",
                    NotificationLevel::Error,
                )),
                Err(_) => {}
            }
        })
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_zero_capacity_is_clamped() {
        let notifier = Notifier::new(0);
        let mut rx = notifier.subscribe();

        notifier.report(Notification::new("Title", "Body", NotificationLevel::Info));

        assert_eq!(rx.recv().await.unwrap().title, "Title");
    }

    #[tokio::test]
    async fn test_report_reaches_subscriber() {
        let notifier = Notifier::default();
        let mut rx = notifier.subscribe();

        notifier.report(Notification::new("Title", "Body", NotificationLevel::Info));

        let got = rx.recv().await.unwrap();
        assert_eq!(got.title, "Title");
        assert_eq!(got.level, NotificationLevel::Info);
    }

    #[tokio::test]
    async fn test_guarded_error_becomes_notification() {
        let notifier = Notifier::default();
        let mut rx = notifier.subscribe();

        notifier
            .spawn_guarded("Preview failed", async { Err(GlimpseError::ipc("socket gone")) })
            .await
            .unwrap();

        let got = rx.recv().await.unwrap();
        assert_eq!(got.title, "Preview failed");
        assert_eq!(got.level, NotificationLevel::Error);
        assert!(got.description.contains("socket gone"));
        assert!(got.description.contains("capture host is running"));
    }

    #[tokio::test]
    async fn test_guarded_panic_becomes_notification() {
        let notifier = Notifier::default();
        let mut rx = notifier.subscribe();

        notifier
            .spawn_guarded("Watcher", async { panic!("boom") })
            .await
            .unwrap();

        let got = rx.recv().await.unwrap();
        assert!(got.description.contains("panicked"));
    }

    #[tokio::test]
    async fn test_guarded_success_is_silent() {
        let notifier = Notifier::default();
        let mut rx = notifier.subscribe();

        notifier.spawn_guarded("Quiet", async { Ok(()) }).await.unwrap();

        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }
}
