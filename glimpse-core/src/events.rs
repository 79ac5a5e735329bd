//! Host event subscriptions
//!
//! The capture host periodically pushes the list of discoverable sources and
//! its measured stream frame rate. Listeners get a [`Subscription`] handle;
//! dropping it always unsubscribes.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use serde::{Deserialize, Serialize};

use crate::types::CaptureSource;

/// Buffered events per subscriber before the forwarder applies backpressure
const SUBSCRIPTION_BUFFER: usize = 32;

/// Events emitted by the capture host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload")]
pub enum HostEvent {
    /// Periodic list of discoverable sources
    #[serde(rename = "share-screen-list")]
    SourcesUpdate {
        sources: Vec<CaptureSource>,
        fps: i32,
    },
    /// Measured frame rate of the host's enumeration stream
    #[serde(rename = "debug-stream-fps")]
    StreamFps(u32),
}

/// Handle to a stream of events
///
/// Unsubscribes when dropped, including the background forwarder if any.
pub struct Subscription<T> {
    rx: mpsc::Receiver<T>,
    task: Option<JoinHandle<()>>,
}

impl<T> Subscription<T> {
    /// Wrap a receiver fed by a background task owned by this handle
    pub fn new(rx: mpsc::Receiver<T>, task: JoinHandle<()>) -> Self {
        Self {
            rx,
            task: Some(task),
        }
    }

    /// Wrap a plain receiver
    pub fn from_receiver(rx: mpsc::Receiver<T>) -> Self {
        Self { rx, task: None }
    }

    /// Wait for the next event; `None` once the source is gone
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Explicitly end the subscription
    pub fn unsubscribe(self) {}
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.rx.close();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// In-process fan-out of host events
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<HostEvent>,
}

impl EventBus {
    /// Create a bus retaining up to `capacity` events per slow subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event; returns how many subscribers saw it
    pub fn publish(&self, event: HostEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> Subscription<HostEvent> {
        let mut source = self.tx.subscribe();
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);

        let task = tokio::spawn(async move {
            loop {
                match source.recv().await {
                    Ok(event) => {
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Event subscriber lagged by {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Subscription::new(rx, task)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

/// Tracks the most recent `debug-stream-fps` value
pub struct FpsMonitor {
    fps: Arc<AtomicU32>,
    task: JoinHandle<()>,
}

impl FpsMonitor {
    /// Consume a subscription in the background
    pub fn spawn(mut subscription: Subscription<HostEvent>) -> Self {
        let fps = Arc::new(AtomicU32::new(0));
        let shared = fps.clone();

        let task = tokio::spawn(async move {
            while let Some(event) = subscription.recv().await {
                match event {
                    HostEvent::StreamFps(value) => {
                        debug!("FPS: {}", value);
                        shared.store(value, Ordering::Relaxed);
                    }
                    HostEvent::SourcesUpdate { sources, fps } => {
                        debug!("Host reported {} sources at {} fps", sources.len(), fps);
                    }
                }
            }
        });

        Self { fps, task }
    }

    /// Last reported frame rate (0 until the first report)
    pub fn fps(&self) -> u32 {
        self.fps.load(Ordering::Relaxed)
    }
}

impl Drop for FpsMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_bus_delivers_to_subscriber() {
        let bus = EventBus::default();
        let mut sub = bus.subscribe();

        bus.publish(HostEvent::StreamFps(24));
        assert_eq!(sub.recv().await, Some(HostEvent::StreamFps(24)));
    }

    #[tokio::test]
    async fn test_drop_unsubscribes() {
        let bus = EventBus::default();
        let sub = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        drop(sub);
        // The aborted forwarder releases its broadcast receiver asynchronously
        for _ in 0..50 {
            if bus.subscriber_count() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_fps_monitor_tracks_latest() {
        let bus = EventBus::default();
        let monitor = FpsMonitor::spawn(bus.subscribe());

        bus.publish(HostEvent::StreamFps(15));
        bus.publish(HostEvent::StreamFps(30));

        for _ in 0..50 {
            if monitor.fps() == 30 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(monitor.fps(), 30);
    }

    #[test]
    fn test_event_wire_format() {
        let json = serde_json::to_string(&HostEvent::StreamFps(12)).unwrap();
        assert_eq!(json, r#"{"event":"debug-stream-fps","payload":12}"#);
    }
}
