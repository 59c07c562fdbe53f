//! Provider events.
//!
//! Plugins publish [`CoreEvent`]s on an [`EventBus`]; hosts subscribe to
//! drive UI state such as "connect your account" prompts and scan progress.
//! The bus is a `tokio::sync::broadcast` channel, so every subscriber sees
//! every event emitted after it subscribed. A subscriber that falls more
//! than the channel capacity behind gets `RecvError::Lagged` and keeps going.
//!
//! ```rust
//! use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
//!
//! let bus = EventBus::new(16);
//! let mut rx = bus.subscribe();
//!
//! bus.emit(CoreEvent::Auth(AuthEvent::AuthenticationRequired {
//!     provider: "Dropbox".to_string(),
//! }))
//! .ok();
//!
//! assert!(rx.try_recv().is_ok());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Channel capacity used by [`EventBus::default`].
///
/// A scan emits one `TrackDiscovered` and one `TagsRead` per file.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 256;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    Auth(AuthEvent),
    Library(LibraryEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum AuthEvent {
    /// No stored credentials; the host should start the authorization flow.
    AuthenticationRequired { provider: String },
    /// Tokens were obtained and persisted.
    Connected {
        provider: String,
        account_name: String,
    },
}

/// Progress of a remote directory walk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum LibraryEvent {
    ScanStarted {
        /// Shared by every event of one walk
        scan_id: String,
        provider: String,
        root: String,
    },
    /// Playable file found and its streaming URL resolved
    TrackDiscovered {
        path: String,
        mime_type: String,
        size: u64,
    },
    TagsRead {
        path: String,
        title: Option<String>,
        artist: Option<String>,
        album: Option<String>,
    },
    /// One step of the walk failed; the rest of the tree is still visited.
    ScanStepFailed {
        path: String,
        stage: ScanStage,
        message: String,
    },
    ScanCompleted {
        scan_id: String,
        directories: u64,
        tracks: u64,
        /// Entries with an unsupported MIME type
        skipped: u64,
        failures: u64,
    },
}

impl LibraryEvent {
    /// Remote path the event is about, if it concerns a single entry
    pub fn path(&self) -> Option<&str> {
        match self {
            LibraryEvent::TrackDiscovered { path, .. }
            | LibraryEvent::TagsRead { path, .. }
            | LibraryEvent::ScanStepFailed { path, .. } => Some(path),
            LibraryEvent::ScanStarted { .. } | LibraryEvent::ScanCompleted { .. } => None,
        }
    }
}

/// Step of a directory walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanStage {
    /// Listing a directory
    Listing,
    /// Resolving a file's streaming URL
    ContentUrl,
    /// Reading embedded tags
    Tags,
}

/// Cloneable handle to one broadcast channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// `capacity` must be non-zero.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Fails only when nobody is subscribed; publishers ignore that with `.ok()`.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connected() -> CoreEvent {
        CoreEvent::Auth(AuthEvent::Connected {
            provider: "Dropbox".to_string(),
            account_name: "Jane".to_string(),
        })
    }

    fn discovered(path: &str) -> CoreEvent {
        CoreEvent::Library(LibraryEvent::TrackDiscovered {
            path: path.to_string(),
            mime_type: "audio/mpeg".to_string(),
            size: 100,
        })
    }

    #[test]
    fn test_emit_without_subscribers_is_err() {
        let bus = EventBus::new(4);
        assert_eq!(bus.subscriber_count(), 0);
        assert!(bus.emit(connected()).is_err());
    }

    #[tokio::test]
    async fn test_every_subscriber_gets_the_event() {
        let bus = EventBus::default();
        let mut first = bus.subscribe();
        let mut second = bus.clone().subscribe();

        assert_eq!(bus.emit(connected()).unwrap(), 2);
        assert_eq!(first.recv().await.unwrap(), connected());
        assert_eq!(second.recv().await.unwrap(), connected());
    }

    #[tokio::test]
    async fn test_late_subscriber_misses_earlier_events() {
        let bus = EventBus::new(4);
        let _early = bus.subscribe();
        bus.emit(discovered("/a.mp3")).ok();

        let mut late = bus.subscribe();
        bus.emit(connected()).ok();
        assert_eq!(late.recv().await.unwrap(), connected());
    }

    #[tokio::test]
    async fn test_slow_subscriber_lags() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe();

        for i in 0..5 {
            bus.emit(discovered(&format!("/{}.mp3", i))).ok();
        }

        assert!(matches!(rx.recv().await, Err(RecvError::Lagged(3))));
        assert_eq!(rx.recv().await.unwrap(), discovered("/3.mp3"));
    }

    #[tokio::test]
    async fn test_concurrent_publishers() {
        let bus = EventBus::new(64);
        let mut rx = bus.subscribe();

        let handles: Vec<_> = ["one", "two"]
            .into_iter()
            .map(|dir| {
                let bus = bus.clone();
                tokio::spawn(async move {
                    for i in 0..10 {
                        bus.emit(discovered(&format!("/{}/{}.ogg", dir, i))).ok();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let mut count = 0;
        while rx.try_recv().is_ok() {
            count += 1;
        }
        assert_eq!(count, 20);
    }

    #[test]
    fn test_library_event_path() {
        let failed = LibraryEvent::ScanStepFailed {
            path: "/Music".to_string(),
            stage: ScanStage::Listing,
            message: "HTTP 500".to_string(),
        };
        assert_eq!(failed.path(), Some("/Music"));

        let started = LibraryEvent::ScanStarted {
            scan_id: "scan-1".to_string(),
            provider: "Dropbox".to_string(),
            root: "/".to_string(),
        };
        assert_eq!(started.path(), None);
    }

    #[test]
    fn test_step_failure_serializes_stage() {
        let event = CoreEvent::Library(LibraryEvent::ScanStepFailed {
            path: "/b.mp3".to_string(),
            stage: ScanStage::ContentUrl,
            message: "HTTP 404".to_string(),
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"ScanStepFailed\""));
        assert!(json.contains("\"stage\":\"ContentUrl\""));
    }

    #[test]
    fn test_event_serialization() {
        let event = CoreEvent::Library(LibraryEvent::TagsRead {
            path: "/Music/a.ogg".to_string(),
            title: Some("Song".to_string()),
            artist: None,
            album: Some("Album".to_string()),
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"Library\""));
        assert!(json.contains("\"event\":\"TagsRead\""));

        let back: CoreEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
