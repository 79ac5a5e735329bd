//! Playback sinks
//!
//! Where a negotiated preview stream ends up: a video surface in a UI, a
//! frame counter in the CLI, a recorder in tests.

use parking_lot::Mutex;

use crate::endpoint::MediaStream;
use crate::error::Result;

/// Receives the live stream of a preview
pub trait PlaybackSink: Send + Sync {
    /// Bind a stream to this sink, replacing whatever was bound
    fn attach(&self, stream: MediaStream);

    /// Start playing the bound stream
    fn play(&self) -> Result<()>;
}

/// Sink that only remembers the last bound stream
#[derive(Default)]
pub struct StreamSlot {
    stream: Mutex<Option<MediaStream>>,
    playing: Mutex<bool>,
}

impl StreamSlot {
    /// Create an empty slot
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently bound stream
    pub fn stream(&self) -> Option<MediaStream> {
        self.stream.lock().clone()
    }

    /// Whether `play` has been called since the last attach
    pub fn is_playing(&self) -> bool {
        *self.playing.lock()
    }
}

impl PlaybackSink for StreamSlot {
    fn attach(&self, stream: MediaStream) {
        *self.stream.lock() = Some(stream);
        *self.playing.lock() = false;
    }

    fn play(&self) -> Result<()> {
        *self.playing.lock() = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::TrackKind;

    #[test]
    fn test_slot_attach_then_play() {
        let slot = StreamSlot::new();
        assert!(slot.stream().is_none());

        slot.attach(MediaStream::detached("s1", "t1", TrackKind::Video));
        assert!(!slot.is_playing());
        slot.play().unwrap();

        assert!(slot.is_playing());
        assert_eq!(slot.stream().unwrap().id, "s1");
    }
}
