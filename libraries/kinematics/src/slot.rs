//! Latest-frame hand-off between an acquisition thread and the resolver.
//!
//! The producer only ever overwrites the newest frame; the consumer picks up
//! whatever is newest when it is ready. Frames the consumer never saw are
//! counted, not queued.

use std::sync::{Arc, PoisonError, RwLock};

use crate::frame::Frame;

#[derive(Debug, Default)]
struct Slot {
    sequence: u64,
    frame: Option<Frame>,
    closed: bool,
}

/// Create a connected writer/reader pair
pub fn frame_slot() -> (FrameWriter, FrameReader) {
    let shared = Arc::new(RwLock::new(Slot::default()));
    (
        FrameWriter {
            shared: shared.clone(),
        },
        FrameReader {
            shared,
            last_seen: 0,
            missed: 0,
        },
    )
}

/// Single producer side of the slot. Dropping it closes the slot.
#[derive(Debug)]
pub struct FrameWriter {
    shared: Arc<RwLock<Slot>>,
}

impl FrameWriter {
    /// Replace the newest frame; returns its sequence number (starting at 1)
    pub fn publish(&mut self, frame: Frame) -> u64 {
        let mut slot = self.shared.write().unwrap_or_else(PoisonError::into_inner);
        slot.sequence += 1;
        slot.frame = Some(frame);
        slot.sequence
    }

    /// Signal that no more frames will be published
    pub fn close(self) {
        // Drop does the work
    }
}

impl Drop for FrameWriter {
    fn drop(&mut self) {
        let mut slot = self.shared.write().unwrap_or_else(PoisonError::into_inner);
        slot.closed = true;
    }
}

/// Single consumer side of the slot
#[derive(Debug)]
pub struct FrameReader {
    shared: Arc<RwLock<Slot>>,
    last_seen: u64,
    missed: u64,
}

impl FrameReader {
    /// Newest frame if it was published after the last one taken
    pub fn take_latest(&mut self) -> Option<(u64, Frame)> {
        let slot = self.shared.read().unwrap_or_else(PoisonError::into_inner);
        if slot.sequence <= self.last_seen {
            return None;
        }
        let frame = slot.frame.clone()?;
        self.missed += slot.sequence - self.last_seen - 1;
        self.last_seen = slot.sequence;
        Some((slot.sequence, frame))
    }

    /// Newest frame regardless of whether it was already taken
    pub fn latest(&self) -> Option<Frame> {
        let slot = self.shared.read().unwrap_or_else(PoisonError::into_inner);
        slot.frame.clone()
    }

    /// True once the writer is gone
    pub fn is_closed(&self) -> bool {
        self.shared.read().unwrap_or_else(PoisonError::into_inner).closed
    }

    /// True once the writer is gone and the final frame has been taken
    pub fn is_drained(&self) -> bool {
        let slot = self.shared.read().unwrap_or_else(PoisonError::into_inner);
        slot.closed && slot.sequence == self.last_seen
    }

    /// Frames overwritten before this reader could take them
    pub fn missed(&self) -> u64 {
        self.missed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quaternion::Quat;
    use std::thread;

    fn frame(w: f64) -> Frame {
        Frame::new().with("upper_arm", Quat::new(w, 0.0, 0.0, 0.0))
    }

    #[test]
    fn test_empty_slot() {
        let (_writer, mut reader) = frame_slot();
        assert!(reader.take_latest().is_none());
        assert!(reader.latest().is_none());
        assert!(!reader.is_closed());
    }

    #[test]
    fn test_take_latest_only_once() {
        let (mut writer, mut reader) = frame_slot();
        assert_eq!(writer.publish(frame(1.0)), 1);

        let (seq, taken) = reader.take_latest().unwrap();
        assert_eq!(seq, 1);
        assert_eq!(taken, frame(1.0));
        assert!(reader.take_latest().is_none());
        assert_eq!(reader.latest(), Some(frame(1.0)));
    }

    #[test]
    fn test_overwritten_frames_are_counted() {
        let (mut writer, mut reader) = frame_slot();
        writer.publish(frame(1.0));
        writer.publish(frame(2.0));
        writer.publish(frame(3.0));

        let (seq, taken) = reader.take_latest().unwrap();
        assert_eq!(seq, 3);
        assert_eq!(taken, frame(3.0));
        assert_eq!(reader.missed(), 2);
    }

    #[test]
    fn test_close_and_drain() {
        let (mut writer, mut reader) = frame_slot();
        writer.publish(frame(1.0));
        writer.close();

        assert!(reader.is_closed());
        assert!(!reader.is_drained());
        reader.take_latest().unwrap();
        assert!(reader.is_drained());
    }

    #[test]
    fn test_cross_thread_hand_off() {
        let (mut writer, mut reader) = frame_slot();
        let producer = thread::spawn(move || {
            for i in 1..=50 {
                writer.publish(frame(i as f64));
            }
        });
        producer.join().unwrap();

        let (seq, taken) = reader.take_latest().unwrap();
        assert_eq!(seq, 50);
        assert_eq!(taken, frame(50.0));
        assert_eq!(reader.missed(), 49);
        assert!(reader.is_drained());
    }
}
