use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use kinematics::{frame_slot, ArmTracker, Frame, FrameReader, FrameWriter, Pose};

pub enum ReplayCommand {
    Stop,
}

/// Publishes recorded frames into the frame slot at a fixed rate, standing
/// in for live sensor acquisition.
pub struct ReplayWorker {
    frames: Vec<Frame>,
    period: Duration,
}

impl ReplayWorker {
    /// `rate_hz` of zero (or anything not a positive number) publishes as fast as possible
    pub fn new(frames: Vec<Frame>, rate_hz: f64) -> Self {
        let period = if rate_hz.is_finite() && rate_hz > 0.0 {
            Duration::from_secs_f64(1.0 / rate_hz)
        } else {
            Duration::ZERO
        };
        Self { frames, period }
    }

    /// Run on a new thread. The thread ends after the last frame, on
    /// [`ReplayCommand::Stop`] or when the command sender is dropped; it
    /// returns the number of frames published. The slot is closed when it ends.
    pub fn run(
        self,
        mut writer: FrameWriter,
        to_worker_rx: mpsc::Receiver<ReplayCommand>,
    ) -> JoinHandle<usize> {
        std::thread::spawn(move || {
            let mut published = 0;
            let mut last_publish: Option<Instant> = None;
            let mut frames = self.frames.into_iter();
            loop {
                match to_worker_rx.try_recv() {
                    Ok(ReplayCommand::Stop) => {
                        log::info!("Replay stopped after {} frames", published);
                        break;
                    }
                    Err(mpsc::TryRecvError::Disconnected) => {
                        break;
                    }
                    Err(mpsc::TryRecvError::Empty) => {}
                }

                if let Some(last) = last_publish {
                    let dt = last.elapsed();
                    if dt < self.period {
                        std::thread::sleep(self.period - dt);
                        continue;
                    }
                }

                let Some(frame) = frames.next() else {
                    log::info!("Replay finished: {} frames", published);
                    break;
                };
                last_publish = Some(Instant::now());
                writer.publish(frame);
                published += 1;
            }
            writer.close();
            published
        })
    }
}

/// Handle to a running replay
pub struct Replay {
    to_worker_tx: Option<mpsc::Sender<ReplayCommand>>,
    worker_thread: Option<JoinHandle<usize>>,
}

impl Replay {
    /// Start replaying `frames`; returns the handle and the consumer side of the slot
    pub fn start(frames: Vec<Frame>, rate_hz: f64) -> (Self, FrameReader) {
        let (writer, reader) = frame_slot();
        let (to_worker_tx, to_worker_rx) = mpsc::channel();
        let worker_thread = ReplayWorker::new(frames, rate_hz).run(writer, to_worker_rx);
        (
            Self {
                to_worker_tx: Some(to_worker_tx),
                worker_thread: Some(worker_thread),
            },
            reader,
        )
    }

    pub fn is_finished(&self) -> bool {
        self.worker_thread
            .as_ref()
            .map_or(true, |handle| handle.is_finished())
    }

    /// Stop the worker and wait for it; returns the number of frames published
    pub fn stop(&mut self) -> usize {
        if let Some(tx) = self.to_worker_tx.take() {
            let _ = tx.send(ReplayCommand::Stop);
        }
        self.join()
    }

    /// Wait for the worker to finish on its own
    pub fn join(&mut self) -> usize {
        match self.worker_thread.take().map(JoinHandle::join) {
            Some(Ok(published)) => published,
            Some(Err(_)) => {
                log::error!("Replay worker panicked");
                0
            }
            None => 0,
        }
    }
}

impl Drop for Replay {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Resolve frames from `reader` until the producer is done.
///
/// Only the newest frame is resolved each time; frames overwritten in between
/// are skipped. Rejected frames are logged. Returns the number of frames the
/// consumer never saw.
pub fn consume(
    mut reader: FrameReader,
    tracker: &ArmTracker,
    mut on_pose: impl FnMut(u64, Pose),
) -> u64 {
    let idle = Duration::from_millis(1);
    loop {
        match reader.take_latest() {
            Some((sequence, frame)) => match tracker.resolve_frame(&frame) {
                Ok(pose) => on_pose(sequence, pose),
                Err(e) => log::warn!("Frame {} skipped: {}", sequence, e),
            },
            None if reader.is_drained() => break,
            None => std::thread::sleep(idle),
        }
    }
    if reader.missed() > 0 {
        log::debug!("Consumer fell behind by {} frames", reader.missed());
    }
    reader.missed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinematics::{Quat, Skeleton};

    fn frames(n: usize) -> Vec<Frame> {
        (0..n)
            .map(|_| {
                Frame::new()
                    .with("upper_arm", Quat::identity())
                    .with("forearm", Quat::identity())
            })
            .collect()
    }

    fn tracker() -> ArmTracker {
        let mut tracker = ArmTracker::new(Skeleton::single_arm(0.4, 0.35).unwrap());
        tracker.calibrate_frame(&frames(1)[0]).unwrap();
        tracker
    }

    #[test]
    fn test_replay_runs_to_the_end() {
        let (mut replay, reader) = Replay::start(frames(5), 0.0);
        let tracker = tracker();

        let mut sequences = Vec::new();
        let missed = consume(reader, &tracker, |seq, pose| {
            assert_eq!(pose.len(), 3);
            sequences.push(seq);
        });

        assert_eq!(replay.join(), 5);
        assert_eq!(sequences.len() as u64 + missed, 5);
        assert_eq!(sequences.last(), Some(&5));
        assert!(replay.is_finished());
    }

    #[test]
    fn test_stop_ends_a_slow_replay() {
        let (mut replay, reader) = Replay::start(frames(1000), 50.0);
        std::thread::sleep(Duration::from_millis(30));

        let published = replay.stop();
        assert!(published >= 1 && published < 1000);
        assert!(reader.is_closed());
    }

    #[test]
    fn test_dropping_replay_closes_slot() {
        let (replay, reader) = Replay::start(frames(1000), 50.0);
        drop(replay);
        assert!(reader.is_closed());
    }

    #[test]
    fn test_rejected_frames_do_not_stop_consumer() {
        let mut input = frames(3);
        input[1] = Frame::new().with("upper_arm", Quat::identity());
        let (mut replay, reader) = Replay::start(input, 200.0);
        let tracker = tracker();

        let mut resolved = 0;
        consume(reader, &tracker, |_, _| resolved += 1);
        replay.join();

        assert!(resolved >= 1);
        assert_eq!(tracker.stats().frames_resolved, resolved);
    }
}
