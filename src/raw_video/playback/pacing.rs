use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PaceOutcome {
    /// The deadline passed while waiting.
    OnTime,
    /// Decoding finished after the deadline; the frame goes out immediately.
    Late(Duration),
    /// The session was cancelled during the wait.
    Cancelled,
}

/// Deadline-based frame pacing.
///
/// `arm` is called right after a delivery; `wait` blocks until one interval
/// after that point. Late frames are never skipped, so lag is carried forward
/// instead of being caught up.
#[derive(Debug)]
pub(crate) struct FramePacer {
    interval: Duration,
    deadline: Option<Instant>,
}

impl FramePacer {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: None,
        }
    }

    pub(crate) fn arm(&mut self) {
        self.deadline = Some(Instant::now() + self.interval);
    }

    /// Waits for the armed deadline. A message on `cancel`, or its sender
    /// being dropped, ends the wait early.
    pub(crate) fn wait(&mut self, cancel: &Receiver<()>) -> PaceOutcome {
        let Some(deadline) = self.deadline.take() else {
            return PaceOutcome::OnTime;
        };
        let now = Instant::now();
        if now >= deadline {
            return PaceOutcome::Late(now - deadline);
        }
        match cancel.recv_deadline(deadline) {
            Err(RecvTimeoutError::Timeout) => PaceOutcome::OnTime,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => PaceOutcome::Cancelled,
        }
    }
}
