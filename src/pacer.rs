//! Bounds how many frames the CPU may build ahead of GPU completion.
//!
//! The counting primitive is a bounded channel pre-filled with one permit per
//! ring slot. Starting a frame takes a permit; the backend's completion
//! callback puts it back. A permit dropped before submission is returned
//! immediately, so a skipped frame never counts as in flight.

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};

use crate::error::FrameError;

// How long to sleep between backend polls while waiting for a permit
const POLL_INTERVAL: Duration = Duration::from_millis(1);

pub struct FramePacer {
    release: Sender<()>,
    permits: Receiver<()>,
    max_in_flight: usize,
    in_flight: Arc<AtomicUsize>,
    wait_timeout: Option<Duration>,
}

impl FramePacer {
    pub fn new(max_in_flight: usize, wait_timeout: Option<Duration>) -> Self {
        let (release, permits) = bounded(max_in_flight);
        for _ in 0..max_in_flight {
            // Capacity equals the permit count, this cannot block
            let _ = release.try_send(());
        }
        Self {
            release,
            permits,
            max_in_flight,
            in_flight: Arc::new(AtomicUsize::new(0)),
            wait_timeout,
        }
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    /// Frames currently between `acquire` and completion.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Permits ready to be taken without blocking.
    pub fn available(&self) -> usize {
        self.permits.len()
    }

    pub fn try_acquire(&self) -> Option<FramePermit> {
        self.permits.try_recv().ok().map(|()| self.permit())
    }

    /// Takes a permit, blocking until one is released.
    ///
    /// `pump` runs between waits so backends that deliver completions through
    /// polling can make progress. Without a configured timeout the wait is
    /// unbounded.
    pub fn acquire(&self, mut pump: impl FnMut()) -> Result<FramePermit, FrameError> {
        match self.permits.try_recv() {
            Ok(()) => return Ok(self.permit()),
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => unreachable!("pacer owns its sender"),
        }

        log::trace!("all {} frame slots in flight, waiting", self.max_in_flight);
        let deadline = self.wait_timeout.map(|timeout| Instant::now() + timeout);
        loop {
            pump();
            match self.permits.recv_timeout(POLL_INTERVAL) {
                Ok(()) => return Ok(self.permit()),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => unreachable!("pacer owns its sender"),
            }
            if let (Some(deadline), Some(timeout)) = (deadline, self.wait_timeout) {
                if Instant::now() >= deadline {
                    log::warn!("no frame slot freed within {:?}", timeout);
                    return Err(FrameError::Timeout(timeout));
                }
            }
        }
    }

    fn permit(&self) -> FramePermit {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        FramePermit {
            release: self.release.clone(),
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

/// Ownership of one frame slot. Returns itself to the pacer on drop.
#[must_use = "dropping a permit releases its frame slot"]
pub struct FramePermit {
    release: Sender<()>,
    in_flight: Arc<AtomicUsize>,
}

impl FramePermit {
    /// Releases the slot. Equivalent to dropping the permit.
    pub fn retire(self) {}
}

impl Drop for FramePermit {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
        // The channel has room for every permit ever issued
        let _ = self.release.try_send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn hands_out_at_most_max_permits() {
        let pacer = FramePacer::new(3, None);
        let permits = (0..3)
            .map(|_| pacer.try_acquire().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(pacer.in_flight(), 3);
        assert!(pacer.try_acquire().is_none());

        drop(permits);
        assert_eq!(pacer.in_flight(), 0);
        assert_eq!(pacer.available(), 3);
    }

    #[test]
    fn acquire_times_out_when_configured() {
        let pacer = FramePacer::new(1, Some(Duration::from_millis(20)));
        let _held = pacer.acquire(|| {}).unwrap();
        let result = pacer.acquire(|| {});
        assert!(matches!(result, Err(FrameError::Timeout(_))));
        assert_eq!(pacer.in_flight(), 1);
    }

    #[test]
    fn acquire_unblocks_when_another_thread_releases() {
        let pacer = FramePacer::new(1, None);
        let held = pacer.acquire(|| {}).unwrap();

        let releaser = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            held.retire();
        });

        let permit = pacer.acquire(|| {}).unwrap();
        releaser.join().unwrap();
        assert_eq!(pacer.in_flight(), 1);
        drop(permit);
    }

    #[test]
    fn pump_runs_while_waiting() {
        let pacer = FramePacer::new(1, None);
        let mut held = Some(pacer.acquire(|| {}).unwrap());
        let mut pumps = 0;
        // Completion is delivered from inside the pump, as a polled backend would
        let permit = pacer
            .acquire(|| {
                pumps += 1;
                if pumps == 3 {
                    held.take();
                }
            })
            .unwrap();
        assert!(pumps >= 3);
        drop(permit);
    }
}
