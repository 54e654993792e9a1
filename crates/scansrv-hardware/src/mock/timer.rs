//! Mock guard timer.
//!
//! Records every start and stop so tests can check the stop-before-start
//! discipline of the scan service. Expiry is never generated on its own; tests
//! fire it explicitly by calling the service's timer entry point.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::lock;
use crate::traits::ScanTimer;

#[derive(Debug, Default)]
struct TimerState {
    running: bool,
    starts: Vec<Duration>,
    stops: usize,
}

/// Mock single-shot timer.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use scansrv_hardware::mock::MockTimer;
/// use scansrv_hardware::traits::ScanTimer;
///
/// let (mut timer, handle) = MockTimer::new();
/// timer.start(Duration::from_secs(2));
///
/// assert_eq!(handle.start_count(), 1);
/// assert_eq!(handle.last_duration(), Some(Duration::from_secs(2)));
/// ```
#[derive(Debug)]
pub struct MockTimer {
    state: Arc<Mutex<TimerState>>,
}

impl MockTimer {
    /// Create a new mock timer and its inspection handle.
    pub fn new() -> (Self, MockTimerHandle) {
        let state = Arc::new(Mutex::new(TimerState::default()));
        let handle = MockTimerHandle {
            state: Arc::clone(&state),
        };
        (Self { state }, handle)
    }
}

impl ScanTimer for MockTimer {
    fn start(&mut self, duration: Duration) {
        let mut state = lock(&self.state);
        state.running = true;
        state.starts.push(duration);
    }

    fn stop(&mut self) {
        let mut state = lock(&self.state);
        state.running = false;
        state.stops += 1;
    }
}

/// Handle for inspecting a [`MockTimer`].
#[derive(Debug, Clone)]
pub struct MockTimerHandle {
    state: Arc<Mutex<TimerState>>,
}

impl MockTimerHandle {
    /// Whether the timer is armed (started and not stopped since).
    pub fn is_running(&self) -> bool {
        lock(&self.state).running
    }

    /// Number of times the timer was started.
    pub fn start_count(&self) -> usize {
        lock(&self.state).starts.len()
    }

    /// Number of times the timer was stopped.
    pub fn stop_count(&self) -> usize {
        lock(&self.state).stops
    }

    /// Duration passed to the most recent start.
    pub fn last_duration(&self) -> Option<Duration> {
        lock(&self.state).starts.last().copied()
    }

    /// Simulate the hardware timer firing: it is no longer armed.
    ///
    /// This does not notify the scan service; the caller does that.
    pub fn mark_fired(&self) {
        lock(&self.state).running = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_stop_tracking() {
        let (mut timer, handle) = MockTimer::new();
        assert!(!handle.is_running());

        timer.start(Duration::from_millis(100));
        timer.start(Duration::from_millis(200));
        assert!(handle.is_running());
        assert_eq!(handle.start_count(), 2);
        assert_eq!(handle.last_duration(), Some(Duration::from_millis(200)));

        timer.stop();
        assert!(!handle.is_running());
        assert_eq!(handle.stop_count(), 1);
    }

    #[test]
    fn test_mark_fired() {
        let (mut timer, handle) = MockTimer::new();
        timer.start(Duration::from_millis(100));
        handle.mark_fired();
        assert!(!handle.is_running());
        assert_eq!(handle.stop_count(), 0);
    }
}
