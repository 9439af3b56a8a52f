//! A stop signal shared between a controller and its worker thread.

use std::{
    sync::{Arc, Condvar, Mutex, PoisonError},
    time::Duration,
};

/// Cloneable, one-shot cancellation flag.
///
/// Once raised it stays raised. Waiters are woken as soon as it is raised.
#[derive(Clone, Debug, Default)]
pub struct StopSignal {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    stopped: Mutex<bool>,
    cv: Condvar,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal and wake every waiter.
    pub fn stop(&self) {
        let mut g = self
            .inner
            .stopped
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *g = true;
        self.inner.cv.notify_all();
    }

    /// Returns true iff the signal has been raised.
    pub fn is_stopped(&self) -> bool {
        *self
            .inner
            .stopped
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Wait until the duration expires or the signal is raised.
    /// Returns true if the signal has been raised.
    pub fn wait_timeout(&self, duration: Duration) -> bool {
        let g = self
            .inner
            .stopped
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let (v, _) = self
            .inner
            .cv
            .wait_timeout_while(g, duration, |stopped| !*stopped)
            .unwrap_or_else(PoisonError::into_inner);
        *v
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn timeout_without_stop() {
        let s = StopSignal::new();
        assert!(!s.wait_timeout(Duration::from_millis(5)));
        assert!(!s.is_stopped());
    }

    #[test]
    fn stop_wakes_waiter() {
        let s = StopSignal::new();
        let waiter = {
            let s = s.clone();
            thread::spawn(move || {
                let start = Instant::now();
                let stopped = s.wait_timeout(Duration::from_secs(60));
                (stopped, start.elapsed())
            })
        };
        thread::sleep(Duration::from_millis(10));
        s.stop();
        let (stopped, elapsed) = waiter.join().unwrap();
        assert!(stopped);
        assert!(elapsed < Duration::from_secs(30));
    }

    #[test]
    fn stays_stopped() {
        let s = StopSignal::new();
        s.stop();
        assert!(s.is_stopped());
        assert!(s.wait_timeout(Duration::from_secs(60)));
    }
}
