//! Test doubles shared by the driver tests.

use embedded_hal::delay::DelayNs;

/// Delay that returns immediately and remembers what it was asked for.
#[derive(Debug, Default)]
pub struct RecordingDelay {
    calls: Vec<u64>,
}

impl RecordingDelay {
    /// Requested delays, in nanoseconds.
    pub fn calls(&self) -> Vec<u64> {
        self.calls.clone()
    }

    pub fn total_ms(&self) -> u64 {
        self.calls.iter().sum::<u64>() / 1_000_000
    }
}

impl DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.calls.push(ns as u64);
    }

    fn delay_us(&mut self, us: u32) {
        self.calls.push(us as u64 * 1_000);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.calls.push(ms as u64 * 1_000_000);
    }
}
