//! Environment monitor.
//!
//! Keeps an HTU21D (temperature / humidity) and a TSL2561 (light) sampling
//! in the background and logs what they report.
//!
//! # Building
//! The `hardware` feature (on by default) pulls in the Linux I2c transport
//! and the SIGINT handler used by the `monitor` binary.

use std::time::Duration;

use sensors::signal::StopSignal;

pub mod atmosphere;

use atmosphere::AtmosphereSampler;

/// Parse a refresh interval given in whole seconds.
///
/// Zero is rejected: the sensors would be polled back-to-back.
pub fn parse_interval(arg: &str) -> Result<Duration, String> {
    match arg.parse::<u64>() {
        Ok(0) => Err("interval must be at least 1 second".into()),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(e) => Err(format!("invalid interval {:?}: {}", arg, e)),
    }
}

/// Log one sample per interval until `stop` is raised.
/// Returns the number of samples logged.
pub fn run(stop: &StopSignal, sampler: &mut impl AtmosphereSampler, interval: Duration) -> usize {
    let mut logged = 0;
    while !stop.is_stopped() {
        let sample = sampler.sample();
        if sample.is_empty() {
            tracing::info!("no readings yet");
        } else {
            tracing::info!("{} (as of {})", sample, sample.timestamp);
        }
        logged += 1;
        stop.wait_timeout(interval);
    }
    logged
}
