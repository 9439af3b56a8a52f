//! Periodic background sampling of a sensor.
//!
//! A [`Refresher`] owns a sensor driver and, while running, a worker thread
//! that measures it once per interval and publishes the result. Readers see
//! the most recent successful measurement through [`Refresher::latest`]
//! without waiting on the bus.
//!
//! Stopping is cooperative. [`Refresher::stop`] raises the worker's stop
//! signal and returns immediately; the worker notices at its next wait, so a
//! measurement already in flight (bounded by the sensor's own delays, or
//! indefinitely if the transport hangs) still completes and may still be
//! published. Use [`Refresher::stop_and_join`] to wait for the worker.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    thread::{self, JoinHandle},
    time::Duration,
};

use chrono::{DateTime, Utc};

use crate::signal::StopSignal;

/// A sensor that can take one complete measurement on demand.
pub trait Measure: Send + 'static {
    type Reading: Copy + Send + 'static;
    type Error: core::fmt::Debug;

    fn measure(&mut self) -> Result<Self::Reading, Self::Error>;

    /// Fold a new reading into the one already published.
    /// Sensors with independently failing parts override this to keep
    /// the parts the new reading is missing.
    fn merge(_previous: Self::Reading, latest: Self::Reading) -> Self::Reading {
        latest
    }
}

/// A reading together with the time it was taken.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Published<R> {
    pub taken: DateTime<Utc>,
    pub reading: R,
}

/// Settings for a [`Refresher`].
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct RefreshSettings {
    /// Time between background measurements.
    /// Defaults to 10 seconds.
    pub interval: Duration,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
        }
    }
}

impl RefreshSettings {
    pub fn with_interval(interval: Duration) -> Self {
        Self { interval }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Running,
}

struct Worker {
    stop: StopSignal,
    handle: JoinHandle<()>,
}

type Latest<R> = Arc<Mutex<Option<Published<R>>>>;

/// Background sampler for one sensor.
pub struct Refresher<M: Measure> {
    sensor: Arc<Mutex<M>>,
    latest: Latest<M::Reading>,
    interval: Duration,
    worker: Option<Worker>,
    /// Workers that were told to stop but not joined.
    stopping: Vec<JoinHandle<()>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Measure and publish under the sensor lock, so publications land in
/// measurement order.
fn measure_and_publish<M: Measure>(
    sensor: &Mutex<M>,
    latest: &Mutex<Option<Published<M::Reading>>>,
) -> Result<M::Reading, M::Error> {
    let mut sensor = lock(sensor);
    let reading = sensor.measure()?;
    let taken = Utc::now();

    let mut latest = lock(latest);
    let merged = match *latest {
        Some(previous) => M::merge(previous.reading, reading),
        None => reading,
    };
    *latest = Some(Published {
        taken,
        reading: merged,
    });
    drop(latest);
    drop(sensor);
    Ok(reading)
}

fn run<M: Measure>(
    sensor: Arc<Mutex<M>>,
    latest: Latest<M::Reading>,
    interval: Duration,
    stop: StopSignal,
) {
    tracing::debug!("refresh worker started, interval {:?}", interval);
    while !stop.wait_timeout(interval) {
        if let Err(e) = measure_and_publish(&sensor, &latest) {
            tracing::warn!("background measurement failed, keeping last reading: {:?}", e);
        }
    }
    tracing::debug!("refresh worker exiting");
}

impl<M: Measure> Refresher<M> {
    pub fn new(sensor: M, settings: RefreshSettings) -> Self {
        Refresher {
            sensor: Arc::new(Mutex::new(sensor)),
            latest: Arc::new(Mutex::new(None)),
            interval: settings.interval,
            worker: None,
            stopping: Vec::new(),
        }
    }

    /// Time between background measurements.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> RefreshState {
        match self.worker {
            Some(_) => RefreshState::Running,
            None => RefreshState::Idle,
        }
    }

    /// The most recent successful reading, if any.
    pub fn latest(&self) -> Option<Published<M::Reading>> {
        *lock(&self.latest)
    }

    /// Take a measurement now, publish it, and return it.
    ///
    /// Waits for any background measurement in progress.
    pub fn measure_now(&self) -> Result<M::Reading, M::Error> {
        measure_and_publish(&self.sensor, &self.latest)
    }

    /// Run `f` with exclusive access to the sensor.
    pub fn with_sensor<T>(&self, f: impl FnOnce(&mut M) -> T) -> T {
        f(&mut lock(&self.sensor))
    }

    /// Start background sampling. Does nothing if already running.
    ///
    /// One measurement is taken before this returns, so [`Self::latest`]
    /// is fresh afterwards unless that measurement failed.
    pub fn start(&mut self) -> std::io::Result<()> {
        if self.worker.is_some() {
            return Ok(());
        }

        if let Err(e) = self.measure_now() {
            tracing::warn!("initial measurement failed: {:?}", e);
        }

        let stop = StopSignal::new();
        let handle = {
            let sensor = self.sensor.clone();
            let latest = self.latest.clone();
            let interval = self.interval;
            let stop = stop.clone();
            thread::Builder::new()
                .name("sensor-refresh".into())
                .spawn(move || run(sensor, latest, interval, stop))?
        };
        self.worker = Some(Worker { stop, handle });
        tracing::info!("started refresh every {:?}", self.interval);
        Ok(())
    }

    /// Signal the worker to stop, without waiting for it to exit.
    pub fn stop(&mut self) {
        if let Some(Worker { stop, handle }) = self.worker.take() {
            stop.stop();
            self.stopping.retain(|h| !h.is_finished());
            self.stopping.push(handle);
            tracing::info!("stopping refresh");
        }
    }

    /// Stop, and wait for every worker this controller started to exit.
    pub fn stop_and_join(&mut self) {
        self.stop();
        for handle in self.stopping.drain(..) {
            if handle.join().is_err() {
                tracing::error!("refresh worker panicked");
            }
        }
    }

    /// Stop sampling and hand back the sensor.
    pub fn close(mut self) -> M {
        self.stop_and_join();
        let sensor = self.sensor.clone();
        drop(self);
        match Arc::try_unwrap(sensor) {
            Ok(m) => m.into_inner().unwrap_or_else(PoisonError::into_inner),
            Err(_) => unreachable!("sensor still shared after all workers joined"),
        }
    }
}

impl<M: Measure> Drop for Refresher<M> {
    fn drop(&mut self) {
        self.stop();
    }
}
