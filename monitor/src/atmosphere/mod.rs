//! Types for surfacing atmospheric data.

use chrono::{DateTime, Utc};
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{I2c, SevenBitAddress};
use sensors::{Htu21d, Refresher, Tsl2561};

/// A sample of local atmospheric conditions.
///
/// Fields are `None` when the corresponding sensor has not produced a
/// reading (yet).
#[derive(Default, Clone, Copy, Debug, PartialEq)]
pub struct AtmosphereSample {
    /// Time at which the oldest data in this sample was acquired.
    pub timestamp: DateTime<Utc>,

    /// Temperature in degrees Celsius.
    pub temperature: Option<f32>,

    /// Relative humidity as a percentage (i.e. range 0.0 to 100.0).
    pub relative_humidity: Option<f32>,

    /// Illuminance in lux.
    pub lux: Option<f32>,
}

impl AtmosphereSample {
    /// True if no sensor contributed to this sample.
    pub fn is_empty(&self) -> bool {
        self.temperature.is_none() && self.relative_humidity.is_none() && self.lux.is_none()
    }

    /// Fill the gaps in `self` from `other`.
    pub fn merge(self, other: AtmosphereSample) -> AtmosphereSample {
        let timestamp = match (self.is_empty(), other.is_empty()) {
            (true, _) => other.timestamp,
            (_, true) => self.timestamp,
            _ => std::cmp::min(self.timestamp, other.timestamp),
        };
        AtmosphereSample {
            timestamp,
            temperature: self.temperature.or(other.temperature),
            relative_humidity: self.relative_humidity.or(other.relative_humidity),
            lux: self.lux.or(other.lux),
        }
    }
}

impl core::fmt::Display for AtmosphereSample {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        fn field(v: Option<f32>) -> String {
            v.map(|v| format!("{:.1}", v)).unwrap_or_else(|| "-".into())
        }
        write!(
            f,
            "T: {} °C  RH: {}%  Light: {} lux",
            field(self.temperature),
            field(self.relative_humidity),
            field(self.lux)
        )
    }
}

/// A type that can get local atmospheric conditions.
pub trait AtmosphereSampler {
    /// Get a current / latest sample of atmospheric conditions.
    ///
    /// While this will always return _an_ AtmosphereSample,
    /// it may return stale or partial data.
    fn sample(&mut self) -> AtmosphereSample;
}

/// The nullary AtmosphereSampler: provides no data.
pub struct NullAtmosphereSampler {}

impl AtmosphereSampler for NullAtmosphereSampler {
    fn sample(&mut self) -> AtmosphereSample {
        Default::default()
    }
}

/// Fake atmosphere sampler: repeatedly provides the indicated sample.
pub struct FakeAtmosphereSampler {
    pub sample: AtmosphereSample,
}

impl AtmosphereSampler for FakeAtmosphereSampler {
    fn sample(&mut self) -> AtmosphereSample {
        self.sample
    }
}

/// Climate and light readings from two separate samplers.
pub struct CombinedSampler<C, L> {
    pub climate: C,
    pub light: L,
}

impl<C, L> AtmosphereSampler for CombinedSampler<C, L>
where
    C: AtmosphereSampler,
    L: AtmosphereSampler,
{
    fn sample(&mut self) -> AtmosphereSample {
        self.climate.sample().merge(self.light.sample())
    }
}

impl<I, D> AtmosphereSampler for Refresher<Htu21d<I, D>>
where
    I: I2c<SevenBitAddress> + Send + 'static,
    D: DelayNs + Send + 'static,
{
    fn sample(&mut self) -> AtmosphereSample {
        match self.latest() {
            Some(p) => AtmosphereSample {
                timestamp: p.taken,
                temperature: p.reading.temperature,
                relative_humidity: p.reading.humidity,
                ..Default::default()
            },
            None => Default::default(),
        }
    }
}

impl<I, D> AtmosphereSampler for Refresher<Tsl2561<I, D>>
where
    I: I2c<SevenBitAddress> + Send + 'static,
    D: DelayNs + Send + 'static,
{
    fn sample(&mut self) -> AtmosphereSample {
        match self.latest() {
            Some(p) => AtmosphereSample {
                timestamp: p.taken,
                lux: Some(p.reading),
                ..Default::default()
            },
            None => Default::default(),
        }
    }
}
