//! Drivers for the HTU21D temperature / humidity sensor and the TSL2561
//! ambient light sensor, with periodic background sampling.
//!
//! Both drivers are generic over an [`embedded_hal`] I2c bus and delay; on
//! Linux, `open(address, bus)` attaches to `/dev/i2c-<bus>` directly.
//! Wrap a driver in a [`Refresher`] to keep a fresh reading available.

use core::fmt::Debug;

pub mod convert;
pub mod device;
pub mod htu21d;
pub mod refresh;
pub mod signal;
pub mod tsl2561;

#[cfg(test)]
mod testing;

pub use htu21d::{Climate, Htu21d, HTU21D_ADDR};
pub use refresh::{Measure, Published, RefreshSettings, RefreshState, Refresher};
pub use tsl2561::{Gain, Tsl2561, TSL2561_ADDR, TSL2561_ADDR_0, TSL2561_ADDR_1};

/// An error in communicating with a sensor.
///
/// Failures are reported as they occur; nothing is retried.
pub enum Error<I2cError> {
    I2cWrite(I2cError),
    I2cRead(I2cError),
}

impl<I2cError> Debug for Error<I2cError>
where
    I2cError: Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::I2cWrite(e) => write!(f, "Error::I2cWrite({:?})", e),
            Error::I2cRead(e) => write!(f, "Error::I2cRead({:?})", e),
        }
    }
}

impl<I2cError> core::fmt::Display for Error<I2cError>
where
    I2cError: core::fmt::Display,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::I2cWrite(e) => write!(f, "in sensor write to I2c: {}", e),
            Error::I2cRead(e) => write!(f, "in sensor read from I2c: {}", e),
        }
    }
}

impl<I2cError> core::error::Error for Error<I2cError>
where
    I2cError: core::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Error::I2cWrite(e) => Some(e),
            Error::I2cRead(e) => Some(e),
        }
    }
}

/// Failure to open an I2c bus device.
#[cfg(target_os = "linux")]
pub type OpenError = linux_embedded_hal::i2cdev::linux::LinuxI2CError;

#[cfg(target_os = "linux")]
fn open_bus(bus: u8) -> Result<linux_embedded_hal::I2cdev, OpenError> {
    let path = format!("/dev/i2c-{}", bus);
    tracing::debug!("opening {}", path);
    linux_embedded_hal::I2cdev::new(path)
}
