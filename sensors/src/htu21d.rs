//! Driver for the HTU21D temperature and humidity sensor.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{I2c, SevenBitAddress};

use crate::convert;
use crate::device::{BusDevice, Crc8};
use crate::refresh::{Measure, Refresher};
use crate::Error;

/// Fixed bus address of the HTU21D.
pub const HTU21D_ADDR: u8 = 0x40;

/// Trigger temperature measurement, no clock stretching.
const TRIGGER_TEMPERATURE: u8 = 0xF3;
/// Trigger humidity measurement, no clock stretching.
const TRIGGER_HUMIDITY: u8 = 0xF5;

/// Upper bound on conversion time for either measurement.
const CONVERSION_MS: u32 = 100;

/// One temperature and humidity reading.
///
/// The two are measured separately; a field is `None` if its read failed.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Climate {
    /// Temperature in degrees Celsius
    pub temperature: Option<f32>,
    /// Relative humidity, in percent
    pub humidity: Option<f32>,
}

impl core::fmt::Display for Climate {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self.temperature {
            Some(t) => write!(f, "T: {:.1} °C", t)?,
            None => write!(f, "T: - °C")?,
        }
        match self.humidity {
            Some(rh) => write!(f, "\nRH: {:.1}%", rh),
            None => write!(f, "\nRH: -%"),
        }
    }
}

/// Handle to an HTU21D.
pub struct Htu21d<I, D> {
    device: BusDevice<I>,
    delay: D,
    crc: Crc8,
}

impl<I, D> Htu21d<I, D>
where
    I: I2c<SevenBitAddress>,
    D: DelayNs,
{
    pub fn new(bus: I, address: SevenBitAddress, delay: D) -> Self {
        Htu21d {
            device: BusDevice::new(bus, address),
            delay,
            crc: Crc8::new(),
        }
    }

    pub fn address(&self) -> SevenBitAddress {
        self.device.address()
    }

    /// Read the temperature, in degrees Celsius.
    pub fn read_temperature(&mut self) -> Result<f32, Error<I::Error>> {
        let raw = self.read_word(TRIGGER_TEMPERATURE)?;
        Ok(convert::temperature(raw))
    }

    /// Read the relative humidity, in percent.
    pub fn read_humidity(&mut self) -> Result<f32, Error<I::Error>> {
        let raw = self.read_word(TRIGGER_HUMIDITY)?;
        Ok(convert::humidity(raw))
    }

    /// Read temperature, then humidity.
    ///
    /// A failure of one read does not prevent the other. Fails only if
    /// neither succeeds, with the humidity error.
    pub fn read_climate(&mut self) -> Result<Climate, Error<I::Error>> {
        let temperature = self.read_temperature().map_err(|e| {
            tracing::warn!("HTU21D at {:#04x}: temperature read failed: {:?}", self.address(), e);
            e
        });
        let humidity = self.read_humidity();
        match (temperature, humidity) {
            (Err(_), Err(e)) => Err(e),
            (temperature, humidity) => {
                if let Err(e) = &humidity {
                    tracing::warn!("HTU21D at {:#04x}: humidity read failed: {:?}", self.address(), e);
                }
                Ok(Climate {
                    temperature: temperature.ok(),
                    humidity: humidity.ok(),
                })
            }
        }
    }

    /// Trigger a measurement, wait for it, and read back the masked word.
    fn read_word(&mut self, trigger: u8) -> Result<u16, Error<I::Error>> {
        self.device.write_command(trigger)?;
        self.delay.delay_ms(CONVERSION_MS);
        let frame = self.device.read_bytes::<3>()?;

        // A bad checksum is reported but not fatal.
        if let Err(err) = self.crc.check(&frame) {
            tracing::warn!(
                "HTU21D at {:#04x}: invalid CRC for command {trigger:#04x}: {}",
                self.address(),
                err
            );
        }
        Ok(convert::htu21d_word(&frame))
    }

    /// Release the transport and delay.
    pub fn destroy(self) -> (I, D) {
        (self.device.close(), self.delay)
    }
}

#[cfg(target_os = "linux")]
impl Htu21d<linux_embedded_hal::I2cdev, linux_embedded_hal::Delay> {
    /// Attach to an HTU21D on `/dev/i2c-<bus>`.
    pub fn open(address: u8, bus: u8) -> Result<Self, crate::OpenError> {
        let dev = crate::open_bus(bus)?;
        Ok(Self::new(dev, address, linux_embedded_hal::Delay))
    }
}

impl<I, D> Measure for Htu21d<I, D>
where
    I: I2c<SevenBitAddress> + Send + 'static,
    D: DelayNs + Send + 'static,
{
    type Reading = Climate;
    type Error = Error<I::Error>;

    fn measure(&mut self) -> Result<Climate, Self::Error> {
        self.read_climate()
    }

    /// A field that failed this time keeps its last published value.
    fn merge(previous: Climate, latest: Climate) -> Climate {
        Climate {
            temperature: latest.temperature.or(previous.temperature),
            humidity: latest.humidity.or(previous.humidity),
        }
    }
}

impl<I, D> Refresher<Htu21d<I, D>>
where
    I: I2c<SevenBitAddress> + Send + 'static,
    D: DelayNs + Send + 'static,
{
    /// Last published temperature, in degrees Celsius.
    pub fn temperature(&self) -> Option<f32> {
        self.latest().and_then(|p| p.reading.temperature)
    }

    /// Last published relative humidity, in percent.
    pub fn humidity(&self) -> Option<f32> {
        self.latest().and_then(|p| p.reading.humidity)
    }
}
