//! Driver for the TSL2561 ambient light sensor.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{I2c, SevenBitAddress};

use crate::convert::{self, SATURATED};
use crate::device::BusDevice;
use crate::refresh::{Measure, Refresher};
use crate::Error;

/// Default bus address (ADDR pin floating).
pub const TSL2561_ADDR: u8 = 0x39;
/// Bus address with ADDR pulled high.
pub const TSL2561_ADDR_1: u8 = 0x49;
/// Bus address with ADDR pulled low.
pub const TSL2561_ADDR_0: u8 = 0x29;

/// Command byte selecting the timing register, where gain lives.
const TIMING_REGISTER: u8 = 0x81;
/// Word read of channel 0 (broadband).
const READ_FULL: u8 = 0xAC;
/// Word read of channel 1 (infrared).
const READ_IR: u8 = 0xAE;

/// Time for the ADC to settle after a gain change.
const GAIN_SETTLE_MS: u32 = 800;

/// Analog gain applied before the channels are digitized.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Gain {
    X1,
    X16,
}

impl Gain {
    /// Timing register payload selecting this gain.
    fn timing(self) -> u8 {
        match self {
            Gain::X1 => 0x02,
            Gain::X16 => 0x12,
        }
    }
}

impl From<Gain> for u8 {
    fn from(gain: Gain) -> u8 {
        match gain {
            Gain::X1 => 1,
            Gain::X16 => 16,
        }
    }
}

impl TryFrom<u8> for Gain {
    type Error = u8;

    fn try_from(factor: u8) -> Result<Self, u8> {
        match factor {
            1 => Ok(Gain::X1),
            16 => Ok(Gain::X16),
            other => Err(other),
        }
    }
}

/// Handle to a TSL2561.
///
/// The gain is remembered between readings; an unset gain is picked by
/// autoranging on the next [`Tsl2561::read_lux`].
pub struct Tsl2561<I, D> {
    device: BusDevice<I>,
    delay: D,
    gain: Option<Gain>,
}

impl<I, D> Tsl2561<I, D>
where
    I: I2c<SevenBitAddress>,
    D: DelayNs,
{
    pub fn new(bus: I, address: SevenBitAddress, delay: D) -> Self {
        Tsl2561 {
            device: BusDevice::new(bus, address),
            delay,
            gain: None,
        }
    }

    pub fn address(&self) -> SevenBitAddress {
        self.device.address()
    }

    /// Currently selected gain, if one has been chosen.
    pub fn gain(&self) -> Option<Gain> {
        self.gain
    }

    /// Select a gain, waiting for the sensor to settle.
    ///
    /// Selecting the current gain again does not touch the bus.
    pub fn set_gain(&mut self, gain: Gain) -> Result<(), Error<I::Error>> {
        if self.gain == Some(gain) {
            return Ok(());
        }
        tracing::debug!(
            "TSL2561 at {:#04x}: switching to {}x gain",
            self.address(),
            u8::from(gain)
        );
        self.device.write_bytes(&[TIMING_REGISTER, gain.timing()])?;
        self.gain = Some(gain);
        self.delay.delay_ms(GAIN_SETTLE_MS);
        Ok(())
    }

    /// Read the broadband channel.
    pub fn read_full(&mut self) -> Result<u16, Error<I::Error>> {
        self.read_channel(READ_FULL)
    }

    /// Read the infrared channel.
    pub fn read_ir(&mut self) -> Result<u16, Error<I::Error>> {
        self.read_channel(READ_IR)
    }

    fn read_channel(&mut self, command: u8) -> Result<u16, Error<I::Error>> {
        self.device.write_command(command)?;
        let bytes = self.device.read_bytes::<2>()?;
        Ok(convert::tsl2561_word(bytes))
    }

    /// Take a reading of illuminance, in lux.
    pub fn read_lux(&mut self) -> Result<f32, Error<I::Error>> {
        let (ambient, ir, gain) = match self.gain {
            Some(gain) => (self.read_full()?, self.read_ir()?, gain),
            None => self.autorange()?,
        };
        Ok(convert::lux(
            convert::normalize(ambient, gain),
            convert::normalize(ir, gain),
        ))
    }

    /// Try high gain first; drop to low gain if either channel saturates.
    fn autorange(&mut self) -> Result<(u16, u16, Gain), Error<I::Error>> {
        self.set_gain(Gain::X16)?;
        let ambient = self.read_full()?;
        // No point reading IR if broadband is already pinned.
        let ir = if ambient < SATURATED {
            self.read_ir()?
        } else {
            0
        };
        if ambient < SATURATED && ir < SATURATED {
            return Ok((ambient, ir, Gain::X16));
        }

        tracing::debug!(
            "TSL2561 at {:#04x}: saturated at 16x (full {ambient:#06x}, ir {ir:#06x})",
            self.address()
        );
        self.set_gain(Gain::X1)?;
        Ok((self.read_full()?, self.read_ir()?, Gain::X1))
    }

    /// Release the transport and delay.
    pub fn destroy(self) -> (I, D) {
        (self.device.close(), self.delay)
    }
}

#[cfg(target_os = "linux")]
impl Tsl2561<linux_embedded_hal::I2cdev, linux_embedded_hal::Delay> {
    /// Attach to a TSL2561 on `/dev/i2c-<bus>`.
    pub fn open(address: u8, bus: u8) -> Result<Self, crate::OpenError> {
        let dev = crate::open_bus(bus)?;
        Ok(Self::new(dev, address, linux_embedded_hal::Delay))
    }
}

impl<I, D> Measure for Tsl2561<I, D>
where
    I: I2c<SevenBitAddress> + Send + 'static,
    D: DelayNs + Send + 'static,
{
    type Reading = f32;
    type Error = Error<I::Error>;

    fn measure(&mut self) -> Result<f32, Self::Error> {
        self.read_lux()
    }
}

impl<I, D> Refresher<Tsl2561<I, D>>
where
    I: I2c<SevenBitAddress> + Send + 'static,
    D: DelayNs + Send + 'static,
{
    /// Last published illuminance, in lux.
    pub fn lux(&self) -> Option<f32> {
        self.latest().map(|p| p.reading)
    }

    /// Waits for any measurement in progress.
    pub fn gain(&self) -> Option<Gain> {
        self.with_sensor(|tsl| tsl.gain())
    }

    /// Select a gain. No reading starts until the sensor has settled.
    pub fn set_gain(&self, gain: Gain) -> Result<(), Error<I::Error>> {
        self.with_sensor(|tsl| tsl.set_gain(gain))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingDelay;
    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};

    const A: u8 = TSL2561_ADDR;

    fn channel(command: u8, value: u16) -> [I2cTransaction; 2] {
        [
            I2cTransaction::write(A, vec![command]),
            I2cTransaction::read(A, value.to_le_bytes().to_vec()),
        ]
    }

    fn gain(payload: u8) -> I2cTransaction {
        I2cTransaction::write(A, vec![TIMING_REGISTER, payload])
    }

    #[test]
    fn gain_conversions() {
        assert_eq!(u8::from(Gain::X1), 1);
        assert_eq!(u8::from(Gain::X16), 16);
        assert_eq!(Gain::try_from(16), Ok(Gain::X16));
        assert_eq!(Gain::try_from(4), Err(4));
    }

    #[test]
    fn set_gain_is_idempotent() {
        let expectations = [gain(0x02)];
        let mut tsl = Tsl2561::new(I2cMock::new(&expectations), A, RecordingDelay::default());
        assert_eq!(tsl.gain(), None);

        tsl.set_gain(Gain::X1).unwrap();
        tsl.set_gain(Gain::X1).unwrap();
        assert_eq!(tsl.gain(), Some(Gain::X1));

        let (mut i2c, delay) = tsl.destroy();
        i2c.done();
        assert_eq!(delay.total_ms(), 800);
    }

    #[test]
    fn failed_gain_write_leaves_gain_unset() {
        let expectations = [gain(0x12).with_error(ErrorKind::Other)];
        let mut tsl = Tsl2561::new(I2cMock::new(&expectations), A, RecordingDelay::default());
        assert!(tsl.set_gain(Gain::X16).is_err());
        assert_eq!(tsl.gain(), None);
        let (mut i2c, delay) = tsl.destroy();
        i2c.done();
        assert_eq!(delay.total_ms(), 0);
    }

    #[test]
    fn fixed_gain_reads_both_channels() {
        let mut expectations = vec![gain(0x12)];
        expectations.extend(channel(READ_FULL, 1000));
        expectations.extend(channel(READ_IR, 300));
        let mut tsl = Tsl2561::new(I2cMock::new(&expectations), A, RecordingDelay::default());
        tsl.set_gain(Gain::X16).unwrap();

        let lux = tsl.read_lux().unwrap();
        assert_eq!(lux, convert::lux(1000, 300));
        assert_eq!(tsl.gain(), Some(Gain::X16));
        tsl.destroy().0.done();
    }

    #[test]
    fn autorange_keeps_high_gain_when_unsaturated() {
        let mut expectations = vec![gain(0x12)];
        expectations.extend(channel(READ_FULL, 1000));
        expectations.extend(channel(READ_IR, 300));
        let mut tsl = Tsl2561::new(I2cMock::new(&expectations), A, RecordingDelay::default());

        let lux = tsl.read_lux().unwrap();
        assert_eq!(lux, convert::lux(1000, 300));
        assert_eq!(tsl.gain(), Some(Gain::X16));
        let (mut i2c, delay) = tsl.destroy();
        i2c.done();
        assert_eq!(delay.total_ms(), 800);
    }

    #[test]
    fn autorange_falls_back_on_saturated_broadband() {
        // The IR channel is skipped once broadband is pinned at 16x.
        let mut expectations = vec![gain(0x12)];
        expectations.extend(channel(READ_FULL, 0xFFFF));
        expectations.push(gain(0x02));
        expectations.extend(channel(READ_FULL, 2000));
        expectations.extend(channel(READ_IR, 600));
        let mut tsl = Tsl2561::new(I2cMock::new(&expectations), A, RecordingDelay::default());

        let lux = tsl.read_lux().unwrap();
        assert_eq!(lux, convert::lux(2000 * 16, 600 * 16));
        assert_eq!(tsl.gain(), Some(Gain::X1));
        let (mut i2c, delay) = tsl.destroy();
        i2c.done();
        assert_eq!(delay.calls(), vec![800_000_000, 800_000_000]);
    }

    #[test]
    fn autorange_falls_back_on_saturated_ir() {
        let mut expectations = vec![gain(0x12)];
        expectations.extend(channel(READ_FULL, 0x8000));
        expectations.extend(channel(READ_IR, 0xFFFF));
        expectations.push(gain(0x02));
        expectations.extend(channel(READ_FULL, 0x0800));
        expectations.extend(channel(READ_IR, 0x0900));
        let mut tsl = Tsl2561::new(I2cMock::new(&expectations), A, RecordingDelay::default());

        let lux = tsl.read_lux().unwrap();
        assert_eq!(lux, convert::lux(0x0800 * 16, 0x0900 * 16));
        assert_eq!(tsl.gain(), Some(Gain::X1));
        tsl.destroy().0.done();
    }

    #[test]
    fn chosen_gain_persists() {
        let mut expectations = vec![gain(0x12)];
        expectations.extend(channel(READ_FULL, 0xFFFF));
        expectations.push(gain(0x02));
        expectations.extend(channel(READ_FULL, 100));
        expectations.extend(channel(READ_IR, 10));
        // Second reading: no gain traffic at all.
        expectations.extend(channel(READ_FULL, 200));
        expectations.extend(channel(READ_IR, 20));
        let mut tsl = Tsl2561::new(I2cMock::new(&expectations), A, RecordingDelay::default());

        tsl.read_lux().unwrap();
        let second = tsl.read_lux().unwrap();
        assert_eq!(second, convert::lux(200 * 16, 20 * 16));
        let (mut i2c, delay) = tsl.destroy();
        i2c.done();
        assert_eq!(delay.total_ms(), 1600);
    }

    #[test]
    fn read_error_is_returned() {
        let expectations = [
            gain(0x12),
            I2cTransaction::write(A, vec![READ_FULL]),
            I2cTransaction::read(A, vec![0, 0]).with_error(ErrorKind::Other),
        ];
        let mut tsl = Tsl2561::new(I2cMock::new(&expectations), A, RecordingDelay::default());
        assert!(matches!(
            tsl.read_lux(),
            Err(Error::I2cRead(ErrorKind::Other))
        ));
        tsl.destroy().0.done();
    }

    #[test]
    fn refresher_gain_control() {
        let mut expectations = vec![gain(0x02)];
        expectations.extend(channel(READ_FULL, 1000));
        expectations.extend(channel(READ_IR, 300));
        let tsl = Tsl2561::new(I2cMock::new(&expectations), A, RecordingDelay::default());
        let mut r = Refresher::new(
            tsl,
            crate::RefreshSettings::with_interval(std::time::Duration::from_secs(3600)),
        );
        r.set_gain(Gain::X1).unwrap();
        r.set_gain(Gain::X1).unwrap();
        assert_eq!(r.gain(), Some(Gain::X1));

        r.start().unwrap();
        assert_eq!(r.lux(), Some(convert::lux(16_000, 4_800)));

        let (mut i2c, delay) = r.close().destroy();
        i2c.done();
        assert_eq!(delay.total_ms(), 800);
    }
}
