//! Raw register access to a single device on an I2c bus.

use crate::Error;
use crc_any::CRCu8;
use embedded_hal::i2c::{I2c, SevenBitAddress};

/// Exclusive handle to one device on the bus.
///
/// Each call is a blocking round-trip. Nothing here makes a write-then-read
/// pair atomic; a handle that is shared must be guarded by the caller.
pub struct BusDevice<I> {
    bus: I,
    address: SevenBitAddress,
}

impl<I> BusDevice<I>
where
    I: I2c<SevenBitAddress>,
{
    pub fn new(bus: I, address: SevenBitAddress) -> Self {
        BusDevice { bus, address }
    }

    /// Address of the device on the bus.
    pub fn address(&self) -> SevenBitAddress {
        self.address
    }

    /// Send a single command byte.
    pub fn write_command(&mut self, command: u8) -> Result<(), Error<I::Error>> {
        self.write_bytes(&[command])
    }

    /// Send a register write (or any other multi-byte frame).
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Error<I::Error>> {
        self.bus.write(self.address, bytes).map_err(Error::I2cWrite)
    }

    /// Read exactly `N` bytes back from the device.
    pub fn read_bytes<const N: usize>(&mut self) -> Result<[u8; N], Error<I::Error>> {
        let mut buffer = [0u8; N];
        self.bus
            .read(self.address, &mut buffer)
            .map_err(Error::I2cRead)?;
        Ok(buffer)
    }

    /// Release the transport.
    pub fn close(self) -> I {
        self.bus
    }
}

/// CRC-8 checker for the HTU21D measurement frame.
pub struct Crc8(CRCu8);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct InvalidCRC {
    pub computed: u8,
    pub received: u8,
}

impl core::fmt::Display for InvalidCRC {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "received: {:#04x} computed: {:#04x}", self.received, self.computed)
    }
}

impl Crc8 {
    /// x^8 + x^5 + x^4 + 1, starting from zero.
    pub fn new() -> Self {
        Crc8(CRCu8::create_crc(
            /*poly=*/ 0x31, /*bits=*/ 8, /*initial=*/ 0x00, /*final_xor=*/ 0,
            /*reflect=*/ false,
        ))
    }

    pub fn compute(&mut self, data: &[u8]) -> u8 {
        let Crc8(ref mut crc) = self;
        crc.reset();
        crc.digest(data);
        crc.get_crc()
    }

    /// Check a `[msb, lsb, crc]` frame.
    pub fn check(&mut self, frame: &[u8; 3]) -> Result<(), InvalidCRC> {
        let computed = self.compute(&frame[0..2]);
        let received = frame[2];
        if computed != received {
            Err(InvalidCRC { computed, received })
        } else {
            Ok(())
        }
    }
}

impl Default for Crc8 {
    fn default() -> Self {
        Self::new()
    }
}
