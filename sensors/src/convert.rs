//! Conversion from raw register words to physical units.
//!
//! Everything here is pure single-precision arithmetic, evaluated in the
//! same order as the datasheet formulas so results are reproducible bit for
//! bit.

use crate::tsl2561::Gain;

/// Full scale of a 16-bit measurement word.
const FULL_SCALE: f32 = 65536.0;

/// Saturated reading of a TSL2561 channel.
pub const SATURATED: u16 = 0xFFFF;

/// Combine an HTU21D `[msb, lsb, crc]` frame into a measurement word,
/// clearing the two status bits.
pub fn htu21d_word(frame: &[u8; 3]) -> u16 {
    u16::from_be_bytes([frame[0], frame[1]]) & 0xFFFC
}

/// Combine a TSL2561 `[low, high]` channel read.
pub fn tsl2561_word(bytes: [u8; 2]) -> u16 {
    u16::from_le_bytes(bytes)
}

/// Temperature in degrees Celsius from an HTU21D word.
pub fn temperature(raw: u16) -> f32 {
    let raw = raw & 0xFFFC;
    -46.85 + 175.72 * (raw as f32 / FULL_SCALE)
}

/// Relative humidity (percent) from an HTU21D word.
pub fn humidity(raw: u16) -> f32 {
    let raw = raw & 0xFFFC;
    -6.0 + 125.0 * (raw as f32 / FULL_SCALE)
}

/// Rescale a channel read at `gain` to the 16x reference scale.
pub fn normalize(raw: u16, gain: Gain) -> u32 {
    match gain {
        Gain::X1 => raw as u32 * 16,
        Gain::X16 => raw as u32,
    }
}

/// Segment of the empirical lux curve, selected by the IR / broadband ratio.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LuxBand {
    /// ratio in [0, 0.52]
    Visible,
    /// ratio in (0.52, 0.65]
    Mixed,
    /// ratio in (0.65, 0.80]
    Warm,
    /// ratio in (0.80, 1.3]
    Infrared,
    /// ratio above 1.3; no visible light to speak of.
    Dark,
}

impl LuxBand {
    /// Select the band for a ratio. Upper bounds are inclusive.
    pub fn for_ratio(ratio: f32) -> LuxBand {
        if ratio <= 0.52 {
            LuxBand::Visible
        } else if ratio <= 0.65 {
            LuxBand::Mixed
        } else if ratio <= 0.80 {
            LuxBand::Warm
        } else if ratio <= 1.3 {
            LuxBand::Infrared
        } else {
            LuxBand::Dark
        }
    }
}

/// Illuminance in lux from normalized (16x scale) channel counts.
///
/// A zero broadband count is reported as 0 lux rather than a non-finite
/// ratio.
pub fn lux(ambient: u32, ir: u32) -> f32 {
    if ambient == 0 {
        return 0.0;
    }
    let ambient = ambient as f32;
    let ir = ir as f32;
    let ratio = ir / ambient;

    match LuxBand::for_ratio(ratio) {
        LuxBand::Visible => {
            let curve = (ratio as f64).powf(1.4) as f32;
            (0.0315 * ambient) - (0.0593 * ambient * curve)
        }
        LuxBand::Mixed => (0.0229 * ambient) - (0.0291 * ir),
        LuxBand::Warm => (0.0157 * ambient) - (0.018 * ir),
        LuxBand::Infrared => (0.00338 * ambient) - (0.0026 * ir),
        LuxBand::Dark => 0.0,
    }
}
