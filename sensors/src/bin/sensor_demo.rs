//! Take one reading from each sensor.

use sensors::{Htu21d, Tsl2561, HTU21D_ADDR, TSL2561_ADDR};

const BUS: u8 = 1;

fn main() {
    let mut htu = Htu21d::open(HTU21D_ADDR, BUS).expect("could not open HTU21D");
    match htu.read_climate() {
        Ok(c) => println!("{}", c),
        Err(e) => println!("HTU21D error: {}", e),
    }

    let mut tsl = Tsl2561::open(TSL2561_ADDR, BUS).expect("could not open TSL2561");
    match tsl.read_lux() {
        Ok(lux) => println!("Light: {:.1} lux (gain {:?})", lux, tsl.gain()),
        Err(e) => println!("TSL2561 error: {}", e),
    }
}
