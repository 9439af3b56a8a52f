//! Log temperature, humidity and light until interrupted.
//!
//! Usage: `monitor [BUS] [INTERVAL_SECS]`; defaults to bus 1, every 10s.

use std::time::Duration;

use linux_embedded_hal::{Delay, I2cdev};
use monitor::atmosphere::CombinedSampler;
use sensors::{
    signal::StopSignal, Htu21d, RefreshSettings, Refresher, Tsl2561, HTU21D_ADDR, TSL2561_ADDR,
};

type Climate = Refresher<Htu21d<I2cdev, Delay>>;
type Light = Refresher<Tsl2561<I2cdev, Delay>>;

fn arg<T>(arg: Option<String>, default: T, parse: impl FnOnce(&str) -> Result<T, String>) -> T {
    match arg {
        Some(s) => parse(&s).unwrap_or_else(|e| {
            eprintln!("{}", e);
            std::process::exit(2)
        }),
        None => default,
    }
}

fn main() {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let bus: u8 = arg(args.next(), 1, |s| {
        s.parse()
            .map_err(|e| format!("invalid bus {:?}: {}", s, e))
    });
    let interval = arg(args.next(), Duration::from_secs(10), monitor::parse_interval);

    let stop = StopSignal::new();
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || {
            tracing::info!("got SIGINT, stopping");
            stop.stop();
        })
        .expect("could not set SIGINT handler");
    }

    let settings = RefreshSettings::with_interval(interval);
    let climate: Climate = Refresher::new(
        Htu21d::open(HTU21D_ADDR, bus).expect("could not open HTU21D"),
        settings.clone(),
    );
    let light: Light = Refresher::new(
        Tsl2561::open(TSL2561_ADDR, bus).expect("could not open TSL2561"),
        settings,
    );

    let mut sampler = CombinedSampler { climate, light };
    sampler.climate.start().expect("could not start HTU21D refresh");
    sampler.light.start().expect("could not start TSL2561 refresh");

    let every = sampler.climate.interval();
    tracing::info!("sampling /dev/i2c-{} every {:?}", bus, every);
    monitor::run(&stop, &mut sampler, every);

    let CombinedSampler { climate, light } = sampler;
    climate.close().destroy();
    light.close().destroy();

    tracing::info!("shut down");
}
