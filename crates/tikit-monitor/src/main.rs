//! TI kit board monitor
//!
//! Keeps one board connected, polls it once per second and answers its
//! `load_timer_data` requests from the persisted store.
//!
//! Usage: `tikit-monitor [CONFIG.json] [--demo] [--ticks N]`
//!
//! Without a config file the port is taken from `TIKIT_PORT`.

mod monitor;

use anyhow::{bail, Context};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use tikit_core::protocol::mock::MockBoard;
use tikit_core::{BoardDriver, EndpointConfig};

const POLL_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_PORT: &str = "/dev/ttyACM0";

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    demo: bool,
    ticks: Option<u64>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = Args::default();
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--demo" => args.demo = true,
            "--ticks" => {
                let n = iter.next().context("--ticks needs a value")?;
                args.ticks = Some(n.parse().with_context(|| format!("bad tick count '{n}'"))?);
            }
            flag if flag.starts_with("--") => bail!("unknown option {flag}"),
            path => args.config = Some(PathBuf::from(path)),
        }
    }
    Ok(args)
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = parse_args()?;

    let config = match &args.config {
        Some(path) => EndpointConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => EndpointConfig::new(
            std::env::var("TIKIT_PORT").unwrap_or_else(|_| DEFAULT_PORT.to_string()),
        ),
    };

    let (mut driver, ticks) = if args.demo {
        tracing::info!("Demo mode: using a simulated board");
        let board = MockBoard::new();
        board.push_inbound(b"load_timer_data\ntimer_finished\n");
        let driver = BoardDriver::with_connector(config, Box::new(board.connector()))?;
        (driver, args.ticks.or(Some(5)))
    } else {
        (BoardDriver::new(config)?, args.ticks)
    };

    tracing::info!("Monitoring board on {}", driver.config().port_name);
    if driver.connect_with_retries(None).is_connected() {
        monitor::seed_defaults(&mut driver);
    }

    let mut count = 0u64;
    loop {
        let report = monitor::tick(&mut driver);
        tracing::debug!("tick {}: {:?}", count, report);

        count += 1;
        if ticks.is_some_and(|max| count >= max) {
            break;
        }
        std::thread::sleep(POLL_INTERVAL);
    }

    let counters = driver.counters();
    tracing::info!(
        "Done: {} frame(s) sent, {} frame(s) received",
        counters.tx_frames,
        counters.rx_frames
    );
    Ok(())
}
