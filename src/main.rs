// Copyright (c) Meta Platforms, Inc. and affiliates.

// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use log::info;
use log::warn;

use fft_stress::harness;
use fft_stress::transform;
use fft_stress::Config;
use fft_stress::Shutdown;
use fft_stress::TransformSize;

/// fft_stress: Saturate CPU cores with floating-point FFT work
///
/// Starts one worker thread per requested core. Each worker repeatedly
/// generates a synthetic complex signal, runs a recursive radix-2 FFT over
/// it and transforms it back. Transform sizes are assigned round-robin from
/// a small menu (8 to 1024 points by default), so the workers mix short and
/// long round-trips.
///
/// Aggregate throughput is printed at a fixed interval. Ctrl-C or SIGTERM
/// stops every worker at its next round-trip boundary, after which the
/// final statistics are printed.
///
/// Before any load is generated, the transform checks itself on a fixed
/// 8-point fixture and refuses to run if the round-trip error is too large.
#[derive(Debug, Parser)]
#[command(version)]
struct Opts {
    /// Number of cores to load. Clamped to the number of available CPUs.
    #[clap(
        allow_negative_numbers = true,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    cores: u32,

    /// Throughput reporting interval in seconds.
    #[clap(
        short = 'i',
        long,
        allow_negative_numbers = true,
        default_value = "2.0",
        value_parser = parse_secs
    )]
    interval: Duration,

    /// Stop after this many seconds instead of waiting for Ctrl-C.
    #[clap(short = 'd', long, allow_negative_numbers = true, value_parser = parse_secs)]
    duration: Option<Duration>,

    /// Comma separated transform sizes handed out to workers round-robin.
    /// Each must be a power of two. Defaults to 8,16,32,64,128,256,512,1024.
    #[clap(short = 's', long, value_delimiter = ',', value_parser = parse_size)]
    sizes: Vec<TransformSize>,

    /// Enable verbose output. Specify multiple times to increase verbosity.
    #[clap(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_secs(s: &str) -> Result<Duration, String> {
    let secs: f64 = s
        .parse()
        .map_err(|e| format!("invalid number of seconds {:?} ({})", s, e))?;
    match Duration::try_from_secs_f64(secs) {
        Ok(d) if !d.is_zero() => Ok(d),
        _ => Err(format!("{} is not a positive number of seconds", s)),
    }
}

fn parse_size(s: &str) -> Result<TransformSize, String> {
    s.parse::<TransformSize>().map_err(|e| e.to_string())
}

// Usage errors exit with 1 rather than clap's default of 2.
fn parse_opts() -> Opts {
    match Opts::try_parse() {
        Ok(opts) => opts,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    }
}

fn init_logging(verbose: u8) -> Result<()> {
    let llv = match verbose {
        0 => simplelog::LevelFilter::Info,
        1 => simplelog::LevelFilter::Debug,
        _ => simplelog::LevelFilter::Trace,
    };
    let mut lcfg = simplelog::ConfigBuilder::new();
    lcfg.set_time_level(simplelog::LevelFilter::Error)
        .set_location_level(simplelog::LevelFilter::Off)
        .set_target_level(simplelog::LevelFilter::Off)
        .set_thread_level(simplelog::LevelFilter::Off);
    simplelog::TermLogger::init(
        llv,
        lcfg.build(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )?;
    Ok(())
}

fn main() -> Result<()> {
    let opts = parse_opts();
    init_logging(opts.verbose)?;

    let requested = opts.cores as usize;
    let available = harness::available_cores();
    let workers = harness::clamp_workers(requested, available);
    if workers < requested {
        warn!(
            "System only supports {} cores, limiting to that value",
            available
        );
    }

    let shutdown = Shutdown::new();
    shutdown.install_handler()?;

    let sizes = if opts.sizes.is_empty() {
        transform::default_sizes()
    } else {
        opts.sizes
    };
    let config = Config {
        workers,
        sizes,
        interval: opts.interval,
        duration: opts.duration,
    };

    let summary = harness::run(&config, &shutdown)?;
    summary.format(&mut std::io::stdout())?;
    info!("CPU stress test finished");
    Ok(())
}
