use anyhow::Context;
use clap::Parser;
use crossbeam_channel::{Receiver, bounded};
use std::io::BufRead;
use std::path::PathBuf;
use std::thread;

use bearingfit::config::{DfConfig, FitModel};
use bearingfit::output::{Formatter, OutputFormat, create_formatter};
use bearingfit::transport::parse_line;
use bearingfit::{DfError, DfProcessor};

#[derive(Parser, Debug)]
#[command(name = "bearingfit")]
#[command(about = "Fit live RSSI sweeps from two rotating antennas and triangulate the emitter", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Fit model: gaussian, cosine, polynomial[:degree]
    #[arg(short = 'm', long)]
    model: Option<FitModel>,

    /// Distance between the two stations in meters
    #[arg(short = 'b', long)]
    baseline: Option<f64>,

    /// Only sweep after an explicit start message
    #[arg(long)]
    no_auto_start: bool,

    /// Increase output verbosity
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let mut config = match &args.config {
        Some(path) => DfConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => DfConfig::default(),
    };
    if let Some(model) = args.model {
        config.fit.model = model;
    }
    if let Some(baseline) = args.baseline {
        config.triangulation.baseline_m = baseline;
    }
    if args.no_auto_start {
        config.sweep.auto_start = false;
    }

    let processor = DfProcessor::new(&config).context("invalid configuration")?;

    log::info!(
        "Stations {} / {}, baseline {} m, model {}",
        config.triangulation.station_a,
        config.triangulation.station_b,
        config.triangulation.baseline_m,
        config.fit.model
    );

    let (line_tx, line_rx) = bounded(64);

    let reader = thread::spawn(move || -> std::io::Result<()> {
        for line in std::io::stdin().lock().lines() {
            if line_tx.send(line?).is_err() {
                break;
            }
        }
        Ok(())
    });

    let formatter = create_formatter(args.format, args.verbose > 0);
    run_processing_loop(line_rx, processor, formatter.as_ref());

    match reader.join() {
        Ok(result) => result.context("reading stdin")?,
        Err(_) => anyhow::bail!("stdin reader panicked"),
    }

    Ok(())
}

fn run_processing_loop(line_rx: Receiver<String>, mut processor: DfProcessor, formatter: &dyn Formatter) {
    if let Some(header) = formatter.header() {
        println!("{}", header);
    }

    // Ends when the reader thread drops its sender
    for (index, line) in line_rx.iter().enumerate() {
        let message = match parse_line(&line) {
            Ok(Some(message)) => message,
            Ok(None) => continue,
            Err(e) => {
                log::warn!("Line {}: {}", index + 1, e);
                continue;
            }
        };

        match processor.process(message) {
            Ok(reports) => {
                for report in reports {
                    println!("{}", formatter.format(&report));
                }
            }
            Err(DfError::UnknownBoard(board)) => {
                log::warn!("Line {}: ignoring unknown board '{}'", index + 1, board)
            }
            Err(e) => log::warn!("Line {}: {}", index + 1, e),
        }
    }

    log::info!("Input closed");
}
