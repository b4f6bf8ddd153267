use anyhow::Context;
use clap::Parser;
use rolling_stats::Stats;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use bearingfit::config::{DfConfig, FitModel};
use bearingfit::observation::PeakEstimate;
use bearingfit::output::beam_width;
use bearingfit::session::{SweepEvent, SweepState};
use bearingfit::transport::parse_line;
use bearingfit::triangulation::TriangulationResult;
use bearingfit::{BoardMessage, DfProcessor};

#[derive(Parser, Debug)]
#[command(name = "analyze_sweep")]
#[command(about = "Replay recorded sweep logs and summarize fits and triangulation", long_about = None)]
struct Args {
    /// JSON-lines sweep logs to analyze
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Output format: text, csv, json
    #[arg(short = 'f', long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// TOML configuration file
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Fit model: gaussian, cosine, polynomial[:degree]
    #[arg(short = 'm', long)]
    model: Option<FitModel>,

    /// Distance between the two stations in meters
    #[arg(short = 'b', long)]
    baseline: Option<f64>,

    /// Increase output verbosity
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Csv,
    Json,
}

#[derive(Debug, Clone, Serialize)]
struct StatsSummary {
    count: usize,
    mean: f64,
    std_dev: f64,
    min: f64,
    max: f64,
}

impl StatsSummary {
    fn from_stats(stats: &Stats<f64>) -> Option<Self> {
        if stats.count == 0 {
            return None;
        }
        Some(Self {
            count: stats.count,
            mean: stats.mean,
            std_dev: stats.std_dev,
            min: stats.min,
            max: stats.max,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
struct BoardAnalysis {
    board: String,
    state: SweepState,
    sample_count: usize,
    rssi: Option<StatsSummary>,
    snr: Option<StatsSummary>,
    live_peak: Option<PeakEstimate>,
    reported_peak: Option<PeakEstimate>,
    fitted_peak: Option<PeakEstimate>,
    beam_width: Option<f64>,
    r2: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fit_error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct FileAnalysis {
    filename: String,
    lines: usize,
    skipped: usize,
    boards: Vec<BoardAnalysis>,
    triangulation: Option<TriangulationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    triangulation_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

struct SignalStats {
    rssi: Stats<f64>,
    snr: Stats<f64>,
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
    config.validate().context("invalid configuration")?;

    let results: Vec<FileAnalysis> = args
        .files
        .iter()
        .map(|path| analyze_file(path, &config))
        .collect();

    match args.format {
        OutputFormat::Text => print_text(&results),
        OutputFormat::Csv => print_csv(&results),
        OutputFormat::Json => print_json(&results)?,
    }

    Ok(())
}

fn analyze_file(path: &Path, config: &DfConfig) -> FileAnalysis {
    let filename = path.display().to_string();
    let mut analysis = FileAnalysis {
        filename,
        lines: 0,
        skipped: 0,
        boards: Vec::new(),
        triangulation: None,
        triangulation_error: None,
        error: None,
    };

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            analysis.error = Some(e.to_string());
            return analysis;
        }
    };

    let mut processor = match DfProcessor::new(config) {
        Ok(p) => p,
        Err(e) => {
            analysis.error = Some(e.to_string());
            return analysis;
        }
    };

    let mut stats: BTreeMap<String, SignalStats> = BTreeMap::new();

    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        analysis.lines += 1;

        let message = match parse_line(line) {
            Ok(Some(m)) => m,
            Ok(None) => {
                analysis.skipped += 1;
                continue;
            }
            Err(e) => {
                log::warn!("{}:{}: {}", analysis.filename, index + 1, e);
                analysis.skipped += 1;
                continue;
            }
        };

        record_signal(&mut stats, &message);
        if let Err(e) = processor.process(message) {
            log::warn!("{}:{}: {}", analysis.filename, index + 1, e);
            analysis.skipped += 1;
        }
    }

    analysis.boards = processor
        .sessions()
        .map(|session| {
            let signal = stats.get(session.id());
            let fit = session.fit();
            BoardAnalysis {
                board: session.id().to_string(),
                state: session.state(),
                sample_count: session.series().len(),
                rssi: signal.and_then(|s| StatsSummary::from_stats(&s.rssi)),
                snr: signal.and_then(|s| StatsSummary::from_stats(&s.snr)),
                live_peak: session.live_peak(),
                reported_peak: session.reported_peak(),
                fitted_peak: session.fitted_peak(),
                beam_width: fit.and_then(|f| beam_width(&f.parameters)),
                r2: fit.map(|f| f.quality.r2),
                fit_error: session.fit_error().map(|e| e.to_string()),
            }
        })
        .collect();

    match processor.triangulate() {
        Ok(result) => analysis.triangulation = Some(result),
        Err(e) => analysis.triangulation_error = Some(e.to_string()),
    }

    analysis
}

fn record_signal(stats: &mut BTreeMap<String, SignalStats>, message: &BoardMessage) {
    if let SweepEvent::Observation(obs) = &message.event {
        let entry = stats
            .entry(message.board.clone())
            .or_insert_with(|| SignalStats {
                rssi: Stats::new(),
                snr: Stats::new(),
            });
        entry.rssi.update(obs.rssi);
        if let Some(snr) = obs.snr {
            entry.snr.update(snr);
        }
    }
}

fn fmt_opt(value: Option<f64>, precision: usize) -> String {
    value.map_or("-".to_string(), |v| format!("{:.*}", precision, v))
}

fn print_text(results: &[FileAnalysis]) {
    for result in results {
        println!("{}", result.filename);
        if let Some(ref error) = result.error {
            println!("  Error: {}", error);
            continue;
        }
        println!("  Lines: {} ({} skipped)", result.lines, result.skipped);

        for board in &result.boards {
            println!();
            println!("  {} ({:?}, {} samples)", board.board, board.state, board.sample_count);
            if let Some(ref rssi) = board.rssi {
                println!(
                    "    RSSI: {:.1} ± {:.1} dBm (min {:.1}, max {:.1}, {} packets)",
                    rssi.mean, rssi.std_dev, rssi.min, rssi.max, rssi.count
                );
            }
            if let Some(ref snr) = board.snr {
                println!("    SNR:  {:.1} ± {:.1} dB", snr.mean, snr.std_dev);
            }
            if let Some(peak) = board.live_peak {
                println!("    Raw peak:      {:.1}° @ {:.1} dBm", peak.angle, peak.signal);
            }
            if let Some(peak) = board.reported_peak {
                println!("    Reported peak: {:.1}° @ {:.1} dBm", peak.angle, peak.signal);
            }
            match (board.fitted_peak, &board.fit_error) {
                (Some(peak), _) => println!(
                    "    Fitted peak:   {:.1}° @ {:.1} dBm (R² {}, beamwidth {}°)",
                    peak.angle,
                    peak.signal,
                    fmt_opt(board.r2, 3),
                    fmt_opt(board.beam_width, 1)
                ),
                (None, Some(error)) => println!("    No fit: {}", error),
                (None, None) => println!("    No fit: sweep not complete"),
            }
        }

        println!();
        match (&result.triangulation, &result.triangulation_error) {
            (Some(t), _) => {
                println!(
                    "  Source: ({:.2}, {:.2}) m, distances {:.2} / {:.2} m",
                    t.source_x, t.source_y, t.distance_a, t.distance_b
                );
                println!(
                    "  Triangle angles: {:.1}° / {:.1}° / {:.1}°",
                    t.interior_angles[0], t.interior_angles[1], t.interior_angles[2]
                );
            }
            (None, Some(error)) => println!("  Triangulation: {}", error),
            (None, None) => {}
        }
    }
}

fn print_csv(results: &[FileAnalysis]) {
    println!(
        "filename,board,state,samples,rssi_mean,rssi_std,snr_mean,live_peak,fitted_peak,fitted_rssi,r2,beam_width,source_x,source_y,error"
    );
    for result in results {
        let source_x = fmt_csv(result.triangulation.map(|t| t.source_x), 3);
        let source_y = fmt_csv(result.triangulation.map(|t| t.source_y), 3);

        if let Some(ref error) = result.error {
            println!("{},,,,,,,,,,,,,,\"{}\"", result.filename, error);
            continue;
        }

        for board in &result.boards {
            println!(
                "{},{},{:?},{},{},{},{},{},{},{},{},{},{},{},{}",
                result.filename,
                board.board,
                board.state,
                board.sample_count,
                fmt_csv(board.rssi.as_ref().map(|s| s.mean), 2),
                fmt_csv(board.rssi.as_ref().map(|s| s.std_dev), 2),
                fmt_csv(board.snr.as_ref().map(|s| s.mean), 2),
                fmt_csv(board.live_peak.map(|p| p.angle), 1),
                fmt_csv(board.fitted_peak.map(|p| p.angle), 2),
                fmt_csv(board.fitted_peak.map(|p| p.signal), 2),
                fmt_csv(board.r2, 4),
                fmt_csv(board.beam_width, 2),
                source_x,
                source_y,
                board
                    .fit_error
                    .as_deref()
                    .map(|e| format!("\"{}\"", e))
                    .unwrap_or_default()
            );
        }
    }
}

fn fmt_csv(value: Option<f64>, precision: usize) -> String {
    value
        .map(|v| format!("{:.*}", precision, v))
        .unwrap_or_default()
}

fn print_json(results: &[FileAnalysis]) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(results)?;
    println!("{}", json);
    Ok(())
}
