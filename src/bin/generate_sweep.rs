use anyhow::{Context, Result};
use bearingfit::simulation::{NoiseConfig, Scenario};
use clap::Parser;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "generate_sweep")]
#[command(about = "Generate synthetic two-station sweep logs for DF testing")]
struct Args {
    /// TOML scenario file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, default_value = "data/synthetic")]
    output_dir: PathBuf,

    /// Write a single trial to stdout instead of files
    #[arg(long)]
    stdout: bool,

    /// Source positions: "x,y" pairs separated by ';' (e.g. "3,4;5,5")
    #[arg(short = 'p', long)]
    sources: Option<String>,

    /// Number of trials per source
    #[arg(short, long, default_value_t = 1)]
    trials: u32,

    /// Base seed for reproducibility
    #[arg(short, long)]
    seed: Option<u64>,

    /// Distance between the stations in meters (overrides the scenario)
    #[arg(short, long)]
    baseline: Option<f64>,

    /// Antenna step in degrees (overrides the scenario)
    #[arg(long)]
    step: Option<f64>,

    /// RSSI noise standard deviation in dB (CLI override)
    #[arg(long)]
    noise_db: Option<f64>,

    /// Packet loss probability 0.0-1.0 (CLI override)
    #[arg(long)]
    dropout: Option<f64>,

    /// Append each board's stored sweep after its rotation summary
    #[arg(long)]
    final_dump: bool,

    /// Output filename prefix
    #[arg(long, default_value = "sweep")]
    prefix: String,

    /// Generate manifest.json
    #[arg(long)]
    manifest: bool,
}

#[derive(Debug, serde::Serialize)]
struct ManifestEntry {
    file: String,
    source_x: f64,
    source_y: f64,
    bearing_a: f64,
    bearing_b: f64,
    trial: u32,
    seed: u64,
}

#[derive(Debug, serde::Serialize)]
struct Manifest {
    baseline_m: f64,
    step_deg: f64,
    files: Vec<ManifestEntry>,
}

fn parse_sources(s: &str) -> Result<Vec<(f64, f64)>> {
    s.split(';')
        .filter(|p| !p.trim().is_empty())
        .map(|pair| {
            let (x, y) = pair
                .split_once(',')
                .with_context(|| format!("Invalid source '{}', expected 'x,y'", pair))?;
            let x: f64 = x.trim().parse().context("Invalid x value")?;
            let y: f64 = y.trim().parse().context("Invalid y value")?;
            Ok((x, y))
        })
        .collect()
}

fn load_scenario(args: &Args) -> Result<Scenario> {
    let mut scenario = match args.config {
        Some(ref path) => {
            let content = fs::read_to_string(path).context("Failed to read config file")?;
            Scenario::from_toml_str(&content).context("Failed to parse config file")?
        }
        None => Scenario::default(),
    };

    if let Some(baseline) = args.baseline {
        scenario.baseline_m = baseline;
    }
    if let Some(step) = args.step {
        scenario.step_deg = step;
    }
    if let Some(noise_db) = args.noise_db {
        scenario.noise = scenario.noise.with_rssi_noise(noise_db);
    }
    if let Some(dropout) = args.dropout {
        scenario.noise = scenario.noise.with_dropouts(dropout);
    }
    if args.final_dump {
        scenario.final_dump = true;
    }
    Ok(scenario)
}

fn render(scenario: &Scenario) -> Result<String> {
    let mut out = String::new();
    for message in scenario.wire_messages()? {
        out.push_str(&message.encode()?);
        out.push('\n');
    }
    Ok(out)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let base = load_scenario(&args)?;

    let sources = match args.sources {
        Some(ref s) => parse_sources(s)?,
        None => vec![(base.source_x, base.source_y)],
    };
    if sources.is_empty() {
        anyhow::bail!("No source positions given");
    }
    let base_seed = args.seed.or(base.noise.seed).unwrap_or(0);

    if args.stdout {
        let (x, y) = sources[0];
        let scenario = base
            .clone()
            .with_source(x, y)
            .with_noise(NoiseConfig {
                seed: Some(base_seed),
                ..base.noise.clone()
            });
        std::io::stdout()
            .write_all(render(&scenario)?.as_bytes())
            .context("Failed to write output")?;
        return Ok(());
    }

    fs::create_dir_all(&args.output_dir).context("Failed to create output directory")?;

    let mut manifest_entries = Vec::new();
    let total_files = sources.len() * args.trials as usize;
    let mut file_count = 0;

    for (index, &(x, y)) in sources.iter().enumerate() {
        for trial in 0..args.trials {
            let seed = base_seed + trial as u64 * 1000 + index as u64;
            let scenario = base.clone().with_source(x, y).with_noise(NoiseConfig {
                seed: Some(seed),
                ..base.noise.clone()
            });
            let (bearing_a, bearing_b) = scenario.bearings()?;

            let filename = format!("{}_s{:02}_t{:02}.jsonl", args.prefix, index, trial);
            let filepath = args.output_dir.join(&filename);
            fs::write(&filepath, render(&scenario)?).context("Failed to write sweep log")?;

            manifest_entries.push(ManifestEntry {
                file: filename,
                source_x: x,
                source_y: y,
                bearing_a,
                bearing_b,
                trial,
                seed,
            });

            file_count += 1;
            eprint!("\rGenerating: {}/{}", file_count, total_files);
        }
    }
    eprintln!();

    if args.manifest {
        let manifest = Manifest {
            baseline_m: base.baseline_m,
            step_deg: base.step_deg,
            files: manifest_entries,
        };
        let manifest_path = args.output_dir.join("manifest.json");
        let manifest_json =
            serde_json::to_string_pretty(&manifest).context("Failed to serialize manifest")?;
        fs::write(&manifest_path, manifest_json).context("Failed to write manifest")?;
        eprintln!("Manifest written to: {}", manifest_path.display());
    }

    eprintln!(
        "Generated {} files in {}",
        total_files,
        args.output_dir.display()
    );
    Ok(())
}
