//! SoundSage command line
//!
//! Usage:
//!   sage-meter analyze <WAV> [--target <target>] [--json]
//!   sage-meter process <IN> <OUT> --preset <preset> [--config <json>]
//!   sage-meter presets

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sage_dsp::presets::{DynamicsPreset, EqPreset, LoudnessTarget};
use sage_meter::{AnalysisReport, DEFAULT_BLOCK_SIZE, ProcessConfig, read_wav, render, write_wav};

#[derive(Parser)]
#[command(
    name = "sage-meter",
    version,
    about = "BS.1770 loudness metering and dynamics processing"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Measure loudness, range and true peak of a WAV file
    Analyze {
        input: PathBuf,
        /// Check against a delivery target (e.g. streaming, ebu-r128)
        #[arg(short, long)]
        target: Option<LoudnessTarget>,
        /// Frames per processing block
        #[arg(long, default_value_t = DEFAULT_BLOCK_SIZE)]
        block_size: usize,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Render a WAV file through EQ and dynamics
    Process {
        input: PathBuf,
        output: PathBuf,
        /// Dynamics preset
        #[arg(short, long, required_unless_present = "config")]
        preset: Option<DynamicsPreset>,
        /// JSON chain description (overrides --preset)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// EQ bands applied before dynamics, in order
        #[arg(long)]
        eq: Vec<EqPreset>,
        /// Frames per processing block
        #[arg(long, default_value_t = DEFAULT_BLOCK_SIZE)]
        block_size: usize,
    },
    /// List presets and loudness targets
    Presets,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            input,
            target,
            block_size,
            json,
        } => run_analyze(&input, target, block_size, json),
        Commands::Process {
            input,
            output,
            preset,
            config,
            eq,
            block_size,
        } => run_process(&input, &output, preset, config.as_deref(), &eq, block_size),
        Commands::Presets => {
            list_presets();
            Ok(())
        }
    }
}

fn run_analyze(
    input: &Path,
    target: Option<LoudnessTarget>,
    block_size: usize,
    json: bool,
) -> Result<()> {
    let audio = read_wav(input)?;
    let mut report = AnalysisReport::new(input.display().to_string(), &audio, block_size)
        .with_context(|| format!("failed to analyze {}", input.display()))?;
    if let Some(target) = target {
        report = report.with_target(target);
    }

    if json {
        println!("{}", report.to_json()?);
    } else {
        println!("{report}");
    }
    Ok(())
}

fn run_process(
    input: &Path,
    output: &Path,
    preset: Option<DynamicsPreset>,
    config: Option<&Path>,
    eq: &[EqPreset],
    block_size: usize,
) -> Result<()> {
    let mut chain_config = match (config, preset) {
        (Some(path), _) => ProcessConfig::load(path)?,
        (None, Some(preset)) => ProcessConfig::from_preset(preset),
        (None, None) => anyhow::bail!("either --preset or --config is required"),
    };
    for &band in eq {
        chain_config = chain_config.with_eq(band);
    }

    let audio = read_wav(input)?;
    let before = AnalysisReport::new(input.display().to_string(), &audio, block_size)?;

    let (rendered, summary) = render(&audio, &chain_config, block_size)
        .with_context(|| format!("failed to process {}", input.display()))?;
    write_wav(output, &rendered)?;

    let after = AnalysisReport::new(output.display().to_string(), &rendered, block_size)?;
    println!(
        "{} -> {} ({} frames, {} frames latency removed)",
        input.display(),
        output.display(),
        summary.frames,
        summary.latency
    );
    println!("Max gain reduction: {:.1} dB", summary.max_gain_reduction_db);
    println!(
        "Integrated: {} -> {}",
        before.loudness.integrated, after.loudness.integrated
    );
    if let (Some(a), Some(b)) = (before.loudness.true_peak_dbtp, after.loudness.true_peak_dbtp) {
        println!("True peak:  {a:.1} -> {b:.1} dBTP");
    }
    Ok(())
}

fn list_presets() {
    println!("Dynamics presets:");
    for preset in DynamicsPreset::ALL {
        println!("  {:<20} {}", preset.name(), preset.description());
    }
    println!("\nEQ presets:");
    for preset in EqPreset::ALL {
        println!("  {:<20} {}", preset.name(), preset.description());
    }
    println!("\nLoudness targets:");
    for target in LoudnessTarget::ALL {
        println!(
            "  {:<20} {:>5.1} LUFS, ceiling {:.1} dBTP",
            target.name(),
            target.target_lufs(),
            target.true_peak_ceiling_dbtp()
        );
    }
}
