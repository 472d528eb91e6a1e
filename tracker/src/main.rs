use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracker::{
    config, consume, frames_for, load_recording, write_simulation, AppConfig, OutputFormat,
    PoseWriter, Replay, Session,
};

#[derive(Parser, Debug)]
#[command(name = "armtrack", about = "Reconstruct arm poses from IMU orientation recordings")]
struct Args {
    /// TOML config (defaults are used if the file does not exist)
    #[arg(long, short, default_value = "armtrack.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve every frame of a recording
    Replay {
        #[command(flatten)]
        io: IoArgs,
    },
    /// Play a recording back at the configured rate through the frame slot
    Live {
        #[command(flatten)]
        io: IoArgs,

        /// Override the playback rate from the config
        #[arg(long)]
        rate: Option<f64>,
    },
    /// Write a synthetic bicep curl for the configured sensors as a combined CSV
    Simulate {
        /// Destination CSV
        output: PathBuf,

        /// Number of frames to generate
        #[arg(long, default_value_t = 200)]
        frames: usize,
    },
    /// Write the default config and exit
    InitConfig {
        /// Overwrite an existing file
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

#[derive(clap::Args, Debug)]
struct IoArgs {
    /// Combined `<sensor>_WXYZ` CSV (not needed for the movella format)
    input: Option<PathBuf>,

    /// Write poses here instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,

    /// Override the decimation stride from the config
    #[arg(long)]
    stride: Option<usize>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match args.command {
        Command::InitConfig { force } => init_config(&args.config, force),
        Command::Simulate { output, frames } => {
            let config = config::load_config(&args.config)?;
            write_simulation(&config, &output, frames)?;
            Ok(())
        }
        Command::Replay { io } => {
            let config = with_overrides(config::load_config(&args.config)?, &io);
            let session = prepare(&config, &io)?;
            let report = session.run();

            let mut writer = PoseWriter::new(open_output(io.output.as_deref())?, io.format);
            for (index, pose) in &report.poses {
                writer.write(*index as u64, pose)?;
            }
            writer.flush()?;
            log::info!("Wrote {} poses", writer.frames());
            Ok(())
        }
        Command::Live { io, rate } => {
            let mut config = with_overrides(config::load_config(&args.config)?, &io);
            if let Some(rate) = rate {
                config.replay.rate_hz = rate;
            }
            let (tracker, frames) = prepare(&config, &io)?.into_parts();

            let mut writer = PoseWriter::new(open_output(io.output.as_deref())?, io.format);
            let (mut replay, reader) = Replay::start(frames, config.replay.rate_hz);
            let mut result = Ok(());
            let missed = consume(reader, &tracker, |sequence, pose| {
                if result.is_ok() {
                    // sequence numbers start at 1
                    result = writer.write(sequence - 1, &pose).and_then(|_| writer.flush());
                }
            });
            let published = replay.join();
            result?;

            let stats = tracker.stats();
            log::info!(
                "Published {} frames, resolved {}, rejected {}, missed {}",
                published,
                stats.frames_resolved,
                stats.frames_rejected,
                missed
            );
            Ok(())
        }
    }
}

fn with_overrides(mut config: AppConfig, io: &IoArgs) -> AppConfig {
    if let Some(stride) = io.stride {
        config.replay.stride = stride;
    }
    config
}

fn prepare(config: &AppConfig, io: &IoArgs) -> Result<Session> {
    let recording = load_recording(config, io.input.as_deref())?;
    let frames = frames_for(config, &recording)?;
    log::info!("{} frames ready", frames.len());
    Session::new(config, frames)
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    })
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    config::save_config(&AppConfig::default(), path)
}
