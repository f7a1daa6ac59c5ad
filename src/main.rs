use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use voxlink::audio::{samples_to_wav, AudioCapture, AudioOutput, PlaybackClock, PlaybackScheduler};
use voxlink::SessionConfig;

/// Voxlink - real-time duplex voice session controller
#[derive(Parser)]
#[command(name = "voxlink", version, about)]
struct Cli {
    /// Path to a session config TOML file
    #[arg(short, long, env = "VOXLINK_CONFIG")]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,

        /// Write the captured audio to this WAV file
        #[arg(short, long, default_value = "voxlink-mic-test.wav")]
        output: PathBuf,
    },
    /// Test speaker output through the playback scheduler
    TestSpeaker,
    /// Validate a config file and print the effective settings
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "voxlink=info",
        1 => "voxlink=debug",
        _ => "voxlink=trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .init();

    let config = match &cli.config {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::default(),
    };

    match cli.command {
        Command::TestMic { duration, output } => test_mic(&config, duration, &output).await,
        Command::TestSpeaker => test_speaker(&config).await,
        Command::CheckConfig => {
            config.validate()?;
            println!("{config:#?}");
            Ok(())
        }
    }
}

/// Capture from the default microphone and write a WAV file
async fn test_mic(config: &SessionConfig, duration: u64, output: &Path) -> anyhow::Result<()> {
    let (block_tx, mut block_rx) = tokio::sync::mpsc::channel(64);

    let mut capture = AudioCapture::new(config.input_sample_rate)?;
    capture.start(block_tx)?;
    println!("recording for {duration}s...");

    let mut samples = Vec::new();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(duration);
    loop {
        tokio::select! {
            () = tokio::time::sleep_until(deadline) => break,
            block = block_rx.recv() => match block {
                Some(block) => samples.extend(block),
                None => break,
            },
        }
    }
    capture.stop();

    let level = voxlink::audio::rms(&samples);
    println!("captured {} samples, rms level {level:.4}", samples.len());

    let wav = samples_to_wav(&samples, config.input_sample_rate)?;
    std::fs::write(output, wav)?;
    println!("wrote {}", output.display());
    Ok(())
}

/// Play a short tone through the jitter-buffered scheduler
async fn test_speaker(config: &SessionConfig) -> anyhow::Result<()> {
    let (scheduler, _events) =
        PlaybackScheduler::new(config.output_sample_rate, config.jitter_latency());
    let scheduler = Arc::new(scheduler);

    let mut output = AudioOutput::new(config.output_sample_rate)?;
    let clock = output.clock();
    output.start(Arc::clone(&scheduler))?;

    let rate = config.output_sample_rate;
    let tone: Vec<f32> = (0..rate)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let t = i as f32 / rate as f32;
            0.3 * (2.0 * std::f32::consts::PI * 440.0 * t).sin()
        })
        .collect();

    println!("playing a 1s tone...");
    scheduler.push(tone, clock.now());
    tokio::time::sleep(Duration::from_millis(1500) + config.jitter_latency()).await;
    output.stop();
    Ok(())
}
