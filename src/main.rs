use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail};
use clap::Parser;
use tracing::info;

use duplex_voice::ClientConfig;
use duplex_voice::core::audio::{
    PlaybackClock, PlaybackSink, WavRecorder, capture_channel, read_wav, spawn_file_capture,
    spawn_usage_monitor,
};
use duplex_voice::core::realtime::DuplexSession;

/// Full-duplex realtime voice client driven by WAV files
#[derive(Parser, Debug)]
#[command(name = "duplex-voice")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// PCM16 mono WAV file used as the microphone
    #[arg(short = 'i', long = "input", value_name = "WAV")]
    input: PathBuf,

    /// Record assistant audio to this WAV file
    #[arg(short = 'o', long = "record-output", value_name = "WAV")]
    record_output: Option<PathBuf>,

    /// Push input frames as fast as the queue accepts them instead of in real time
    #[arg(long = "no-pace")]
    no_pace: bool,

    /// Seconds between capture queue usage reports
    #[arg(
        long = "monitor-interval",
        value_name = "SECS",
        default_value_t = 5,
        value_parser = clap::value_parser!(u64).range(1..=3600)
    )]
    monitor_interval: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Initialize crypto provider for TLS connections
    // This must be done before any TLS connections are attempted
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install default crypto provider"))?;

    let cli = Cli::parse();

    // Load configuration from file or environment
    let config = if let Some(config_path) = cli.config.as_ref() {
        info!("Loading configuration from {}", config_path.display());
        ClientConfig::from_file(config_path).map_err(|e| anyhow!(e.to_string()))?
    } else {
        ClientConfig::from_env().map_err(|e| anyhow!(e.to_string()))?
    };

    let clip = read_wav(&cli.input)?;
    if clip.sample_rate != config.sample_rate {
        bail!(
            "{} is {} Hz but the session expects {} Hz",
            cli.input.display(),
            clip.sample_rate,
            config.sample_rate
        );
    }
    info!(
        file = %cli.input.display(),
        samples = clip.samples.len(),
        "Loaded capture input"
    );

    // Capture side: file frames -> bounded queue -> session
    let (producer, capture) =
        capture_channel(config.capture_queue_capacity, config.capture_frame_samples);
    let monitor = spawn_usage_monitor(
        producer.clone(),
        Duration::from_secs(cli.monitor_interval),
    );
    let file_capture = spawn_file_capture(clip, producer, !cli.no_pace);
    let capture_done = tokio::spawn(async move {
        let stats = file_capture.await;
        // The monitor holds a producer; dropping it closes the capture stream
        monitor.abort();
        stats
    });

    // Playback side: session -> ring buffer -> steady clock -> optional recording
    let playback = PlaybackSink::with_capacity(config.playback_capacity_samples());
    let recorder = match cli.record_output.as_ref() {
        Some(path) => Some(WavRecorder::create(path, config.sample_rate)?),
        None => None,
    };
    let clock = PlaybackClock::spawn(
        playback.clone(),
        config.playback_frame_samples,
        config.sample_rate,
        recorder,
    );

    let mut session = DuplexSession::new(config.session_settings())?;
    session.attach_capture(capture).attach_playback(playback.clone());

    let outcome = tokio::select! {
        result = session.start() => result.map(Some),
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down");
            Ok(None)
        }
    };

    let played = clock.stop().await?;
    capture_done.abort();

    let buffer = playback.stats();
    info!(
        played_samples = played,
        overwritten = buffer.samples_overwritten,
        underruns = buffer.underruns,
        "Playback finished"
    );

    match outcome {
        Ok(Some(stats)) => {
            info!(
                sent = stats.chunks_sent,
                gated = stats.chunks_gated,
                deltas = stats.deltas_received,
                "Session complete"
            );
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(e) => Err(e.into()),
    }
}
