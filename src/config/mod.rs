//! Configuration module for the duplex voice client
//!
//! Configuration comes from defaults, environment variables (a `.env` file is
//! loaded into the environment by `main`), and an optional YAML file.
//! Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//!
//! # Example
//! ```rust,no_run
//! use duplex_voice::config::ClientConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ClientConfig::from_env()?;
//!
//! // Load from YAML file with environment variable base
//! let config_path = PathBuf::from("config.yaml");
//! let config = ClientConfig::from_file(&config_path)?;
//!
//! println!("Streaming to {}", config.url);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

mod env;
mod yaml;

pub use yaml::{AudioYaml, RealtimeYaml, VadYaml, YamlConfig};

use crate::core::audio::{DEFAULT_CAPTURE_QUEUE_CAPACITY, DEFAULT_PLAYBACK_FRAME_SAMPLES};
use crate::core::realtime::session_config::{
    DEFAULT_INSTRUCTIONS, DEFAULT_TEMPERATURE, DEFAULT_TRANSCRIPTION_MODEL,
    DEFAULT_VAD_PREFIX_PADDING_MS, DEFAULT_VAD_SILENCE_DURATION_MS, DEFAULT_VAD_THRESHOLD,
};
use crate::core::realtime::{
    DEFAULT_CAPTURE_FRAME_SAMPLES, DEFAULT_PLAYBACK_BUFFER_SECONDS, DEFAULT_READ_TIMEOUT,
    MaxTokens, REALTIME_SAMPLE_RATE, REALTIME_URL, RealtimeModel, RealtimeVoice,
    SessionConfigurator, SessionSettings,
};

/// Longest accepted read timeout and ping interval.
pub const MAX_TIMER_SECS: u64 = 3600;
/// Largest accepted playback buffer.
pub const MAX_PLAYBACK_BUFFER_SECONDS: u32 = 300;
pub const MAX_SAMPLE_RATE: u32 = 192_000;
pub const MAX_CAPTURE_QUEUE_CAPACITY: usize = 10_000;

/// Client configuration
///
/// Contains everything needed to run one duplex session:
/// - Realtime service connection (endpoint, model, credential)
/// - Session negotiation (voice, instructions, VAD, sampling)
/// - Audio endpoint sizing (frame sizes, queue and buffer capacity)
#[derive(Clone)]
pub struct ClientConfig {
    // Realtime connection
    pub api_key: String,
    pub url: String,
    pub model: String,
    /// Seconds without any inbound frame before the connection is declared dead
    pub read_timeout_secs: u64,
    /// Client ping interval; `None` disables client pings
    pub ping_interval_secs: Option<u64>,

    // Session negotiation
    pub voice: RealtimeVoice,
    pub instructions: String,
    pub transcription_model: String,
    pub temperature: f32,
    pub max_response_output_tokens: MaxTokens,
    pub vad_threshold: f32,
    pub vad_prefix_padding_ms: u32,
    pub vad_silence_duration_ms: u32,

    // Audio endpoints
    pub sample_rate: u32,
    pub capture_frame_samples: usize,
    pub capture_queue_capacity: usize,
    pub playback_frame_samples: usize,
    /// Playback ring buffer size in seconds of audio
    pub playback_buffer_seconds: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            url: REALTIME_URL.to_string(),
            model: RealtimeModel::default().as_str().to_string(),
            read_timeout_secs: DEFAULT_READ_TIMEOUT.as_secs(),
            ping_interval_secs: None,
            voice: RealtimeVoice::default(),
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            transcription_model: DEFAULT_TRANSCRIPTION_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_response_output_tokens: MaxTokens::default(),
            vad_threshold: DEFAULT_VAD_THRESHOLD,
            vad_prefix_padding_ms: DEFAULT_VAD_PREFIX_PADDING_MS,
            vad_silence_duration_ms: DEFAULT_VAD_SILENCE_DURATION_MS,
            sample_rate: REALTIME_SAMPLE_RATE,
            capture_frame_samples: DEFAULT_CAPTURE_FRAME_SAMPLES,
            capture_queue_capacity: DEFAULT_CAPTURE_QUEUE_CAPACITY,
            playback_frame_samples: DEFAULT_PLAYBACK_FRAME_SAMPLES,
            playback_buffer_seconds: DEFAULT_PLAYBACK_BUFFER_SECONDS,
        }
    }
}

/// Zeroize the API key when the configuration is dropped.
impl Drop for ClientConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        self.api_key.zeroize();
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &if self.api_key.is_empty() { "" } else { "[REDACTED]" })
            .field("url", &self.url)
            .field("model", &self.model)
            .field("read_timeout_secs", &self.read_timeout_secs)
            .field("ping_interval_secs", &self.ping_interval_secs)
            .field("voice", &self.voice)
            .field("transcription_model", &self.transcription_model)
            .field("temperature", &self.temperature)
            .field("max_response_output_tokens", &self.max_response_output_tokens)
            .field("vad_threshold", &self.vad_threshold)
            .field("vad_prefix_padding_ms", &self.vad_prefix_padding_ms)
            .field("vad_silence_duration_ms", &self.vad_silence_duration_ms)
            .field("sample_rate", &self.sample_rate)
            .field("capture_frame_samples", &self.capture_frame_samples)
            .field("capture_queue_capacity", &self.capture_queue_capacity)
            .field("playback_frame_samples", &self.playback_frame_samples)
            .field("playback_buffer_seconds", &self.playback_buffer_seconds)
            .finish()
    }
}

impl ClientConfig {
    /// Load configuration from environment variables on top of defaults
    ///
    /// # Errors
    /// Returns an error if a variable has an invalid format or the resulting
    /// configuration fails validation.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let mut config = Self::default();
        env::apply_env(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml_config = YamlConfig::from_file(path)?;

        let mut config = Self::default();
        env::apply_env(&mut config)?;
        yaml_config.apply_to(&mut config);

        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    ///
    /// The API key is not checked here; session construction rejects a
    /// missing key.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.vad_threshold) {
            return Err(format!(
                "VAD threshold must be within [0, 1], got {}",
                self.vad_threshold
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(format!(
                "Temperature must be within [0, 2], got {}",
                self.temperature
            ));
        }
        if let MaxTokens::Infinite(value) = &self.max_response_output_tokens
            && value != "inf"
        {
            return Err(format!(
                "max_response_output_tokens must be a number or \"inf\", got {value:?}"
            ));
        }

        let sizes = [
            ("read_timeout_secs", self.read_timeout_secs as usize),
            ("sample_rate", self.sample_rate as usize),
            ("capture_frame_samples", self.capture_frame_samples),
            ("capture_queue_capacity", self.capture_queue_capacity),
            ("playback_frame_samples", self.playback_frame_samples),
            ("playback_buffer_seconds", self.playback_buffer_seconds as usize),
        ];
        if let Some((name, _)) = sizes.iter().find(|(_, value)| *value == 0) {
            return Err(format!("{name} must be greater than zero"));
        }

        let limits = [
            ("read_timeout_secs", self.read_timeout_secs, MAX_TIMER_SECS),
            (
                "ping_interval_secs",
                self.ping_interval_secs.unwrap_or(1),
                MAX_TIMER_SECS,
            ),
            (
                "playback_buffer_seconds",
                u64::from(self.playback_buffer_seconds),
                u64::from(MAX_PLAYBACK_BUFFER_SECONDS),
            ),
            ("sample_rate", u64::from(self.sample_rate), u64::from(MAX_SAMPLE_RATE)),
            (
                "capture_queue_capacity",
                self.capture_queue_capacity as u64,
                MAX_CAPTURE_QUEUE_CAPACITY as u64,
            ),
            // At most one second per frame
            (
                "capture_frame_samples",
                self.capture_frame_samples as u64,
                u64::from(self.sample_rate),
            ),
            (
                "playback_frame_samples",
                self.playback_frame_samples as u64,
                u64::from(self.sample_rate),
            ),
        ];
        if let Some((name, value, max)) = limits.iter().find(|(_, value, max)| value > max) {
            return Err(format!("{name} must be at most {max}, got {value}"));
        }
        if self.ping_interval_secs == Some(0) {
            return Err("ping_interval_secs must be greater than zero".to_string());
        }

        Ok(())
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn ping_interval(&self) -> Option<Duration> {
        self.ping_interval_secs.map(Duration::from_secs)
    }

    /// Capacity of the playback ring buffer in samples.
    pub fn playback_capacity_samples(&self) -> usize {
        (self.sample_rate as usize).saturating_mul(self.playback_buffer_seconds as usize)
    }

    /// Session negotiation parameters derived from this configuration.
    pub fn configurator(&self) -> SessionConfigurator {
        SessionConfigurator {
            instructions: self.instructions.clone(),
            voice: self.voice,
            transcription_model: self.transcription_model.clone(),
            vad_threshold: self.vad_threshold,
            prefix_padding_ms: self.vad_prefix_padding_ms,
            silence_duration_ms: self.vad_silence_duration_ms,
            create_response: true,
            tool_choice: SessionConfigurator::default().tool_choice,
            temperature: self.temperature,
            max_response_output_tokens: self.max_response_output_tokens.clone(),
        }
    }

    /// Everything a [`crate::core::realtime::DuplexSession`] needs to connect.
    pub fn session_settings(&self) -> SessionSettings {
        let mut settings = SessionSettings::new(self.api_key.clone());
        settings.url = self.url.clone();
        settings.model = self.model.clone();
        settings.read_timeout = self.read_timeout();
        settings.ping_interval = self.ping_interval();
        settings.configurator = self.configurator();
        settings
    }
}
