use serde::Deserialize;
use std::path::PathBuf;

use super::ClientConfig;
use crate::core::realtime::{MaxTokens, RealtimeVoice};

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values present in
/// the file override environment variables and defaults.
///
/// # Example YAML structure
/// ```yaml
/// realtime:
///   api_key: "sk-..."
///   url: "wss://api.openai.com/v1/realtime"
///   model: "gpt-4o-realtime-preview-2024-12-17"
///   voice: "ash"
///   instructions: "You are a helpful assistant."
///   transcription_model: "whisper-1"
///   temperature: 0.8
///   max_response_output_tokens: "inf"
///   read_timeout_secs: 60
///   ping_interval_secs: 20
///
/// audio:
///   sample_rate: 24000
///   capture_frame_samples: 1920
///   capture_queue_capacity: 50
///   playback_frame_samples: 480
///   playback_buffer_seconds: 30
///
/// vad:
///   threshold: 0.75
///   prefix_padding_ms: 300
///   silence_duration_ms: 500
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub realtime: Option<RealtimeYaml>,
    pub audio: Option<AudioYaml>,
    pub vad: Option<VadYaml>,
}

/// Connection and session settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RealtimeYaml {
    pub api_key: Option<String>,
    pub url: Option<String>,
    pub model: Option<String>,
    pub voice: Option<String>,
    pub instructions: Option<String>,
    pub transcription_model: Option<String>,
    pub temperature: Option<f32>,
    /// Either a positive integer or "inf"
    pub max_response_output_tokens: Option<MaxTokens>,
    pub read_timeout_secs: Option<u64>,
    /// 0 disables client pings
    pub ping_interval_secs: Option<u64>,
}

/// Audio endpoint sizing from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AudioYaml {
    pub sample_rate: Option<u32>,
    pub capture_frame_samples: Option<usize>,
    pub capture_queue_capacity: Option<usize>,
    pub playback_frame_samples: Option<usize>,
    pub playback_buffer_seconds: Option<u32>,
}

/// Server VAD turn detection from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct VadYaml {
    pub threshold: Option<f32>,
    pub prefix_padding_ms: Option<u32>,
    pub silence_duration_ms: Option<u32>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if:
    /// - The file cannot be read
    /// - The YAML is malformed
    /// - Fields have invalid types
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;

        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse YAML config: {e}"))?;

        Ok(config)
    }

    /// Overlay every value present in the file onto `config`.
    pub(super) fn apply_to(&self, config: &mut ClientConfig) {
        if let Some(realtime) = &self.realtime {
            if let Some(key) = &realtime.api_key {
                config.api_key = key.clone();
            }
            if let Some(url) = &realtime.url {
                config.url = url.clone();
            }
            if let Some(model) = &realtime.model {
                config.model = model.clone();
            }
            if let Some(voice) = &realtime.voice {
                config.voice = RealtimeVoice::from_str_or_default(voice);
            }
            if let Some(instructions) = &realtime.instructions {
                config.instructions = instructions.clone();
            }
            if let Some(model) = &realtime.transcription_model {
                config.transcription_model = model.clone();
            }
            if let Some(temperature) = realtime.temperature {
                config.temperature = temperature;
            }
            if let Some(max) = &realtime.max_response_output_tokens {
                config.max_response_output_tokens = max.clone();
            }
            if let Some(secs) = realtime.read_timeout_secs {
                config.read_timeout_secs = secs;
            }
            if let Some(secs) = realtime.ping_interval_secs {
                config.ping_interval_secs = (secs > 0).then_some(secs);
            }
        }

        if let Some(audio) = &self.audio {
            if let Some(rate) = audio.sample_rate {
                config.sample_rate = rate;
            }
            if let Some(samples) = audio.capture_frame_samples {
                config.capture_frame_samples = samples;
            }
            if let Some(capacity) = audio.capture_queue_capacity {
                config.capture_queue_capacity = capacity;
            }
            if let Some(samples) = audio.playback_frame_samples {
                config.playback_frame_samples = samples;
            }
            if let Some(seconds) = audio.playback_buffer_seconds {
                config.playback_buffer_seconds = seconds;
            }
        }

        if let Some(vad) = &self.vad {
            if let Some(threshold) = vad.threshold {
                config.vad_threshold = threshold;
            }
            if let Some(ms) = vad.prefix_padding_ms {
                config.vad_prefix_padding_ms = ms;
            }
            if let Some(ms) = vad.silence_duration_ms {
                config.vad_silence_duration_ms = ms;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_yaml_config_full() {
        let yaml = r#"
realtime:
  api_key: "sk-yaml"
  model: "gpt-4o-mini-realtime-preview"
  voice: "coral"
  temperature: 0.6
  max_response_output_tokens: 1024
  read_timeout_secs: 30
  ping_interval_secs: 15

audio:
  sample_rate: 16000
  capture_frame_samples: 320
  capture_queue_capacity: 10

vad:
  threshold: 0.5
  silence_duration_ms: 700
"#;

        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();
        let realtime = config.realtime.as_ref().unwrap();

        assert_eq!(realtime.api_key, Some("sk-yaml".to_string()));
        assert_eq!(realtime.voice, Some("coral".to_string()));
        assert_eq!(
            realtime.max_response_output_tokens,
            Some(MaxTokens::Number(1024))
        );
        assert_eq!(config.audio.as_ref().unwrap().capture_frame_samples, Some(320));
        assert_eq!(config.vad.as_ref().unwrap().threshold, Some(0.5));
        assert_eq!(config.vad.as_ref().unwrap().prefix_padding_ms, None);
    }

    #[test]
    fn test_yaml_config_empty() {
        let config: YamlConfig = serde_yaml::from_str("{}").unwrap();
        assert!(config.realtime.is_none());
        assert!(config.audio.is_none());
        assert!(config.vad.is_none());
    }

    #[test]
    fn test_apply_only_present_values() {
        let yaml = r#"
realtime:
  max_response_output_tokens: "inf"
  ping_interval_secs: 0
vad:
  prefix_padding_ms: 250
"#;
        let parsed: YamlConfig = serde_yaml::from_str(yaml).unwrap();
        let mut config = ClientConfig::default();
        config.ping_interval_secs = Some(10);
        parsed.apply_to(&mut config);

        assert_eq!(config.max_response_output_tokens, MaxTokens::inf());
        assert_eq!(config.ping_interval_secs, None);
        assert_eq!(config.vad_prefix_padding_ms, 250);
        assert_eq!(config.vad_threshold, 0.75);
        assert_eq!(config.voice, RealtimeVoice::Ash);
    }

    #[test]
    fn test_from_file_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.yaml");
        fs::write(&path, "realtime: [unclosed").unwrap();

        let err = YamlConfig::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse YAML config"));
    }
}
