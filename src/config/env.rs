use std::env;
use std::str::FromStr;

use super::ClientConfig;
use crate::core::realtime::{MaxTokens, RealtimeVoice};

/// Read an environment variable, treating empty values as unset.
fn env_string(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse an environment variable, failing loudly on malformed values.
fn env_parse<T>(key: &str) -> Result<Option<T>, Box<dyn std::error::Error>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_string(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| format!("Invalid value for {key}: {raw:?} ({e})").into()),
        None => Ok(None),
    }
}

/// Overlay environment variables onto `config`.
pub(super) fn apply_env(config: &mut ClientConfig) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(key) = env_string("OPENAI_API_KEY") {
        config.api_key = key;
    }
    if let Some(url) = env_string("REALTIME_URL") {
        config.url = url;
    }
    if let Some(model) = env_string("REALTIME_MODEL") {
        config.model = model;
    }
    if let Some(voice) = env_string("REALTIME_VOICE") {
        config.voice = RealtimeVoice::from_str_or_default(&voice);
    }
    if let Some(instructions) = env_string("REALTIME_INSTRUCTIONS") {
        config.instructions = instructions;
    }
    if let Some(model) = env_string("REALTIME_TRANSCRIPTION_MODEL") {
        config.transcription_model = model;
    }
    if let Some(temperature) = env_parse::<f32>("REALTIME_TEMPERATURE")? {
        config.temperature = temperature;
    }
    if let Some(raw) = env_string("REALTIME_MAX_OUTPUT_TOKENS") {
        config.max_response_output_tokens = MaxTokens::parse(&raw).ok_or_else(|| {
            format!("Invalid value for REALTIME_MAX_OUTPUT_TOKENS: {raw:?} (expected \"inf\" or a positive integer)")
        })?;
    }
    if let Some(secs) = env_parse::<u64>("REALTIME_READ_TIMEOUT_SECS")? {
        config.read_timeout_secs = secs;
    }
    if let Some(secs) = env_parse::<u64>("REALTIME_PING_INTERVAL_SECS")? {
        // 0 disables client pings
        config.ping_interval_secs = (secs > 0).then_some(secs);
    }

    if let Some(rate) = env_parse::<u32>("AUDIO_SAMPLE_RATE")? {
        config.sample_rate = rate;
    }
    if let Some(samples) = env_parse::<usize>("CAPTURE_FRAME_SAMPLES")? {
        config.capture_frame_samples = samples;
    }
    if let Some(capacity) = env_parse::<usize>("CAPTURE_QUEUE_CAPACITY")? {
        config.capture_queue_capacity = capacity;
    }
    if let Some(samples) = env_parse::<usize>("PLAYBACK_FRAME_SAMPLES")? {
        config.playback_frame_samples = samples;
    }
    if let Some(seconds) = env_parse::<u32>("PLAYBACK_BUFFER_SECONDS")? {
        config.playback_buffer_seconds = seconds;
    }

    if let Some(threshold) = env_parse::<f32>("VAD_THRESHOLD")? {
        config.vad_threshold = threshold;
    }
    if let Some(ms) = env_parse::<u32>("VAD_PREFIX_PADDING_MS")? {
        config.vad_prefix_padding_ms = ms;
    }
    if let Some(ms) = env_parse::<u32>("VAD_SILENCE_DURATION_MS")? {
        config.vad_silence_duration_ms = ms;
    }

    Ok(())
}
