//! Audio Test Fixtures
//!
//! Generated PCM16 mono audio at the realtime sample rate, plus builders for
//! the server events that carry assistant audio. Generated audio keeps the
//! tests free of binary files and makes every sample predictable.

use std::f32::consts::PI;

use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use serde_json::{Value, json};

/// Realtime sample rate (24kHz)
pub const SAMPLE_RATE: u32 = 24000;

/// 20ms at 24kHz
pub const MS_20: usize = 480;

/// Generate silence (zeros)
pub fn generate_silence(duration_samples: usize) -> Vec<i16> {
    vec![0i16; duration_samples]
}

/// Generate a sine wave tone
pub fn generate_sine_wave(duration_samples: usize, frequency: f32, amplitude: f32) -> Vec<i16> {
    let max_amplitude = amplitude * i16::MAX as f32;
    let angular_freq = 2.0 * PI * frequency / SAMPLE_RATE as f32;

    (0..duration_samples)
        .map(|i| ((angular_freq * i as f32).sin() * max_amplitude) as i16)
        .collect()
}

/// Strictly increasing samples starting at `start`, so ordering is checkable
pub fn generate_ramp(start: i16, duration_samples: usize) -> Vec<i16> {
    (0..duration_samples)
        .map(|i| start.wrapping_add(i as i16))
        .collect()
}

/// Convert samples to little-endian bytes
pub fn samples_to_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Base64 of the little-endian bytes of `samples`
pub fn samples_to_base64(samples: &[i16]) -> String {
    BASE64_STANDARD.encode(samples_to_bytes(samples))
}

// =============================================================================
// Server events
// =============================================================================

pub fn session_created(session_id: &str) -> Value {
    json!({
        "type": "session.created",
        "event_id": format!("evt_srv_{session_id}"),
        "session": { "id": session_id, "model": "gpt-4o-realtime-preview-2024-12-17" }
    })
}

pub fn session_updated() -> Value {
    json!({ "type": "session.updated", "event_id": "evt_srv_updated", "session": {} })
}

pub fn response_created(response_id: &str) -> Value {
    json!({
        "type": "response.created",
        "event_id": format!("evt_created_{response_id}"),
        "response": { "id": response_id, "status": "in_progress" }
    })
}

pub fn audio_delta(response_id: &str, samples: &[i16]) -> Value {
    audio_delta_raw(response_id, &samples_to_base64(samples))
}

/// An audio delta with a caller-supplied (possibly invalid) payload
pub fn audio_delta_raw(response_id: &str, delta: &str) -> Value {
    json!({
        "type": "response.audio.delta",
        "event_id": format!("evt_delta_{response_id}"),
        "response_id": response_id,
        "item_id": "item_1",
        "output_index": 0,
        "content_index": 0,
        "delta": delta
    })
}

pub fn audio_done(response_id: &str) -> Value {
    json!({
        "type": "response.audio.done",
        "event_id": format!("evt_audio_done_{response_id}"),
        "response_id": response_id,
        "item_id": "item_1",
        "output_index": 0,
        "content_index": 0
    })
}

pub fn response_done(response_id: &str) -> Value {
    json!({
        "type": "response.done",
        "event_id": format!("evt_done_{response_id}"),
        "response": { "id": response_id, "status": "completed" }
    })
}

pub fn server_error(code: &str, message: &str) -> Value {
    json!({
        "type": "error",
        "event_id": "evt_error",
        "error": { "type": "invalid_request_error", "code": code, "message": message }
    })
}
