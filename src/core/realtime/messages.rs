//! Realtime API wire messages.
//!
//! Every message is a JSON object discriminated by its `type` field. Field
//! names in this module are the wire contract and must not be renamed.
//!
//! Client events (sent to server):
//! - session.update - One-time session negotiation
//! - input_audio_buffer.append - Captured PCM16 audio, base64 encoded
//!
//! Server events consumed by the session:
//! - session.created / session.updated - Session acknowledgments (logged only)
//! - conversation.item.created - Item added to conversation
//! - response.created - Response generation started
//! - response.audio.delta - Audio data chunk
//! - response.audio.done - Audio generation complete
//! - response.done - Response complete
//! - error - Server-side error
//!
//! Any other `type` is surfaced as unhandled by the codec.

use serde::{Deserialize, Serialize};

use super::config::{AudioFormat, Modality, RealtimeVoice};

// =============================================================================
// Session Configuration
// =============================================================================

/// Payload of the `session.update` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Response modalities
    pub modalities: Vec<Modality>,

    /// System instructions for the assistant
    pub instructions: String,

    /// Voice for audio output
    pub voice: RealtimeVoice,

    pub input_audio_format: AudioFormat,

    pub output_audio_format: AudioFormat,

    /// Input audio transcription configuration
    pub input_audio_transcription: InputAudioTranscription,

    /// Turn detection configuration
    pub turn_detection: TurnDetection,

    /// Tool choice strategy ("auto", "none", "required")
    pub tool_choice: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum response output tokens
    pub max_response_output_tokens: MaxTokens,
}

/// Maximum tokens configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MaxTokens {
    /// Specific number of tokens
    Number(u32),
    /// Unlimited, sent as the string "inf"
    Infinite(String),
}

impl MaxTokens {
    pub fn inf() -> Self {
        MaxTokens::Infinite("inf".to_string())
    }

    /// Parse "inf" or a positive integer.
    pub fn parse(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("inf") {
            return Some(Self::inf());
        }
        trimmed
            .parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .map(MaxTokens::Number)
    }
}

impl Default for MaxTokens {
    fn default() -> Self {
        Self::inf()
    }
}

/// Input audio transcription configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputAudioTranscription {
    /// Transcription model (e.g., "whisper-1")
    pub model: String,
}

/// Turn detection configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TurnDetection {
    /// Server-side VAD
    #[serde(rename = "server_vad")]
    ServerVad {
        /// Activation threshold in [0, 1]
        threshold: f32,
        /// Audio kept before detected speech, in ms
        prefix_padding_ms: u32,
        /// Silence that ends a turn, in ms
        silence_duration_ms: u32,
        /// Whether the server starts a response when the turn ends
        create_response: bool,
    },
}

// =============================================================================
// Server Payload Fragments
// =============================================================================

/// Error details carried by the `error` event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
}

/// The parts of a server session object this client reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// The parts of a server response object this client reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// The parts of a conversation item this client reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

// =============================================================================
// Wire Events
// =============================================================================

/// Every event shape the codec knows, as it appears on the wire.
///
/// Audio is carried base64 encoded here; [`super::codec`] converts to and from
/// raw bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WireEvent {
    #[serde(rename = "session.update")]
    SessionUpdate {
        #[serde(default)]
        event_id: String,
        session: SessionConfig,
    },

    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend {
        #[serde(default)]
        event_id: String,
        /// Base64-encoded PCM16
        audio: String,
    },

    #[serde(rename = "session.created")]
    SessionCreated {
        #[serde(default)]
        event_id: String,
        #[serde(default)]
        session: SessionInfo,
    },

    #[serde(rename = "session.updated")]
    SessionUpdated {
        #[serde(default)]
        event_id: String,
        #[serde(default)]
        session: SessionInfo,
    },

    #[serde(rename = "conversation.item.created")]
    ConversationItemCreated {
        #[serde(default)]
        event_id: String,
        #[serde(default)]
        item: ItemInfo,
    },

    #[serde(rename = "response.created")]
    ResponseCreated {
        #[serde(default)]
        event_id: String,
        #[serde(default)]
        response: ResponseInfo,
    },

    #[serde(rename = "response.audio.delta")]
    ResponseAudioDelta {
        #[serde(default)]
        event_id: String,
        #[serde(default)]
        response_id: String,
        #[serde(default)]
        item_id: String,
        #[serde(default)]
        output_index: u32,
        #[serde(default)]
        content_index: u32,
        /// Base64-encoded PCM16
        delta: String,
    },

    #[serde(rename = "response.audio.done")]
    ResponseAudioDone {
        #[serde(default)]
        event_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        response_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        item_id: Option<String>,
    },

    #[serde(rename = "response.done")]
    ResponseDone {
        #[serde(default)]
        event_id: String,
        #[serde(default)]
        response: ResponseInfo,
    },

    #[serde(rename = "error")]
    Error {
        #[serde(default)]
        event_id: String,
        #[serde(default)]
        error: ApiError,
    },
}

impl WireEvent {
    /// Type tags with a dedicated variant.
    pub const KNOWN_TYPES: &'static [&'static str] = &[
        "session.update",
        "input_audio_buffer.append",
        "session.created",
        "session.updated",
        "conversation.item.created",
        "response.created",
        "response.audio.delta",
        "response.audio.done",
        "response.done",
        "error",
    ];

    pub fn is_known_type(event_type: &str) -> bool {
        Self::KNOWN_TYPES.contains(&event_type)
    }
}

/// Minimal envelope read before per-type parsing.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type", default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub event_id: Option<String>,
}
