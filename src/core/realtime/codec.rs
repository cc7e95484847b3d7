//! Event codec between wire JSON and in-memory [`Event`]s.
//!
//! Decoding reads a minimal envelope first (`type`, `event_id`), then parses
//! known types strictly. Unknown types become [`Event::Unhandled`] instead of
//! failing. Audio is base64 on the wire and raw PCM16 bytes in memory.

use base64::prelude::*;
use bytes::Bytes;
use thiserror::Error;
use uuid::Uuid;

use super::messages::{ApiError, Envelope, SessionConfig, WireEvent};

/// Errors produced while decoding an inbound message.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Not a JSON object
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    /// JSON object without a string `type`
    #[error("Message has no type field")]
    MissingType,

    /// Known type whose fields do not match
    #[error("Malformed {event_type} event: {reason}")]
    Malformed { event_type: String, reason: String },

    /// Audio payload is not valid base64
    #[error("Invalid base64 audio in {event_type}: {reason}")]
    InvalidAudio { event_type: String, reason: String },
}

/// Errors produced while encoding an outbound message.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("Failed to serialize {event_type}: {reason}")]
    Serialization { event_type: String, reason: String },

    /// Unhandled events have no wire shape
    #[error("Event type {0} cannot be encoded")]
    Unencodable(String),
}

/// Audio chunk produced by the assistant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDelta {
    pub event_id: String,
    pub response_id: String,
    pub item_id: String,
    pub output_index: u32,
    pub content_index: u32,
    /// Raw little-endian PCM16 bytes
    pub audio: Bytes,
}

/// A decoded protocol event.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    SessionUpdate {
        event_id: String,
        session: SessionConfig,
    },
    InputAudioAppend {
        event_id: String,
        /// Raw little-endian PCM16 bytes
        audio: Bytes,
    },
    ResponseAudioDelta(AudioDelta),
    ResponseCreated {
        event_id: String,
        response_id: Option<String>,
    },
    ResponseDone {
        event_id: String,
        response_id: Option<String>,
    },
    ResponseAudioDone {
        event_id: String,
        response_id: Option<String>,
        item_id: Option<String>,
    },
    ConversationItemCreated {
        event_id: String,
        item_id: Option<String>,
    },
    SessionCreated {
        event_id: String,
        session_id: Option<String>,
    },
    SessionUpdated {
        event_id: String,
        session_id: Option<String>,
    },
    Error {
        event_id: String,
        error: ApiError,
    },
    /// Any type without a dedicated variant
    Unhandled {
        event_id: String,
        event_type: String,
    },
}

impl Event {
    /// Build a `session.update` with a fresh event id.
    pub fn session_update(session: SessionConfig) -> Self {
        Event::SessionUpdate {
            event_id: new_event_id(),
            session,
        }
    }

    /// Build an `input_audio_buffer.append` with a fresh event id.
    pub fn input_audio_append(audio: impl Into<Bytes>) -> Self {
        Event::InputAudioAppend {
            event_id: new_event_id(),
            audio: audio.into(),
        }
    }

    /// The wire `type` tag.
    pub fn event_type(&self) -> &str {
        match self {
            Event::SessionUpdate { .. } => "session.update",
            Event::InputAudioAppend { .. } => "input_audio_buffer.append",
            Event::ResponseAudioDelta(_) => "response.audio.delta",
            Event::ResponseCreated { .. } => "response.created",
            Event::ResponseDone { .. } => "response.done",
            Event::ResponseAudioDone { .. } => "response.audio.done",
            Event::ConversationItemCreated { .. } => "conversation.item.created",
            Event::SessionCreated { .. } => "session.created",
            Event::SessionUpdated { .. } => "session.updated",
            Event::Error { .. } => "error",
            Event::Unhandled { event_type, .. } => event_type,
        }
    }

    pub fn event_id(&self) -> &str {
        match self {
            Event::SessionUpdate { event_id, .. }
            | Event::InputAudioAppend { event_id, .. }
            | Event::ResponseCreated { event_id, .. }
            | Event::ResponseDone { event_id, .. }
            | Event::ResponseAudioDone { event_id, .. }
            | Event::ConversationItemCreated { event_id, .. }
            | Event::SessionCreated { event_id, .. }
            | Event::SessionUpdated { event_id, .. }
            | Event::Error { event_id, .. }
            | Event::Unhandled { event_id, .. } => event_id,
            Event::ResponseAudioDelta(delta) => &delta.event_id,
        }
    }
}

/// Fresh random correlation id for an outbound event.
pub fn new_event_id() -> String {
    format!("evt_{}", Uuid::new_v4().simple())
}

/// Stateless JSON codec for realtime events.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventCodec;

impl EventCodec {
    /// Decode one inbound text or binary message.
    pub fn decode(bytes: &[u8]) -> Result<Event, DecodeError> {
        let envelope: Envelope = serde_json::from_slice(bytes)
            .map_err(|e| DecodeError::InvalidJson(e.to_string()))?;

        let event_type = envelope.event_type.ok_or(DecodeError::MissingType)?;

        if !WireEvent::is_known_type(&event_type) {
            return Ok(Event::Unhandled {
                event_id: envelope.event_id.unwrap_or_default(),
                event_type,
            });
        }

        let wire: WireEvent =
            serde_json::from_slice(bytes).map_err(|e| DecodeError::Malformed {
                event_type: event_type.clone(),
                reason: e.to_string(),
            })?;

        Self::from_wire(wire)
    }

    /// Encode an event as a JSON text message.
    pub fn encode(event: &Event) -> Result<String, EncodeError> {
        let wire = Self::to_wire(event)?;
        serde_json::to_string(&wire).map_err(|e| EncodeError::Serialization {
            event_type: event.event_type().to_string(),
            reason: e.to_string(),
        })
    }

    fn from_wire(wire: WireEvent) -> Result<Event, DecodeError> {
        let event = match wire {
            WireEvent::SessionUpdate { event_id, session } => {
                Event::SessionUpdate { event_id, session }
            }
            WireEvent::InputAudioBufferAppend { event_id, audio } => Event::InputAudioAppend {
                event_id,
                audio: decode_audio("input_audio_buffer.append", &audio)?,
            },
            WireEvent::ResponseAudioDelta {
                event_id,
                response_id,
                item_id,
                output_index,
                content_index,
                delta,
            } => Event::ResponseAudioDelta(AudioDelta {
                event_id,
                response_id,
                item_id,
                output_index,
                content_index,
                audio: decode_audio("response.audio.delta", &delta)?,
            }),
            WireEvent::SessionCreated { event_id, session } => Event::SessionCreated {
                event_id,
                session_id: session.id,
            },
            WireEvent::SessionUpdated { event_id, session } => Event::SessionUpdated {
                event_id,
                session_id: session.id,
            },
            WireEvent::ConversationItemCreated { event_id, item } => {
                Event::ConversationItemCreated {
                    event_id,
                    item_id: item.id,
                }
            }
            WireEvent::ResponseCreated { event_id, response } => Event::ResponseCreated {
                event_id,
                response_id: response.id,
            },
            WireEvent::ResponseAudioDone {
                event_id,
                response_id,
                item_id,
            } => Event::ResponseAudioDone {
                event_id,
                response_id,
                item_id,
            },
            WireEvent::ResponseDone { event_id, response } => Event::ResponseDone {
                event_id,
                response_id: response.id,
            },
            WireEvent::Error { event_id, error } => Event::Error { event_id, error },
        };
        Ok(event)
    }

    fn to_wire(event: &Event) -> Result<WireEvent, EncodeError> {
        use super::messages::{ItemInfo, ResponseInfo, SessionInfo};

        let wire = match event {
            Event::SessionUpdate { event_id, session } => WireEvent::SessionUpdate {
                event_id: event_id.clone(),
                session: session.clone(),
            },
            Event::InputAudioAppend { event_id, audio } => WireEvent::InputAudioBufferAppend {
                event_id: event_id.clone(),
                audio: BASE64_STANDARD.encode(audio),
            },
            Event::ResponseAudioDelta(delta) => WireEvent::ResponseAudioDelta {
                event_id: delta.event_id.clone(),
                response_id: delta.response_id.clone(),
                item_id: delta.item_id.clone(),
                output_index: delta.output_index,
                content_index: delta.content_index,
                delta: BASE64_STANDARD.encode(&delta.audio),
            },
            Event::ResponseCreated {
                event_id,
                response_id,
            } => WireEvent::ResponseCreated {
                event_id: event_id.clone(),
                response: ResponseInfo {
                    id: response_id.clone(),
                    status: None,
                },
            },
            Event::ResponseDone {
                event_id,
                response_id,
            } => WireEvent::ResponseDone {
                event_id: event_id.clone(),
                response: ResponseInfo {
                    id: response_id.clone(),
                    status: None,
                },
            },
            Event::ResponseAudioDone {
                event_id,
                response_id,
                item_id,
            } => WireEvent::ResponseAudioDone {
                event_id: event_id.clone(),
                response_id: response_id.clone(),
                item_id: item_id.clone(),
            },
            Event::ConversationItemCreated { event_id, item_id } => {
                WireEvent::ConversationItemCreated {
                    event_id: event_id.clone(),
                    item: ItemInfo {
                        id: item_id.clone(),
                        role: None,
                    },
                }
            }
            Event::SessionCreated {
                event_id,
                session_id,
            } => WireEvent::SessionCreated {
                event_id: event_id.clone(),
                session: SessionInfo {
                    id: session_id.clone(),
                    model: None,
                },
            },
            Event::SessionUpdated {
                event_id,
                session_id,
            } => WireEvent::SessionUpdated {
                event_id: event_id.clone(),
                session: SessionInfo {
                    id: session_id.clone(),
                    model: None,
                },
            },
            Event::Error { event_id, error } => WireEvent::Error {
                event_id: event_id.clone(),
                error: error.clone(),
            },
            Event::Unhandled { event_type, .. } => {
                return Err(EncodeError::Unencodable(event_type.clone()));
            }
        };
        Ok(wire)
    }
}

fn decode_audio(event_type: &str, encoded: &str) -> Result<Bytes, DecodeError> {
    BASE64_STANDARD
        .decode(encoded)
        .map(Bytes::from)
        .map_err(|e| DecodeError::InvalidAudio {
            event_type: event_type.to_string(),
            reason: e.to_string(),
        })
}
