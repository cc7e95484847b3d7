//! Shared error and state types for the realtime duplex session.

use std::fmt;

use thiserror::Error;

use crate::core::audio::PcmError;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can end or prevent a realtime session.
///
/// Decode failures on individual inbound messages are not represented here:
/// they are logged and the message is skipped.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// Dialing the service failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Missing or rejected credential
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Invalid configuration or unattached endpoints
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Read or write failure on an open connection
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// Outbound event could not be serialized
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// No traffic within the read deadline
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Internal task failure
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Result type for realtime operations.
pub type RealtimeResult<T> = Result<T, RealtimeError>;

impl From<PcmError> for RealtimeError {
    fn from(err: PcmError) -> Self {
        RealtimeError::InternalError(err.to_string())
    }
}

// =============================================================================
// Turn State
// =============================================================================

/// Whether the remote assistant is currently producing speech.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnState {
    /// Captured audio may be forwarded
    #[default]
    AssistantIdle,
    /// Captured audio is dropped to avoid feeding the assistant its own voice
    AssistantSpeaking,
}

impl TurnState {
    #[inline]
    pub fn is_speaking(&self) -> bool {
        matches!(self, Self::AssistantSpeaking)
    }
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AssistantIdle => write!(f, "assistant_idle"),
            Self::AssistantSpeaking => write!(f, "assistant_speaking"),
        }
    }
}

// =============================================================================
// Session Outcome
// =============================================================================

/// Why the session ended without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// Server sent a close frame
    ServerClosed,
    /// Inbound stream ended without a close frame
    StreamEnded,
}

impl fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServerClosed => write!(f, "server closed the connection"),
            Self::StreamEnded => write!(f, "inbound stream ended"),
        }
    }
}
