//! Builds and sends the one-time `session.update` negotiation message.

use futures_util::{Sink, SinkExt};
use tokio_tungstenite::tungstenite::Message;

use super::base::{RealtimeError, RealtimeResult};
use super::codec::{Event, EventCodec};
use super::config::{AudioFormat, Modality, RealtimeVoice};
use super::messages::{InputAudioTranscription, MaxTokens, SessionConfig, TurnDetection};

pub const DEFAULT_INSTRUCTIONS: &str = "You are a helpful voice assistant. Keep answers short and conversational.";
pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "whisper-1";
pub const DEFAULT_VAD_THRESHOLD: f32 = 0.75;
pub const DEFAULT_VAD_PREFIX_PADDING_MS: u32 = 300;
pub const DEFAULT_VAD_SILENCE_DURATION_MS: u32 = 500;
pub const DEFAULT_TOOL_CHOICE: &str = "auto";
pub const DEFAULT_TEMPERATURE: f32 = 0.8;

/// Session negotiation parameters.
///
/// Audio formats are always PCM16 and modalities are always text plus audio;
/// everything else can be overridden before [`build`](Self::build).
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfigurator {
    pub instructions: String,
    pub voice: RealtimeVoice,
    pub transcription_model: String,
    pub vad_threshold: f32,
    pub prefix_padding_ms: u32,
    pub silence_duration_ms: u32,
    pub create_response: bool,
    pub tool_choice: String,
    pub temperature: f32,
    pub max_response_output_tokens: MaxTokens,
}

impl Default for SessionConfigurator {
    fn default() -> Self {
        Self {
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            voice: RealtimeVoice::default(),
            transcription_model: DEFAULT_TRANSCRIPTION_MODEL.to_string(),
            vad_threshold: DEFAULT_VAD_THRESHOLD,
            prefix_padding_ms: DEFAULT_VAD_PREFIX_PADDING_MS,
            silence_duration_ms: DEFAULT_VAD_SILENCE_DURATION_MS,
            create_response: true,
            tool_choice: DEFAULT_TOOL_CHOICE.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_response_output_tokens: MaxTokens::default(),
        }
    }
}

impl SessionConfigurator {
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn with_voice(mut self, voice: RealtimeVoice) -> Self {
        self.voice = voice;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_vad(mut self, threshold: f32, prefix_padding_ms: u32, silence_duration_ms: u32) -> Self {
        self.vad_threshold = threshold;
        self.prefix_padding_ms = prefix_padding_ms;
        self.silence_duration_ms = silence_duration_ms;
        self
    }

    pub fn with_max_tokens(mut self, max: MaxTokens) -> Self {
        self.max_response_output_tokens = max;
        self
    }

    /// Build the immutable session payload.
    pub fn build(&self) -> SessionConfig {
        SessionConfig {
            modalities: vec![Modality::Text, Modality::Audio],
            instructions: self.instructions.clone(),
            voice: self.voice,
            input_audio_format: AudioFormat::Pcm16,
            output_audio_format: AudioFormat::Pcm16,
            input_audio_transcription: InputAudioTranscription {
                model: self.transcription_model.clone(),
            },
            turn_detection: TurnDetection::ServerVad {
                threshold: self.vad_threshold,
                prefix_padding_ms: self.prefix_padding_ms,
                silence_duration_ms: self.silence_duration_ms,
                create_response: self.create_response,
            },
            tool_choice: self.tool_choice.clone(),
            temperature: self.temperature,
            max_response_output_tokens: self.max_response_output_tokens.clone(),
        }
    }

    /// Build the `session.update` event with a fresh event id.
    pub fn event(&self) -> Event {
        Event::session_update(self.build())
    }

    /// Send the `session.update` once and return its event id.
    ///
    /// No acknowledgment is awaited; the caller may start streaming audio
    /// immediately.
    pub async fn send<S>(&self, sink: &mut S) -> RealtimeResult<String>
    where
        S: Sink<Message> + Unpin,
        S::Error: std::fmt::Display,
    {
        let event = self.event();
        let json = EventCodec::encode(&event)
            .map_err(|e| RealtimeError::SerializationError(e.to_string()))?;

        sink.send(Message::Text(json.into()))
            .await
            .map_err(|e| RealtimeError::WebSocketError(format!("Failed to send session.update: {e}")))?;

        tracing::info!(
            event_id = event.event_id(),
            voice = %self.voice,
            vad_threshold = self.vad_threshold,
            "Sent session configuration"
        );
        Ok(event.event_id().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use futures::channel::mpsc;

    #[test]
    fn test_defaults() {
        let session = SessionConfigurator::default().build();
        assert_eq!(session.voice, RealtimeVoice::Ash);
        assert_eq!(session.input_audio_format, AudioFormat::Pcm16);
        assert_eq!(session.output_audio_format, AudioFormat::Pcm16);
        assert_eq!(session.modalities, vec![Modality::Text, Modality::Audio]);
        assert_eq!(session.input_audio_transcription.model, "whisper-1");
        assert_eq!(session.tool_choice, "auto");
        assert_eq!(session.temperature, 0.8);
        assert_eq!(session.max_response_output_tokens, MaxTokens::inf());
        assert_eq!(
            session.turn_detection,
            TurnDetection::ServerVad {
                threshold: 0.75,
                prefix_padding_ms: 300,
                silence_duration_ms: 500,
                create_response: true,
            }
        );
    }

    #[test]
    fn test_builder_overrides() {
        let session = SessionConfigurator::default()
            .with_voice(RealtimeVoice::Coral)
            .with_instructions("Be brief")
            .with_temperature(0.6)
            .with_vad(0.5, 200, 800)
            .with_max_tokens(MaxTokens::Number(512))
            .build();

        assert_eq!(session.voice, RealtimeVoice::Coral);
        assert_eq!(session.instructions, "Be brief");
        assert_eq!(session.temperature, 0.6);
        assert_eq!(session.max_response_output_tokens, MaxTokens::Number(512));
        assert!(matches!(
            session.turn_detection,
            TurnDetection::ServerVad {
                silence_duration_ms: 800,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_send_writes_exactly_one_message() {
        let (mut tx, mut rx) = mpsc::unbounded::<Message>();
        let configurator = SessionConfigurator::default();

        let event_id = configurator.send(&mut tx).await.unwrap();
        drop(tx);

        let sent: Vec<Message> = rx.by_ref().collect().await;
        assert_eq!(sent.len(), 1);
        let Message::Text(text) = &sent[0] else {
            panic!("expected text message");
        };
        let value: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
        assert_eq!(value["type"], "session.update");
        assert_eq!(value["event_id"], event_id.as_str());
    }
}
