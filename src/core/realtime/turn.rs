//! Half-duplex turn arbitration.
//!
//! Only the inbound loop calls [`TurnArbiter::observe`]; the outbound loop reads
//! [`TurnArbiter::is_speaking`] before forwarding each captured chunk.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use super::base::TurnState;
use super::codec::Event;

/// Tracks whether the assistant is currently producing speech.
#[derive(Debug, Default)]
pub struct TurnArbiter {
    speaking: AtomicBool,
    transitions: AtomicU64,
}

impl TurnArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply the transition (if any) triggered by an inbound event and return
    /// the resulting state.
    pub fn observe(&self, event: &Event) -> TurnState {
        match Self::target_for(event) {
            Some(target) => self.set(target, event.event_type()),
            None => self.state(),
        }
    }

    /// State an event moves the arbiter to, or `None` if it has no effect.
    pub fn target_for(event: &Event) -> Option<TurnState> {
        match event {
            Event::ResponseCreated { .. }
            | Event::ConversationItemCreated { .. }
            | Event::ResponseAudioDelta(_) => Some(TurnState::AssistantSpeaking),
            Event::ResponseAudioDone { .. } | Event::ResponseDone { .. } => {
                Some(TurnState::AssistantIdle)
            }
            _ => None,
        }
    }

    #[inline]
    pub fn state(&self) -> TurnState {
        if self.speaking.load(Ordering::Acquire) {
            TurnState::AssistantSpeaking
        } else {
            TurnState::AssistantIdle
        }
    }

    #[inline]
    pub fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::Acquire)
    }

    /// Number of state changes since creation.
    pub fn transitions(&self) -> u64 {
        self.transitions.load(Ordering::Relaxed)
    }

    fn set(&self, target: TurnState, cause: &str) -> TurnState {
        let previous = self.speaking.swap(target.is_speaking(), Ordering::AcqRel);
        if previous != target.is_speaking() {
            self.transitions.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(state = %target, cause, "Turn state changed");
        }
        target
    }
}
