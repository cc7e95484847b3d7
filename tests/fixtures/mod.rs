//! Test Fixtures Module
//!
//! Programmatically generated PCM audio and the server events that carry it.

// Not every test binary uses every fixture
#![allow(dead_code)]

pub mod audio_fixtures;

pub use audio_fixtures::*;
