//! Mock Realtime Service
//!
//! A scripted WebSocket server standing in for the realtime endpoint. Each
//! test describes what the server sends and when, then inspects what the
//! client wrote.

// Not every test binary uses every helper
#![allow(dead_code)]

pub mod realtime_mock;

pub use realtime_mock::*;
