//! Library entry for guessmon components used by the binary and tests.

pub mod game;
pub mod config;
pub mod console;
pub mod logutil;
pub mod metrics;
