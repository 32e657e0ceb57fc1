//! DTMF Test Fixture Generator
//!
//! Synthesizes a single sample-accurate PCM WAV file containing scripted
//! DTMF PIN entries, gaps and timeouts, used to exercise a DTMF PIN decoder.
//! The file content is a pure function of the test plan and timing policy.

pub mod config;
pub mod core;
pub mod protocols;
pub mod interfaces;
pub mod services;
pub mod error;
pub mod utils;

pub use error::{Error, Result};

/// Generator version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
