//! Signalling tone protocols

pub mod dtmf;

pub use dtmf::{DtmfDigit, DtmfSequence, ToneSynthesizer};
