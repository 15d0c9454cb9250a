//! # PlayMoodify Common Library
//!
//! Shared code for the PlayMoodify crates:
//! - Error type used across crate boundaries
//! - TOML bootstrap configuration loading
//! - Tracing subscriber initialisation

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
