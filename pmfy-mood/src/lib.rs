//! pmfy-mood library interface
//!
//! Mood analysis engine: enriches a track list through identity resolution,
//! feature retrieval and classification, then resolves one recommendation
//! per mood category.

pub mod classifier;
pub mod clients;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod recommend;
pub mod report;
pub mod resolver;
pub mod staging;

pub use crate::engine::MoodEngine;
pub use crate::error::{ClassifierError, FetchError, PipelineError, SkipReason};
pub use crate::report::MoodReport;
