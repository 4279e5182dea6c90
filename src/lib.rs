// src/lib.rs
pub mod analysis;
pub mod config;
pub mod processing;
pub mod synthetic;
pub use analysis::{analyze_session, BandReport, SessionReport};
pub use config::{DetectorConfig, PipelineConfig};
