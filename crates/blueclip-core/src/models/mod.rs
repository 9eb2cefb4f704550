//! Data models: configuration, clip requests and artifacts.

pub mod clip;
pub mod config;

pub use clip::{ClipArtifact, ClipPayload, ClipRequest, ClipResponse, SizingMode};
pub use config::ClipConfig;
