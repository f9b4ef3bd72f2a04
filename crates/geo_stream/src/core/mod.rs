//! # Core Module
//!
//! Shared configuration types used by both the stream player and the point
//! renderer.

pub mod config;

// Re-export commonly used config types
pub use config::{Config, ConfigError, PlayerConfig, PointsRendererConfig, ShaderSlots, StreamConfig};
