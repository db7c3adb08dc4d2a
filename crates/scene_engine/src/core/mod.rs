//! # Core Engine Module
//!
//! Shared configuration used by the scene graph, the render-group builder
//! and the frame driver.

pub mod config;

pub use config::{
    ApplicationConfig, Config, ConfigError, EngineConfig, MaterialOrder, NodeCountPolicy,
    RenderGroupConfig, SceneGraphConfig,
};
