//! Foundation module - Core utilities and types
//!
//! - Math types and the node [`Transform`](math::Transform)
//! - Logging setup

pub mod logging;
pub mod math;
