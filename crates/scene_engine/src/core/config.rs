//! # Unified Configuration
//!
//! Configuration structures for the scene graph, the render-group builder and
//! engine-wide behaviour. Every structure has sensible defaults and can be
//! loaded from TOML or RON through the [`Config`] trait.
//!
//! ```toml
//! [engine]
//! log_level = "debug"
//!
//! [scene]
//! initial_stack_capacity = 32
//! node_count_policy = "subtree_size"
//!
//! [render]
//! material_order = "shader_set"
//! ```

use serde::{Deserialize, Serialize};

pub use crate::config::{Config, ConfigError};

/// Traversal buffer size a new graph starts with
pub const DEFAULT_STACK_CAPACITY: usize = 16;

/// How `node_count` reacts when a node carrying its own subtree is attached
/// or removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeCountPolicy {
    /// Count every node of the attached or destroyed subtree. Keeps
    /// `node_count` equal to the number of reachable nodes.
    #[default]
    SubtreeSize,
    /// Adjust by exactly one per `add_child`/`remove_child` call, whatever
    /// the subtree size. Only the directly attached node gets its graph
    /// back-reference. Kept for behavioural parity with legacy scenes; the
    /// count drifts as soon as non-leaf subtrees move.
    Legacy,
}

/// # Scene Graph Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneGraphConfig {
    /// Entries preallocated in each traversal buffer
    pub initial_stack_capacity: usize,
    /// Node counting behaviour
    pub node_count_policy: NodeCountPolicy,
}

impl SceneGraphConfig {
    /// Set the initial traversal buffer capacity
    #[must_use]
    pub fn with_initial_stack_capacity(mut self, capacity: usize) -> Self {
        self.initial_stack_capacity = capacity;
        self
    }

    /// Set the node counting policy
    #[must_use]
    pub fn with_node_count_policy(mut self, policy: NodeCountPolicy) -> Self {
        self.node_count_policy = policy;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_stack_capacity == 0 {
            return Err(ConfigError::Invalid(
                "initial_stack_capacity must be at least 1 (the root)".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SceneGraphConfig {
    fn default() -> Self {
        Self {
            initial_stack_capacity: DEFAULT_STACK_CAPACITY,
            node_count_policy: NodeCountPolicy::default(),
        }
    }
}

/// Order in which material buckets are emitted into a render group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialOrder {
    /// Lexicographic `(vertex, fragment)` shader identity, ties broken by the
    /// order in which materials were first encountered
    #[default]
    ShaderSet,
    /// Order of first encounter during traversal, no sorting
    FirstSeen,
}

/// # Render Group Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderGroupConfig {
    /// Bucket ordering
    pub material_order: MaterialOrder,
    /// Capacity hint for the item list
    pub expected_items: usize,
}

impl RenderGroupConfig {
    /// Set the bucket ordering
    #[must_use]
    pub fn with_material_order(mut self, order: MaterialOrder) -> Self {
        self.material_order = order;
        self
    }
}

impl Default for RenderGroupConfig {
    fn default() -> Self {
        Self {
            material_order: MaterialOrder::default(),
            expected_items: 64,
        }
    }
}

/// # Engine Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Log level for the engine
    pub log_level: String,
}

impl EngineConfig {
    /// Set log level
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// # Complete Application Configuration
///
/// Top-level configuration that encompasses all subsystems.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Engine core configuration
    pub engine: EngineConfig,
    /// Scene graph configuration
    pub scene: SceneGraphConfig,
    /// Render group configuration
    pub render: RenderGroupConfig,
}

impl ApplicationConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scene.validate()?;
        if self.engine.log_level.parse::<log::LevelFilter>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "unknown log level '{}'",
                self.engine.log_level
            )));
        }
        Ok(())
    }
}

impl Config for ApplicationConfig {}
