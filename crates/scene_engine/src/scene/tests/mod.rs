//! Cross-module behaviour tests for the scene graph and render groups

mod graph_properties;
mod render_group_properties;
