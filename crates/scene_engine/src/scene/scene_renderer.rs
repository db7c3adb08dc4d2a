//! Scene Renderer - per-frame driver for render groups
//!
//! Keeps the last [`RenderGroup`] and decides each frame how much work the
//! graph's changes require:
//!
//! - structural change (or a different graph): rebuild the group
//! - transform-only change: refresh world matrices in place
//! - no change: reuse the group as is
//!
//! The chosen group is then submitted to the device in item order.

use super::render_group::{RenderGroup, RenderStats};
use super::scene_graph::SceneGraph;
use crate::core::config::RenderGroupConfig;
use crate::render::device::RenderDevice;
use crate::render::material::MaterialCatalog;

/// What a frame did with the cached render group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameAction {
    /// Built a new group from the graph
    Rebuilt,
    /// Kept the buckets, rewrote world matrices
    Refreshed,
    /// Submitted the cached group unchanged
    Reused,
}

/// Scene renderer that caches render groups across frames
#[derive(Debug, Default)]
pub struct SceneRenderer {
    /// Group build configuration
    config: RenderGroupConfig,

    /// Group submitted last frame
    group: Option<RenderGroup>,

    /// Decision taken by the last frame
    last_action: Option<FrameAction>,

    frame_count: u64,
}

impl SceneRenderer {
    /// Create a renderer with the given group configuration
    pub fn new(config: RenderGroupConfig) -> Self {
        Self {
            config,
            group: None,
            last_action: None,
            frame_count: 0,
        }
    }

    /// Render one frame of `graph` to `device`
    pub fn render_frame<C, D>(
        &mut self,
        graph: &mut SceneGraph,
        catalog: &C,
        device: &mut D,
    ) -> RenderStats
    where
        C: MaterialCatalog + ?Sized,
        D: RenderDevice + ?Sized,
    {
        let action = self.prepare(graph, catalog);
        self.last_action = Some(action);
        self.frame_count += 1;

        let Some(group) = self.group.as_ref() else {
            return RenderStats::default();
        };

        let mut stats = group.execute(graph, device);
        if action != FrameAction::Rebuilt {
            stats.build_time_us = 0;
        }

        log::trace!(
            "Frame {}: {:?}, {} swaps, {} draws",
            self.frame_count,
            action,
            stats.swaps,
            stats.draws
        );
        stats
    }

    /// Bring the cached group up to date with `graph`
    fn prepare<C>(&mut self, graph: &mut SceneGraph, catalog: &C) -> FrameAction
    where
        C: MaterialCatalog + ?Sized,
    {
        if let Some(group) = self.group.as_mut() {
            let staleness = group.staleness(graph);
            if staleness.is_empty() {
                return FrameAction::Reused;
            }
            if !staleness.needs_rebuild() && group.refresh_world_matrices(graph).is_ok() {
                return FrameAction::Refreshed;
            }
            log::debug!("Render group stale ({:?}), rebuilding", staleness);
        }

        self.group = Some(RenderGroup::build(graph, catalog, &self.config));
        FrameAction::Rebuilt
    }

    /// Drop the cached group so the next frame rebuilds it.
    ///
    /// Needed when materials change shader sets, which the graph cannot see.
    pub fn invalidate(&mut self) {
        self.group = None;
    }

    /// The cached group, if a frame has been rendered
    pub fn group(&self) -> Option<&RenderGroup> {
        self.group.as_ref()
    }

    /// Decision taken by the most recent frame
    pub fn last_action(&self) -> Option<FrameAction> {
        self.last_action
    }

    /// Frames rendered so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Group build configuration
    pub fn config(&self) -> &RenderGroupConfig {
        &self.config
    }
}
