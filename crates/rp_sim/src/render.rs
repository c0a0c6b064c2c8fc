//! Published render state.
//!
//! The render thread never touches entity or component memory. After each
//! update pass the manager asks every component to contribute its render
//! state, then swaps the assembled frame into a shared slot in one write.
//! Readers therefore always observe a complete, internally consistent
//! frame: positions and transforms from the same tick, never torn.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::entity::EntityId;
use crate::math::Mat4;

/// Render contribution for one entity.
#[derive(Debug, Clone)]
pub struct RenderEntry {
    /// Entity the entry belongs to.
    pub id: EntityId,
    /// Template name, for model selection by the renderer.
    pub kind: String,
    /// World transform at the end of the tick.
    pub transform: Mat4,
}

/// One frame of render state, replaced wholesale each tick.
#[derive(Debug, Clone, Default)]
pub struct RenderFrame {
    /// Simulation tick the frame was collected at.
    pub tick: u64,
    /// Entries in ascending entity-id order.
    pub entries: Vec<RenderEntry>,
}

/// Shared handle to the most recently published frame.
///
/// Cloning is cheap; the render thread keeps one clone and calls
/// [`read_frame`] once per drawn frame.
pub type RenderHandle = Arc<RwLock<RenderFrame>>;

/// Create a fresh handle holding an empty frame.
#[must_use]
pub fn render_handle() -> RenderHandle {
    Arc::new(RwLock::new(RenderFrame::default()))
}

/// Clone the current frame out of the handle.
#[must_use]
pub fn read_frame(handle: &RenderHandle) -> RenderFrame {
    handle.read().clone()
}

/// Per-entity context handed to `collect_render` hooks.
#[derive(Debug, Clone, Copy)]
pub struct RenderCtx<'a> {
    /// Entity contributing to the frame.
    pub id: EntityId,
    /// The entity's template name.
    pub kind: &'a str,
}
