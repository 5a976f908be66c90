use canny_core::Grid;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Per-pixel state of the hysteresis state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PixelState {
    /// Below the lower threshold
    Suppressed,
    /// In `[lower, upper)`
    Weak,
    /// At or above the upper threshold
    Strong,
    /// Sitting in the active list
    Queued,
    /// Linked to a strong pixel
    Confirmed,
}

impl PixelState {
    /// Weak or strong and not yet visited
    pub(crate) fn is_linkable(self) -> bool {
        matches!(self, PixelState::Weak | PixelState::Strong)
    }
}

/// Counters gathered during one engine run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HysteresisStats {
    pub strong: usize,
    pub weak: usize,
    pub confirmed: usize,
    /// Nodes pushed onto the active list, seeds included
    pub pushes: usize,
    /// Largest number of nodes queued at once
    pub peak_active: usize,
    pub allocations: usize,
    pub releases: usize,
}

/// Final edge mask plus run statistics
#[derive(Debug, Clone)]
pub struct HysteresisOutput {
    pub edges: Grid<f32>,
    pub stats: HysteresisStats,
}

/// Shared flag polled between active-list pops
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
