use canny_core::{GridError, Region};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CannyError {
    #[error("Requested region {requested:?} cannot be satisfied by largest possible region {largest:?}")]
    InvalidRequestedRegion { requested: Region, largest: Region },
    #[error("Node pool exhausted (capacity {capacity})")]
    PoolExhausted { capacity: usize },
    #[error("Pixel offset {offset} outside grid of {volume} pixels")]
    OutOfBounds { offset: usize, volume: usize },
    #[error("Invalid thresholds: upper={upper}, lower={lower} (need upper >= lower >= 0)")]
    InvalidThresholds { upper: f32, lower: f32 },
    #[error("Invalid sigma: {0} (must be finite and > 0)")]
    InvalidSigma(f32),
    #[error("Invalid maximum kernel error: {0} (must be in (0, 1))")]
    InvalidMaximumError(f32),
    #[error("Edge value and outside value are both {value}; the output mask would be uniform")]
    IndistinctOutputValues { value: f32 },
    #[error("Invalid thread count: {0} (must be >= 1)")]
    InvalidThreadCount(usize),
    #[error("Edge linking cancelled")]
    Cancelled,
    #[error(transparent)]
    Grid(#[from] GridError),
}

pub type CannyResult<T> = Result<T, CannyError>;
