#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("Grid shape must have at least one axis")]
    EmptyShape,
    #[error("Invalid extent on axis {axis}: {extent} (must be > 0)")]
    ZeroExtent { axis: usize, extent: usize },
    #[error("Grid extent {extent:?} has more pixels than can be addressed")]
    VolumeOverflow { extent: Vec<usize> },
    #[error("Grid data length mismatch: expected {expected_len}, got {actual_len}")]
    InvalidGridData { expected_len: usize, actual_len: usize },
    #[error("Grid shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch { expected: Vec<usize>, actual: Vec<usize> },
    #[error("Region has {actual} axes, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

pub type GridResult<T> = Result<T, GridError>;
