use canny_core::GridError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GaussianError {
    #[error("Invalid sigma: {0} (must be finite and > 0)")]
    InvalidSigma(f32),
    #[error("Invalid maximum kernel error: {0} (must be in (0, 1))")]
    InvalidMaximumError(f32),
    #[error("Invalid maximum kernel width: {0} (must be >= 1)")]
    InvalidKernelWidth(usize),
    #[error(transparent)]
    Grid(#[from] GridError),
}

pub type GaussianResult<T> = Result<T, GaussianError>;
