//! Gaussian smoothing and derivative stages of Canny edge detection.
//!
//! [`GaussianDerivativeEngine::candidates`] turns a raw image into the
//! candidate-strength (non-maximum suppression) grid consumed by
//! `canny-hysteresis`.

pub mod derivative;
pub mod error;
pub mod kernel;

pub use derivative::{DerivativeOutput, GaussianDerivativeEngine, DERIVATIVE_HALO};
pub use error::{GaussianError, GaussianResult};
pub use kernel::{kernel_radius, GaussianKernel};
