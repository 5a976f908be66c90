pub mod error;
pub mod grid;
pub mod region;
pub mod shape;

pub use error::{GridError, GridResult};
pub use grid::Grid;
pub use region::Region;
pub use shape::{AxisSlice, Connectivity, GridShape, NeighborOffsets, Neighborhood};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Real-valued D-dimensional image
pub type Image = Grid<f32>;

/// Value written to linked edge pixels in the output mask
pub const DEFAULT_EDGE_VALUE: f32 = 1.0;

/// Largest Gaussian kernel width considered when sizing the halo
pub const DEFAULT_MAX_KERNEL_WIDTH: usize = 32;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CannyConfig {
    /// Standard deviation of the Gaussian smoothing kernel
    pub sigma: f32,
    /// Maximum permissible truncation error of the kernel, one entry per
    /// axis or a single entry applied to every axis
    pub maximum_error: Vec<f32>,
    pub max_kernel_width: usize,
    pub upper_threshold: f32,
    pub lower_threshold: f32,
    /// Fill value for pixels that are not edges
    pub outside_value: f32,
    pub edge_value: f32,
    pub connectivity: Connectivity,
    pub n_threads: usize,
}

impl Default for CannyConfig {
    fn default() -> Self {
        Self {
            sigma: 1.0,
            maximum_error: vec![0.01],
            max_kernel_width: DEFAULT_MAX_KERNEL_WIDTH,
            upper_threshold: 0.2,
            lower_threshold: 0.1,
            outside_value: 0.0,
            edge_value: DEFAULT_EDGE_VALUE,
            connectivity: Connectivity::Full,
            n_threads: num_cpus::get().max(1),
        }
    }
}

/// Initialize Rayon thread pool with the specified number of threads
pub fn init_thread_pool(n_threads: usize) -> Result<(), rayon::ThreadPoolBuildError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .build_global()
}
