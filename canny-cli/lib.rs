use canny_core::{CannyConfig, Grid, GridError, GridShape, Region};
use canny_gaussian::{DerivativeOutput, GaussianDerivativeEngine, GaussianError};
use canny_hysteresis::{CancelToken, CannyError, HysteresisEngine, HysteresisStats};
use image::GrayImage;
use log::debug;
use std::time::Instant;

pub use canny_core::{self, CannyConfig as Config, Connectivity, Image};
pub use canny_hysteresis::{self, DetectorBuilder, DetectorConfig};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Hysteresis error: {0}")]
    Canny(#[from] CannyError),
    #[error("Derivative engine error: {0}")]
    Gaussian(#[from] GaussianError),
    #[error("Grid error: {0}")]
    Grid(#[from] GridError),
    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Everything one pipeline run produces
#[derive(Debug, Clone)]
pub struct CannyOutput {
    /// Binary mask: edge value on linked edges, outside value elsewhere
    pub edges: Grid<f32>,
    non_maximum_suppression: Grid<f32>,
    derivatives: DerivativeOutput,
    pub stats: HysteresisStats,
}

impl CannyOutput {
    /// Candidate strength grid fed to hysteresis
    pub fn non_maximum_suppression(&self) -> &Grid<f32> {
        &self.non_maximum_suppression
    }

    /// Gradient magnitude and maxima mask from the derivative stage
    pub fn derivatives(&self) -> &DerivativeOutput {
        &self.derivatives
    }
}

/// Canny edge detector over grids of any dimension: Gaussian smoothing,
/// second-derivative maxima, then hysteresis edge linking
#[derive(Debug, Clone)]
pub struct CannyEdgeDetector {
    config: CannyConfig,
}

impl CannyEdgeDetector {
    /// Create a detector from a validated configuration
    pub fn new(config: CannyConfig) -> PipelineResult<Self> {
        DetectorConfig {
            core: config.clone(),
            ..DetectorConfig::default()
        }
        .validate()?;
        Ok(Self { config })
    }

    /// Validate a builder and wrap the resulting configuration
    pub fn from_builder(builder: DetectorBuilder) -> PipelineResult<Self> {
        Ok(Self {
            config: builder.build_config()?,
        })
    }

    pub fn config(&self) -> &CannyConfig {
        &self.config
    }

    pub fn sigma(&self) -> f32 {
        self.config.sigma
    }

    pub fn upper_threshold(&self) -> f32 {
        self.config.upper_threshold
    }

    pub fn lower_threshold(&self) -> f32 {
        self.config.lower_threshold
    }

    pub fn outside_value(&self) -> f32 {
        self.config.outside_value
    }

    /// Input region needed to produce `output` without reading past the halo
    pub fn input_requested_region(&self, output: &Region, largest: &Region) -> PipelineResult<Region> {
        input_requested_region(output, largest, &self.config)
    }

    /// Run the full pipeline on `input`
    pub fn execute(&self, input: &Grid<f32>) -> PipelineResult<CannyOutput> {
        execute(&self.config, input, None)
    }

    /// Same as `execute`, aborting edge linking once `cancel` fires
    pub fn execute_with_cancel(&self, input: &Grid<f32>, cancel: &CancelToken) -> PipelineResult<CannyOutput> {
        execute(&self.config, input, Some(cancel))
    }
}

/// Pads `output` by the derivative halo on every axis and crops the result
/// to `largest`.
pub fn input_requested_region(output: &Region, largest: &Region, config: &CannyConfig) -> PipelineResult<Region> {
    if output.dims() != largest.dims() {
        return Err(GridError::DimensionMismatch {
            expected: largest.dims(),
            actual: output.dims(),
        }
        .into());
    }
    let halo = GaussianDerivativeEngine::from_config(config).halo_radius(output.dims())?;

    let mut requested = output.clone();
    requested.pad_by(&halo);
    if !requested.crop(largest) {
        return Err(CannyError::InvalidRequestedRegion {
            requested,
            largest: largest.clone(),
        }
        .into());
    }
    Ok(requested)
}

/// Smooth, differentiate, combine and link edges with `config`
pub fn execute(config: &CannyConfig, input: &Grid<f32>, cancel: Option<&CancelToken>) -> PipelineResult<CannyOutput> {
    let t0 = Instant::now();
    let derivative = GaussianDerivativeEngine::from_config(config);
    let (derivatives, non_maximum_suppression) = derivative.candidates(input)?;
    let t_derive = t0.elapsed();

    let engine = HysteresisEngine::from_config(config)?;
    let linked = engine.run_with_cancel(&non_maximum_suppression, None, cancel)?;
    debug!(
        "pipeline: shape={:?} derive={:?} total={:?}",
        input.extent(),
        t_derive,
        t0.elapsed()
    );

    Ok(CannyOutput {
        edges: linked.edges,
        non_maximum_suppression,
        derivatives,
        stats: linked.stats,
    })
}

/// 8-bit grayscale image to a 2-D grid scaled to [0, 1]
pub fn grid_from_luma(img: &GrayImage) -> PipelineResult<Grid<f32>> {
    let (w, h) = img.dimensions();
    let data = img.as_raw().iter().map(|&p| p as f32 / 255.0).collect();
    Ok(Grid::from_2d(w as usize, h as usize, data)?)
}

/// 2-D grid to an 8-bit grayscale image; values are clamped to [0, 1]
pub fn luma_from_grid(grid: &Grid<f32>) -> PipelineResult<GrayImage> {
    let extent = grid.extent();
    if extent.len() != 2 {
        return Err(GridError::DimensionMismatch {
            expected: 2,
            actual: extent.len(),
        }
        .into());
    }
    let pixels = grid
        .as_slice()
        .iter()
        .map(|&v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
        .collect();
    GrayImage::from_raw(extent[0] as u32, extent[1] as u32, pixels).ok_or_else(|| {
        PipelineError::from(GridError::ShapeMismatch {
            expected: extent.to_vec(),
            actual: vec![grid.len()],
        })
    })
}

/// Shape of the largest region of a grid, as a `Region` at the origin
pub fn largest_region(shape: &GridShape) -> Region {
    Region::from_shape(shape)
}
