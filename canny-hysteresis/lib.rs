//! Hysteresis thresholding and edge linking, the final stage of Canny edge
//! detection on grids of any dimension.
//!
//! ```
//! use canny_core::{Grid, GridShape};
//! use canny_hysteresis::HysteresisEngine;
//!
//! let shape = GridShape::new(&[10]).unwrap();
//! let strength = vec![0.0, 0.0, 6.0, 6.0, 6.0, 2.0, 6.0, 0.0, 0.0, 0.0];
//! let candidates = Grid::from_vec(shape, strength).unwrap();
//!
//! let engine = HysteresisEngine::new(5.0, 1.0).unwrap();
//! let out = engine.run(&candidates).unwrap();
//! assert_eq!(out.stats.confirmed, 5);
//! ```

pub mod builder;
pub mod config;
pub mod engine;
pub mod error;
pub mod partition;
pub mod pool;
pub mod types;

pub use builder::DetectorBuilder;
pub use config::DetectorConfig;
pub use engine::{validate_thresholds, HysteresisEngine};
pub use error::{CannyError, CannyResult};
pub use pool::{NodePool, NodeRef, SparseList};
pub use types::{CancelToken, HysteresisOutput, HysteresisStats, PixelState};
