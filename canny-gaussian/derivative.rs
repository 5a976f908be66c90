//! Smoothing and derivative stages that produce the candidate-strength grid.
//!
//! Boundaries are zero-flux Neumann: reads past the edge of the grid repeat
//! the nearest in-bounds sample.

use canny_core::{CannyConfig, Grid, GridShape};
use log::debug;
use rayon::prelude::*;

use crate::error::GaussianResult;
use crate::kernel::GaussianKernel;

/// Gradient magnitudes below this are treated as flat
const FLAT_EPS: f32 = 1e-6;

/// Extra samples needed past the smoothing kernel: one for the first and
/// second derivatives, one more for the derivative of the second derivative
pub const DERIVATIVE_HALO: usize = 2;

#[derive(Debug, Clone)]
pub struct GaussianDerivativeEngine {
    sigma: f32,
    maximum_error: Vec<f32>,
    max_kernel_width: usize,
}

/// Gradient magnitude and the zero-crossing mask of the second directional
/// derivative
#[derive(Debug, Clone)]
pub struct DerivativeOutput {
    pub magnitude: Grid<f32>,
    /// 1.0 on a gradient-magnitude maximum across the edge, else 0.0
    pub sign: Grid<f32>,
}

impl GaussianDerivativeEngine {
    pub fn new(sigma: f32, maximum_error: Vec<f32>, max_kernel_width: usize) -> Self {
        Self {
            sigma,
            maximum_error,
            max_kernel_width,
        }
    }

    pub fn from_config(cfg: &CannyConfig) -> Self {
        Self::new(cfg.sigma, cfg.maximum_error.clone(), cfg.max_kernel_width)
    }

    fn error_for(&self, axis: usize) -> f32 {
        match self.maximum_error.as_slice() {
            [] => 0.01,
            errors => errors[axis.min(errors.len() - 1)],
        }
    }

    /// Smoothing kernel for `axis`
    pub fn kernel(&self, axis: usize) -> GaussianResult<GaussianKernel> {
        GaussianKernel::new(self.sigma, self.error_for(axis), self.max_kernel_width)
    }

    /// Per-axis number of input samples read beyond an output pixel
    pub fn halo_radius(&self, dims: usize) -> GaussianResult<Vec<usize>> {
        (0..dims)
            .map(|axis| -> GaussianResult<usize> { Ok(self.kernel(axis)?.radius() + DERIVATIVE_HALO) })
            .collect()
    }

    /// Separable Gaussian smoothing, one pass per axis
    pub fn smooth(&self, input: &Grid<f32>) -> GaussianResult<Grid<f32>> {
        let shape = input.shape().clone();
        let mut current = input.as_slice().to_vec();
        let mut next = vec![0.0f32; current.len()];

        for axis in 0..shape.dims() {
            let kernel = self.kernel(axis)?;
            convolve_axis(&shape, axis, &kernel, &current, &mut next);
            std::mem::swap(&mut current, &mut next);
            debug!("smooth: axis {} radius {}", axis, kernel.radius());
        }

        Ok(Grid::from_vec(shape, current)?)
    }

    /// Gradient magnitude and maxima mask of an already smoothed grid
    pub fn second_derivative(&self, smoothed: &Grid<f32>) -> GaussianResult<DerivativeOutput> {
        let shape = smoothed.shape();
        let dims = shape.dims();
        let src = smoothed.as_slice();

        let volume = shape.volume();

        // Central-difference gradient, `dims` entries per pixel
        let mut gradient = vec![0.0f32; volume * dims];
        gradient
            .par_chunks_mut(dims)
            .enumerate()
            .for_each_init(
                || vec![0usize; dims],
                |coords, (offset, grad)| {
                    shape.coords_of(offset, coords);
                    for (i, g) in grad.iter_mut().enumerate() {
                        *g = (sample(src, shape, coords, &[(i, 1)]) - sample(src, shape, coords, &[(i, -1)])) / 2.0;
                    }
                },
            );

        // |grad| and the second derivative along the gradient, Lww
        let (magnitude, lww): (Vec<f32>, Vec<f32>) = gradient
            .par_chunks(dims)
            .enumerate()
            .map_init(
                || vec![0usize; dims],
                |coords, (offset, grad)| {
                    let norm_sq: f32 = grad.iter().map(|g| g * g).sum();
                    let norm = norm_sq.sqrt();
                    if norm < FLAT_EPS {
                        return (0.0, 0.0);
                    }

                    shape.coords_of(offset, coords);
                    let centre = src[offset];
                    let mut lww = 0.0f32;
                    for i in 0..dims {
                        for j in 0..dims {
                            let h = if i == j {
                                sample(src, shape, coords, &[(i, 1)]) - 2.0 * centre
                                    + sample(src, shape, coords, &[(i, -1)])
                            } else {
                                (sample(src, shape, coords, &[(i, 1), (j, 1)])
                                    - sample(src, shape, coords, &[(i, 1), (j, -1)])
                                    - sample(src, shape, coords, &[(i, -1), (j, 1)])
                                    + sample(src, shape, coords, &[(i, -1), (j, -1)]))
                                    / 4.0
                            };
                            lww += grad[i] * grad[j] * h;
                        }
                    }
                    (norm, lww / norm_sq)
                },
            )
            .unzip();

        let sign: Vec<f32> = (0..volume)
            .into_par_iter()
            .map_init(
                || vec![0usize; dims],
                |coords, offset| {
                    if magnitude[offset] < FLAT_EPS {
                        return 0.0;
                    }
                    let value = lww[offset];
                    let grad = &gradient[offset * dims..(offset + 1) * dims];
                    shape.coords_of(offset, coords);
                    let crossing = (0..dims).any(|i| {
                        [1isize, -1].iter().any(|&d| {
                            let Some(n) = neighbor(shape, coords, offset, i, d) else {
                                return false;
                            };
                            let other = lww[n];
                            (value >= 0.0) != (other >= 0.0) && value.abs() <= other.abs()
                        })
                    });
                    if !crossing {
                        return 0.0;
                    }
                    // Lww decreases along the gradient at a maximum of |grad|
                    let third: f32 = (0..dims)
                        .map(|i| {
                            let ahead = sample(&lww, shape, coords, &[(i, 1)]);
                            let behind = sample(&lww, shape, coords, &[(i, -1)]);
                            grad[i] * (ahead - behind) / 2.0
                        })
                        .sum();
                    if third <= 0.0 {
                        1.0
                    } else {
                        0.0
                    }
                },
            )
            .collect();

        Ok(DerivativeOutput {
            magnitude: Grid::from_vec(shape.clone(), magnitude)?,
            sign: Grid::from_vec(shape.clone(), sign)?,
        })
    }

    /// Pixel-wise product of magnitude and maxima mask: the non-maximum
    /// suppression grid
    pub fn combine(&self, derivatives: &DerivativeOutput) -> GaussianResult<Grid<f32>> {
        derivatives.magnitude.ensure_same_shape(&derivatives.sign)?;
        let data = derivatives
            .magnitude
            .as_slice()
            .par_iter()
            .zip(derivatives.sign.as_slice().par_iter())
            .map(|(m, s)| m * s)
            .collect();
        Ok(Grid::from_vec(derivatives.magnitude.shape().clone(), data)?)
    }

    /// Smooth, differentiate and combine in one call
    pub fn candidates(&self, input: &Grid<f32>) -> GaussianResult<(DerivativeOutput, Grid<f32>)> {
        let smoothed = self.smooth(input)?;
        let derivatives = self.second_derivative(&smoothed)?;
        let combined = self.combine(&derivatives)?;
        Ok((derivatives, combined))
    }
}

fn convolve_axis(shape: &GridShape, axis: usize, kernel: &GaussianKernel, src: &[f32], dst: &mut [f32]) {
    let stride = shape.strides()[axis];
    let extent = shape.extent()[axis] as isize;
    let radius = kernel.radius() as isize;
    let weights = kernel.coefficients();

    dst.par_iter_mut().enumerate().for_each(|(offset, out)| {
        let c = ((offset / stride) as isize) % extent;
        let base = offset as isize - c * stride as isize;
        *out = weights
            .iter()
            .enumerate()
            .map(|(k, w)| {
                let n = (c + k as isize - radius).clamp(0, extent - 1);
                w * src[(base + n * stride as isize) as usize]
            })
            .sum();
    });
}

/// Value at `coords` shifted by `steps`, clamped to the grid
fn sample(src: &[f32], shape: &GridShape, coords: &[usize], steps: &[(usize, isize)]) -> f32 {
    let mut offset = shape.offset_of(coords) as isize;
    for &(axis, d) in steps {
        let extent = shape.extent()[axis] as isize;
        let c = coords[axis] as isize;
        let moved = (c + d).clamp(0, extent - 1);
        offset += (moved - c) * shape.strides()[axis] as isize;
    }
    src[offset as usize]
}

fn neighbor(shape: &GridShape, coords: &[usize], offset: usize, axis: usize, d: isize) -> Option<usize> {
    let c = coords[axis] as isize + d;
    if c < 0 || c as usize >= shape.extent()[axis] {
        return None;
    }
    Some((offset as isize + d * shape.strides()[axis] as isize) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(sigma: f32) -> GaussianDerivativeEngine {
        GaussianDerivativeEngine::new(sigma, vec![0.01], 32)
    }

    fn step(len: usize, at: usize) -> Grid<f32> {
        let data = (0..len).map(|i| if i >= at { 1.0 } else { 0.0 }).collect();
        Grid::from_vec(GridShape::new(&[len]).unwrap(), data).unwrap()
    }

    #[test]
    fn test_smoothing_preserves_constant() {
        let grid = Grid::new(GridShape::new(&[6, 5, 4]).unwrap(), 3.5f32);
        let out = engine(1.5).smooth(&grid).unwrap();
        for &v in out.as_slice() {
            assert!((v - 3.5).abs() < 1e-4);
        }
    }

    #[test]
    fn test_smoothing_spreads_impulse() {
        let mut grid = Grid::new(GridShape::new(&[11]).unwrap(), 0.0f32);
        grid.set(&[5], 1.0);
        let out = engine(1.0).smooth(&grid).unwrap();
        let s = out.as_slice();
        assert!(s[5] > s[4] && s[4] > s[3]);
        assert!((s[4] - s[6]).abs() < 1e-6);
        assert!((s.iter().sum::<f32>() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_step_edge_yields_single_ridge() {
        let (derivatives, nms) = engine(1.0).candidates(&step(20, 10)).unwrap();
        let nonzero: Vec<usize> = nms
            .as_slice()
            .iter()
            .enumerate()
            .filter(|(_, &v)| v > 0.0)
            .map(|(i, _)| i)
            .collect();
        assert!(!nonzero.is_empty());
        assert!(nonzero.iter().all(|&i| i == 9 || i == 10), "{:?}", nonzero);
        let peak = derivatives.magnitude.as_slice()[9].max(derivatives.magnitude.as_slice()[10]);
        assert!(derivatives.magnitude.as_slice().iter().all(|&m| m <= peak + 1e-6));
    }

    #[test]
    fn test_flat_grid_has_no_candidates() {
        let grid = Grid::new(GridShape::new(&[8, 8]).unwrap(), 0.25f32);
        let (derivatives, nms) = engine(1.0).candidates(&grid).unwrap();
        assert!(nms.as_slice().iter().all(|&v| v == 0.0));
        assert!(derivatives.sign.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_vertical_edge_in_2d() {
        let (w, h) = (16, 8);
        let data = (0..w * h).map(|i| if i % w >= 8 { 1.0 } else { 0.0 }).collect();
        let grid = Grid::from_2d(w, h, data).unwrap();
        let (_, nms) = engine(1.0).candidates(&grid).unwrap();
        for y in 0..h {
            for x in 0..w {
                let v = *nms.get(&[x, y]).unwrap();
                if v > 0.0 {
                    assert!(x == 7 || x == 8, "unexpected candidate at ({}, {})", x, y);
                }
            }
            let row_hits = (0..w).filter(|&x| *nms.get(&[x, y]).unwrap() > 0.0).count();
            assert!(row_hits >= 1);
        }
    }

    #[test]
    fn test_maximum_error_per_axis() {
        let e = GaussianDerivativeEngine::new(2.0, vec![0.1, 0.0001], 64);
        let coarse = e.kernel(0).unwrap().radius();
        let fine = e.kernel(1).unwrap().radius();
        assert!(coarse < fine);
        // Axes past the list reuse the last entry
        assert_eq!(e.kernel(4).unwrap().radius(), fine);
        assert_eq!(e.halo_radius(3).unwrap(), vec![coarse + 2, fine + 2, fine + 2]);

        let single = GaussianDerivativeEngine::new(2.0, vec![0.1], 64);
        assert_eq!(single.kernel(3).unwrap().radius(), coarse);
    }

    #[test]
    fn test_step_in_volume_matches_line() {
        // Step along axis 1 of a 3-D volume; axes 0 and 2 are constant
        let shape = GridShape::new(&[3, 20, 2]).unwrap();
        let data = (0..shape.volume())
            .map(|i| if (i / 3) % 20 >= 10 { 1.0 } else { 0.0 })
            .collect();
        let grid = Grid::from_vec(shape, data).unwrap();
        let (derivatives, nms) = engine(1.0).candidates(&grid).unwrap();
        let (reference, _) = engine(1.0).candidates(&step(20, 10)).unwrap();
        for z in 0..2 {
            for x in 0..3 {
                let hits: Vec<usize> = (0..20).filter(|&y| *nms.get(&[x, y, z]).unwrap() > 0.0).collect();
                assert!(!hits.is_empty(), "column ({}, {})", x, z);
                assert!(hits.iter().all(|&y| y == 9 || y == 10), "{:?}", hits);
                for y in 0..20 {
                    let m = *derivatives.magnitude.get(&[x, y, z]).unwrap();
                    assert!((m - reference.magnitude.as_slice()[y]).abs() < 1e-4);
                }
            }
        }
    }

    #[test]
    fn test_halo_radius() {
        let e = engine(1.0);
        let halo = e.halo_radius(3).unwrap();
        assert_eq!(halo.len(), 3);
        assert_eq!(halo[0], e.kernel(0).unwrap().radius() + DERIVATIVE_HALO);
    }

    #[test]
    fn test_combine_is_product() {
        let shape = GridShape::new(&[3]).unwrap();
        let d = DerivativeOutput {
            magnitude: Grid::from_vec(shape.clone(), vec![0.5, 2.0, 3.0]).unwrap(),
            sign: Grid::from_vec(shape, vec![1.0, 0.0, 1.0]).unwrap(),
        };
        assert_eq!(engine(1.0).combine(&d).unwrap().as_slice(), &[0.5, 0.0, 3.0]);
    }
}
