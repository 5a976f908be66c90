use crate::error::{GaussianError, GaussianResult};

/// Sampled, normalized 1-D Gaussian of odd width `2 * radius + 1`
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianKernel {
    coefficients: Vec<f32>,
    radius: usize,
}

impl GaussianKernel {
    /// Builds the narrowest kernel whose discarded tail mass is at most
    /// `maximum_error`, never wider than `max_width`.
    pub fn new(sigma: f32, maximum_error: f32, max_width: usize) -> GaussianResult<Self> {
        if !sigma.is_finite() || sigma <= 0.0 {
            return Err(GaussianError::InvalidSigma(sigma));
        }
        if !(maximum_error > 0.0 && maximum_error < 1.0) {
            return Err(GaussianError::InvalidMaximumError(maximum_error));
        }
        if max_width == 0 {
            return Err(GaussianError::InvalidKernelWidth(max_width));
        }

        let sigma = sigma as f64;
        let support = (10.0 * sigma).ceil() as usize + 1;
        let weight = |k: usize| (-((k * k) as f64) / (2.0 * sigma * sigma)).exp();
        let total: f64 = weight(0) + 2.0 * (1..=support).map(weight).sum::<f64>();

        let max_radius = (max_width - 1) / 2;
        let mut radius = 0;
        let mut kept = weight(0);
        while radius < max_radius && 1.0 - kept / total > maximum_error as f64 {
            radius += 1;
            kept += 2.0 * weight(radius);
        }

        let coefficients = (0..=2 * radius)
            .map(|i| (weight(i.abs_diff(radius)) / kept) as f32)
            .collect();

        Ok(Self {
            coefficients,
            radius,
        })
    }

    pub fn radius(&self) -> usize {
        self.radius
    }

    pub fn width(&self) -> usize {
        self.coefficients.len()
    }

    /// Coefficient for tap `-radius..=radius`
    pub fn coefficients(&self) -> &[f32] {
        &self.coefficients
    }
}

/// Shorthand for the support radius alone
pub fn kernel_radius(sigma: f32, maximum_error: f32, max_width: usize) -> GaussianResult<usize> {
    GaussianKernel::new(sigma, maximum_error, max_width).map(|k| k.radius())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kernel_is_normalized_and_symmetric() {
        for sigma in [0.5f32, 1.0, 2.0, 4.0] {
            let k = GaussianKernel::new(sigma, 0.01, 64).unwrap();
            let sum: f32 = k.coefficients().iter().sum();
            assert!((sum - 1.0).abs() < 1e-5, "sigma {} sum {}", sigma, sum);
            let c = k.coefficients();
            for i in 0..k.radius() {
                assert!((c[i] - c[c.len() - 1 - i]).abs() < 1e-7);
            }
            assert_eq!(k.width(), 2 * k.radius() + 1);
        }
    }

    #[test]
    fn test_radius_grows_with_sigma_and_precision() {
        let r1 = kernel_radius(1.0, 0.01, 64).unwrap();
        let r2 = kernel_radius(2.0, 0.01, 64).unwrap();
        let r3 = kernel_radius(2.0, 0.0001, 64).unwrap();
        assert!(r1 < r2);
        assert!(r2 < r3);
        // About 2.6 standard deviations for a 1% tail
        assert!((2..=4).contains(&r1));
    }

    #[test]
    fn test_radius_capped_by_width() {
        assert_eq!(kernel_radius(20.0, 0.001, 32).unwrap(), 15);
        assert_eq!(kernel_radius(20.0, 0.001, 1).unwrap(), 0);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(matches!(GaussianKernel::new(0.0, 0.01, 32), Err(GaussianError::InvalidSigma(_))));
        assert!(matches!(GaussianKernel::new(1.0, 0.0, 32), Err(GaussianError::InvalidMaximumError(_))));
        assert!(matches!(GaussianKernel::new(1.0, 0.01, 0), Err(GaussianError::InvalidKernelWidth(0))));
    }
}
