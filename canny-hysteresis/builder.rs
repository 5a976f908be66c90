use canny_core::{CannyConfig, Connectivity};
use log::warn;
use crate::config::DetectorConfig;
use crate::engine::HysteresisEngine;
use crate::error::CannyResult;

/// Which of the two thresholds were set explicitly
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ThresholdOrigin {
    upper: bool,
    lower: bool,
    legacy: bool,
}

/// Fluent API builder for detector configuration
#[derive(Debug, Clone)]
pub struct DetectorBuilder {
    config: CannyConfig,
    origin: ThresholdOrigin,
}

impl Default for DetectorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self {
            config: CannyConfig::default(),
            origin: ThresholdOrigin::default(),
        }
    }

    /// Set the Gaussian smoothing sigma
    pub fn sigma(mut self, sigma: f32) -> Self {
        self.config.sigma = sigma;
        self
    }

    /// Set one kernel truncation error for every axis
    pub fn maximum_error(mut self, error: f32) -> Self {
        self.config.maximum_error = vec![error];
        self
    }

    /// Set a kernel truncation error per axis
    pub fn maximum_error_per_axis(mut self, errors: &[f32]) -> Self {
        self.config.maximum_error = errors.to_vec();
        self
    }

    pub fn max_kernel_width(mut self, width: usize) -> Self {
        self.config.max_kernel_width = width;
        self
    }

    /// Set the upper (strong) threshold
    pub fn upper_threshold(mut self, value: f32) -> Self {
        self.config.upper_threshold = value;
        self.origin.upper = true;
        self
    }

    /// Set the lower (weak) threshold
    pub fn lower_threshold(mut self, value: f32) -> Self {
        self.config.lower_threshold = value;
        self.origin.lower = true;
        self
    }

    /// Legacy single threshold: upper = `value`, lower = `value / 2`.
    ///
    /// Overrides explicitly set bounds, with a warning. Bounds set after this
    /// call replace only the bound they name.
    pub fn threshold(mut self, value: f32) -> Self {
        if self.origin.upper || self.origin.lower {
            warn!(
                "legacy threshold {} overrides explicit thresholds upper={} lower={}",
                value, self.config.upper_threshold, self.config.lower_threshold
            );
        }
        self.config.upper_threshold = value;
        self.config.lower_threshold = value / 2.0;
        self.origin = ThresholdOrigin {
            upper: false,
            lower: false,
            legacy: true,
        };
        self
    }

    /// Set the value written to non-edge pixels
    pub fn outside_value(mut self, value: f32) -> Self {
        self.config.outside_value = value;
        self
    }

    /// Set the value written to edge pixels
    pub fn edge_value(mut self, value: f32) -> Self {
        self.config.edge_value = value;
        self
    }

    pub fn connectivity(mut self, connectivity: Connectivity) -> Self {
        self.config.connectivity = connectivity;
        self
    }

    /// Set the number of threads for parallel processing
    pub fn threads(mut self, n_threads: usize) -> Self {
        self.config.n_threads = n_threads;
        self
    }

    /// Apply the fine preset
    pub fn preset_fine(self) -> Self {
        self.with_preset(DetectorConfig::fine_preset())
    }

    /// Apply the balanced preset
    pub fn preset_balanced(self) -> Self {
        self.with_preset(DetectorConfig::balanced_preset())
    }

    /// Apply the coarse preset
    pub fn preset_coarse(self) -> Self {
        self.with_preset(DetectorConfig::coarse_preset())
    }

    fn with_preset(mut self, preset: DetectorConfig) -> Self {
        self.config = preset.core;
        self.origin = ThresholdOrigin::default();
        self
    }

    /// True once the legacy single threshold has been applied
    pub fn uses_legacy_threshold(&self) -> bool {
        self.origin.legacy
    }

    /// Validate and build the hysteresis engine
    pub fn build(self) -> CannyResult<HysteresisEngine> {
        let config = self.to_config();
        config.validate()?;
        HysteresisEngine::from_config(&config.core)
    }

    /// Validate and return the smoothing/threshold configuration
    pub fn build_config(self) -> CannyResult<CannyConfig> {
        let config = self.to_config();
        config.validate()?;
        Ok(config.core)
    }

    /// Generate a summary of the builder's configuration
    pub fn summary(&self) -> String {
        self.clone().to_config().summary()
    }

    /// Create a builder from an existing `DetectorConfig`
    pub fn from_config(config: DetectorConfig) -> Self {
        Self {
            config: config.core,
            origin: ThresholdOrigin::default(),
        }
    }

    /// Convert the builder into a `DetectorConfig`
    pub fn to_config(self) -> DetectorConfig {
        DetectorConfig {
            core: self.config,
            name: None,
            description: None,
            version: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CannyError;

    #[test]
    fn test_legacy_threshold_derives_lower() {
        let cfg = DetectorBuilder::new().threshold(0.4).build_config().unwrap();
        assert_eq!(cfg.upper_threshold, 0.4);
        assert_eq!(cfg.lower_threshold, 0.2);
    }

    #[test]
    fn test_legacy_threshold_overrides_explicit() {
        let builder = DetectorBuilder::new()
            .upper_threshold(0.9)
            .lower_threshold(0.1)
            .threshold(0.6);
        assert!(builder.uses_legacy_threshold());
        let cfg = builder.build_config().unwrap();
        assert_eq!(cfg.upper_threshold, 0.6);
        assert_eq!(cfg.lower_threshold, 0.3);
    }

    #[test]
    fn test_explicit_after_legacy_replaces_one_bound() {
        let cfg = DetectorBuilder::new()
            .threshold(0.6)
            .lower_threshold(0.1)
            .build_config()
            .unwrap();
        assert_eq!(cfg.upper_threshold, 0.6);
        assert_eq!(cfg.lower_threshold, 0.1);
    }

    #[test]
    fn test_build_engine() {
        let engine = DetectorBuilder::new()
            .upper_threshold(5.0)
            .lower_threshold(1.0)
            .outside_value(-1.0)
            .connectivity(Connectivity::Face)
            .threads(2)
            .build()
            .unwrap();
        assert_eq!(engine.upper(), 5.0);
        assert_eq!(engine.lower(), 1.0);
        assert_eq!(engine.outside_value(), -1.0);
        assert_eq!(engine.connectivity(), Connectivity::Face);
    }

    #[test]
    fn test_build_rejects_inverted_thresholds() {
        let result = DetectorBuilder::new()
            .upper_threshold(0.1)
            .lower_threshold(0.5)
            .build();
        assert!(matches!(result, Err(CannyError::InvalidThresholds { .. })));
    }

    #[test]
    fn test_build_rejects_matching_edge_and_outside_values() {
        let result = DetectorBuilder::new().outside_value(1.0).build_config();
        assert!(matches!(result, Err(CannyError::IndistinctOutputValues { .. })));
        assert!(DetectorBuilder::new()
            .outside_value(1.0)
            .edge_value(0.0)
            .build_config()
            .is_ok());
    }

    #[test]
    fn test_presets_and_round_trip() {
        let builder = DetectorBuilder::new().preset_coarse();
        let cfg = builder.clone().to_config();
        assert_eq!(cfg.core.connectivity, Connectivity::Face);
        let again = DetectorBuilder::from_config(cfg.clone()).to_config();
        assert_eq!(again.core, cfg.core);
        assert!(builder.summary().contains("Face"));
    }
}
