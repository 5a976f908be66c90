use canny_core::{CannyConfig, Connectivity};
use crate::builder::DetectorBuilder;
use crate::engine::validate_thresholds;
use crate::error::{CannyError, CannyResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Complete detector configuration with all settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DetectorConfig {
    /// Metadata
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none", default))]
    pub name: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none", default))]
    pub description: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none", default))]
    pub version: Option<String>,
    /// Smoothing, threshold and linking parameters; last so TOML emits it as a table
    pub core: CannyConfig,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorConfig {
    /// Create new configuration with default settings
    pub fn new() -> Self {
        Self {
            core: CannyConfig::default(),
            name: None,
            description: None,
            version: None,
        }
    }

    /// Small sigma and low thresholds: keeps fine structure and faint edges
    pub fn fine_preset() -> Self {
        Self {
            core: CannyConfig {
                sigma: 0.8,
                upper_threshold: 0.1,
                lower_threshold: 0.04,
                connectivity: Connectivity::Full,
                n_threads: num_cpus::get(),
                ..CannyConfig::default()
            },
            name: Some("Fine".to_string()),
            description: Some("Light smoothing, keeps faint and thin edges".to_string()),
            version: Some("1.0".to_string()),
        }
    }

    /// Middle-of-the-road settings for normalized images
    pub fn balanced_preset() -> Self {
        Self {
            core: CannyConfig {
                sigma: 1.5,
                upper_threshold: 0.2,
                lower_threshold: 0.1,
                connectivity: Connectivity::Full,
                n_threads: num_cpus::get(),
                ..CannyConfig::default()
            },
            name: Some("Balanced".to_string()),
            description: Some("Moderate smoothing with the classic 2:1 threshold ratio".to_string()),
            version: Some("1.0".to_string()),
        }
    }

    /// Heavy smoothing and face connectivity: only long, strong contours survive
    pub fn coarse_preset() -> Self {
        Self {
            core: CannyConfig {
                sigma: 3.0,
                upper_threshold: 0.3,
                lower_threshold: 0.15,
                connectivity: Connectivity::Face,
                n_threads: num_cpus::get(),
                ..CannyConfig::default()
            },
            name: Some("Coarse".to_string()),
            description: Some("Strong smoothing for noisy inputs".to_string()),
            version: Some("1.0".to_string()),
        }
    }

    /// Add metadata to configuration
    pub fn with_metadata(mut self, name: &str, description: &str) -> Self {
        self.name = Some(name.to_string());
        self.description = Some(description.to_string());
        self.version = Some("1.0".to_string());
        self
    }

    /// Convert to DetectorBuilder for further customization
    pub fn to_builder(self) -> DetectorBuilder {
        DetectorBuilder::from_config(self)
    }

    /// Generate human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "DetectorConfig: sigma={}, upper={}, lower={}, outside={}, connectivity={:?}, threads={}",
            self.core.sigma,
            self.core.upper_threshold,
            self.core.lower_threshold,
            self.core.outside_value,
            self.core.connectivity,
            self.core.n_threads
        )
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> CannyResult<()> {
        let c = &self.core;
        if !c.sigma.is_finite() || c.sigma <= 0.0 {
            return Err(CannyError::InvalidSigma(c.sigma));
        }
        if let Some(&e) = c
            .maximum_error
            .iter()
            .find(|&&e| !(e > 0.0 && e < 1.0))
        {
            return Err(CannyError::InvalidMaximumError(e));
        }
        validate_thresholds(c.upper_threshold, c.lower_threshold)?;
        if c.edge_value == c.outside_value {
            return Err(CannyError::IndistinctOutputValues { value: c.edge_value });
        }
        if c.n_threads == 0 {
            return Err(CannyError::InvalidThreadCount(0));
        }
        Ok(())
    }

    /// Save configuration to JSON file
    #[cfg(feature = "serde")]
    pub fn save_json<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load configuration from JSON file
    #[cfg(feature = "serde")]
    pub fn load_json<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Save configuration to TOML file
    #[cfg(feature = "serde")]
    pub fn save_toml<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let toml = toml::to_string_pretty(self)?;
        std::fs::write(path, toml)?;
        Ok(())
    }

    /// Load configuration from TOML file
    #[cfg(feature = "serde")]
    pub fn load_toml<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Serialize to JSON string
    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON string
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML string
    #[cfg(feature = "serde")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Deserialize from TOML string
    #[cfg(feature = "serde")]
    pub fn from_toml(toml_str: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_validate() {
        for cfg in [
            DetectorConfig::new(),
            DetectorConfig::fine_preset(),
            DetectorConfig::balanced_preset(),
            DetectorConfig::coarse_preset(),
        ] {
            assert!(cfg.validate().is_ok(), "{}", cfg.summary());
        }
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut cfg = DetectorConfig::new();
        cfg.core.sigma = 0.0;
        assert!(matches!(cfg.validate(), Err(CannyError::InvalidSigma(_))));

        let mut cfg = DetectorConfig::new();
        cfg.core.maximum_error = vec![0.01, 1.5];
        assert!(matches!(cfg.validate(), Err(CannyError::InvalidMaximumError(_))));

        let mut cfg = DetectorConfig::new();
        cfg.core.lower_threshold = 0.5;
        cfg.core.upper_threshold = 0.2;
        assert!(matches!(cfg.validate(), Err(CannyError::InvalidThresholds { .. })));

        let mut cfg = DetectorConfig::new();
        cfg.core.outside_value = 1.0;
        cfg.core.edge_value = 1.0;
        assert!(matches!(
            cfg.validate(),
            Err(CannyError::IndistinctOutputValues { value }) if value == 1.0
        ));

        let mut cfg = DetectorConfig::new();
        cfg.core.n_threads = 0;
        assert!(matches!(cfg.validate(), Err(CannyError::InvalidThreadCount(0))));
    }

    #[test]
    fn test_metadata() {
        let cfg = DetectorConfig::new().with_metadata("ct", "liver slices");
        assert_eq!(cfg.name.as_deref(), Some("ct"));
        assert_eq!(cfg.version.as_deref(), Some("1.0"));
        assert!(cfg.summary().contains("sigma=1"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_json_and_toml_round_trip() {
        let cfg = DetectorConfig::coarse_preset();
        let json = cfg.to_json().unwrap();
        assert_eq!(DetectorConfig::from_json(&json).unwrap(), cfg);
        let toml = cfg.to_toml().unwrap();
        assert_eq!(DetectorConfig::from_toml(&toml).unwrap(), cfg);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_from_json_validates() {
        let mut cfg = DetectorConfig::new();
        cfg.core.lower_threshold = 2.0;
        cfg.core.upper_threshold = 1.0;
        let json = cfg.to_json().unwrap();
        assert!(DetectorConfig::from_json(&json).is_err());
    }
}
