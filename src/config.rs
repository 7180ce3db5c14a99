//! Aggregate analysis configuration.
//!
//! Every section has defaults, so a TOML file only needs the values it
//! changes:
//!
//! ```toml
//! [location]
//! latitude = 59.94
//! longitude = 30.31
//!
//! [growth]
//! voxel_size = 4.0
//! max_height = 60.0
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::InputError;
use crate::sim::growth::GrowthConfig;
use crate::sim::insolation::InsolationNorm;
use crate::sim::sampling::SamplingConfig;
use crate::sim::solar::{GeoLocation, SunPathConfig};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub location: GeoLocation,
    pub sun: SunPathConfig,
    pub norm: InsolationNorm,
    pub sampling: SamplingConfig,
    pub growth: GrowthConfig,
}

impl AnalysisConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).context("Failed to parse analysis config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("In config file: {}", path.display()))
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize analysis config")
    }

    pub fn validate(&self) -> Result<()> {
        let loc = &self.location;
        if !(-90.0..=90.0).contains(&loc.latitude) {
            return Err(invalid(format!("latitude {} out of range", loc.latitude)));
        }
        if !(-180.0..=180.0).contains(&loc.longitude) {
            return Err(invalid(format!("longitude {} out of range", loc.longitude)));
        }
        if !(-14.0..=14.0).contains(&loc.timezone_offset) {
            return Err(invalid(format!(
                "timezone offset {} out of range",
                loc.timezone_offset
            )));
        }

        let norm = &self.norm;
        let minutes = [
            norm.normative_minutes,
            norm.gap_penalty_minutes,
            norm.interruption_penalty_minutes,
            norm.min_period_for_interrupted_minutes,
            norm.tolerance_minutes,
        ];
        if minutes.iter().any(|m| !(*m >= 0.0)) {
            return Err(invalid("insolation norm minutes must not be negative".into()));
        }

        self.sun.validate()?;
        self.sampling.validate()?;
        self.growth.validate()?;
        Ok(())
    }
}

fn invalid(msg: String) -> anyhow::Error {
    InputError::InvalidConfig(msg).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::occlusion::SelfIntersectionGuard;
    use tempfile::tempdir;

    #[test]
    fn test_partial_toml_keeps_defaults() -> Result<()> {
        let config = AnalysisConfig::from_toml_str(
            r#"
            [location]
            latitude = 59.94
            longitude = 30.31

            [norm]
            normative_minutes = 90.0

            [growth]
            voxel_size = 4.0
            max_height = 60.0

            [growth.voxel_occlusion]
            guard = { kind = "origin_offset", distance = 0.3 }
            max_distance = 400.0
            "#,
        )?;
        assert_eq!(config.location.latitude, 59.94);
        assert_eq!(config.location.timezone_offset, 3.0);
        assert_eq!(config.norm.normative_minutes, 90.0);
        assert_eq!(config.norm.gap_penalty_minutes, 10.0);
        assert_eq!(config.growth.num_layers(), 15);
        assert_eq!(
            config.growth.voxel_occlusion.guard,
            SelfIntersectionGuard::OriginOffset(0.3)
        );
        assert_eq!(config.sampling, SamplingConfig::default());
        Ok(())
    }

    #[test]
    fn test_rejects_bad_values() {
        let err = AnalysisConfig::from_toml_str("[location]\nlatitude = 123.0\n").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<InputError>(),
            Some(InputError::InvalidConfig(_))
        ));
        assert!(AnalysisConfig::from_toml_str("[growth]\nvoxel_size = -1.0\n").is_err());
        assert!(AnalysisConfig::from_toml_str("[sun]\nstart_month = 13\n").is_err());
        assert!(AnalysisConfig::from_toml_str("not toml at all [").is_err());
    }

    #[test]
    fn test_file_roundtrip() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("analysis.toml");
        let mut config = AnalysisConfig::default();
        config.growth.max_height = 42.0;
        std::fs::write(&path, config.to_toml_string()?)?;
        let back = AnalysisConfig::from_toml_file(&path)?;
        assert_eq!(back, config);
        Ok(())
    }
}
