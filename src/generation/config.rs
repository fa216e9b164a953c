//! Generation settings cascade: one settings block per hierarchy level.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::coords::Level;
use crate::core::{Error, Result};

/// Fractal noise shape for one level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseShape {
    /// Exponent applied to the normalized value (sharpens peaks above 1.0)
    pub power: f32,
    /// Base frequency in cycles per cell
    pub frequency: f32,
    /// fBm octaves
    pub octaves: u32,
    /// fBm persistence (0.5 typical)
    pub persistence: f32,
    /// fBm lacunarity (2.0 typical)
    pub lacunarity: f32,
    /// Multiplier applied to the raw noise value
    pub amplitude: f32,
    /// Optional per-cell jitter magnitude
    pub jitter: Option<f32>,
}

impl Default for NoiseShape {
    fn default() -> Self {
        Self {
            power: 1.0,
            frequency: 0.05,
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
            amplitude: 1.0,
            jitter: None,
        }
    }
}

/// Linear remap from the raw noise range into the stored range.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Remap {
    pub from_min: f32,
    pub from_max: f32,
    pub to_min: f32,
    pub to_max: f32,
}

impl Default for Remap {
    fn default() -> Self {
        Self { from_min: -1.0, from_max: 1.0, to_min: 0.0, to_max: 1.0 }
    }
}

impl Remap {
    /// Map `value` from the source range into the target range (unclamped).
    pub fn apply(&self, value: f32) -> f32 {
        let t = (value - self.from_min) / (self.from_max - self.from_min);
        self.to_min + t * (self.to_max - self.to_min)
    }
}

/// Settings for a single level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Base seed for every node of this level
    pub seed: i32,
    /// Cells per chunk along one axis
    pub chunk_size: u32,
    /// Chunks per level grid along one axis
    pub chunk_count: u32,
    pub noise: NoiseShape,
    pub remap: Remap,
    /// Weight of the parent level's field folded into this level
    pub influence: f32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            seed: 0,
            chunk_size: 32,
            chunk_count: 4,
            noise: NoiseShape::default(),
            remap: Remap::default(),
            influence: 0.5,
        }
    }
}

impl GenerationSettings {
    /// Cells along one axis of the level grid (`chunk_count * chunk_size`).
    pub fn size(&self) -> u32 {
        self.chunk_count * self.chunk_size
    }

    /// Reject settings that cannot drive a synthesis run.
    pub fn validate(&self, level: Level) -> Result<()> {
        let invalid = |reason: &str| Error::InvalidSettings {
            level: level.to_string(),
            reason: reason.to_string(),
        };

        if self.chunk_size == 0 {
            return Err(invalid("chunk_size must be positive"));
        }
        if self.chunk_count == 0 {
            return Err(invalid("chunk_count must be positive"));
        }
        if self.noise.octaves == 0 {
            return Err(invalid("octaves must be positive"));
        }
        if !(self.noise.frequency.is_finite() && self.noise.frequency > 0.0) {
            return Err(invalid("frequency must be positive"));
        }
        if !(self.noise.power.is_finite() && self.noise.power > 0.0) {
            return Err(invalid("power must be positive"));
        }
        if self.remap.from_min >= self.remap.from_max {
            return Err(invalid("remap source range is empty"));
        }
        if self.remap.to_min > self.remap.to_max {
            return Err(invalid("remap target range is inverted"));
        }
        if !self.influence.is_finite() {
            return Err(invalid("influence must be finite"));
        }
        Ok(())
    }
}

/// The full Universe → Filament → Sector → Region cascade.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CascadeSettings {
    pub universe: GenerationSettings,
    pub filament: GenerationSettings,
    pub sector: GenerationSettings,
    pub region: GenerationSettings,
}

impl Default for CascadeSettings {
    fn default() -> Self {
        Self {
            universe: GenerationSettings {
                seed: 0,
                chunk_size: 64,
                chunk_count: 16,
                noise: NoiseShape {
                    power: 5.0,
                    frequency: 0.01,
                    octaves: 3,
                    ..Default::default()
                },
                remap: Remap::default(),
                influence: 0.0,
            },
            filament: GenerationSettings {
                chunk_size: 32,
                chunk_count: 4,
                noise: NoiseShape {
                    power: 2.0,
                    frequency: 0.05,
                    octaves: 4,
                    ..Default::default()
                },
                ..Default::default()
            },
            sector: GenerationSettings {
                chunk_size: 32,
                chunk_count: 4,
                noise: NoiseShape {
                    power: 1.5,
                    frequency: 0.08,
                    octaves: 4,
                    ..Default::default()
                },
                ..Default::default()
            },
            region: GenerationSettings {
                chunk_size: 16,
                chunk_count: 4,
                noise: NoiseShape {
                    power: 1.0,
                    frequency: 0.12,
                    octaves: 5,
                    ..Default::default()
                },
                ..Default::default()
            },
        }
    }
}

impl CascadeSettings {
    /// Parse a cascade from JSON; missing fields take the reference defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let cascade: CascadeSettings = serde_json::from_str(json)?;
        cascade.validate()?;
        Ok(cascade)
    }

    /// Load and validate a cascade from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let cascade = Self::from_json_str(&json)?;
        log::info!("Loaded generation cascade from {}", path.display());
        Ok(cascade)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Settings for one level.
    pub fn level(&self, level: Level) -> &GenerationSettings {
        match level {
            Level::Universe => &self.universe,
            Level::Filament => &self.filament,
            Level::Sector => &self.sector,
            Level::Region => &self.region,
        }
    }

    /// Validate every level and the combined grid extent.
    pub fn validate(&self) -> Result<()> {
        for level in Level::ALL {
            self.level(level).validate(level)?;
        }

        // Finest global cell index: universe * filament * sector * region cells.
        let extent = Level::ALL
            .iter()
            .try_fold(1u64, |acc, &level| acc.checked_mul(self.level(level).size() as u64));
        match extent {
            Some(cells) if cells <= i32::MAX as u64 => Ok(()),
            _ => Err(Error::InvalidSettings {
                level: Level::Region.to_string(),
                reason: "combined grid exceeds the i32 cell range".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cascade() {
        let cascade = CascadeSettings::default();
        assert_eq!(cascade.universe.size(), 1024);
        assert_eq!(cascade.universe.noise.octaves, 3);
        assert_eq!(cascade.universe.noise.power, 5.0);
        assert_eq!(cascade.universe.remap.to_min, 0.0);
        assert_eq!(cascade.universe.remap.to_max, 1.0);
        assert_eq!(cascade.filament.size(), 128);
        assert_eq!(cascade.sector.size(), 128);
        assert_eq!(cascade.region.size(), 64);
        assert!(cascade.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_sizes() {
        let mut cascade = CascadeSettings::default();
        cascade.sector.chunk_size = 0;
        assert!(matches!(cascade.validate(), Err(Error::InvalidSettings { .. })));

        let mut cascade = CascadeSettings::default();
        cascade.region.chunk_count = 0;
        assert!(cascade.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_overflowing_grid() {
        let mut cascade = CascadeSettings::default();
        cascade.region.chunk_count = 1024;
        assert!(cascade.validate().is_err());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let cascade = CascadeSettings::from_json_str(
            r#"{ "universe": { "seed": 42, "chunk_size": 8, "chunk_count": 4 } }"#,
        )
        .unwrap();
        assert_eq!(cascade.universe.seed, 42);
        assert_eq!(cascade.universe.size(), 32);
        assert_eq!(cascade.filament, CascadeSettings::default().filament);
    }

    #[test]
    fn test_json_round_trip() {
        let cascade = CascadeSettings::default();
        let json = cascade.to_json_pretty().unwrap();
        assert_eq!(CascadeSettings::from_json_str(&json).unwrap(), cascade);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cascade.json");
        std::fs::write(&path, r#"{ "region": { "influence": 0.25 } }"#).unwrap();

        let cascade = CascadeSettings::load(&path).unwrap();
        assert_eq!(cascade.region.influence, 0.25);
        assert!(CascadeSettings::load(dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_remap_apply() {
        let remap = Remap::default();
        assert_eq!(remap.apply(-1.0), 0.0);
        assert_eq!(remap.apply(1.0), 1.0);
        assert_eq!(remap.apply(0.0), 0.5);
    }
}
