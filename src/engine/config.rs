//! Declarative field configuration and calibration overrides.
//!
//! Every field is described by a `const` [`FieldSpec`]: its tiers, keyword
//! sets, length bounds, penalties and numeric [`FieldTuning`]. The numbers
//! can be recalibrated without recompiling through an [`EngineConfig`]
//! file (YAML or TOML) whose per-field [`FieldOverrides`] replace the
//! built-in defaults key by key.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use super::calibrate::Calibration;
use super::candidates::LineBounds;
use super::rules::{PenaltySpec, TierSpec};
use super::scoring::{LabelScope, PositionBucket};
use crate::modality::ModalityTuning;
use crate::models::FieldName;

/// Numeric knobs of one field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldTuning {
    pub header_lines: usize,
    pub header_bonus: f64,
    pub explicit_label_bonus: f64,
    pub target_bonus: f64,
    pub neutral_factor: f64,
    pub multiplicity_bonus: f64,
    pub window_before: usize,
    pub window_after: usize,
    pub min_score: f64,
    pub calibration: Calibration,
}

impl FieldTuning {
    pub const DEFAULT: FieldTuning = FieldTuning {
        header_lines: 0,
        header_bonus: 0.0,
        explicit_label_bonus: 0.0,
        target_bonus: 0.0,
        neutral_factor: 1.0,
        multiplicity_bonus: 0.0,
        window_before: 0,
        window_after: 0,
        min_score: 0.0,
        calibration: Calibration::new(1.0, 0.0, 1.0),
    };

    /// Check the invariants the scorer relies on.
    ///
    /// Explicit labels must outweigh the header bonus, which must outweigh
    /// the target-context bonus, whenever those bonuses are in use.
    pub fn validate(&self, field: FieldName) -> Result<()> {
        if self.explicit_label_bonus > 0.0
            && self.header_bonus > 0.0
            && self.explicit_label_bonus <= self.header_bonus
        {
            bail!(
                "{field}: explicit_label_bonus ({}) must exceed header_bonus ({})",
                self.explicit_label_bonus,
                self.header_bonus
            );
        }
        if self.header_bonus > 0.0 && self.target_bonus >= self.header_bonus {
            bail!(
                "{field}: header_bonus ({}) must exceed target_bonus ({})",
                self.header_bonus,
                self.target_bonus
            );
        }
        if self.target_bonus < 0.0 || self.header_bonus < 0.0 || self.explicit_label_bonus < 0.0 {
            bail!("{field}: bonuses must not be negative");
        }
        if !(self.neutral_factor > 0.0 && self.neutral_factor <= 1.0) {
            bail!(
                "{field}: neutral_factor must be in (0, 1], got {}",
                self.neutral_factor
            );
        }
        self.calibration
            .validate()
            .with_context(|| format!("{field}: invalid calibration"))
    }

    /// Apply overrides key by key.
    pub fn with_overrides(mut self, overrides: &FieldOverrides) -> Self {
        if let Some(v) = overrides.header_lines {
            self.header_lines = v;
        }
        if let Some(v) = overrides.header_bonus {
            self.header_bonus = v;
        }
        if let Some(v) = overrides.explicit_label_bonus {
            self.explicit_label_bonus = v;
        }
        if let Some(v) = overrides.target_bonus {
            self.target_bonus = v;
        }
        if let Some(v) = overrides.neutral_factor {
            self.neutral_factor = v;
        }
        if let Some(v) = overrides.multiplicity_bonus {
            self.multiplicity_bonus = v;
        }
        if let Some(v) = overrides.window_before {
            self.window_before = v;
        }
        if let Some(v) = overrides.window_after {
            self.window_after = v;
        }
        if let Some(v) = overrides.min_score {
            self.min_score = v;
        }
        if let Some(v) = overrides.scale {
            self.calibration.scale = v;
        }
        if let Some(v) = overrides.floor {
            self.calibration.floor = v;
        }
        if let Some(v) = overrides.ceiling {
            self.calibration.ceiling = v;
        }
        self
    }
}

/// Optional replacements for a field's [`FieldTuning`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FieldOverrides {
    pub header_lines: Option<usize>,
    pub header_bonus: Option<f64>,
    pub explicit_label_bonus: Option<f64>,
    pub target_bonus: Option<f64>,
    pub neutral_factor: Option<f64>,
    pub multiplicity_bonus: Option<f64>,
    pub window_before: Option<usize>,
    pub window_after: Option<usize>,
    pub min_score: Option<f64>,
    pub scale: Option<f64>,
    pub floor: Option<f64>,
    pub ceiling: Option<f64>,
}

/// Source form of a field's text cleanup.
#[derive(Debug, Clone, Copy)]
pub struct CleanupSpec {
    pub strip_trailing_punct: bool,
    pub strip_parentheticals: bool,
    pub strip_weights: bool,
    pub rewrites: &'static [(&'static str, &'static str)],
    pub max_chars: Option<usize>,
}

impl CleanupSpec {
    pub const NONE: CleanupSpec = CleanupSpec {
        strip_trailing_punct: false,
        strip_parentheticals: false,
        strip_weights: false,
        rewrites: &[],
        max_chars: None,
    };
}

/// How candidates on the same line are combined before scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    /// Every match is its own candidate.
    PerMatch,
    /// Distinct values on one line merge into one candidate, joined with
    /// the separator and eligible for the multiplicity bonus.
    PerLine { separator: &'static str },
}

/// Complete declarative description of a generic-pipeline field.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub field: FieldName,
    pub tiers: &'static [TierSpec],
    pub bounds: LineBounds,
    pub max_lines: Option<usize>,
    pub max_chars: Option<usize>,
    pub target: &'static [&'static str],
    pub excluded: &'static [&'static str],
    pub explicit_label: Option<&'static str>,
    pub label_scope: LabelScope,
    pub penalties: &'static [PenaltySpec],
    pub position_buckets: &'static [PositionBucket],
    pub aggregation: Aggregation,
    pub cleanup: CleanupSpec,
    pub tuning: FieldTuning,
}

/// Whole-engine configuration: per-field overrides plus modality tuning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub fields: BTreeMap<FieldName, FieldOverrides>,
    pub modality: ModalityTuning,
}

impl EngineConfig {
    /// Load overrides from a `.toml`, `.yaml` or `.yml` file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read calibration file {}", path.display()))?;
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("toml") => toml::from_str(&content)
                .with_context(|| format!("invalid TOML calibration in {}", path.display())),
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
                .with_context(|| format!("invalid YAML calibration in {}", path.display())),
            _ => bail!(
                "unsupported calibration file {} (expected .toml, .yaml or .yml)",
                path.display()
            ),
        }
    }

    pub fn overrides_for(&self, field: FieldName) -> Option<&FieldOverrides> {
        self.fields.get(&field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn tuning() -> FieldTuning {
        FieldTuning {
            header_lines: 20,
            header_bonus: 0.15,
            explicit_label_bonus: 0.25,
            target_bonus: 0.05,
            neutral_factor: 0.7,
            ..FieldTuning::DEFAULT
        }
    }

    #[test]
    fn test_default_tuning_is_valid() {
        assert!(FieldTuning::DEFAULT.validate(FieldName::Email).is_ok());
        assert!(tuning().validate(FieldName::ClassLocation).is_ok());
    }

    #[test]
    fn test_ordering_violation_is_rejected() {
        let bad = FieldTuning {
            explicit_label_bonus: 0.1,
            ..tuning()
        };
        let err = bad.validate(FieldName::ClassLocation).unwrap_err();
        assert!(err.to_string().contains("explicit_label_bonus"));

        let bad = FieldTuning {
            target_bonus: 0.2,
            ..tuning()
        };
        assert!(bad.validate(FieldName::ClassLocation).is_err());
    }

    #[test]
    fn test_overrides_apply_key_by_key() {
        let overrides = FieldOverrides {
            header_bonus: Some(0.2),
            floor: Some(0.5),
            ..FieldOverrides::default()
        };
        let tuned = tuning().with_overrides(&overrides);
        assert_eq!(tuned.header_bonus, 0.2);
        assert_eq!(tuned.calibration.floor, 0.5);
        assert_eq!(tuned.explicit_label_bonus, 0.25);
    }

    #[test]
    fn test_load_yaml_and_toml() {
        let dir = tempfile::tempdir().unwrap();

        let yaml_path = dir.path().join("calibration.yaml");
        let mut f = fs::File::create(&yaml_path).unwrap();
        writeln!(f, "fields:\n  class_location:\n    header_bonus: 0.2\nmodality:\n  hybrid_blend: 0.6").unwrap();
        let config = EngineConfig::load(&yaml_path).unwrap();
        assert_eq!(
            config.overrides_for(FieldName::ClassLocation).unwrap().header_bonus,
            Some(0.2)
        );
        assert_eq!(config.modality.hybrid_blend, 0.6);

        let toml_path = dir.path().join("calibration.toml");
        fs::write(&toml_path, "[fields.email]\nfloor = 0.9\nceiling = 0.9\n").unwrap();
        let config = EngineConfig::load(&toml_path).unwrap();
        assert_eq!(config.overrides_for(FieldName::Email).unwrap().floor, Some(0.9));
        assert_eq!(config.modality, ModalityTuning::default());
    }

    #[test]
    fn test_load_rejects_unknown_keys_and_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        fs::write(&path, "fields:\n  class_location:\n    header_bonsu: 0.2\n").unwrap();
        assert!(EngineConfig::load(&path).is_err());

        let path = dir.path().join("calibration.json");
        fs::write(&path, "{}").unwrap();
        assert!(EngineConfig::load(&path).is_err());
    }
}
