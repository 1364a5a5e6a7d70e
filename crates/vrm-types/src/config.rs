// ─────────────────────────────────────────────────────────────────────
// VRM Sensitivity Core — Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::constants::{DEFAULT_RADIUS_SCALE, DEFAULT_REF_FACTOR, MAX_REF_FACTOR};
use crate::error::{VrmError, VrmResult};
use crate::field::{Component, FieldType};
use serde::{Deserialize, Serialize};

/// Problem-level configuration loaded from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VrmConfig {
    /// Maximum refinement level applied near sources.
    #[serde(default = "default_ref_factor")]
    pub ref_factor: usize,
    /// Distances from the source bounding each refinement shell.
    /// When absent, derived from the mesh (see [`RefinementSpec::with_default_radius`]).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_radius: Option<Vec<f64>>,
}

fn default_ref_factor() -> usize {
    DEFAULT_REF_FACTOR
}

impl Default for VrmConfig {
    fn default() -> Self {
        VrmConfig {
            ref_factor: default_ref_factor(),
            ref_radius: None,
        }
    }
}

impl VrmConfig {
    pub fn from_file(path: &str) -> VrmResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn from_json_str(json: &str) -> VrmResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config)
    }

    /// Resolve into a validated refinement spec. `min_widths` are the smallest
    /// cell widths along x, y and z; they seed the default radii.
    pub fn refinement(&self, min_widths: [f64; 3]) -> VrmResult<RefinementSpec> {
        match &self.ref_radius {
            Some(radius) => RefinementSpec::new(self.ref_factor, radius.clone()),
            None => RefinementSpec::with_default_radius(self.ref_factor, min_widths),
        }
    }
}

/// Validated refinement factor and shell radii.
///
/// Invariants: `ref_factor <= MAX_REF_FACTOR`, `ref_radius.len() >= ref_factor`,
/// radii finite, positive and strictly ascending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinementSpec {
    ref_factor: usize,
    ref_radius: Vec<f64>,
}

impl RefinementSpec {
    pub fn new(ref_factor: usize, ref_radius: Vec<f64>) -> VrmResult<Self> {
        validate_ref_factor(ref_factor)?;
        validate_ref_radius(&ref_radius)?;
        if ref_radius.len() < ref_factor {
            return Err(VrmError::ConfigError(format!(
                "number of refinement radii ({}) must be >= refinement factor ({ref_factor})",
                ref_radius.len()
            )));
        }
        Ok(RefinementSpec {
            ref_factor,
            ref_radius,
        })
    }

    /// No refinement at all.
    pub fn unrefined() -> Self {
        RefinementSpec {
            ref_factor: 0,
            ref_radius: Vec::new(),
        }
    }

    /// Radii `1.25 · mean(min hx, min hy, min hz) · [1, 2, ..., ref_factor]`.
    pub fn with_default_radius(ref_factor: usize, min_widths: [f64; 3]) -> VrmResult<Self> {
        if min_widths.iter().any(|w| !w.is_finite() || *w <= 0.0) {
            return Err(VrmError::ConfigError(format!(
                "minimum cell widths must be finite and > 0, got {min_widths:?}"
            )));
        }
        let mean = min_widths.iter().sum::<f64>() / 3.0;
        let radius = (1..=ref_factor)
            .map(|k| DEFAULT_RADIUS_SCALE * mean * k as f64)
            .collect();
        Self::new(ref_factor, radius)
    }

    pub fn ref_factor(&self) -> usize {
        self.ref_factor
    }

    pub fn ref_radius(&self) -> &[f64] {
        &self.ref_radius
    }
}

fn validate_ref_factor(ref_factor: usize) -> VrmResult<()> {
    if ref_factor > MAX_REF_FACTOR {
        return Err(VrmError::ConfigError(format!(
            "refinement factor {ref_factor} exceeds the memory bound of {MAX_REF_FACTOR}"
        )));
    }
    Ok(())
}

fn validate_ref_radius(ref_radius: &[f64]) -> VrmResult<()> {
    if ref_radius.iter().any(|r| !r.is_finite() || *r <= 0.0) {
        return Err(VrmError::ConfigError(
            "refinement radii must be finite and > 0".to_string(),
        ));
    }
    if ref_radius.windows(2).any(|w| w[1] <= w[0]) {
        return Err(VrmError::ConfigError(
            "refinement radii must be strictly ascending".to_string(),
        ));
    }
    Ok(())
}

/// Survey description loaded from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyConfig {
    pub sources: Vec<SourceConfig>,
    /// Optional mask over all decay rows; absent means every row is active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_times: Option<Vec<bool>>,
}

impl SurveyConfig {
    pub fn from_file(path: &str) -> VrmResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn from_json_str(json: &str) -> VrmResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    MagDipole {
        location: [f64; 3],
        /// Dipole moment vector (A·m²).
        moment: [f64; 3],
        waveform: WaveformConfig,
        receivers: Vec<ReceiverConfig>,
    },
    CircularLoop {
        location: [f64; 3],
        /// Loop normal; normalised on construction.
        normal: [f64; 3],
        radius: f64,
        current: f64,
        waveform: WaveformConfig,
        receivers: Vec<ReceiverConfig>,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WaveformConfig {
    StepOff {
        #[serde(default)]
        t0: f64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiverConfig {
    pub locations: Vec<[f64; 3]>,
    pub component: Component,
    pub times: Vec<f64>,
    pub field_type: FieldType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = VrmConfig::from_json_str("{}").unwrap();
        assert_eq!(cfg.ref_factor, DEFAULT_REF_FACTOR);
        assert!(cfg.ref_radius.is_none());
    }

    #[test]
    fn test_default_radius_from_widths() {
        let spec = VrmConfig::default().refinement([2.0, 2.0, 2.0]).unwrap();
        assert_eq!(spec.ref_factor(), 3);
        let expected = [2.5, 5.0, 7.5];
        for (r, e) in spec.ref_radius().iter().zip(expected.iter()) {
            assert!((r - e).abs() < 1e-12, "radius {r} != {e}");
        }
    }

    #[test]
    fn test_explicit_radius_used() {
        let cfg = VrmConfig::from_json_str(r#"{"ref_factor": 2, "ref_radius": [1.0, 3.0, 9.0]}"#)
            .unwrap();
        let spec = cfg.refinement([1.0, 1.0, 1.0]).unwrap();
        assert_eq!(spec.ref_factor(), 2);
        assert_eq!(spec.ref_radius(), &[1.0, 3.0, 9.0]);
    }

    #[test]
    fn test_rejects_short_radius() {
        assert!(RefinementSpec::new(3, vec![1.0, 2.0]).is_err());
    }

    #[test]
    fn test_rejects_excessive_factor() {
        let radius: Vec<f64> = (1..=6).map(|k| k as f64).collect();
        assert!(RefinementSpec::new(MAX_REF_FACTOR + 1, radius).is_err());
    }

    #[test]
    fn test_rejects_unordered_or_invalid_radius() {
        assert!(RefinementSpec::new(2, vec![2.0, 1.0]).is_err());
        assert!(RefinementSpec::new(2, vec![1.0, 1.0]).is_err());
        assert!(RefinementSpec::new(1, vec![-1.0]).is_err());
        assert!(RefinementSpec::new(1, vec![f64::NAN]).is_err());
    }

    #[test]
    fn test_rejects_bad_min_widths() {
        let zero_width = RefinementSpec::with_default_radius(2, [0.0, 1.0, 1.0]);
        assert!(zero_width.is_err());
    }

    #[test]
    fn test_unrefined_is_valid() {
        let spec = RefinementSpec::unrefined();
        assert_eq!(spec.ref_factor(), 0);
        assert!(spec.ref_radius().is_empty());
    }

    #[test]
    fn test_survey_config_parses() {
        let json = r#"{
            "sources": [
                {
                    "type": "mag_dipole",
                    "location": [0.0, 0.0, 1.0],
                    "moment": [0.0, 0.0, 1.0],
                    "waveform": {"type": "step_off"},
                    "receivers": [
                        {"locations": [[0.0, 0.0, 1.0]], "component": "z",
                         "times": [1e-4, 1e-3], "field_type": "dbdt"}
                    ]
                },
                {
                    "type": "circular_loop",
                    "location": [5.0, 0.0, 1.0],
                    "normal": [0.0, 0.0, 1.0],
                    "radius": 2.0,
                    "current": 1.0,
                    "waveform": {"type": "step_off", "t0": 0.0},
                    "receivers": []
                }
            ]
        }"#;
        let cfg = SurveyConfig::from_json_str(json).unwrap();
        assert_eq!(cfg.sources.len(), 2);
        assert!(cfg.active_times.is_none());
        match &cfg.sources[0] {
            SourceConfig::MagDipole { receivers, .. } => {
                assert_eq!(receivers[0].component, Component::Z);
                assert_eq!(receivers[0].field_type, FieldType::DbDt);
            }
            other => panic!("unexpected source {other:?}"),
        }
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = VrmConfig::from_file("/nonexistent/vrm_config.json").unwrap_err();
        assert!(matches!(err, VrmError::Io(_)));
    }
}
