// ─────────────────────────────────────────────────────────────────────
// VRM Sensitivity Core — Survey
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Receivers, the source interface and the survey container.
//!
//! Data ordering is fixed here and relied on everywhere else: sources, then
//! each source's receivers, then each receiver's locations, and within a
//! location its time channels.

use ndarray::{Array2, ArrayView2};
use vrm_types::config::{ReceiverConfig, SurveyConfig};
use vrm_types::error::{VrmError, VrmResult};
use vrm_types::field::{Component, FieldType};

use crate::sources;
use crate::waveform::Waveform;

/// Receiver measuring one field component at `M` locations.
#[derive(Debug, Clone, PartialEq)]
pub struct Receiver {
    locations: Array2<f64>,
    component: Component,
    times: Vec<f64>,
    field_type: FieldType,
}

impl Receiver {
    pub fn new(
        locations: Array2<f64>,
        component: Component,
        times: Vec<f64>,
        field_type: FieldType,
    ) -> VrmResult<Self> {
        if locations.ncols() != 3 {
            return Err(VrmError::dimension(
                "receiver location columns",
                3,
                locations.ncols(),
            ));
        }
        if locations.nrows() == 0 {
            return Err(VrmError::ConfigError(
                "receiver needs at least one location".to_string(),
            ));
        }
        if locations.iter().any(|x| !x.is_finite()) {
            return Err(VrmError::ConfigError(
                "receiver locations must be finite".to_string(),
            ));
        }
        if times.is_empty() {
            return Err(VrmError::InvalidTimeChannel(
                "receiver needs at least one time channel".to_string(),
            ));
        }
        if times.iter().any(|t| !t.is_finite()) {
            return Err(VrmError::InvalidTimeChannel(
                "receiver time channels must be finite".to_string(),
            ));
        }
        Ok(Receiver {
            locations,
            component,
            times,
            field_type,
        })
    }

    pub fn from_config(cfg: &ReceiverConfig) -> VrmResult<Self> {
        let flat: Vec<f64> = cfg.locations.iter().flatten().copied().collect();
        let locations = Array2::from_shape_vec((cfg.locations.len(), 3), flat)
            .map_err(|e| VrmError::ConfigError(format!("receiver locations: {e}")))?;
        Self::new(locations, cfg.component, cfg.times.clone(), cfg.field_type)
    }

    pub fn locations(&self) -> ArrayView2<'_, f64> {
        self.locations.view()
    }

    pub fn location(&self, index: usize) -> [f64; 3] {
        let row = self.locations.row(index);
        [row[0], row[1], row[2]]
    }

    pub fn component(&self) -> Component {
        self.component
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn n_locations(&self) -> usize {
        self.locations.nrows()
    }

    pub fn n_times(&self) -> usize {
        self.times.len()
    }

    /// Decay rows contributed by this receiver, `M·T`.
    pub fn n_data(&self) -> usize {
        self.n_locations() * self.n_times()
    }
}

/// Transmitter collaborator.
pub trait Source {
    /// Reference point used by the distance-shell refinement rule.
    fn location(&self) -> [f64; 3];

    /// Inducing field at `points` (`M×3`), returned as `M×3`.
    fn h0(&self, points: ArrayView2<f64>) -> Array2<f64>;

    fn receivers(&self) -> &[Receiver];

    fn waveform(&self) -> &dyn Waveform;

    /// One refinement level in `[0, ref_factor]` per cell center.
    fn refinement_flags(
        &self,
        centers: ArrayView2<f64>,
        ref_factor: usize,
        ref_radius: &[f64],
    ) -> Vec<usize> {
        distance_shell_flags(self.location(), centers, ref_factor, ref_radius)
    }
}

/// Level `ref_factor − n` for the first shell `n` with `distance < ref_radius[n]`,
/// 0 when the distance lies beyond every shell.
pub fn shell_level(distance: f64, ref_factor: usize, ref_radius: &[f64]) -> usize {
    ref_radius
        .iter()
        .take(ref_factor)
        .position(|&r| distance < r)
        .map_or(0, |n| ref_factor - n)
}

/// Refinement flags by Euclidean distance from `origin`.
pub fn distance_shell_flags(
    origin: [f64; 3],
    centers: ArrayView2<f64>,
    ref_factor: usize,
    ref_radius: &[f64],
) -> Vec<usize> {
    centers
        .rows()
        .into_iter()
        .map(|c| {
            let d = ((c[0] - origin[0]).powi(2)
                + (c[1] - origin[1]).powi(2)
                + (c[2] - origin[2]).powi(2))
            .sqrt();
            shell_level(d, ref_factor, ref_radius)
        })
        .collect()
}

/// Ordered sources plus the active-time mask over all decay rows.
pub struct Survey {
    sources: Vec<Box<dyn Source>>,
    active_times: Vec<bool>,
}

impl Survey {
    /// Survey with every decay row active.
    pub fn new(sources: Vec<Box<dyn Source>>) -> Self {
        let n_data = sources
            .iter()
            .flat_map(|s| s.receivers())
            .map(Receiver::n_data)
            .sum();
        Survey {
            sources,
            active_times: vec![true; n_data],
        }
    }

    pub fn with_active_times(mut self, active_times: Vec<bool>) -> VrmResult<Self> {
        if active_times.len() != self.n_data() {
            return Err(VrmError::dimension(
                "active time mask",
                self.n_data(),
                active_times.len(),
            ));
        }
        self.active_times = active_times;
        Ok(self)
    }

    pub fn from_config(cfg: &SurveyConfig) -> VrmResult<Self> {
        let sources = cfg
            .sources
            .iter()
            .map(sources::from_config)
            .collect::<VrmResult<Vec<_>>>()?;
        let survey = Survey::new(sources);
        match &cfg.active_times {
            Some(mask) => survey.with_active_times(mask.clone()),
            None => Ok(survey),
        }
    }

    pub fn sources(&self) -> &[Box<dyn Source>] {
        &self.sources
    }

    pub fn n_sources(&self) -> usize {
        self.sources.len()
    }

    pub fn active_times(&self) -> &[bool] {
        &self.active_times
    }

    /// Total decay rows, `Σ M·T` over all receivers.
    pub fn n_data(&self) -> usize {
        self.active_times.len()
    }

    pub fn n_active_data(&self) -> usize {
        self.active_times.iter().filter(|&&a| a).count()
    }

    /// Geometry rows, `Σ M` over all receivers.
    pub fn n_geometry_rows(&self) -> usize {
        self.sources
            .iter()
            .flat_map(|s| s.receivers())
            .map(Receiver::n_locations)
            .sum()
    }
}

impl std::fmt::Debug for Survey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Survey")
            .field("n_sources", &self.sources.len())
            .field("n_data", &self.n_data())
            .field("n_active_data", &self.n_active_data())
            .finish()
    }
}
