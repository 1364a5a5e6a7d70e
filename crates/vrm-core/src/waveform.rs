// ─────────────────────────────────────────────────────────────────────
// VRM Sensitivity Core — Waveforms
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Off-time decay kernels of the transmitter waveform.
//!
//! The linear formulation needs only the characteristic decay η(t) that
//! multiplies the amalgamated parameter ξ = Δχ / ln(τ2/τ1). The log-uniform
//! formulation evaluates the full response of a log-uniform distribution of
//! relaxation times in [τ1, τ2] for every cell.

use ndarray::{Array2, ArrayView1};
use vrm_math::expint::expi_neg;
use vrm_types::constants::MU0;
use vrm_types::error::{VrmError, VrmResult};
use vrm_types::field::FieldType;

/// Per-cell log-uniform parameters after the parameter map.
#[derive(Debug, Clone, Copy)]
pub struct LogUniformParams<'a> {
    pub chi0: ArrayView1<'a, f64>,
    pub dchi: ArrayView1<'a, f64>,
    pub tau1: ArrayView1<'a, f64>,
    pub tau2: ArrayView1<'a, f64>,
}

impl LogUniformParams<'_> {
    pub fn n_cells(&self) -> usize {
        self.dchi.len()
    }

    fn validate(&self) -> VrmResult<()> {
        let n = self.n_cells();
        let others = [
            ("chi0", &self.chi0),
            ("tau1", &self.tau1),
            ("tau2", &self.tau2),
        ];
        for (what, arr) in others {
            if arr.len() != n {
                return Err(VrmError::dimension(
                    format!("log-uniform {what}"),
                    n,
                    arr.len(),
                ));
            }
        }
        for cell in 0..n {
            let (t1, t2) = (self.tau1[cell], self.tau2[cell]);
            if !(t1.is_finite() && t2.is_finite() && t1 > 0.0 && t2 > t1) {
                return Err(VrmError::ConfigError(format!(
                    "log-uniform decay requires 0 < tau1 < tau2, cell {cell} has tau1={t1}, tau2={t2}"
                )));
            }
        }
        Ok(())
    }
}

pub trait Waveform {
    /// Characteristic decay η(t), one value per time channel.
    fn characteristic_decay(&self, field_type: FieldType, times: &[f64]) -> VrmResult<Vec<f64>>;

    /// Log-uniform decay, `n_times × n_cells`.
    fn log_uniform_decay(
        &self,
        field_type: FieldType,
        times: &[f64],
        params: &LogUniformParams<'_>,
    ) -> VrmResult<Array2<f64>>;
}

/// Inducing field switched off instantaneously at `t0`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StepOffWaveform {
    pub t0: f64,
}

impl StepOffWaveform {
    pub fn new(t0: f64) -> Self {
        StepOffWaveform { t0 }
    }

    fn require_off_time(&self, times: &[f64]) -> VrmResult<()> {
        if let Some(&t) = times.iter().find(|&&t| !t.is_finite() || t <= self.t0) {
            return Err(VrmError::InvalidTimeChannel(format!(
                "time channel {t} must be after the start of the off-time (t0 = {:e} s)",
                self.t0
            )));
        }
        Ok(())
    }
}

impl Waveform for StepOffWaveform {
    fn characteristic_decay(&self, field_type: FieldType, times: &[f64]) -> VrmResult<Vec<f64>> {
        let scale = match field_type {
            FieldType::DhDt => 1.0,
            FieldType::DbDt => MU0,
            FieldType::H | FieldType::B => {
                return Err(VrmError::UnsupportedFieldType {
                    waveform: "step-off characteristic decay",
                    field_type: field_type.to_string(),
                })
            }
        };
        self.require_off_time(times)?;
        Ok(times.iter().map(|&t| -scale / (t - self.t0)).collect())
    }

    fn log_uniform_decay(
        &self,
        field_type: FieldType,
        times: &[f64],
        params: &LogUniformParams<'_>,
    ) -> VrmResult<Array2<f64>> {
        params.validate()?;
        if field_type.is_time_derivative() {
            self.require_off_time(times)?;
        } else if times.iter().any(|t| !t.is_finite()) {
            return Err(VrmError::InvalidTimeChannel(
                "time channels must be finite".to_string(),
            ));
        }
        let scale = if field_type.is_flux_density() {
            MU0
        } else {
            1.0
        };

        let n_cells = params.n_cells();
        let mut eta = Array2::zeros((times.len(), n_cells));
        for (it, &t) in times.iter().enumerate() {
            let s = t - self.t0;
            for cell in 0..n_cells {
                let tau1 = params.tau1[cell];
                let tau2 = params.tau2[cell];
                let amp = params.dchi[cell] / (tau2 / tau1).ln();
                let value = if field_type.is_time_derivative() {
                    amp * ((-s / tau1).exp() - (-s / tau2).exp()) / s
                } else if s > 0.0 {
                    amp * (expi_neg(s / tau2) - expi_neg(s / tau1))
                } else if s < 0.0 {
                    params.chi0[cell]
                } else {
                    // Midpoint of the on-time value and the off-time limit −Δχ.
                    0.5 * (params.chi0[cell] - params.dchi[cell])
                };
                eta[[it, cell]] = scale * value;
            }
        }
        Ok(eta)
    }
}
