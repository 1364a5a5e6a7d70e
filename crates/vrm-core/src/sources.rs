// ─────────────────────────────────────────────────────────────────────
// VRM Sensitivity Core — Sources
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Inducing-field transmitters: point dipole and circular current loop.

use std::f64::consts::PI;

use ndarray::{Array2, ArrayView2};
use vrm_math::elliptic::{ellipe, ellipk};
use vrm_types::config::{SourceConfig, WaveformConfig};
use vrm_types::error::{VrmError, VrmResult};

use crate::survey::{shell_level, Receiver, Source};
use crate::waveform::{StepOffWaveform, Waveform};

/// Largest elliptic parameter handed to `ellipk`; points on the wire itself
/// are singular and produce non-finite fields.
const MAX_ELLIPTIC_PARAM: f64 = 1.0 - f64::EPSILON;

fn check_finite(what: &str, values: &[f64]) -> VrmResult<()> {
    if values.iter().any(|v| !v.is_finite()) {
        return Err(VrmError::ConfigError(format!("{what} must be finite")));
    }
    Ok(())
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Point magnetic dipole.
#[derive(Debug, Clone)]
pub struct MagDipoleSource {
    location: [f64; 3],
    moment: [f64; 3],
    waveform: StepOffWaveform,
    receivers: Vec<Receiver>,
}

impl MagDipoleSource {
    pub fn new(
        location: [f64; 3],
        moment: [f64; 3],
        waveform: StepOffWaveform,
        receivers: Vec<Receiver>,
    ) -> VrmResult<Self> {
        check_finite("dipole location", &location)?;
        check_finite("dipole moment", &moment)?;
        Ok(MagDipoleSource {
            location,
            moment,
            waveform,
            receivers,
        })
    }

    pub fn moment(&self) -> [f64; 3] {
        self.moment
    }
}

impl Source for MagDipoleSource {
    fn location(&self) -> [f64; 3] {
        self.location
    }

    /// `H = (3 r (m·r) / r⁵ − m / r³) / 4π`.
    fn h0(&self, points: ArrayView2<f64>) -> Array2<f64> {
        let mut out = Array2::zeros((points.nrows(), 3));
        for (p, mut h) in points.rows().into_iter().zip(out.rows_mut()) {
            let r = [
                p[0] - self.location[0],
                p[1] - self.location[1],
                p[2] - self.location[2],
            ];
            let r2 = dot(r, r);
            let r_len = r2.sqrt();
            let mr = dot(self.moment, r);
            let r3 = r2 * r_len;
            let r5 = r3 * r2;
            for axis in 0..3 {
                h[axis] = (3.0 * r[axis] * mr / r5 - self.moment[axis] / r3) / (4.0 * PI);
            }
        }
        out
    }

    fn receivers(&self) -> &[Receiver] {
        &self.receivers
    }

    fn waveform(&self) -> &dyn Waveform {
        &self.waveform
    }
}

/// Circular loop of radius `a` carrying current `I`, centered at `location`
/// with unit normal `n`.
#[derive(Debug, Clone)]
pub struct CircularLoopSource {
    location: [f64; 3],
    normal: [f64; 3],
    radius: f64,
    current: f64,
    waveform: StepOffWaveform,
    receivers: Vec<Receiver>,
}

impl CircularLoopSource {
    pub fn new(
        location: [f64; 3],
        normal: [f64; 3],
        radius: f64,
        current: f64,
        waveform: StepOffWaveform,
        receivers: Vec<Receiver>,
    ) -> VrmResult<Self> {
        check_finite("loop location", &location)?;
        check_finite("loop normal", &normal)?;
        check_finite("loop current", &[current])?;
        if !(radius.is_finite() && radius > 0.0) {
            return Err(VrmError::ConfigError(format!(
                "loop radius must be finite and > 0, got {radius}"
            )));
        }
        let len = dot(normal, normal).sqrt();
        if len == 0.0 {
            return Err(VrmError::ConfigError(
                "loop normal must be non-zero".to_string(),
            ));
        }
        Ok(CircularLoopSource {
            location,
            normal: [normal[0] / len, normal[1] / len, normal[2] / len],
            radius,
            current,
            waveform,
            receivers,
        })
    }

    pub fn normal(&self) -> [f64; 3] {
        self.normal
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    /// Axial offset `z` and in-plane offset vector of `p` in the loop frame.
    fn local_frame(&self, p: [f64; 3]) -> (f64, [f64; 3]) {
        let d = [
            p[0] - self.location[0],
            p[1] - self.location[1],
            p[2] - self.location[2],
        ];
        let z = dot(d, self.normal);
        let rho = [
            d[0] - z * self.normal[0],
            d[1] - z * self.normal[1],
            d[2] - z * self.normal[2],
        ];
        (z, rho)
    }
}

impl Source for CircularLoopSource {
    fn location(&self) -> [f64; 3] {
        self.location
    }

    fn h0(&self, points: ArrayView2<f64>) -> Array2<f64> {
        let a = self.radius;
        let c = self.current / PI;
        let mut out = Array2::zeros((points.nrows(), 3));
        for (p, mut h) in points.rows().into_iter().zip(out.rows_mut()) {
            let (z, rho_vec) = self.local_frame([p[0], p[1], p[2]]);
            let rho = dot(rho_vec, rho_vec).sqrt();

            let s = a * a + rho * rho + z * z;
            let alpha2 = s - 2.0 * a * rho;
            let beta2 = s + 2.0 * a * rho;
            let beta = beta2.sqrt();
            let k2 = (1.0 - alpha2 / beta2).clamp(0.0, MAX_ELLIPTIC_PARAM);
            let (kk, ek) = (ellipk(k2), ellipe(k2));

            let hz = c / (2.0 * alpha2 * beta) * ((a * a - rho * rho - z * z) * ek + alpha2 * kk);
            let h_rho = if rho > 0.0 {
                c * z / (2.0 * alpha2 * beta * rho) * (s * ek - alpha2 * kk)
            } else {
                0.0
            };
            for axis in 0..3 {
                let radial = if rho > 0.0 { rho_vec[axis] / rho } else { 0.0 };
                h[axis] = h_rho * radial + hz * self.normal[axis];
            }
        }
        out
    }

    fn receivers(&self) -> &[Receiver] {
        &self.receivers
    }

    fn waveform(&self) -> &dyn Waveform {
        &self.waveform
    }

    /// Shells are measured from the loop wire rather than its center.
    fn refinement_flags(
        &self,
        centers: ArrayView2<f64>,
        ref_factor: usize,
        ref_radius: &[f64],
    ) -> Vec<usize> {
        centers
            .rows()
            .into_iter()
            .map(|c| {
                let (z, rho_vec) = self.local_frame([c[0], c[1], c[2]]);
                let rho = dot(rho_vec, rho_vec).sqrt();
                let d = ((rho - self.radius).powi(2) + z * z).sqrt();
                shell_level(d, ref_factor, ref_radius)
            })
            .collect()
    }
}

fn waveform_from_config(cfg: &WaveformConfig) -> StepOffWaveform {
    match *cfg {
        WaveformConfig::StepOff { t0 } => StepOffWaveform::new(t0),
    }
}

/// Build a boxed source from its JSON description.
pub fn from_config(cfg: &SourceConfig) -> VrmResult<Box<dyn Source>> {
    match cfg {
        SourceConfig::MagDipole {
            location,
            moment,
            waveform,
            receivers,
        } => {
            let receivers = receivers
                .iter()
                .map(Receiver::from_config)
                .collect::<VrmResult<Vec<_>>>()?;
            let src = MagDipoleSource::new(
                *location,
                *moment,
                waveform_from_config(waveform),
                receivers,
            )?;
            Ok(Box::new(src))
        }
        SourceConfig::CircularLoop {
            location,
            normal,
            radius,
            current,
            waveform,
            receivers,
        } => {
            let receivers = receivers
                .iter()
                .map(Receiver::from_config)
                .collect::<VrmResult<Vec<_>>>()?;
            let src = CircularLoopSource::new(
                *location,
                *normal,
                *radius,
                *current,
                waveform_from_config(waveform),
                receivers,
            )?;
            Ok(Box::new(src))
        }
    }
}
