// ─────────────────────────────────────────────────────────────────────
// VRM Sensitivity Core — Prism Kernel
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Closed-form field of a uniformly magnetized rectangular prism.
//!
//! For a receiver at `p` and a prism with lower corner `a` and upper corner
//! `b`, the corner differences are
//!
//!   u_i = p_x − {a_x, b_x},  v_j = p_y − {a_y, b_y},  w_k = p_z − {a_z, b_z}
//!
//! and every series below is `Σ s_ijk f(u_i, v_j, w_k)` over the eight corners
//! with `s_ijk = (−1)^(i+j+k)` and `r = √(u² + v² + w²)`:
//!
//!   Aᵤ = Σ s atan(v w / (u r + ε)),   Aᵥ = Σ s atan(u w / (v r + ε)),
//!   Lᵤ = Σ s ln(r − u),  Lᵥ = Σ s ln(r − v),  L_w = Σ s ln(r − w).
//!
//! Rows are `C·[Aᵤ, L_w, Lᵥ]` (x), `C·[L_w, Aᵥ, Lᵤ]` (y) and
//! `C·[Lᵥ, Lᵤ, −Aᵤ − Aᵥ]` (z) with `C = −1/(4π)`; entry `c` is the field
//! component per unit magnetization along axis `c`.
//!
//! Numerical smoothing: a corner difference with `|d| < 1e-10` is replaced
//! by `+δ` on the lower corner and `−δ` on the upper corner, where `δ` is the
//! smallest width of the evaluated cell set on that axis divided by 1000.
//! The arctangent denominators carry `ε = 1e-10`. Both rules are part of the
//! kernel's reproducible output.

use ndarray::{Array2, ArrayView2};
use vrm_types::constants::{KERNEL_EPS, NUDGE_DIVISOR, NUDGE_THRESHOLD, PRISM_PREFACTOR};
use vrm_types::field::Component;

/// Corner visiting order and signs. The order fixes the summation sequence.
const CORNERS: [(usize, usize, usize, f64); 8] = [
    (0, 0, 0, 1.0),
    (1, 0, 0, -1.0),
    (1, 1, 0, 1.0),
    (0, 1, 0, -1.0),
    (0, 1, 1, 1.0),
    (0, 0, 1, -1.0),
    (1, 0, 1, 1.0),
    (1, 1, 1, -1.0),
];

/// Per-axis nudge `min(width)/1000` over a set of cells (`N×3` widths).
///
/// An empty set yields zero nudges; nothing is evaluated against it anyway.
pub fn nudge_from_widths(widths: ArrayView2<f64>) -> [f64; 3] {
    let mut nudge = [0.0; 3];
    for (axis, slot) in nudge.iter_mut().enumerate() {
        let min = widths
            .column(axis)
            .iter()
            .cloned()
            .fold(f64::INFINITY, f64::min);
        *slot = if min.is_finite() {
            min / NUDGE_DIVISOR
        } else {
            0.0
        };
    }
    nudge
}

/// Single-prism kernel evaluator carrying the nudge of its cell set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrismKernel {
    nudge: [f64; 3],
}

impl PrismKernel {
    pub fn new(nudge: [f64; 3]) -> Self {
        PrismKernel { nudge }
    }

    /// Kernel whose nudge is derived from the given `N×3` widths.
    pub fn for_widths(widths: ArrayView2<f64>) -> Self {
        Self::new(nudge_from_widths(widths))
    }

    pub fn nudge(&self) -> [f64; 3] {
        self.nudge
    }

    /// Sensitivity row `[g_x, g_y, g_z]` of `component` at `location` to the
    /// three magnetization components of the prism with the given center and
    /// full widths.
    pub fn row(
        &self,
        center: [f64; 3],
        width: [f64; 3],
        location: [f64; 3],
        component: Component,
    ) -> [f64; 3] {
        let mut diffs = [[0.0; 2]; 3];
        for axis in 0..3 {
            let lower = center[axis] - width[axis] / 2.0;
            let upper = center[axis] + width[axis] / 2.0;
            let mut d1 = location[axis] - lower;
            if d1.abs() < NUDGE_THRESHOLD {
                d1 = self.nudge[axis];
            }
            let mut d2 = location[axis] - upper;
            if d2.abs() < NUDGE_THRESHOLD {
                d2 = -self.nudge[axis];
            }
            diffs[axis] = [d1, d2];
        }
        let [u, v, w] = diffs;

        let g = match component {
            Component::X => [
                atan_series_u(u, v, w),
                log_series_w(u, v, w),
                log_series_v(u, v, w),
            ],
            Component::Y => [
                log_series_w(u, v, w),
                atan_series_v(u, v, w),
                log_series_u(u, v, w),
            ],
            Component::Z => [
                log_series_v(u, v, w),
                log_series_u(u, v, w),
                vertical_self_series(u, v, w),
            ],
        };
        [
            PRISM_PREFACTOR * g[0],
            PRISM_PREFACTOR * g[1],
            PRISM_PREFACTOR * g[2],
        ]
    }

    /// Fill one geometry row laid out `[x-block | y-block | z-block]`, each
    /// block `N` long, for all cells of `centers`/`widths` (`N×3`).
    pub fn fill_row(
        &self,
        centers: ArrayView2<f64>,
        widths: ArrayView2<f64>,
        location: [f64; 3],
        component: Component,
        out: &mut [f64],
    ) {
        let n = centers.nrows();
        debug_assert_eq!(out.len(), 3 * n, "geometry row must be 3N long");
        for cell in 0..n {
            let c = [centers[[cell, 0]], centers[[cell, 1]], centers[[cell, 2]]];
            let h = [widths[[cell, 0]], widths[[cell, 1]], widths[[cell, 2]]];
            let g = self.row(c, h, location, component);
            out[cell] = g[0];
            out[n + cell] = g[1];
            out[2 * n + cell] = g[2];
        }
    }

    /// Dense geometry matrix `G` (`K × 3N`) for `K` receiver points.
    pub fn geometry_matrix(
        &self,
        centers: ArrayView2<f64>,
        widths: ArrayView2<f64>,
        points: &[([f64; 3], Component)],
    ) -> Array2<f64> {
        let n = centers.nrows();
        let mut g = Array2::zeros((points.len(), 3 * n));
        for (mut row, &(location, component)) in g.rows_mut().into_iter().zip(points.iter()) {
            match row.as_slice_mut() {
                Some(slice) => self.fill_row(centers, widths, location, component, slice),
                None => {
                    let mut buf = vec![0.0; 3 * n];
                    self.fill_row(centers, widths, location, component, &mut buf);
                    row.iter_mut().zip(buf).for_each(|(dst, src)| *dst = src);
                }
            }
        }
        g
    }
}

#[inline]
fn radius(u: f64, v: f64, w: f64) -> f64 {
    (u * u + v * v + w * w).sqrt()
}

fn atan_series_u(u: [f64; 2], v: [f64; 2], w: [f64; 2]) -> f64 {
    let mut acc = 0.0;
    for &(i, j, k, s) in &CORNERS {
        let r = radius(u[i], v[j], w[k]);
        acc += s * ((v[j] * w[k]) / (u[i] * r + KERNEL_EPS)).atan();
    }
    acc
}

fn atan_series_v(u: [f64; 2], v: [f64; 2], w: [f64; 2]) -> f64 {
    let mut acc = 0.0;
    for &(i, j, k, s) in &CORNERS {
        let r = radius(u[i], v[j], w[k]);
        acc += s * ((u[i] * w[k]) / (v[j] * r + KERNEL_EPS)).atan();
    }
    acc
}

/// `−Aᵤ − Aᵥ`, accumulated term by term so the rounding sequence is fixed.
fn vertical_self_series(u: [f64; 2], v: [f64; 2], w: [f64; 2]) -> f64 {
    let mut acc = 0.0;
    for &(i, j, k, s) in &CORNERS {
        let r = radius(u[i], v[j], w[k]);
        acc -= s * ((v[j] * w[k]) / (u[i] * r + KERNEL_EPS)).atan();
    }
    for &(i, j, k, s) in &CORNERS {
        let r = radius(u[i], v[j], w[k]);
        acc -= s * ((u[i] * w[k]) / (v[j] * r + KERNEL_EPS)).atan();
    }
    acc
}

fn log_series_u(u: [f64; 2], v: [f64; 2], w: [f64; 2]) -> f64 {
    let mut acc = 0.0;
    for &(i, j, k, s) in &CORNERS {
        acc += s * (radius(u[i], v[j], w[k]) - u[i]).ln();
    }
    acc
}

fn log_series_v(u: [f64; 2], v: [f64; 2], w: [f64; 2]) -> f64 {
    let mut acc = 0.0;
    for &(i, j, k, s) in &CORNERS {
        acc += s * (radius(u[i], v[j], w[k]) - v[j]).ln();
    }
    acc
}

fn log_series_w(u: [f64; 2], v: [f64; 2], w: [f64; 2]) -> f64 {
    let mut acc = 0.0;
    for &(i, j, k, s) in &CORNERS {
        acc += s * (radius(u[i], v[j], w[k]) - w[k]).ln();
    }
    acc
}
