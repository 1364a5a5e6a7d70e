// ─────────────────────────────────────────────────────────────────────
// VRM Sensitivity Core — Inducing-Field Operator
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! `H0 = [diag(Hx); diag(Hy); diag(Hz)]`, shape `3N × N`.
//!
//! Only the `N×3` field samples are stored. Projecting a geometry row
//! `[x-block | y-block | z-block]` through `H0` gives, per cell `j`,
//! `g_x[j]·Hx[j] + g_y[j]·Hy[j] + g_z[j]·Hz[j]`.

use ndarray::{Array2, ArrayView2};
use vrm_types::error::{VrmError, VrmResult};

use crate::survey::Source;

#[derive(Debug, Clone, PartialEq)]
pub struct H0Operator {
    field: Array2<f64>,
}

impl H0Operator {
    /// Sample the inducing field of `source` at `points` (`N×3`).
    pub fn from_source(source: &dyn Source, points: ArrayView2<f64>) -> VrmResult<Self> {
        let field = source.h0(points);
        if field.dim() != (points.nrows(), 3) {
            let got = if field.ncols() == 3 {
                field.nrows()
            } else {
                field.len()
            };
            return Err(VrmError::dimension(
                "inducing field samples (rows of an N×3 array)",
                points.nrows(),
                got,
            ));
        }
        if let Some(pos) = field.iter().position(|h| !h.is_finite()) {
            let cell = pos / 3;
            return Err(VrmError::ConfigError(format!(
                "inducing field is not finite at point {cell} ({:?})",
                points.row(cell).to_vec()
            )));
        }
        Ok(H0Operator { field })
    }

    pub fn n_cells(&self) -> usize {
        self.field.nrows()
    }

    pub fn field(&self) -> ArrayView2<'_, f64> {
        self.field.view()
    }

    /// Project one `3N` geometry row onto `out` (`N`).
    pub fn project_row(&self, g_row: &[f64], out: &mut [f64]) {
        let n = self.n_cells();
        debug_assert_eq!(g_row.len(), 3 * n);
        debug_assert_eq!(out.len(), n);
        for (j, slot) in out.iter_mut().enumerate() {
            *slot = g_row[j] * self.field[[j, 0]]
                + g_row[n + j] * self.field[[j, 1]]
                + g_row[2 * n + j] * self.field[[j, 2]];
        }
    }

    /// `G·H0` for a dense `K × 3N` geometry matrix, returning `K × N`.
    pub fn project(&self, g: ArrayView2<f64>) -> VrmResult<Array2<f64>> {
        let n = self.n_cells();
        if g.ncols() != 3 * n {
            return Err(VrmError::dimension(
                "geometry matrix columns",
                3 * n,
                g.ncols(),
            ));
        }
        let mut out = Array2::zeros((g.nrows(), n));
        let mut row_buf = vec![0.0; 3 * n];
        let mut out_buf = vec![0.0; n];
        for (g_row, mut a_row) in g.rows().into_iter().zip(out.rows_mut()) {
            row_buf.iter_mut().zip(g_row.iter()).for_each(|(d, &s)| *d = s);
            self.project_row(&row_buf, &mut out_buf);
            a_row.iter_mut().zip(&out_buf).for_each(|(d, &s)| *d = s);
        }
        Ok(out)
    }

    /// Dense `3N × N` matrix, for inspection and tests.
    pub fn to_dense(&self) -> Array2<f64> {
        let n = self.n_cells();
        let mut dense = Array2::zeros((3 * n, n));
        for j in 0..n {
            for c in 0..3 {
                dense[[c * n + j, j]] = self.field[[j, c]];
            }
        }
        dense
    }
}
