// ─────────────────────────────────────────────────────────────────────
// VRM Sensitivity Core — Mesh
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Mesh adapter and active-cell selection.
//!
//! Only axis-aligned cells are supported: each cell is a center plus full
//! widths along x, y and z.

use ndarray::{Array2, ArrayView2};
use vrm_types::error::{VrmError, VrmResult};

/// Read-only view of a 3-D mesh of axis-aligned cells.
pub trait MeshAdapter {
    /// Spatial dimension of the mesh.
    fn dim(&self) -> usize;

    fn n_cells(&self) -> usize;

    /// Cell centers, `n_cells × 3`.
    fn cell_centers(&self) -> Array2<f64>;

    /// Full cell widths, `n_cells × 3`.
    fn cell_widths(&self) -> Array2<f64>;

    /// Smallest cell width along each axis over the whole mesh.
    fn min_widths(&self) -> [f64; 3] {
        let widths = self.cell_widths();
        let mut out = [f64::INFINITY; 3];
        for row in widths.rows() {
            for axis in 0..3 {
                out[axis] = out[axis].min(row[axis]);
            }
        }
        out
    }
}

/// Tensor-product mesh. Cells are enumerated with x fastest, then y, then z.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorMesh {
    h: [Vec<f64>; 3],
    origin: [f64; 3],
}

impl TensorMesh {
    /// Build from one width vector per axis. Exactly three axes are required.
    pub fn new(h: Vec<Vec<f64>>, origin: [f64; 3]) -> VrmResult<Self> {
        let h: [Vec<f64>; 3] = h.try_into().map_err(|axes: Vec<Vec<f64>>| {
            VrmError::ConfigError(format!(
                "VRM problems require a 3D mesh, got {} axes",
                axes.len()
            ))
        })?;
        for (axis, widths) in h.iter().enumerate() {
            if widths.is_empty() {
                return Err(VrmError::ConfigError(format!(
                    "mesh axis {axis} has no cells"
                )));
            }
            if widths.iter().any(|w| !w.is_finite() || *w <= 0.0) {
                return Err(VrmError::ConfigError(format!(
                    "mesh axis {axis} widths must be finite and > 0"
                )));
            }
        }
        if origin.iter().any(|o| !o.is_finite()) {
            return Err(VrmError::ConfigError(
                "mesh origin must be finite".to_string(),
            ));
        }
        Ok(TensorMesh { h, origin })
    }

    /// `n[0] × n[1] × n[2]` cells of identical widths.
    pub fn uniform(n: [usize; 3], width: [f64; 3], origin: [f64; 3]) -> VrmResult<Self> {
        Self::new(
            (0..3).map(|axis| vec![width[axis]; n[axis]]).collect(),
            origin,
        )
    }

    pub fn shape(&self) -> [usize; 3] {
        [self.h[0].len(), self.h[1].len(), self.h[2].len()]
    }

    pub fn widths(&self, axis: usize) -> &[f64] {
        &self.h[axis]
    }

    pub fn origin(&self) -> [f64; 3] {
        self.origin
    }

    fn axis_centers(&self, axis: usize) -> Vec<f64> {
        let mut edge = self.origin[axis];
        self.h[axis]
            .iter()
            .map(|&w| {
                let c = edge + w / 2.0;
                edge += w;
                c
            })
            .collect()
    }

    fn fill_cells(&self, mut f: impl FnMut(usize, [usize; 3])) {
        let [nx, ny, nz] = self.shape();
        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    f(i + nx * (j + ny * k), [i, j, k]);
                }
            }
        }
    }
}

impl MeshAdapter for TensorMesh {
    fn dim(&self) -> usize {
        3
    }

    fn n_cells(&self) -> usize {
        self.h.iter().map(Vec::len).product()
    }

    fn cell_centers(&self) -> Array2<f64> {
        let centers = [
            self.axis_centers(0),
            self.axis_centers(1),
            self.axis_centers(2),
        ];
        let mut out = Array2::zeros((self.n_cells(), 3));
        self.fill_cells(|idx, ijk| {
            for axis in 0..3 {
                out[[idx, axis]] = centers[axis][ijk[axis]];
            }
        });
        out
    }

    fn cell_widths(&self) -> Array2<f64> {
        let mut out = Array2::zeros((self.n_cells(), 3));
        self.fill_cells(|idx, ijk| {
            for axis in 0..3 {
                out[[idx, axis]] = self.h[axis][ijk[axis]];
            }
        });
        out
    }

    fn min_widths(&self) -> [f64; 3] {
        let min = |axis: usize| self.h[axis].iter().cloned().fold(f64::INFINITY, f64::min);
        [min(0), min(1), min(2)]
    }
}

/// Centers and widths of the active cells, in mesh order.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveCells {
    mask: Vec<bool>,
    centers: Array2<f64>,
    widths: Array2<f64>,
}

impl ActiveCells {
    /// Select the cells flagged in `mask`; the mask must cover every mesh cell.
    pub fn select<M: MeshAdapter + ?Sized>(mesh: &M, mask: &[bool]) -> VrmResult<Self> {
        if mesh.dim() != 3 {
            return Err(VrmError::ConfigError(format!(
                "VRM problems require a 3D mesh, got dimension {}",
                mesh.dim()
            )));
        }
        if mask.len() != mesh.n_cells() {
            return Err(VrmError::dimension(
                "active cell mask",
                mesh.n_cells(),
                mask.len(),
            ));
        }
        let all_centers = mesh.cell_centers();
        let all_widths = mesh.cell_widths();
        check_cell_array("mesh cell centers", all_centers.view(), mesh.n_cells())?;
        check_cell_array("mesh cell widths", all_widths.view(), mesh.n_cells())?;

        let active: Vec<usize> = (0..mask.len()).filter(|&i| mask[i]).collect();
        let mut centers = Array2::zeros((active.len(), 3));
        let mut widths = Array2::zeros((active.len(), 3));
        for (row, &cell) in active.iter().enumerate() {
            centers.row_mut(row).assign(&all_centers.row(cell));
            widths.row_mut(row).assign(&all_widths.row(cell));
        }
        Ok(ActiveCells {
            mask: mask.to_vec(),
            centers,
            widths,
        })
    }

    /// Every mesh cell active.
    pub fn all<M: MeshAdapter + ?Sized>(mesh: &M) -> VrmResult<Self> {
        Self::select(mesh, &vec![true; mesh.n_cells()])
    }

    pub fn mask(&self) -> &[bool] {
        &self.mask
    }

    pub fn n_active(&self) -> usize {
        self.centers.nrows()
    }

    pub fn centers(&self) -> ArrayView2<'_, f64> {
        self.centers.view()
    }

    pub fn widths(&self) -> ArrayView2<'_, f64> {
        self.widths.view()
    }
}

fn check_cell_array(what: &str, arr: ArrayView2<f64>, n_cells: usize) -> VrmResult<()> {
    if arr.nrows() != n_cells {
        return Err(VrmError::dimension(
            format!("{what} rows"),
            n_cells,
            arr.nrows(),
        ));
    }
    if arr.ncols() != 3 {
        return Err(VrmError::dimension(
            format!("{what} columns"),
            3,
            arr.ncols(),
        ));
    }
    Ok(())
}
