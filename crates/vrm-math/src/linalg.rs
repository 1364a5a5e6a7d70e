// ─────────────────────────────────────────────────────────────────────
// VRM Sensitivity Core — Block-Diagonal Decay Algebra
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Block-diagonal operator with Kronecker blocks `I_M ⊗ η`.
//!
//! Each block maps `M` location values to `M·T` time samples; row
//! `loc·T + t` of a block is `η[t] · x[loc]`. The full operator stacks the
//! blocks along the diagonal, so its shape is `(Σ M·T) × (Σ M)`.

use ndarray::{Array1, Array2, ArrayView1};
use vrm_types::error::{VrmError, VrmResult};

/// One diagonal block `I_M ⊗ η`.
#[derive(Debug, Clone, PartialEq)]
pub struct KronBlock {
    n_locations: usize,
    eta: Vec<f64>,
}

impl KronBlock {
    pub fn new(n_locations: usize, eta: Vec<f64>) -> Self {
        KronBlock { n_locations, eta }
    }

    pub fn n_locations(&self) -> usize {
        self.n_locations
    }

    pub fn eta(&self) -> &[f64] {
        &self.eta
    }

    pub fn n_rows(&self) -> usize {
        self.n_locations * self.eta.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockDiagonalDecay {
    blocks: Vec<KronBlock>,
    n_rows: usize,
    n_cols: usize,
}

impl BlockDiagonalDecay {
    pub fn new(blocks: Vec<KronBlock>) -> Self {
        let n_rows = blocks.iter().map(KronBlock::n_rows).sum();
        let n_cols = blocks.iter().map(KronBlock::n_locations).sum();
        BlockDiagonalDecay {
            blocks,
            n_rows,
            n_cols,
        }
    }

    pub fn blocks(&self) -> &[KronBlock] {
        &self.blocks
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// `y = T·x`, `x` of length `n_cols`, `y` of length `n_rows`.
    pub fn apply(&self, x: ArrayView1<f64>) -> VrmResult<Array1<f64>> {
        if x.len() != self.n_cols {
            return Err(VrmError::dimension(
                "decay operator input",
                self.n_cols,
                x.len(),
            ));
        }
        let mut y = Array1::zeros(self.n_rows);
        let (mut row, mut col) = (0, 0);
        for block in &self.blocks {
            for loc in 0..block.n_locations {
                let xv = x[col + loc];
                for &eta in &block.eta {
                    y[row] = eta * xv;
                    row += 1;
                }
            }
            col += block.n_locations;
        }
        Ok(y)
    }

    /// `x = Tᵀ·y`, `y` of length `n_rows`, `x` of length `n_cols`.
    pub fn transpose_apply(&self, y: ArrayView1<f64>) -> VrmResult<Array1<f64>> {
        if y.len() != self.n_rows {
            return Err(VrmError::dimension(
                "decay operator transpose input",
                self.n_rows,
                y.len(),
            ));
        }
        let mut x = Array1::zeros(self.n_cols);
        let (mut row, mut col) = (0, 0);
        for block in &self.blocks {
            for loc in 0..block.n_locations {
                let mut acc = 0.0;
                for &eta in &block.eta {
                    acc += eta * y[row];
                    row += 1;
                }
                x[col + loc] = acc;
            }
            col += block.n_locations;
        }
        Ok(x)
    }

    /// Dense copy, for inspection and tests on small surveys.
    pub fn to_dense(&self) -> Array2<f64> {
        let mut dense = Array2::zeros((self.n_rows, self.n_cols));
        let (mut row, mut col) = (0, 0);
        for block in &self.blocks {
            for loc in 0..block.n_locations {
                for &eta in &block.eta {
                    dense[[row, col + loc]] = eta;
                    row += 1;
                }
            }
            col += block.n_locations;
        }
        dense
    }
}

/// Keep the entries of `v` whose mask bit is set.
pub fn select_rows(v: ArrayView1<f64>, mask: &[bool]) -> VrmResult<Array1<f64>> {
    if v.len() != mask.len() {
        return Err(VrmError::dimension("row mask", v.len(), mask.len()));
    }
    Ok(v.iter()
        .zip(mask)
        .filter(|(_, keep)| **keep)
        .map(|(&x, _)| x)
        .collect())
}

/// Adjoint of [`select_rows`]: place `w` at the set positions of `mask`,
/// zeros elsewhere.
pub fn scatter_rows(w: ArrayView1<f64>, mask: &[bool]) -> VrmResult<Array1<f64>> {
    let n_active = mask.iter().filter(|&&keep| keep).count();
    if w.len() != n_active {
        return Err(VrmError::dimension("active rows", n_active, w.len()));
    }
    let mut out = Array1::zeros(mask.len());
    let mut src = w.iter();
    for (slot, &keep) in out.iter_mut().zip(mask) {
        if keep {
            if let Some(&val) = src.next() {
                *slot = val;
            }
        }
    }
    Ok(out)
}
