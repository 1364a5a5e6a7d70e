// ─────────────────────────────────────────────────────────────────────
// VRM Sensitivity Core — Refinement Engine
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Near-source column refinement.
//!
//! A cell flagged at level `q` is split into `n = 2^q` sub-cells per axis.
//! The kernel and inducing field are evaluated on every sub-cell and the
//! `n³` child columns are summed back onto the parent column, which replaces
//! the level-0 column of the block. Cells at level 0 are left untouched.
//!
//! Child `k` of a parent sits at offset `(i + ½)·w/n` from the parent's lower
//! corner with `iy = k mod n`, `ix = ⌊k/n⌋ mod n`, `iz = ⌊k/n²⌋`; children are
//! summed in increasing `k`.

use ndarray::{Array2, ArrayView2, Axis};
use vrm_math::prism::PrismKernel;
use vrm_types::config::RefinementSpec;
use vrm_types::error::{VrmError, VrmResult};

use crate::assembler::{collapsed_block, receiver_points, ReceiverPoint};
use crate::h0::H0Operator;
use crate::mesh::ActiveCells;
use crate::survey::Source;

/// Unit-free child offsets `(ix + ½, iy + ½, iz + ½)` in enumeration order.
pub fn child_offsets(n: usize) -> Vec<[f64; 3]> {
    (0..n * n * n)
        .map(|k| {
            let iy = k % n;
            let ix = (k / n) % n;
            let iz = k / (n * n);
            [ix as f64 + 0.5, iy as f64 + 0.5, iz as f64 + 0.5]
        })
        .collect()
}

/// Split each parent into `(2^level)³` children. Returns sub-cell centers and
/// widths, children of parent `p` occupying rows `p·n³ .. (p+1)·n³`.
pub fn subdivide(
    centers: ArrayView2<f64>,
    widths: ArrayView2<f64>,
    level: usize,
) -> (Array2<f64>, Array2<f64>) {
    let n = 1usize << level;
    let offsets = child_offsets(n);
    let n_children = offsets.len();
    let n_parents = centers.nrows();
    let mut sub_centers = Array2::zeros((n_parents * n_children, 3));
    let mut sub_widths = Array2::zeros((n_parents * n_children, 3));
    for p in 0..n_parents {
        for (k, offset) in offsets.iter().enumerate() {
            let row = p * n_children + k;
            for axis in 0..3 {
                let h = widths[[p, axis]] / n as f64;
                let lower = centers[[p, axis]] - widths[[p, axis]] / 2.0;
                sub_centers[[row, axis]] = lower + h * offset[axis];
                sub_widths[[row, axis]] = h;
            }
        }
    }
    (sub_centers, sub_widths)
}

/// Every cell must carry exactly one level in `[0, ref_factor]`.
pub fn validate_flags(flags: &[usize], n_cells: usize, ref_factor: usize) -> VrmResult<()> {
    if flags.len() != n_cells {
        return Err(VrmError::dimension(
            "refinement flags",
            n_cells,
            flags.len(),
        ));
    }
    if let Some((cell, &level)) = flags.iter().enumerate().find(|(_, l)| **l > ref_factor) {
        return Err(VrmError::InvalidRefinementFlag {
            cell,
            level,
            max: ref_factor,
        });
    }
    Ok(())
}

/// Collapsed `K × m` columns for `m` parents refined at `level`.
///
/// The kernel nudge is taken from the widths of all sub-cells at this level.
pub fn refined_columns(
    source: &dyn Source,
    points: &[ReceiverPoint],
    centers: ArrayView2<f64>,
    widths: ArrayView2<f64>,
    level: usize,
) -> VrmResult<Array2<f64>> {
    let (sub_centers, sub_widths) = subdivide(centers, widths, level);
    let kernel = PrismKernel::for_widths(sub_widths.view());
    let h0 = H0Operator::from_source(source, sub_centers.view())?;
    let n = 1usize << level;
    collapsed_block(
        &kernel,
        sub_centers.view(),
        sub_widths.view(),
        &h0,
        points,
        n * n * n,
    )
}

#[derive(Debug, Clone, Copy)]
pub struct RefinementEngine<'a> {
    spec: &'a RefinementSpec,
}

impl<'a> RefinementEngine<'a> {
    pub fn new(spec: &'a RefinementSpec) -> Self {
        RefinementEngine { spec }
    }

    /// Validated per-cell levels from the source's flag generator.
    pub fn flags(&self, cells: &ActiveCells, source: &dyn Source) -> VrmResult<Vec<usize>> {
        let flags = source.refinement_flags(
            cells.centers(),
            self.spec.ref_factor(),
            self.spec.ref_radius(),
        );
        validate_flags(&flags, cells.n_active(), self.spec.ref_factor())?;
        Ok(flags)
    }

    /// Overwrite the flagged columns of `block` (`K × N`) with refined values.
    ///
    /// Returns the number of cells at each level `0..=ref_factor`.
    pub fn refine_block(
        &self,
        block: &mut Array2<f64>,
        cells: &ActiveCells,
        source: &dyn Source,
    ) -> VrmResult<Vec<usize>> {
        let ref_factor = self.spec.ref_factor();
        let mut counts = vec![0; ref_factor + 1];
        if ref_factor == 0 || cells.n_active() == 0 {
            counts[0] = cells.n_active();
            return Ok(counts);
        }
        if block.ncols() != cells.n_active() {
            return Err(VrmError::dimension(
                "geometry block columns",
                cells.n_active(),
                block.ncols(),
            ));
        }

        let flags = self.flags(cells, source)?;
        for &level in &flags {
            counts[level] += 1;
        }
        let points = receiver_points(source);
        if block.nrows() != points.len() {
            return Err(VrmError::dimension(
                "geometry block rows",
                points.len(),
                block.nrows(),
            ));
        }

        for level in 1..=ref_factor {
            let targets: Vec<usize> = (0..flags.len()).filter(|&i| flags[i] == level).collect();
            if targets.is_empty() {
                continue;
            }
            let parent_centers = cells.centers().select(Axis(0), &targets);
            let parent_widths = cells.widths().select(Axis(0), &targets);
            let columns = refined_columns(
                source,
                &points,
                parent_centers.view(),
                parent_widths.view(),
                level,
            )?;
            for (k, &cell) in targets.iter().enumerate() {
                block.column_mut(cell).assign(&columns.column(k));
            }
            log::trace!(
                "refined {} cells at level {level} ({} sub-cells each)",
                targets.len(),
                1usize << (3 * level)
            );
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::TensorMesh;
    use crate::sources::MagDipoleSource;
    use crate::survey::Receiver;
    use crate::waveform::StepOffWaveform;
    use ndarray::array;
    use vrm_types::field::{Component, FieldType};

    fn dipole_above_origin() -> MagDipoleSource {
        let rx = Receiver::new(
            array![[0.0, 0.0, 1.5]],
            Component::Z,
            vec![1e-3],
            FieldType::DbDt,
        )
        .unwrap();
        MagDipoleSource::new(
            [0.0, 0.0, 1.5],
            [0.0, 0.0, 1.0],
            StepOffWaveform::default(),
            vec![rx],
        )
        .unwrap()
    }

    #[test]
    fn test_child_offsets_enumeration() {
        let offsets = child_offsets(2);
        assert_eq!(offsets.len(), 8);
        assert_eq!(offsets[0], [0.5, 0.5, 0.5]);
        // y varies fastest, then x, then z.
        assert_eq!(offsets[1], [0.5, 1.5, 0.5]);
        assert_eq!(offsets[2], [1.5, 0.5, 0.5]);
        assert_eq!(offsets[4], [0.5, 0.5, 1.5]);
        assert_eq!(offsets[7], [1.5, 1.5, 1.5]);
    }

    #[test]
    fn test_subdivide_tiles_parent() {
        let centers = array![[1.0, 2.0, 3.0]];
        let widths = array![[2.0, 4.0, 8.0]];
        let (c, w) = subdivide(centers.view(), widths.view(), 1);
        assert_eq!(c.nrows(), 8);
        assert_eq!(w.row(0).to_vec(), vec![1.0, 2.0, 4.0]);
        assert_eq!(c.row(0).to_vec(), vec![0.5, 1.0, 1.0]);
        assert_eq!(c.row(1).to_vec(), vec![0.5, 3.0, 1.0]);
        assert_eq!(c.row(2).to_vec(), vec![1.5, 1.0, 1.0]);
        assert_eq!(c.row(7).to_vec(), vec![1.5, 3.0, 5.0]);
        // Children share the parent's centroid and volume.
        for axis in 0..3 {
            let mean = c.column(axis).sum() / 8.0;
            assert!((mean - centers[[0, axis]]).abs() < 1e-12);
        }
        let volume: f64 = w.rows().into_iter().map(|r| r[0] * r[1] * r[2]).sum();
        assert!((volume - 64.0).abs() < 1e-12);
    }

    #[test]
    fn test_validate_flags() {
        assert!(validate_flags(&[0, 1, 2], 3, 2).is_ok());
        assert!(matches!(
            validate_flags(&[0, 3, 2], 3, 2),
            Err(VrmError::InvalidRefinementFlag {
                cell: 1,
                level: 3,
                max: 2,
            })
        ));
        assert!(matches!(
            validate_flags(&[0, 1], 3, 2),
            Err(VrmError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_only_flagged_columns_change() {
        let mesh = TensorMesh::uniform([3, 1, 1], [1.0; 3], [-0.5, -0.5, -0.5]).unwrap();
        let cells = ActiveCells::all(&mesh).unwrap();
        let src = dipole_above_origin();
        let unrefined = RefinementSpec::unrefined();
        let base = crate::assembler::SensitivityAssembler::new(&unrefined)
            .source_block(&cells, &src)
            .unwrap();

        // Cell 0 (distance 1.5) refined at level 2, cell 1 at level 1, cell 2 untouched.
        let spec = RefinementSpec::new(2, vec![1.6, 2.0]).unwrap();
        let engine = RefinementEngine::new(&spec);
        let mut block = base.clone();
        let counts = engine.refine_block(&mut block, &cells, &src).unwrap();
        assert_eq!(counts, vec![1, 1, 1]);
        assert_ne!(block[[0, 0]], base[[0, 0]]);
        assert_ne!(block[[0, 1]], base[[0, 1]]);
        assert_eq!(block[[0, 2]], base[[0, 2]]);
    }

    #[test]
    fn test_unrefined_spec_is_noop() {
        let mesh = TensorMesh::uniform([2, 1, 1], [1.0; 3], [0.0; 3]).unwrap();
        let cells = ActiveCells::all(&mesh).unwrap();
        let spec = RefinementSpec::unrefined();
        let mut block = Array2::from_elem((1, 2), 7.0);
        let counts = RefinementEngine::new(&spec)
            .refine_block(&mut block, &cells, &dipole_above_origin())
            .unwrap();
        assert_eq!(counts, vec![2]);
        assert!(block.iter().all(|&v| v == 7.0));
    }
}
