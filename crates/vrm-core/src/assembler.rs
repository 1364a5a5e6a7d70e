// ─────────────────────────────────────────────────────────────────────
// VRM Sensitivity Core — Sensitivity Assembler
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Geometry operator `A`: one dense `K_p × N` block per source, stacked.
//!
//! For source `p` the block is `G_p · H0_p` evaluated over the active cells,
//! after which the refinement engine overwrites the columns of cells flagged
//! near the source. Rows are the source's receiver locations in receiver
//! order; columns are active cells in mesh order.

use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2};
use rayon::prelude::*;
use vrm_math::prism::PrismKernel;
use vrm_types::config::RefinementSpec;
use vrm_types::error::{VrmError, VrmResult};
use vrm_types::field::Component;

use crate::h0::H0Operator;
use crate::mesh::ActiveCells;
use crate::refinement::RefinementEngine;
use crate::survey::{Source, Survey};

/// Receiver point and measured component, one per geometry row.
pub type ReceiverPoint = ([f64; 3], Component);

/// Geometry rows of `source`: receivers in order, locations within each.
pub fn receiver_points(source: &dyn Source) -> Vec<ReceiverPoint> {
    source
        .receivers()
        .iter()
        .flat_map(|rx| (0..rx.n_locations()).map(move |i| (rx.location(i), rx.component())))
        .collect()
}

/// Evaluate `G·H0` for `points` over the given cells and sum every run of
/// `group` consecutive columns, giving `K × N/group`.
///
/// `group = 1` is the plain block; refined sub-cells use `group = n³` so
/// each parent column is the sum of its children in enumeration order.
/// Rows are computed in parallel and written back in row order.
pub fn collapsed_block(
    kernel: &PrismKernel,
    centers: ArrayView2<f64>,
    widths: ArrayView2<f64>,
    h0: &H0Operator,
    points: &[ReceiverPoint],
    group: usize,
) -> VrmResult<Array2<f64>> {
    let n = centers.nrows();
    if widths.nrows() != n {
        return Err(VrmError::dimension("cell widths", n, widths.nrows()));
    }
    if h0.n_cells() != n {
        return Err(VrmError::dimension("inducing field cells", n, h0.n_cells()));
    }
    if group == 0 || n % group != 0 {
        return Err(VrmError::ConfigError(format!(
            "cannot collapse {n} columns in groups of {group}"
        )));
    }
    let n_out = n / group;
    let mut data = vec![0.0; points.len() * n_out];
    if n_out > 0 {
        data
            .par_chunks_mut(n_out)
            .zip(points.par_iter())
            .for_each(|(row, &(location, component))| {
                let mut g = vec![0.0; 3 * n];
                kernel.fill_row(centers, widths, location, component, &mut g);
                let mut a = vec![0.0; n];
                h0.project_row(&g, &mut a);
                for (parent, slot) in row.iter_mut().enumerate() {
                    *slot = a[parent * group..(parent + 1) * group].iter().sum();
                }
            });
    }
    Array2::from_shape_vec((points.len(), n_out), data)
        .map_err(|e| VrmError::ConfigError(format!("block shape: {e}")))
}

/// Stacked per-source geometry blocks, `(Σ K_p) × N`.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryOperator {
    blocks: Vec<Array2<f64>>,
    row_offsets: Vec<usize>,
    n_cols: usize,
}

impl GeometryOperator {
    pub fn new(blocks: Vec<Array2<f64>>, n_cols: usize) -> VrmResult<Self> {
        let mut row_offsets = Vec::with_capacity(blocks.len() + 1);
        row_offsets.push(0);
        for block in &blocks {
            if block.ncols() != n_cols {
                return Err(VrmError::dimension(
                    "geometry block columns",
                    n_cols,
                    block.ncols(),
                ));
            }
            let last = row_offsets.last().copied().unwrap_or(0);
            row_offsets.push(last + block.nrows());
        }
        Ok(GeometryOperator {
            blocks,
            row_offsets,
            n_cols,
        })
    }

    pub fn blocks(&self) -> &[Array2<f64>] {
        &self.blocks
    }

    pub fn block(&self, source: usize) -> Option<&Array2<f64>> {
        self.blocks.get(source)
    }

    pub fn n_rows(&self) -> usize {
        self.row_offsets.last().copied().unwrap_or(0)
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// `A·x`, `x` of length `N`.
    pub fn apply(&self, x: ArrayView1<f64>) -> VrmResult<Array1<f64>> {
        if x.len() != self.n_cols {
            return Err(VrmError::dimension(
                "geometry operator input",
                self.n_cols,
                x.len(),
            ));
        }
        let mut y = Array1::zeros(self.n_rows());
        for (p, block) in self.blocks.iter().enumerate() {
            let (r0, r1) = (self.row_offsets[p], self.row_offsets[p + 1]);
            y.slice_mut(s![r0..r1]).assign(&block.dot(&x));
        }
        Ok(y)
    }

    /// `Aᵀ·y`, `y` of length `Σ K_p`.
    pub fn transpose_apply(&self, y: ArrayView1<f64>) -> VrmResult<Array1<f64>> {
        if y.len() != self.n_rows() {
            return Err(VrmError::dimension(
                "geometry operator transpose input",
                self.n_rows(),
                y.len(),
            ));
        }
        let mut x = Array1::zeros(self.n_cols);
        for (p, block) in self.blocks.iter().enumerate() {
            let (r0, r1) = (self.row_offsets[p], self.row_offsets[p + 1]);
            x += &block.t().dot(&y.slice(s![r0..r1]));
        }
        Ok(x)
    }

    pub fn to_dense(&self) -> Array2<f64> {
        let mut dense = Array2::zeros((self.n_rows(), self.n_cols));
        for (p, block) in self.blocks.iter().enumerate() {
            let (r0, r1) = (self.row_offsets[p], self.row_offsets[p + 1]);
            dense.slice_mut(s![r0..r1, ..]).assign(block);
        }
        dense
    }
}

/// Builds the geometry operator for a survey over a set of active cells.
#[derive(Debug, Clone)]
pub struct SensitivityAssembler<'a> {
    refinement: &'a RefinementSpec,
}

impl<'a> SensitivityAssembler<'a> {
    pub fn new(refinement: &'a RefinementSpec) -> Self {
        SensitivityAssembler { refinement }
    }

    /// Unrefined `G·H0` block of one source.
    pub fn source_block(&self, cells: &ActiveCells, source: &dyn Source) -> VrmResult<Array2<f64>> {
        let points = receiver_points(source);
        let kernel = PrismKernel::for_widths(cells.widths());
        let h0 = H0Operator::from_source(source, cells.centers())?;
        collapsed_block(&kernel, cells.centers(), cells.widths(), &h0, &points, 1)
    }

    pub fn assemble(&self, cells: &ActiveCells, survey: &Survey) -> VrmResult<GeometryOperator> {
        log::debug!(
            "assembling geometry operator: {} sources, {} rows, {} active cells, ref_factor {}",
            survey.n_sources(),
            survey.n_geometry_rows(),
            cells.n_active(),
            self.refinement.ref_factor()
        );
        let engine = RefinementEngine::new(self.refinement);
        let mut blocks = Vec::with_capacity(survey.n_sources());
        for (p, source) in survey.sources().iter().enumerate() {
            let mut block = self.source_block(cells, source.as_ref())?;
            let counts = engine.refine_block(&mut block, cells, source.as_ref())?;
            log::trace!(
                "source {p}: block {}x{}, cells per refinement level {counts:?}",
                block.nrows(),
                block.ncols()
            );
            blocks.push(block);
        }
        GeometryOperator::new(blocks, cells.n_active())
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

    fn small_survey() -> Survey {
        let rx_a = Receiver::new(
            array![[0.0, 0.0, 3.0], [1.0, 0.5, 3.0]],
            Component::Z,
            vec![1e-3],
            vrm_types::field::FieldType::DbDt,
        )
        .unwrap();
        let rx_b = Receiver::new(
            array![[-1.0, 0.0, 2.5]],
            Component::X,
            vec![1e-3, 2e-3],
            vrm_types::field::FieldType::DhDt,
        )
        .unwrap();
        let src = MagDipoleSource::new(
            [0.0, 0.0, 3.0],
            [0.0, 0.0, 1.0],
            StepOffWaveform::default(),
            vec![rx_a, rx_b],
        )
        .unwrap();
        Survey::new(vec![Box::new(src)])
    }

    #[test]
    fn test_receiver_points_order() {
        let survey = small_survey();
        let points = receiver_points(survey.sources()[0].as_ref());
        assert_eq!(points.len(), 3);
        assert_eq!(points[1], ([1.0, 0.5, 3.0], Component::Z));
        assert_eq!(points[2], ([-1.0, 0.0, 2.5], Component::X));
    }

    #[test]
    fn test_block_matches_dense_kernel_product() {
        let mesh = TensorMesh::uniform([2, 2, 2], [1.0; 3], [-1.0, -1.0, -1.0]).unwrap();
        let cells = ActiveCells::all(&mesh).unwrap();
        let survey = small_survey();
        let source = survey.sources()[0].as_ref();
        let spec = RefinementSpec::unrefined();
        let block = SensitivityAssembler::new(&spec).source_block(&cells, source).unwrap();

        let kernel = PrismKernel::for_widths(cells.widths());
        let g = kernel.geometry_matrix(cells.centers(), cells.widths(), &receiver_points(source));
        let h0 = H0Operator::from_source(source, cells.centers()).unwrap();
        let dense = g.dot(&h0.to_dense());
        assert_eq!(block.dim(), (3, 8));
        for (a, b) in block.iter().zip(dense.iter()) {
            assert!((a - b).abs() <= 1e-14 * b.abs() + 1e-18, "{a} vs {b}");
        }
    }

    #[test]
    fn test_collapse_sums_column_groups() {
        let centers = array![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [1.0, 1.0, 0.0],
        ];
        let widths = Array2::from_elem((4, 3), 1.0);
        let survey = small_survey();
        let source = survey.sources()[0].as_ref();
        let h0 = H0Operator::from_source(source, centers.view()).unwrap();
        let kernel = PrismKernel::for_widths(widths.view());
        let points = receiver_points(source);
        let full = collapsed_block(&kernel, centers.view(), widths.view(), &h0, &points, 1)
            .unwrap();
        let pairs = collapsed_block(&kernel, centers.view(), widths.view(), &h0, &points, 2)
            .unwrap();
        assert_eq!(pairs.dim(), (3, 2));
        for k in 0..3 {
            assert_eq!(pairs[[k, 0]], full[[k, 0]] + full[[k, 1]]);
            assert_eq!(pairs[[k, 1]], full[[k, 2]] + full[[k, 3]]);
        }
        let uneven = collapsed_block(&kernel, centers.view(), widths.view(), &h0, &points, 3);
        assert!(uneven.is_err());
    }

    #[test]
    fn test_block_reports_mismatched_cell_counts() {
        let centers = array![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]];
        let widths = Array2::from_elem((2, 3), 1.0);
        let survey = small_survey();
        let source = survey.sources()[0].as_ref();
        let h0 = H0Operator::from_source(source, centers.view()).unwrap();
        let kernel = PrismKernel::for_widths(widths.view());
        let points = receiver_points(source);

        let short = Array2::from_elem((1, 3), 1.0);
        let err = collapsed_block(&kernel, centers.view(), short.view(), &h0, &points, 1)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Dimension mismatch for cell widths: expected 2, got 1"
        );

        let h0_one = H0Operator::from_source(source, centers.slice(s![..1, ..])).unwrap();
        let err = collapsed_block(&kernel, centers.view(), widths.view(), &h0_one, &points, 1)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Dimension mismatch for inducing field cells: expected 2, got 1"
        );
    }

    #[test]
    fn test_geometry_operator_apply_and_transpose() {
        let op = GeometryOperator::new(
            vec![array![[1.0, 2.0], [3.0, 4.0]], array![[5.0, 6.0]]],
            2,
        )
        .unwrap();
        assert_eq!(op.n_rows(), 3);
        let x = array![1.0, -1.0];
        assert_eq!(op.apply(x.view()).unwrap(), array![-1.0, -1.0, -1.0]);
        let y = array![1.0, 0.0, 2.0];
        assert_eq!(op.transpose_apply(y.view()).unwrap(), array![11.0, 14.0]);
        assert_eq!(op.to_dense().row(2).to_vec(), vec![5.0, 6.0]);
        assert!(op.apply(array![1.0].view()).is_err());
    }

    #[test]
    fn test_geometry_operator_rejects_ragged_blocks() {
        let blocks = vec![Array2::zeros((1, 2)), Array2::zeros((1, 3))];
        assert!(GeometryOperator::new(blocks, 2).is_err());
    }
}
