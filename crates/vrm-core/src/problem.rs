// ─────────────────────────────────────────────────────────────────────
// VRM Sensitivity Core — Problems
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Forward, Jacobian and adjoint products for the two decay laws.
//!
//! Cached operators are tagged with an epoch. Changing the active mask, the
//! parameter map or the refinement settings, and pairing or unpairing a
//! survey, all advance the epoch, so the next access rebuilds.

use ndarray::{Array1, ArrayView1};
use vrm_math::linalg::{scatter_rows, select_rows, BlockDiagonalDecay};
use vrm_types::config::{RefinementSpec, VrmConfig};
use vrm_types::error::{VrmError, VrmResult};

use crate::assembler::{GeometryOperator, SensitivityAssembler};
use crate::cache::OperatorCache;
use crate::decay::{build_decay_operator, log_uniform_fields};
use crate::maps::{IdentityMap, ParameterMap};
use crate::mesh::{ActiveCells, MeshAdapter};
use crate::survey::Survey;
use crate::waveform::LogUniformParams;

/// Mesh, active cells, refinement settings, pairing and the cached `A`.
pub struct VrmProblem<M: MeshAdapter> {
    mesh: M,
    cells: ActiveCells,
    refinement: RefinementSpec,
    survey: Option<Survey>,
    epoch: u64,
    geometry: OperatorCache<GeometryOperator>,
}

impl<M: MeshAdapter> VrmProblem<M> {
    /// Problem with every mesh cell active.
    pub fn new(mesh: M, config: &VrmConfig) -> VrmResult<Self> {
        let mask = vec![true; mesh.n_cells()];
        Self::with_active_mask(mesh, config, &mask)
    }

    pub fn with_active_mask(mesh: M, config: &VrmConfig, mask: &[bool]) -> VrmResult<Self> {
        let cells = ActiveCells::select(&mesh, mask)?;
        let refinement = config.refinement(mesh.min_widths())?;
        Ok(VrmProblem {
            mesh,
            cells,
            refinement,
            survey: None,
            epoch: 0,
            geometry: OperatorCache::new(),
        })
    }

    pub fn mesh(&self) -> &M {
        &self.mesh
    }

    pub fn active_cells(&self) -> &ActiveCells {
        &self.cells
    }

    pub fn n_active(&self) -> usize {
        self.cells.n_active()
    }

    pub fn active_mask(&self) -> &[bool] {
        self.cells.mask()
    }

    pub fn refinement(&self) -> &RefinementSpec {
        &self.refinement
    }

    pub fn ref_factor(&self) -> usize {
        self.refinement.ref_factor()
    }

    pub fn ref_radius(&self) -> &[f64] {
        self.refinement.ref_radius()
    }

    pub fn set_refinement(&mut self, refinement: RefinementSpec) {
        self.refinement = refinement;
        self.invalidate();
    }

    /// Keeps the current radii; they must still cover the new factor.
    pub fn set_ref_factor(&mut self, ref_factor: usize) -> VrmResult<()> {
        let spec = RefinementSpec::new(ref_factor, self.refinement.ref_radius().to_vec())?;
        warn_unused_radii(&spec);
        self.set_refinement(spec);
        Ok(())
    }

    pub fn set_ref_radius(&mut self, ref_radius: Vec<f64>) -> VrmResult<()> {
        let ref_factor = self.refinement.ref_factor();
        let spec = RefinementSpec::new(ref_factor, ref_radius)?;
        warn_unused_radii(&spec);
        self.set_refinement(spec);
        Ok(())
    }

    pub fn set_active_mask(&mut self, mask: &[bool]) -> VrmResult<()> {
        self.cells = ActiveCells::select(&self.mesh, mask)?;
        self.invalidate();
        Ok(())
    }

    /// Bind `survey`, returning the previously paired one if any.
    pub fn pair(&mut self, survey: Survey) -> Option<Survey> {
        let previous = self.survey.replace(survey);
        self.invalidate();
        previous
    }

    pub fn unpair(&mut self) -> Option<Survey> {
        let previous = self.survey.take();
        self.invalidate();
        previous
    }

    pub fn is_paired(&self) -> bool {
        self.survey.is_some()
    }

    pub fn survey(&self) -> VrmResult<&Survey> {
        self.survey.as_ref().ok_or(VrmError::NotPaired("accessing the survey"))
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Number of geometry operator builds so far.
    pub fn geometry_builds(&self) -> usize {
        self.geometry.builds()
    }

    pub fn geometry(&mut self) -> VrmResult<&GeometryOperator> {
        Ok(self.paired_geometry()?.0)
    }

    /// Cached geometry operator together with the paired survey.
    pub fn paired_geometry(&mut self) -> VrmResult<(&GeometryOperator, &Survey)> {
        let survey = self
            .survey
            .as_ref()
            .ok_or(VrmError::NotPaired("building the geometry operator"))?;
        let epoch = self.epoch;
        let cells = &self.cells;
        let assembler = SensitivityAssembler::new(&self.refinement);
        let geometry = self
            .geometry
            .get_or_try_insert_with(epoch, || assembler.assemble(cells, survey))?;
        Ok((geometry, survey))
    }

    fn invalidate(&mut self) {
        self.epoch += 1;
        self.geometry.clear();
    }
}

fn warn_unused_radii(spec: &RefinementSpec) {
    let (n_radii, ref_factor) = (spec.ref_radius().len(), spec.ref_factor());
    if n_radii > ref_factor {
        log::warn!(
            "{n_radii} refinement radii for refinement factor {ref_factor}; \
             radii beyond the factor are ignored"
        );
    }
}

fn check_model(what: &str, map: &dyn ParameterMap, m: ArrayView1<f64>) -> VrmResult<()> {
    if m.len() != map.n_params() {
        return Err(VrmError::dimension(what, map.n_params(), m.len()));
    }
    Ok(())
}

/// Linear law: `d = T·A·ξ(m)` with `ξ = Δχ / ln(τ2/τ1)`.
pub struct LinearVrm<M: MeshAdapter> {
    base: VrmProblem<M>,
    xi_map: Box<dyn ParameterMap>,
    decay: OperatorCache<BlockDiagonalDecay>,
}

impl<M: MeshAdapter> LinearVrm<M> {
    /// Identity map over the active cells.
    pub fn new(base: VrmProblem<M>) -> Self {
        let xi_map = Box::new(IdentityMap::new(base.n_active()));
        LinearVrm {
            base,
            xi_map,
            decay: OperatorCache::new(),
        }
    }

    pub fn with_xi_map(mut self, xi_map: Box<dyn ParameterMap>) -> Self {
        self.set_xi_map(xi_map);
        self
    }

    pub fn set_xi_map(&mut self, xi_map: Box<dyn ParameterMap>) {
        self.xi_map = xi_map;
        self.base.invalidate();
    }

    pub fn xi_map(&self) -> &dyn ParameterMap {
        self.xi_map.as_ref()
    }

    pub fn problem(&self) -> &VrmProblem<M> {
        &self.base
    }

    pub fn problem_mut(&mut self) -> &mut VrmProblem<M> {
        &mut self.base
    }

    pub fn pair(&mut self, survey: Survey) -> Option<Survey> {
        self.decay.clear();
        self.base.pair(survey)
    }

    pub fn unpair(&mut self) -> Option<Survey> {
        self.decay.clear();
        self.base.unpair()
    }

    pub fn decay_builds(&self) -> usize {
        self.decay.builds()
    }

    pub fn decay_operator(&mut self) -> VrmResult<&BlockDiagonalDecay> {
        let epoch = self.base.epoch();
        let survey = self.base.survey()?;
        self.decay
            .get_or_try_insert_with(epoch, || build_decay_operator(survey))
    }

    fn operators(&mut self) -> VrmResult<(&GeometryOperator, &BlockDiagonalDecay, &Survey)> {
        let epoch = self.base.epoch();
        let (geometry, survey) = self.base.paired_geometry()?;
        let decay = self
            .decay
            .get_or_try_insert_with(epoch, || build_decay_operator(survey))?;
        Ok((geometry, decay, survey))
    }

    /// Predicted data over all decay rows.
    pub fn fields(&mut self, m: ArrayView1<f64>) -> VrmResult<Array1<f64>> {
        check_model("linear model", self.xi_map.as_ref(), m)?;
        let xi = self.xi_map.apply(m)?;
        let (geometry, decay, _) = self.operators()?;
        let am = geometry.apply(xi.view())?;
        decay.apply(am.view())
    }

    /// `J·v` restricted to the active time rows. The problem is linear, so
    /// `m` only has its length checked.
    pub fn jvec(&mut self, m: ArrayView1<f64>, v: ArrayView1<f64>) -> VrmResult<Array1<f64>> {
        check_model("linear model", self.xi_map.as_ref(), m)?;
        check_model("jvec direction", self.xi_map.as_ref(), v)?;
        let pv = self.xi_map.deriv(v)?;
        let (geometry, decay, survey) = self.operators()?;
        let apv = geometry.apply(pv.view())?;
        let tapv = decay.apply(apv.view())?;
        select_rows(tapv.view(), survey.active_times())
    }

    /// `Jᵀ·w` for `w` over the active time rows.
    pub fn jtvec(&mut self, m: ArrayView1<f64>, w: ArrayView1<f64>) -> VrmResult<Array1<f64>> {
        check_model("linear model", self.xi_map.as_ref(), m)?;
        let (geometry, decay, survey) = self.operators()?;
        let full = scatter_rows(w, survey.active_times())?;
        let tw = decay.transpose_apply(full.view())?;
        let atw = geometry.transpose_apply(tw.view())?;
        self.xi_map.deriv_transpose(atw.view())
    }
}

/// Log-uniform law with four per-cell parameters, each passed through the
/// same parameter map.
pub struct LogUniformVrm<M: MeshAdapter> {
    base: VrmProblem<M>,
    map: Box<dyn ParameterMap>,
}

impl<M: MeshAdapter> LogUniformVrm<M> {
    pub fn new(base: VrmProblem<M>) -> Self {
        let map = Box::new(IdentityMap::new(base.n_active()));
        LogUniformVrm { base, map }
    }

    pub fn with_map(mut self, map: Box<dyn ParameterMap>) -> Self {
        self.set_map(map);
        self
    }

    pub fn set_map(&mut self, map: Box<dyn ParameterMap>) {
        self.map = map;
        self.base.invalidate();
    }

    pub fn map(&self) -> &dyn ParameterMap {
        self.map.as_ref()
    }

    pub fn problem(&self) -> &VrmProblem<M> {
        &self.base
    }

    pub fn problem_mut(&mut self) -> &mut VrmProblem<M> {
        &mut self.base
    }

    pub fn pair(&mut self, survey: Survey) -> Option<Survey> {
        self.base.pair(survey)
    }

    pub fn unpair(&mut self) -> Option<Survey> {
        self.base.unpair()
    }

    pub fn fields<'v>(
        &mut self,
        chi0: ArrayView1<'v, f64>,
        dchi: ArrayView1<'v, f64>,
        tau1: ArrayView1<'v, f64>,
        tau2: ArrayView1<'v, f64>,
    ) -> VrmResult<Array1<f64>> {
        let map = self.map.as_ref();
        let inputs = [
            ("chi0", chi0),
            ("dchi", dchi),
            ("tau1", tau1),
            ("tau2", tau2),
        ];
        for (what, m) in inputs {
            check_model(what, map, m)?;
        }
        let chi0 = map.apply(chi0)?;
        let dchi = map.apply(dchi)?;
        let tau1 = map.apply(tau1)?;
        let tau2 = map.apply(tau2)?;
        let params = LogUniformParams {
            chi0: chi0.view(),
            dchi: dchi.view(),
            tau1: tau1.view(),
            tau2: tau2.view(),
        };
        let (geometry, survey) = self.base.paired_geometry()?;
        log_uniform_fields(geometry, survey, &params)
    }
}
