// ─────────────────────────────────────────────────────────────────────
// VRM Sensitivity Core — Decay Operator
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Time decay on top of the geometry operator.
//!
//! Linear law: `T = blockdiag_r(I_{M_r} ⊗ η_r)` with `η_r` the characteristic
//! decay of receiver `r`, so `fields = T·A·ξ`.
//!
//! Log-uniform law: no `T`. For each receiver the `M×N` rows of the owning
//! source's block are contracted with the `T×N` decay matrix, giving
//! `out[loc, t] = Σ_j A[loc, j]·η[t, j]`, flattened location-major.

use ndarray::{s, Array1};
use vrm_math::linalg::{BlockDiagonalDecay, KronBlock};
use vrm_types::error::{VrmError, VrmResult};

use crate::assembler::GeometryOperator;
use crate::survey::Survey;
use crate::waveform::LogUniformParams;

pub fn build_decay_operator(survey: &Survey) -> VrmResult<BlockDiagonalDecay> {
    let mut blocks = Vec::new();
    for source in survey.sources() {
        let waveform = source.waveform();
        for rx in source.receivers() {
            let eta = waveform.characteristic_decay(rx.field_type(), rx.times())?;
            if eta.len() != rx.n_times() {
                return Err(VrmError::dimension(
                    "characteristic decay",
                    rx.n_times(),
                    eta.len(),
                ));
            }
            blocks.push(KronBlock::new(rx.n_locations(), eta));
        }
    }
    let decay = BlockDiagonalDecay::new(blocks);
    log::debug!(
        "built decay operator: {} receivers, {}x{}",
        decay.blocks().len(),
        decay.n_rows(),
        decay.n_cols()
    );
    Ok(decay)
}

/// Log-uniform predicted data, ordered like `T·A·m`.
pub fn log_uniform_fields(
    geometry: &GeometryOperator,
    survey: &Survey,
    params: &LogUniformParams<'_>,
) -> VrmResult<Array1<f64>> {
    if params.n_cells() != geometry.n_cols() {
        return Err(VrmError::dimension(
            "log-uniform parameters",
            geometry.n_cols(),
            params.n_cells(),
        ));
    }
    let mut out = Vec::with_capacity(survey.n_data());
    for (p, source) in survey.sources().iter().enumerate() {
        let block = geometry
            .block(p)
            .ok_or_else(|| VrmError::dimension("geometry blocks", survey.n_sources(), p))?;
        let waveform = source.waveform();
        let mut row = 0;
        for rx in source.receivers() {
            let m = rx.n_locations();
            if row + m > block.nrows() {
                return Err(VrmError::dimension(
                    "geometry block rows",
                    row + m,
                    block.nrows(),
                ));
            }
            let eta = waveform.log_uniform_decay(rx.field_type(), rx.times(), params)?;
            if eta.dim() != (rx.n_times(), params.n_cells()) {
                return Err(VrmError::dimension(
                    "log-uniform decay entries",
                    rx.n_times() * params.n_cells(),
                    eta.len(),
                ));
            }
            // M×N · N×T
            let response = block.slice(s![row..row + m, ..]).dot(&eta.t());
            out.extend(response.iter().copied());
            row += m;
        }
    }
    Ok(Array1::from(out))
}
