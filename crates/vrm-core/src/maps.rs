// ─────────────────────────────────────────────────────────────────────
// VRM Sensitivity Core — Parameter Maps
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Maps from an inversion model vector to per-active-cell values.

use ndarray::{Array1, ArrayView1};
use vrm_types::error::{VrmError, VrmResult};

/// Model-to-cell projection with its derivative and adjoint.
///
/// `apply` evaluates the map; `deriv` and `deriv_transpose` are the products
/// `P·v` and `Pᵀ·w` with the derivative `P` (`n_cells × n_params`).
pub trait ParameterMap {
    fn n_params(&self) -> usize;

    fn n_cells(&self) -> usize;

    fn apply(&self, m: ArrayView1<f64>) -> VrmResult<Array1<f64>>;

    fn deriv(&self, v: ArrayView1<f64>) -> VrmResult<Array1<f64>>;

    fn deriv_transpose(&self, w: ArrayView1<f64>) -> VrmResult<Array1<f64>>;
}

fn check_len(what: &str, expected: usize, got: usize) -> VrmResult<()> {
    if expected != got {
        return Err(VrmError::dimension(what, expected, got));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentityMap {
    n: usize,
}

impl IdentityMap {
    pub fn new(n: usize) -> Self {
        IdentityMap { n }
    }
}

impl ParameterMap for IdentityMap {
    fn n_params(&self) -> usize {
        self.n
    }

    fn n_cells(&self) -> usize {
        self.n
    }

    fn apply(&self, m: ArrayView1<f64>) -> VrmResult<Array1<f64>> {
        check_len("identity map input", self.n, m.len())?;
        Ok(m.to_owned())
    }

    fn deriv(&self, v: ArrayView1<f64>) -> VrmResult<Array1<f64>> {
        self.apply(v)
    }

    fn deriv_transpose(&self, w: ArrayView1<f64>) -> VrmResult<Array1<f64>> {
        check_len("identity map adjoint input", self.n, w.len())?;
        Ok(w.to_owned())
    }
}

/// Piecewise-constant map: every active cell takes the value of its unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurjectUnitsMap {
    units: Vec<usize>,
    n_units: usize,
}

impl SurjectUnitsMap {
    /// `units[cell]` is the model index feeding that cell.
    pub fn new(units: Vec<usize>, n_units: usize) -> VrmResult<Self> {
        if let Some((cell, &unit)) = units.iter().enumerate().find(|(_, u)| **u >= n_units) {
            return Err(VrmError::ConfigError(format!(
                "cell {cell} assigned to unit {unit}, but only {n_units} units exist"
            )));
        }
        Ok(SurjectUnitsMap { units, n_units })
    }

    pub fn units(&self) -> &[usize] {
        &self.units
    }
}

impl ParameterMap for SurjectUnitsMap {
    fn n_params(&self) -> usize {
        self.n_units
    }

    fn n_cells(&self) -> usize {
        self.units.len()
    }

    fn apply(&self, m: ArrayView1<f64>) -> VrmResult<Array1<f64>> {
        check_len("unit map input", self.n_units, m.len())?;
        Ok(self.units.iter().map(|&u| m[u]).collect())
    }

    fn deriv(&self, v: ArrayView1<f64>) -> VrmResult<Array1<f64>> {
        self.apply(v)
    }

    fn deriv_transpose(&self, w: ArrayView1<f64>) -> VrmResult<Array1<f64>> {
        check_len("unit map adjoint input", self.units.len(), w.len())?;
        let mut out = Array1::zeros(self.n_units);
        for (&u, &val) in self.units.iter().zip(w.iter()) {
            out[u] += val;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_identity_map() {
        let map = IdentityMap::new(3);
        let m = array![1.0, -2.0, 3.5];
        assert_eq!(map.apply(m.view()).unwrap(), m);
        assert_eq!(map.deriv_transpose(m.view()).unwrap(), m);
        assert!(map.apply(array![1.0].view()).is_err());
    }

    #[test]
    fn test_surject_units_apply_and_adjoint() {
        let map = SurjectUnitsMap::new(vec![0, 1, 1, 0, 2], 3).unwrap();
        assert_eq!(map.n_cells(), 5);
        let m = array![10.0, 20.0, 30.0];
        let expanded = map.apply(m.view()).unwrap();
        assert_eq!(expanded, array![10.0, 20.0, 20.0, 10.0, 30.0]);
        let w = array![1.0, 2.0, 3.0, 4.0, 5.0];
        let summed = map.deriv_transpose(w.view()).unwrap();
        assert_eq!(summed, array![5.0, 5.0, 5.0]);

        // ⟨P v, w⟩ = ⟨v, Pᵀ w⟩
        let lhs = map.deriv(m.view()).unwrap().dot(&w);
        let rhs = m.dot(&map.deriv_transpose(w.view()).unwrap());
        assert!((lhs - rhs).abs() < 1e-12);
    }

    #[test]
    fn test_surject_rejects_unknown_unit() {
        assert!(SurjectUnitsMap::new(vec![0, 3], 3).is_err());
    }
}
