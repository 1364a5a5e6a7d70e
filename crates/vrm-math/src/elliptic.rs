// ─────────────────────────────────────────────────────────────────────
// VRM Sensitivity Core — Elliptic
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Complete elliptic integrals K(m) and E(m) by the arithmetic-geometric mean.
//!
//! Parameter convention matches scipy: m = k^2 with 0 <= m < 1. The loop
//! source evaluates these close to the wire, where m approaches 1, so the
//! AGM form is used for full double precision.

use std::f64::consts::FRAC_PI_2;

const AGM_TOL: f64 = 1e-15;
const AGM_MAX_STEPS: usize = 64;

/// Complete elliptic integral of the first kind K(m), `0 <= m < 1`.
pub fn ellipk(m: f64) -> f64 {
    debug_assert!(
        (0.0..1.0).contains(&m),
        "ellipk requires 0 <= m < 1, got {m}"
    );
    let mut a = 1.0;
    let mut b = (1.0 - m).sqrt();
    for _ in 0..AGM_MAX_STEPS {
        if (a - b).abs() <= AGM_TOL * a {
            break;
        }
        let next = 0.5 * (a + b);
        b = (a * b).sqrt();
        a = next;
    }
    FRAC_PI_2 / a
}

/// Complete elliptic integral of the second kind E(m), `0 <= m <= 1`.
pub fn ellipe(m: f64) -> f64 {
    debug_assert!(
        (0.0..=1.0).contains(&m),
        "ellipe requires 0 <= m <= 1, got {m}"
    );
    if m >= 1.0 {
        return 1.0;
    }
    let mut a = 1.0;
    let mut b = (1.0 - m).sqrt();
    let mut weight = 0.5;
    let mut sum = 0.5 * m;
    for _ in 0..AGM_MAX_STEPS {
        if (a - b).abs() <= AGM_TOL * a {
            break;
        }
        let c = 0.5 * (a - b);
        let next = 0.5 * (a + b);
        b = (a * b).sqrt();
        a = next;
        weight *= 2.0;
        sum += weight * c * c;
    }
    FRAC_PI_2 / a * (1.0 - sum)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ellipk_reference_values() {
        let cases: &[(f64, f64)] = &[
            (0.0, FRAC_PI_2),
            (0.1, 1.6124413487202192),
            (0.5, 1.8540746773013719),
            (0.9, 2.5780921133481733),
            (0.99, 3.6956373629898747),
            (0.999, 4.841132560550296),
        ];
        for &(m, expected) in cases {
            let got = ellipk(m);
            assert!(
                (got - expected).abs() < 1e-13,
                "K({m}) = {got}, expected {expected}"
            );
        }
    }

    #[test]
    fn test_ellipe_reference_values() {
        let cases: &[(f64, f64)] = &[
            (0.0, FRAC_PI_2),
            (0.1, 1.5307576368977633),
            (0.5, 1.3506438810476755),
            (0.9, 1.1047747327040733),
            (0.99, 1.015993545025224),
            (0.999, 1.0021707908344453),
        ];
        for &(m, expected) in cases {
            let got = ellipe(m);
            assert!(
                (got - expected).abs() < 1e-13,
                "E({m}) = {got}, expected {expected}"
            );
        }
    }

    #[test]
    fn test_ellipe_at_one() {
        assert_eq!(ellipe(1.0), 1.0);
    }

    #[test]
    fn test_legendre_relation() {
        // E(m)K(1-m) + E(1-m)K(m) - K(m)K(1-m) = π/2
        for &m in &[0.1, 0.3, 0.5, 0.8] {
            let lhs = ellipe(m) * ellipk(1.0 - m) + ellipe(1.0 - m) * ellipk(m)
                - ellipk(m) * ellipk(1.0 - m);
            assert!(
                (lhs - FRAC_PI_2).abs() < 1e-13,
                "Legendre relation at m={m}: {lhs}"
            );
        }
    }
}
