// ─────────────────────────────────────────────────────────────────────
// VRM Sensitivity Core — Exponential Integral
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Exponential integrals E1(x) and Ei(−x) for x > 0.
//!
//! The log-uniform relaxation model integrates `e^{−t/τ}/τ` over a band of
//! time constants, which yields differences of `Ei(−t/τ)`.

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;
const MAX_TERMS: usize = 200;
const REL_TOL: f64 = 1e-16;
const TINY: f64 = 1e-300;

/// Exponential integral `E1(x) = ∫_x^∞ e^{−s}/s ds` for `x > 0`.
///
/// Power series for `x <= 1`, modified Lentz continued fraction above.
/// Returns `+inf` at zero and NaN for negative or NaN input.
pub fn exp_e1(x: f64) -> f64 {
    if x.is_nan() || x < 0.0 {
        return f64::NAN;
    }
    if x == 0.0 {
        return f64::INFINITY;
    }
    if x.is_infinite() {
        return 0.0;
    }

    if x <= 1.0 {
        let mut sum = 0.0;
        let mut term = 1.0;
        for k in 1..MAX_TERMS {
            let kf = k as f64;
            term *= -x / kf;
            let add = -term / kf;
            sum += add;
            if add.abs() < sum.abs() * 1e-17 {
                break;
            }
        }
        return -EULER_GAMMA - x.ln() + sum;
    }

    let mut b = x + 1.0;
    let mut c = 1.0 / TINY;
    let mut d = 1.0 / b;
    let mut h = d;
    for i in 1..MAX_TERMS {
        let an = -((i * i) as f64);
        b += 2.0;
        d = 1.0 / (an * d + b);
        c = b + an / c;
        let delta = c * d;
        h *= delta;
        if (delta - 1.0).abs() < REL_TOL {
            break;
        }
    }
    h * (-x).exp()
}

/// `Ei(−x) = −E1(x)` for `x > 0`.
pub fn expi_neg(x: f64) -> f64 {
    -exp_e1(x)
}
