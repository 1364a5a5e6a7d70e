// ─────────────────────────────────────────────────────────────────────
// VRM Sensitivity Core — Constants
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
/// Vacuum permeability (H/m), `4π·10⁻⁷`.
pub const MU0: f64 = 4.0e-7 * std::f64::consts::PI;

/// Prism kernel prefactor `-1/(4π)`.
pub const PRISM_PREFACTOR: f64 = -1.0 / (4.0 * std::f64::consts::PI);

/// Additive guard on arctangent denominators in the prism kernel.
pub const KERNEL_EPS: f64 = 1e-10;

/// Corner differences with magnitude below this are nudged off zero.
pub const NUDGE_THRESHOLD: f64 = 1e-10;

/// Nudge magnitude is the smallest cell width on an axis divided by this.
pub const NUDGE_DIVISOR: f64 = 1000.0;

/// Largest accepted refinement factor. Level q splits a cell into 8^q children.
pub const MAX_REF_FACTOR: usize = 4;

/// Default refinement factor when none is configured.
pub const DEFAULT_REF_FACTOR: usize = 3;

/// Default shell spacing as a multiple of the mean minimum cell width.
pub const DEFAULT_RADIUS_SCALE: f64 = 1.25;
