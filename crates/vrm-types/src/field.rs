// ─────────────────────────────────────────────────────────────────────
// VRM Sensitivity Core — Field Tags
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Closed tags for receiver field components and field types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cartesian field component measured by a receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    X,
    Y,
    Z,
}

impl Component {
    pub const ALL: [Component; 3] = [Component::X, Component::Y, Component::Z];

    /// Axis index (x=0, y=1, z=2).
    pub fn axis(self) -> usize {
        match self {
            Component::X => 0,
            Component::Y => 1,
            Component::Z => 2,
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Component::X => "x",
            Component::Y => "y",
            Component::Z => "z",
        };
        f.write_str(s)
    }
}

/// Quantity recorded during the off-time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    /// Magnetic field H.
    #[serde(rename = "h")]
    H,
    /// Time derivative of H.
    #[serde(rename = "dhdt")]
    DhDt,
    /// Magnetic flux density B.
    #[serde(rename = "b")]
    B,
    /// Time derivative of B.
    #[serde(rename = "dbdt")]
    DbDt,
}

impl FieldType {
    /// True for B and dB/dt, which carry an extra factor of mu0.
    pub fn is_flux_density(self) -> bool {
        matches!(self, FieldType::B | FieldType::DbDt)
    }

    pub fn is_time_derivative(self) -> bool {
        matches!(self, FieldType::DhDt | FieldType::DbDt)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FieldType::H => "h",
            FieldType::DhDt => "dhdt",
            FieldType::B => "b",
            FieldType::DbDt => "dbdt",
        };
        f.write_str(s)
    }
}
