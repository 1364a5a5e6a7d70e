//! Mathematical primitives for the VRM sensitivity core.

pub mod elliptic;
pub mod expint;
pub mod linalg;
pub mod prism;
