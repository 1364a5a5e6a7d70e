//! VRM forward model: geometry operator assembly, near-source refinement,
//! decay operators and the linear and log-uniform problems.
//!
//! Layer 1: mesh, survey, sources, waveform, parameter maps
//! Layer 2: inducing-field operator, refinement engine, sensitivity assembler
//! Layer 3: decay operator, cached problems with forward and adjoint products

pub mod assembler;
pub mod cache;
pub mod decay;
pub mod h0;
pub mod maps;
pub mod mesh;
pub mod problem;
pub mod refinement;
pub mod sources;
pub mod survey;
pub mod waveform;
