//! Mesh geometry algorithms.
//!
//! - **Curvature**: the five-pass [`CurvatureEngine`](curvature::CurvatureEngine)
//! - **Shape operator**: the pluggable per-edge and per-vertex estimator
//! - **Progress**: callbacks for long-running passes

pub mod curvature;
pub mod progress;
pub mod shape_operator;
