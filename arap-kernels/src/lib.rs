//! As-rigid-as-possible (ARAP) mesh deformation kernels.
//!
//! Per-vertex energy, negative gradient (JTF) and Gauss-Newton Hessian-vector product (JTJ)
//! evaluators, plus a reference Gauss-Newton/PCG driver that sweeps them over a mesh.

pub use crate::analysis::{HessianAnalysis, hessian_analysis};
pub use crate::energy::{eval_energy, total_energy};
pub use crate::error::{
    AnalysisError, BuildError, GraphError, SolveError, StateError, TextualError,
};
pub use crate::gradient::{NegGradient, eval_neg_gradient, neg_gradient_sweep};
pub use crate::graph::{MeshBuilder, MeshGraph};
pub use crate::hessian::{apply_hessian, hessian_sweep};
pub use crate::id::{IdGenerator, VertexId};
pub use crate::solver::{Config, SolveOutcome, solve};
pub use crate::state::{
    NO_TARGET, SolverState, VertexBlocks, Weights, target_from_sentinel, target_to_sentinel,
};
pub use crate::vector::{M3, V3};

/// Dense rank analysis of the Gauss-Newton Hessian.
mod analysis;
/// Scalar energy per vertex.
mod energy;
mod error;
/// Negative gradient and preconditioner per vertex.
mod gradient;
/// Neighbour graph of the mesh.
mod graph;
/// Hessian-vector product per vertex.
mod hessian;
mod id;
/// Rotation matrices from angles, and their derivatives.
pub mod rotation;
/// Reference Gauss-Newton driver.
mod solver;
mod state;
/// Parser for textual representation of these problems.
pub mod textual;
mod vector;

/// Diagonal preconditioner entries at or below this are treated as singular.
const EPSILON: f64 = 1e-6;
