use rayon::prelude::*;

use crate::{
    EPSILON, MeshGraph, SolverState, VertexBlocks, Weights,
    rotation::{derivative_rotation_times_vector, rotation_derivatives, rotation_from_angles},
    vector::{M3, V3},
};

/// One vertex's slice of `-∇E` (i.e. `-JᵀF`), and its Jacobi preconditioner.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NegGradient {
    /// Negative gradient w.r.t. this vertex's position.
    pub position: V3,
    /// Negative gradient w.r.t. this vertex's rotation angles.
    pub angle: V3,
    /// Inverted diagonal of the position block, or all ones if it was near-singular.
    pub precond_position: V3,
    /// Inverted diagonal of the angle block, or all ones if it was near-singular.
    pub precond_angle: V3,
}

/// Evaluate the negative gradient of the total energy w.r.t. one vertex's unknowns.
///
/// The position part includes the residuals this vertex appears in as someone else's
/// neighbour, which is where the neighbour rotation `R_j` comes in.
pub fn eval_neg_gradient(
    vertex: usize,
    graph: &MeshGraph,
    state: &SolverState,
    weights: &Weights,
) -> NegGradient {
    let mut b = V3::ZERO;
    let mut b_angle = V3::ZERO;
    let mut pre = V3::ZERO;
    let mut pre_angle = M3::ZERO;

    let p = state.positions[vertex];

    // Fitting
    if let Some(t) = state.targets[vertex] {
        b -= 2.0 * weights.fitting * (p - t);
        pre += V3::splat(2.0 * weights.fitting);
    }

    // Regularization
    let mut e_reg = V3::ZERO;
    let mut e_reg_angle = V3::ZERO;
    let p_hat = state.urshape[vertex];
    let r_i = rotation_from_angles(state.angles[vertex]);
    let d_r = rotation_derivatives(state.angles[vertex]);
    for &neighbour in graph.neighbours(vertex) {
        let j = neighbour as usize;
        let q = state.positions[j];
        let q_hat = state.urshape[j];
        let edge_hat = p_hat - q_hat;
        let r_j = rotation_from_angles(state.angles[j]);
        // Jacobian of this residual w.r.t. this vertex's angles.
        let d = -derivative_rotation_times_vector(&d_r, edge_hat);
        let d_t = d.transpose();

        e_reg += 2.0 * (p - q) - (r_i + r_j) * edge_hat;
        pre += V3::splat(2.0 * (2.0 * weights.regularizer));
        e_reg_angle += d_t * ((p - q) - r_i * edge_hat);
        pre_angle += d_t * d * (2.0 * weights.regularizer);
    }
    b += -2.0 * weights.regularizer * e_reg;
    b_angle += -2.0 * weights.regularizer * e_reg_angle;

    NegGradient {
        position: b,
        angle: b_angle,
        precond_position: invert_position_diagonal(pre),
        precond_angle: invert_angle_diagonal(pre_angle),
    }
}

/// Invert each axis, unless any axis is too close to 0, in which case use identity.
fn invert_position_diagonal(pre: V3) -> V3 {
    if pre.x.abs() > EPSILON && pre.y.abs() > EPSILON && pre.z.abs() > EPSILON {
        V3::new(pre.x.recip(), pre.y.recip(), pre.z.recip())
    } else {
        V3::ONE
    }
}

/// Only the first diagonal entry decides whether all three get inverted.
/// This assumes the angle block is roughly isotropic; entries 1 and 2 are not checked.
fn invert_angle_diagonal(pre: M3) -> V3 {
    let diagonal = pre.diagonal();
    if diagonal.x > EPSILON {
        V3::new(diagonal.x.recip(), diagonal.y.recip(), diagonal.z.recip())
    } else {
        V3::ONE
    }
}

/// Run [`eval_neg_gradient`] over every vertex in parallel, then store each vertex's
/// preconditioner in its own slot of `state`.
///
/// Evaluation only reads `state`; the preconditioner writes happen afterwards,
/// so no vertex ever observes another vertex's freshly written preconditioner.
pub fn neg_gradient_sweep(
    graph: &MeshGraph,
    state: &mut SolverState,
    weights: &Weights,
) -> VertexBlocks {
    let evaluated: Vec<NegGradient> = (0..graph.num_vertices())
        .into_par_iter()
        .map(|vertex| eval_neg_gradient(vertex, graph, state, weights))
        .collect();

    let mut out = VertexBlocks {
        positions: Vec::with_capacity(evaluated.len()),
        angles: Vec::with_capacity(evaluated.len()),
    };
    for (vertex, g) in evaluated.into_iter().enumerate() {
        state.precond_positions[vertex] = g.precond_position;
        state.precond_angles[vertex] = g.precond_angle;
        out.positions.push(g.position);
        out.angles.push(g.angle);
    }
    out
}
