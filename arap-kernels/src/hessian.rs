use rayon::prelude::*;

use crate::{
    MeshGraph, SolverState, Weights,
    rotation::{derivative_rotation_times_vector, rotation_derivatives},
    vector::V3,
};

/// Apply the Gauss-Newton Hessian `JᵀJ` to the current search direction
/// (`state.dir_positions`, `state.dir_angles`), returning this vertex's rows of the product.
///
/// The Hessian is never formed. This is the linearisation of
/// [`crate::eval_neg_gradient`]: moving the unknowns by `ε·dir` changes the negative
/// gradient by `-ε·(JᵀJ·dir)`, up to second-order residual terms.
pub fn apply_hessian(
    vertex: usize,
    graph: &MeshGraph,
    state: &SolverState,
    weights: &Weights,
) -> (V3, V3) {
    let mut b = V3::ZERO;
    let mut b_angle = V3::ZERO;

    let p = state.dir_positions[vertex];

    // Fitting
    if state.targets[vertex].is_some() {
        b += 2.0 * weights.fitting * p;
    }

    // Regularization
    let mut e_reg = V3::ZERO;
    let mut e_reg_angle = V3::ZERO;
    let d_r = rotation_derivatives(state.angles[vertex]);
    let p_hat = state.urshape[vertex];
    let p_angle = state.dir_angles[vertex];
    for &neighbour in graph.neighbours(vertex) {
        let j = neighbour as usize;
        let q_hat = state.urshape[j];
        let edge_hat = p_hat - q_hat;
        let d = -derivative_rotation_times_vector(&d_r, edge_hat);
        let d_j = -derivative_rotation_times_vector(&rotation_derivatives(state.angles[j]), edge_hat);
        let q = state.dir_positions[j];
        let q_angle = state.dir_angles[j];
        let d_t = d.transpose();

        e_reg += 2.0 * (p - q);
        e_reg_angle += d_t * d * p_angle;
        e_reg += d * p_angle + d_j * q_angle;
        e_reg_angle += d_t * (p - q);
    }
    b += 2.0 * weights.regularizer * e_reg;
    b_angle += 2.0 * weights.regularizer * e_reg_angle;

    (b, b_angle)
}

/// Run [`apply_hessian`] for every vertex in parallel.
/// Each vertex writes only its own slot of `out_positions` / `out_angles`.
pub fn hessian_sweep(
    graph: &MeshGraph,
    state: &SolverState,
    weights: &Weights,
    out_positions: &mut [V3],
    out_angles: &mut [V3],
) {
    out_positions
        .par_iter_mut()
        .zip(out_angles.par_iter_mut())
        .enumerate()
        .for_each(|(vertex, (out_p, out_a))| {
            (*out_p, *out_a) = apply_hessian(vertex, graph, state, weights);
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{isolated_vertex, two_vertices};

    #[test]
    fn isolated_vertex_without_target() {
        let (graph, mut state) = isolated_vertex(None);
        state.dir_positions[0] = V3::new(1.0, 2.0, 3.0);
        state.dir_angles[0] = V3::new(-1.0, 0.5, 0.25);
        let (p, a) = apply_hessian(0, &graph, &state, &Weights::default());
        assert_eq!(p, V3::ZERO);
        assert_eq!(a, V3::ZERO);
    }

    #[test]
    fn fitting_only() {
        let (graph, mut state) = isolated_vertex(Some(V3::ONE));
        state.dir_positions[0] = V3::new(1.0, 2.0, 3.0);
        let weights = Weights::new(1.5, 7.0).unwrap();
        let (p, a) = apply_hessian(0, &graph, &state, &weights);
        assert_eq!(p, V3::new(3.0, 6.0, 9.0));
        assert_eq!(a, V3::ZERO);
    }

    #[test]
    fn opposite_translation_of_bar() {
        // Pull A and B apart along X by one unit each way.
        // Each row sees 2 * w_reg * 2 * (dp - dq) = 4 * (±2).
        let (graph, mut state) = two_vertices(None);
        state.dir_positions = vec![V3::new(-1.0, 0.0, 0.0), V3::new(1.0, 0.0, 0.0)];
        let mut out_p = vec![V3::ZERO; 2];
        let mut out_a = vec![V3::ZERO; 2];
        hessian_sweep(&graph, &state, &Weights::default(), &mut out_p, &mut out_a);
        assert_eq!(out_p, vec![V3::new(-8.0, 0.0, 0.0), V3::new(8.0, 0.0, 0.0)]);
        // Stretching along the bar doesn't couple into any rotation.
        assert_eq!(out_a, vec![V3::ZERO; 2]);
    }

    #[test]
    fn common_translation_is_free() {
        let (graph, mut state) = two_vertices(None);
        state.dir_positions = vec![V3::new(0.3, -1.0, 2.0); 2];
        let mut out_p = vec![V3::ONE; 2];
        let mut out_a = vec![V3::ONE; 2];
        hessian_sweep(&graph, &state, &Weights::default(), &mut out_p, &mut out_a);
        assert_eq!(out_p, vec![V3::ZERO; 2]);
        assert_eq!(out_a, vec![V3::ZERO; 2]);
    }
}
