use crate::{Config, MeshGraph, SolverState, V3, VertexBlocks, Weights, hessian_sweep};

/// Solve `JᵀJ·δ = rhs` with conjugate gradients, preconditioned by the inverted diagonals
/// the last gradient sweep stored in `state`.
///
/// Starts from `δ = 0`. Every search direction goes through `state.dir_positions` /
/// `state.dir_angles`, because that's where [`hessian_sweep`] reads it from.
/// Returns the step and how many iterations it took.
pub(super) fn solve(
    graph: &MeshGraph,
    state: &mut SolverState,
    weights: &Weights,
    rhs: &VertexBlocks,
    config: &Config,
) -> (VertexBlocks, usize) {
    let n = state.len();
    let mut delta = VertexBlocks::zeros(n);
    let mut residual = rhs.clone();
    // Relative to the right-hand side, so scaling both weights doesn't change the answer.
    let threshold = config.linear_tolerance * rhs.dot(rhs);
    if residual.dot(&residual) <= threshold {
        return (delta, 0);
    }

    let mut z = precondition(state, &residual);
    let mut rz = residual.dot(&z);
    let mut direction = z.clone();
    let mut jtj_direction = VertexBlocks::zeros(n);

    let mut iterations = 0;
    while iterations < config.max_linear_iterations {
        iterations += 1;
        state.dir_positions.copy_from_slice(&direction.positions);
        state.dir_angles.copy_from_slice(&direction.angles);
        hessian_sweep(
            graph,
            state,
            weights,
            &mut jtj_direction.positions,
            &mut jtj_direction.angles,
        );

        let curvature = direction.dot(&jtj_direction);
        if curvature.is_nan() || curvature <= 0.0 {
            // Direction is in the Hessian's null space. Nothing left to gain along it.
            break;
        }
        let alpha = rz / curvature;
        delta.axpy(alpha, &direction);
        residual.axpy(-alpha, &jtj_direction);
        if residual.dot(&residual) <= threshold {
            break;
        }

        z = precondition(state, &residual);
        let rz_next = residual.dot(&z);
        direction.xpby(&z, rz_next / rz);
        rz = rz_next;
    }
    (delta, iterations)
}

/// Multiply by the stored inverse diagonals.
/// A blind rotation axis can leave an infinite entry there, which is treated as 1.
fn precondition(state: &SolverState, residual: &VertexBlocks) -> VertexBlocks {
    let apply = |m: &[V3], r: &[V3]| -> Vec<V3> {
        m.iter()
            .zip(r)
            .map(|(m, r)| sanitize(*m).hadamard(*r))
            .collect()
    };
    VertexBlocks {
        positions: apply(&state.precond_positions, &residual.positions),
        angles: apply(&state.precond_angles, &residual.angles),
    }
}

fn sanitize(m: V3) -> V3 {
    let finite_or_one = |v: f64| if v.is_finite() { v } else { 1.0 };
    V3::new(finite_or_one(m.x), finite_or_one(m.y), finite_or_one(m.z))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{neg_gradient_sweep, tests::two_vertices};

    #[test]
    fn zero_rhs_takes_no_iterations() {
        let (graph, mut state) = two_vertices(None);
        let rhs = VertexBlocks::zeros(2);
        let weights = Weights::default();
        let (delta, iterations) = solve(&graph, &mut state, &weights, &rhs, &Config::default());
        assert_eq!(iterations, 0);
        assert_eq!(delta, VertexBlocks::zeros(2));
    }

    #[test]
    fn fitting_only_is_solved_in_one_iteration() {
        // Without regularization JᵀJ is diagonal, and the preconditioner inverts it exactly.
        let (graph, mut state) = two_vertices(Some(V3::new(0.5, 0.0, 0.0)));
        let weights = Weights::new(2.0, 0.0).unwrap();
        let rhs = neg_gradient_sweep(&graph, &mut state, &weights);
        let (delta, iterations) = solve(&graph, &mut state, &weights, &rhs, &Config::default());
        assert_eq!(iterations, 1);
        assert_eq!(delta.positions[0], V3::new(0.5, 0.0, 0.0));
        assert_eq!(delta.positions[1], V3::ZERO);
    }

    #[test]
    fn tiny_weights_still_take_a_step() {
        let (graph, mut state) = two_vertices(Some(V3::new(0.5, 0.0, 0.0)));
        let weights = Weights::new(1e-6, 1e-6).unwrap();
        let rhs = neg_gradient_sweep(&graph, &mut state, &weights);
        let (delta, iterations) = solve(&graph, &mut state, &weights, &rhs, &Config::default());
        assert!(iterations > 0);
        assert!(delta.inf_norm() > 0.1);
    }

    #[test]
    fn infinite_preconditioner_entries_become_one() {
        let m = sanitize(V3::new(0.5, f64::INFINITY, f64::NAN));
        assert_eq!(m, V3::new(0.5, 1.0, 1.0));
    }
}
