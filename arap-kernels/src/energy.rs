use rayon::prelude::*;

use crate::{MeshGraph, SolverState, Weights, rotation::rotation_from_angles, vector::V3};

/// Energy contributed by one vertex: its fitting term plus one regularization
/// residual per neighbour entry.
///
/// Only this vertex's rotation is applied to the rest-shape edges. Summing this over all
/// vertices gives the total energy that [`crate::eval_neg_gradient`] differentiates.
pub fn eval_energy(vertex: usize, graph: &MeshGraph, state: &SolverState, weights: &Weights) -> f64 {
    let mut e = V3::ZERO;

    // Fitting
    if let Some(target) = state.targets[vertex] {
        let e_fit = state.positions[vertex] - target;
        e += weights.fitting * e_fit.hadamard(e_fit);
    }

    // Regularization
    let mut e_reg = V3::ZERO;
    let r = rotation_from_angles(state.angles[vertex]);
    let p = state.positions[vertex];
    let p_hat = state.urshape[vertex];
    for &neighbour in graph.neighbours(vertex) {
        let j = neighbour as usize;
        let q = state.positions[j];
        let q_hat = state.urshape[j];
        let d = (p - q) - r * (p_hat - q_hat);
        e_reg += d.hadamard(d);
    }
    e += weights.regularizer * e_reg;

    e.component_sum()
}

/// Sum of [`eval_energy`] over every vertex.
pub fn total_energy(graph: &MeshGraph, state: &SolverState, weights: &Weights) -> f64 {
    (0..graph.num_vertices())
        .into_par_iter()
        .map(|vertex| eval_energy(vertex, graph, state, weights))
        .sum()
}
