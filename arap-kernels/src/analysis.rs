//! Finding degrees of freedom, and which vertices are free to move without changing the energy.
use faer::Mat;

use crate::{AnalysisError, MeshGraph, SolverState, V3, VertexId, Weights, hessian_sweep};

/// Unknowns per vertex: 3 position components, then 3 angles.
const UNKNOWNS_PER_VERTEX: usize = 6;

/// Rank of the Gauss-Newton Hessian at some state.
#[derive(Debug, Clone, PartialEq)]
pub struct HessianAnalysis {
    /// Numerical rank of `JᵀJ`.
    pub rank: usize,
    /// Unknowns minus rank. Each is a direction the linearised energy can't see.
    pub degrees_of_freedom: usize,
    /// Vertices whose position or angles move along some free direction.
    pub underconstrained: Vec<VertexId>,
}

impl HessianAnalysis {
    /// Are there any free directions at all?
    pub fn is_underconstrained(&self) -> bool {
        self.degrees_of_freedom > 0
    }
}

/// Assemble `JᵀJ` densely, one column per unknown, by applying [`hessian_sweep`] to each
/// unit direction. Then find its rank with an SVD.
///
/// This is O(n²) memory and O(n³) time, so only use it on small meshes.
pub fn hessian_analysis(
    graph: &MeshGraph,
    state: &SolverState,
    weights: &Weights,
) -> Result<HessianAnalysis, AnalysisError> {
    let n = state.len();
    if n == 0 {
        return Err(AnalysisError::EmptyMesh);
    }
    let nvars = n * UNKNOWNS_PER_VERTEX;

    let mut probe = state.clone();
    probe.dir_positions.fill(V3::ZERO);
    probe.dir_angles.fill(V3::ZERO);
    let mut out_positions = vec![V3::ZERO; n];
    let mut out_angles = vec![V3::ZERO; n];
    let mut jtj = Mat::<f64>::zeros(nvars, nvars);
    for col in 0..nvars {
        *unit_direction(&mut probe, col) = 1.0;
        hessian_sweep(graph, &probe, weights, &mut out_positions, &mut out_angles);
        *unit_direction(&mut probe, col) = 0.0;
        for vertex in 0..n {
            let row = vertex * UNKNOWNS_PER_VERTEX;
            for axis in 0..3 {
                jtj[(row + axis, col)] = out_positions[vertex].get(axis);
                jtj[(row + 3 + axis, col)] = out_angles[vertex].get(axis);
            }
        }
    }

    let svd = jtj.svd().map_err(AnalysisError::FaerSvd)?;
    let sigma = svd.S().column_vector();
    let largest_singular_value = sigma.iter().copied().fold(0.0, libm::fmax);
    let tolerance = f64::EPSILON * (nvars as f64) * largest_singular_value;
    let rank = sigma.iter().filter(|&&s| s > tolerance).count();

    // Singular values come out largest first, so columns rank.. of V span the null space.
    // An unknown participates in it if its row of that block is non-negligible.
    let participation: Vec<f64> = (0..nvars)
        .map(|j| {
            let sum_sq: f64 = (rank..nvars)
                .map(|k| {
                    let v_jk = svd.V().get(j, k);
                    v_jk * v_jk
                })
                .sum();
            sum_sq.sqrt()
        })
        .collect();
    let max_participation = participation.iter().copied().fold(0.0, libm::fmax);
    let noise_floor = 10.0 * libm::sqrt(nvars as f64) * f64::EPSILON;
    let var_tol = libm::fmax(1e-3 * max_participation, noise_floor);

    let mut underconstrained: Vec<VertexId> = (0..nvars)
        .filter(|&j| participation[j] > var_tol)
        .map(|j| (j / UNKNOWNS_PER_VERTEX) as VertexId)
        .collect();
    underconstrained.dedup();

    Ok(HessianAnalysis {
        rank,
        degrees_of_freedom: nvars - rank,
        underconstrained,
    })
}

fn unit_direction(state: &mut SolverState, unknown: usize) -> &mut f64 {
    let vertex = unknown / UNKNOWNS_PER_VERTEX;
    let axis = unknown % UNKNOWNS_PER_VERTEX;
    if axis < 3 {
        state.dir_positions[vertex].get_mut(axis)
    } else {
        state.dir_angles[vertex].get_mut(axis - 3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{isolated_vertex, tetrahedron, tetrahedron_rest_shape, two_vertices};

    #[test]
    fn pinned_vertex_can_only_rotate() {
        let (graph, state) = isolated_vertex(Some(V3::ZERO));
        let analysis = hessian_analysis(&graph, &state, &Weights::default()).unwrap();
        assert_eq!(analysis.rank, 3);
        assert_eq!(analysis.degrees_of_freedom, 3);
        assert!(analysis.is_underconstrained());
        assert_eq!(analysis.underconstrained, vec![0]);
    }

    #[test]
    fn free_bar() {
        // Both residuals of the one edge only span 5 dimensions: relative displacement,
        // plus the 2 rotation axes that aren't the bar itself.
        let (graph, state) = two_vertices(None);
        let analysis = hessian_analysis(&graph, &state, &Weights::default()).unwrap();
        assert_eq!(analysis.rank, 5);
        assert_eq!(analysis.degrees_of_freedom, 7);
        assert_eq!(analysis.underconstrained, vec![0, 1]);
    }

    #[test]
    fn fully_pinned_tetrahedron() {
        let rest = tetrahedron_rest_shape();
        let (graph, state) = tetrahedron([Some(rest[0]), Some(rest[1]), Some(rest[2]), Some(rest[3])]);
        let analysis = hessian_analysis(&graph, &state, &Weights::default()).unwrap();
        assert_eq!(analysis.rank, 24);
        assert!(!analysis.is_underconstrained());
        assert!(analysis.underconstrained.is_empty());
    }

    #[test]
    fn empty_mesh() {
        let graph = MeshGraph::new(vec![0], Vec::new()).unwrap();
        let state = SolverState::new(Vec::new(), Vec::new()).unwrap();
        let err = hessian_analysis(&graph, &state, &Weights::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::EmptyMesh));
    }
}
