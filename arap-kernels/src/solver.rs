use tracing::{debug, info, warn};

use crate::{MeshGraph, SolveError, SolverState, Weights, neg_gradient_sweep, total_energy};

mod pcg;

/// Knobs for the Gauss-Newton driver.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    /// Outer (Gauss-Newton) iterations to run at most.
    pub max_nonlinear_iterations: usize,
    /// Inner (PCG) iterations per outer iteration, at most.
    pub max_linear_iterations: usize,
    /// PCG stops once the squared residual norm drops to this fraction of
    /// the squared norm of the right-hand side.
    pub linear_tolerance: f64,
    /// Gauss-Newton stops once a step is this small, relative to the unknowns.
    pub step_tolerance: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_nonlinear_iterations: 20,
            max_linear_iterations: 60,
            linear_tolerance: 1e-10,
            step_tolerance: 1e-8,
        }
    }
}

impl Config {
    /// Set [`Config::max_nonlinear_iterations`].
    pub fn with_max_nonlinear_iterations(mut self, max: usize) -> Self {
        self.max_nonlinear_iterations = max;
        self
    }

    /// Set [`Config::max_linear_iterations`].
    pub fn with_max_linear_iterations(mut self, max: usize) -> Self {
        self.max_linear_iterations = max;
        self
    }

    /// Set [`Config::linear_tolerance`].
    pub fn with_linear_tolerance(mut self, tolerance: f64) -> Self {
        self.linear_tolerance = tolerance;
        self
    }

    /// Set [`Config::step_tolerance`].
    pub fn with_step_tolerance(mut self, tolerance: f64) -> Self {
        self.step_tolerance = tolerance;
        self
    }
}

/// What happened during a [`solve`].
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct SolveOutcome {
    pub(crate) iterations: usize,
    pub(crate) linear_iterations: usize,
    pub(crate) initial_energy: f64,
    pub(crate) final_energy: f64,
    pub(crate) converged: bool,
}

impl SolveOutcome {
    /// How many Gauss-Newton iterations ran?
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// How many PCG iterations ran, summed over every Gauss-Newton iteration?
    pub fn linear_iterations(&self) -> usize {
        self.linear_iterations
    }

    /// Total energy before the first step.
    pub fn initial_energy(&self) -> f64 {
        self.initial_energy
    }

    /// Total energy after the last step.
    pub fn final_energy(&self) -> f64 {
        self.final_energy
    }

    /// Did the step size fall below tolerance?
    /// If not, the solver ran out of iterations, and the state holds its last iterate.
    pub fn converged(&self) -> bool {
        self.converged
    }
}

/// Deform the mesh towards its targets, as rigidly as possible.
///
/// Each Gauss-Newton iteration evaluates the negative gradient and preconditioner
/// for every vertex, solves `JᵀJ·δ = -JᵀF` with Jacobi-preconditioned conjugate gradients,
/// then moves positions and angles by `δ`. Iterates in place on `state`.
pub fn solve(
    graph: &MeshGraph,
    state: &mut SolverState,
    weights: &Weights,
    config: Config,
) -> Result<SolveOutcome, SolveError> {
    if graph.num_vertices() != state.len() {
        return Err(SolveError::SizeMismatch {
            graph: graph.num_vertices(),
            state: state.len(),
        });
    }
    if state.is_empty() {
        return Err(SolveError::EmptyMesh);
    }

    let initial_energy = total_energy(graph, state, weights);
    if !initial_energy.is_finite() {
        return Err(SolveError::NonFiniteEnergy {
            iteration: 0,
            energy: initial_energy,
        });
    }
    info!(
        num_vertices = state.len(),
        num_neighbour_entries = graph.num_neighbour_entries(),
        initial_energy,
        "Starting Gauss-Newton solve"
    );

    let mut energy = initial_energy;
    let mut linear_iterations = 0;
    for this_iteration in 1..=config.max_nonlinear_iterations {
        let rhs = neg_gradient_sweep(graph, state, weights);
        let (step, pcg_iterations) = pcg::solve(graph, state, weights, &rhs, &config);
        linear_iterations += pcg_iterations;

        let current_inf_norm = state
            .positions
            .iter()
            .chain(&state.angles)
            .map(|v| v.inf_norm())
            .fold(0.0, libm::fmax);
        let step_inf_norm = step.inf_norm();
        for (p, d) in state.positions.iter_mut().zip(&step.positions) {
            *p += *d;
        }
        for (a, d) in state.angles.iter_mut().zip(&step.angles) {
            *a += *d;
        }

        energy = total_energy(graph, state, weights);
        if !energy.is_finite() {
            return Err(SolveError::NonFiniteEnergy {
                iteration: this_iteration,
                energy,
            });
        }
        debug!(
            iteration = this_iteration,
            energy, pcg_iterations, step_inf_norm, "Gauss-Newton step"
        );

        // Convergence check: the step barely moved anything,
        // so we're at (or stuck near) a local minimum.
        let step_threshold = config.step_tolerance * (current_inf_norm + config.step_tolerance);
        if step_inf_norm <= step_threshold {
            info!(iterations = this_iteration, energy, "Converged");
            return Ok(SolveOutcome {
                iterations: this_iteration,
                linear_iterations,
                initial_energy,
                final_energy: energy,
                converged: true,
            });
        }
    }

    warn!(
        max_iterations = config.max_nonlinear_iterations,
        energy, "Gauss-Newton did not converge"
    );
    Ok(SolveOutcome {
        iterations: config.max_nonlinear_iterations,
        linear_iterations,
        initial_energy,
        final_energy: energy,
        converged: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{V3, tests::two_vertices};

    #[test]
    fn config_builders() {
        let config = Config::default()
            .with_max_nonlinear_iterations(3)
            .with_max_linear_iterations(7)
            .with_linear_tolerance(1e-4)
            .with_step_tolerance(1e-2);
        assert_eq!(config.max_nonlinear_iterations, 3);
        assert_eq!(config.max_linear_iterations, 7);
        assert_eq!(config.linear_tolerance, 1e-4);
        assert_eq!(config.step_tolerance, 1e-2);
    }

    #[test]
    fn out_of_iterations_is_not_an_error() {
        let (graph, mut state) = two_vertices(Some(V3::new(0.5, 0.0, 0.0)));
        let config = Config::default().with_max_nonlinear_iterations(0);
        let outcome = solve(&graph, &mut state, &Weights::default(), config).unwrap();
        assert!(!outcome.converged());
        assert_eq!(outcome.iterations(), 0);
        assert_eq!(outcome.initial_energy(), outcome.final_energy());
    }

    #[test]
    fn scaling_both_weights_gives_the_same_solution() {
        let target = Some(V3::new(0.5, 0.0, 0.0));
        let (graph, mut unit) = two_vertices(target);
        let (_, mut tiny) = two_vertices(target);
        let unit_outcome = solve(&graph, &mut unit, &Weights::default(), Config::default()).unwrap();
        let tiny_weights = Weights::new(1e-6, 1e-6).unwrap();
        let tiny_outcome = solve(&graph, &mut tiny, &tiny_weights, Config::default()).unwrap();

        assert!(tiny_outcome.converged());
        assert_eq!(tiny_outcome.iterations(), unit_outcome.iterations());
        assert!(tiny_outcome.linear_iterations() > 0);
        assert!(tiny_outcome.final_energy() < 1e-6 * tiny_outcome.initial_energy());
        for (a, b) in unit.positions.iter().zip(&tiny.positions) {
            crate::tests::assert_nearly_eq(a.x, b.x);
            crate::tests::assert_nearly_eq(a.y, b.y);
            crate::tests::assert_nearly_eq(a.z, b.z);
        }
        crate::tests::assert_nearly_eq(tiny.positions[0].x, 0.5);
    }

    #[test]
    fn bar_reaches_its_target() {
        // Dragging A along the bar's own axis: the bar just translates.
        let (graph, mut state) = two_vertices(Some(V3::new(0.5, 0.0, 0.0)));
        let outcome = solve(&graph, &mut state, &Weights::default(), Config::default()).unwrap();
        assert!(outcome.converged());
        assert!(outcome.final_energy() < 1e-12);
        crate::tests::assert_nearly_eq(state.positions[0].x, 0.5);
        crate::tests::assert_nearly_eq(state.positions[1].x, 1.5);
    }
}
