use rayon::prelude::*;

use crate::{StateError, vector::V3};

/// Marks "this vertex has no target" in the x component of a flat target buffer.
/// Only needed when exchanging buffers with a layout that has no optional type.
pub const NO_TARGET: f64 = f64::NEG_INFINITY;

/// Decode one entry of a flat target buffer.
pub fn target_from_sentinel(raw: [f64; 3]) -> Option<V3> {
    if raw[0] == NO_TARGET {
        None
    } else {
        Some(V3::from(raw))
    }
}

/// Encode a target into a flat target buffer entry.
pub fn target_to_sentinel(target: Option<V3>) -> [f64; 3] {
    match target {
        Some(t) => t.to_array(),
        None => [NO_TARGET, NO_TARGET, NO_TARGET],
    }
}

/// Weights of the two energy terms. Constant during a solve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Weights {
    pub(crate) fitting: f64,
    pub(crate) regularizer: f64,
}

impl Weights {
    /// Both weights must be finite and non-negative.
    pub fn new(fitting: f64, regularizer: f64) -> Result<Self, StateError> {
        let valid = |w: f64| w.is_finite() && w >= 0.0;
        if !valid(fitting) || !valid(regularizer) {
            return Err(StateError::InvalidWeights {
                fitting,
                regularizer,
            });
        }
        Ok(Self {
            fitting,
            regularizer,
        })
    }

    /// Weight of the fitting (target) term.
    pub fn fitting(&self) -> f64 {
        self.fitting
    }

    /// Weight of the regularization (rigidity) term.
    pub fn regularizer(&self) -> f64 {
        self.regularizer
    }
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            fitting: 1.0,
            regularizer: 1.0,
        }
    }
}

/// Per-vertex buffers, all indexed by vertex ID.
///
/// `urshape` and `targets` are fixed once built. The driver owns writes to everything else,
/// and kernels only ever read from a `&SolverState`.
#[derive(Clone, Debug)]
pub struct SolverState {
    /// Current vertex positions.
    pub positions: Vec<V3>,
    /// Current rotation angles (alpha, beta, gamma) for each vertex.
    pub angles: Vec<V3>,
    pub(crate) urshape: Vec<V3>,
    pub(crate) targets: Vec<Option<V3>>,
    /// PCG search direction, position block.
    pub dir_positions: Vec<V3>,
    /// PCG search direction, angle block.
    pub dir_angles: Vec<V3>,
    /// Inverted diagonal preconditioner, position block.
    pub precond_positions: Vec<V3>,
    /// Inverted diagonal preconditioner, angle block.
    pub precond_angles: Vec<V3>,
}

impl SolverState {
    /// Start from the rest shape with zero rotations.
    pub fn new(urshape: Vec<V3>, targets: Vec<Option<V3>>) -> Result<Self, StateError> {
        if urshape.len() != targets.len() {
            return Err(StateError::WrongNumberTargets {
                vertices: urshape.len(),
                targets: targets.len(),
            });
        }
        let n = urshape.len();
        Ok(Self {
            positions: urshape.clone(),
            angles: vec![V3::ZERO; n],
            urshape,
            targets,
            dir_positions: vec![V3::ZERO; n],
            dir_angles: vec![V3::ZERO; n],
            precond_positions: vec![V3::ONE; n],
            precond_angles: vec![V3::ONE; n],
        })
    }

    /// Like [`SolverState::new`] but with targets in the flat sentinel encoding.
    pub fn from_sentinel_targets(urshape: Vec<V3>, targets: &[[f64; 3]]) -> Result<Self, StateError> {
        Self::new(urshape, targets.iter().copied().map(target_from_sentinel).collect())
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.urshape.len()
    }

    /// True if there are no vertices.
    pub fn is_empty(&self) -> bool {
        self.urshape.is_empty()
    }

    /// Rest-shape positions.
    pub fn urshape(&self) -> &[V3] {
        &self.urshape
    }

    /// Per-vertex targets. `None` means the vertex isn't pulled anywhere.
    pub fn targets(&self) -> &[Option<V3>] {
        &self.targets
    }
}

/// One position block and one angle block per vertex.
/// The vector type of the linear system the driver solves each iteration.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VertexBlocks {
    /// Position block, one entry per vertex.
    pub positions: Vec<V3>,
    /// Angle block, one entry per vertex.
    pub angles: Vec<V3>,
}

impl VertexBlocks {
    /// All zeroes, for `n` vertices.
    pub fn zeros(n: usize) -> Self {
        Self {
            positions: vec![V3::ZERO; n],
            angles: vec![V3::ZERO; n],
        }
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// True if there are no vertices.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Inner product over both blocks.
    pub fn dot(&self, rhs: &Self) -> f64 {
        let positions: f64 = self
            .positions
            .par_iter()
            .zip(rhs.positions.par_iter())
            .map(|(a, b)| a.dot(b))
            .sum();
        let angles: f64 = self
            .angles
            .par_iter()
            .zip(rhs.angles.par_iter())
            .map(|(a, b)| a.dot(b))
            .sum();
        positions + angles
    }

    /// `self += alpha * x`
    pub fn axpy(&mut self, alpha: f64, x: &Self) {
        for (lhs, rhs) in self.positions.iter_mut().zip(&x.positions) {
            *lhs += alpha * *rhs;
        }
        for (lhs, rhs) in self.angles.iter_mut().zip(&x.angles) {
            *lhs += alpha * *rhs;
        }
    }

    /// `self = x + beta * self`
    pub fn xpby(&mut self, x: &Self, beta: f64) {
        for (lhs, rhs) in self.positions.iter_mut().zip(&x.positions) {
            *lhs = *rhs + beta * *lhs;
        }
        for (lhs, rhs) in self.angles.iter_mut().zip(&x.angles) {
            *lhs = *rhs + beta * *lhs;
        }
    }

    /// Largest absolute component in either block.
    pub fn inf_norm(&self) -> f64 {
        self.positions
            .iter()
            .chain(&self.angles)
            .map(V3::inf_norm)
            .fold(0.0, libm::fmax)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_round_trip() {
        let t = V3::new(0.5, -1.0, 2.0);
        assert_eq!(target_from_sentinel(target_to_sentinel(Some(t))), Some(t));
        assert_eq!(target_from_sentinel(target_to_sentinel(None)), None);
        // Only the x component is inspected.
        assert_eq!(target_from_sentinel([NO_TARGET, 1.0, 1.0]), None);
    }

    #[test]
    fn state_from_flat_target_buffer() {
        let urshape = vec![V3::ZERO, V3::new(1.0, 0.0, 0.0)];
        let raw = [[0.5, 0.0, 0.0], [NO_TARGET, 0.0, 0.0]];
        let state = SolverState::from_sentinel_targets(urshape, &raw).unwrap();
        assert_eq!(state.targets(), &[Some(V3::new(0.5, 0.0, 0.0)), None]);

        // No edges, so all energy comes from fitting.
        let graph = crate::MeshGraph::from_edges(2, &[]).unwrap();
        let weights = Weights::default();
        assert_eq!(crate::eval_energy(0, &graph, &state, &weights), 0.25);
        assert_eq!(crate::eval_energy(1, &graph, &state, &weights), 0.0);
    }

    #[test]
    fn new_state_starts_at_rest() {
        let urshape = vec![V3::new(1.0, 2.0, 3.0), V3::ZERO];
        let state = SolverState::new(urshape.clone(), vec![None, Some(V3::ONE)]).unwrap();
        assert_eq!(state.positions, urshape);
        assert_eq!(state.angles, vec![V3::ZERO; 2]);
        assert_eq!(state.precond_positions, vec![V3::ONE; 2]);
        assert_eq!(state.len(), 2);
    }

    #[test]
    fn mismatched_targets() {
        let err = SolverState::new(vec![V3::ZERO], vec![]).unwrap_err();
        assert_eq!(
            err,
            StateError::WrongNumberTargets {
                vertices: 1,
                targets: 0
            }
        );
    }

    #[test]
    fn block_arithmetic() {
        let mut a = VertexBlocks {
            positions: vec![V3::new(1.0, 0.0, 0.0)],
            angles: vec![V3::new(0.0, 2.0, 0.0)],
        };
        let b = VertexBlocks {
            positions: vec![V3::new(3.0, 0.0, 0.0)],
            angles: vec![V3::new(0.0, -1.0, 0.0)],
        };
        assert_eq!(a.dot(&b), 1.0);
        a.axpy(2.0, &b);
        assert_eq!(a.positions[0], V3::new(7.0, 0.0, 0.0));
        assert_eq!(a.angles[0], V3::ZERO);
        a.xpby(&b, 0.5);
        assert_eq!(a.positions[0], V3::new(6.5, 0.0, 0.0));
        assert_eq!(a.inf_norm(), 6.5);
    }

    #[test]
    fn weights_must_be_non_negative() {
        assert!(matches!(
            Weights::new(-1.0, 0.0),
            Err(StateError::InvalidWeights { .. })
        ));
        assert!(matches!(
            Weights::new(1.0, f64::NAN),
            Err(StateError::InvalidWeights { .. })
        ));
        assert_eq!(Weights::new(0.0, 0.0).map(|w| w.fitting()), Ok(0.0));
    }
}
