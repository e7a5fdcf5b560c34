use faer::linalg::svd::SvdError;

use crate::VertexId;

/// Errors from building or validating a [`crate::MeshGraph`].
#[derive(thiserror::Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum GraphError {
    /// Offsets must have one entry per vertex, plus one.
    #[error("Neighbour offsets must not be empty, they need N+1 entries for N vertices")]
    MissingOffsets,
    /// The first offset must be 0.
    #[error("The first neighbour offset must be 0, but it was {0}")]
    NonZeroFirstOffset(usize),
    /// Offsets must never decrease.
    #[error("Neighbour offsets must be non-decreasing, but vertex {vertex} starts at {start} and ends at {end}")]
    DecreasingOffsets {
        /// Which vertex had the bad range.
        vertex: usize,
        /// Start of its range.
        start: usize,
        /// End of its range.
        end: usize,
    },
    /// The last offset must equal the number of neighbour entries.
    #[error("The last neighbour offset is {last} but there are {len} neighbour entries")]
    OffsetsDoNotCoverNeighbours {
        /// The final offset.
        last: usize,
        /// The length of the flattened neighbour list.
        len: usize,
    },
    /// A neighbour index pointed outside the mesh.
    #[error("Vertex {vertex} refers to neighbour {neighbour}, but the mesh only has {num_vertices} vertices")]
    VertexOutOfRange {
        /// The vertex whose neighbour list is wrong.
        vertex: usize,
        /// The out-of-range neighbour.
        neighbour: VertexId,
        /// Mesh size.
        num_vertices: usize,
    },
}

/// Errors from building a [`crate::SolverState`].
#[derive(thiserror::Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum StateError {
    /// Every vertex needs exactly one (possibly absent) target.
    #[error("There are {vertices} rest positions but {targets} targets")]
    WrongNumberTargets {
        /// Number of rest-shape positions.
        vertices: usize,
        /// Number of targets given.
        targets: usize,
    },
    /// Weights must be finite and non-negative.
    #[error("Energy weights must be finite and non-negative, got fitting={fitting} regularizer={regularizer}")]
    InvalidWeights {
        /// Weight of the fitting term.
        fitting: f64,
        /// Weight of the regularization term.
        regularizer: f64,
    },
}

/// Errors from [`crate::MeshBuilder::build`].
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum BuildError {
    /// A target was set on a vertex that was never added.
    #[error("Vertex {0} was given a target but never added to the mesh")]
    UnknownVertex(VertexId),
    /// The edges were malformed.
    #[error(transparent)]
    Graph(#[from] GraphError),
    /// The per-vertex buffers were malformed.
    #[error(transparent)]
    State(#[from] StateError),
}

/// Errors from the Gauss-Newton driver.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum SolveError {
    /// You provided an empty mesh.
    #[error("Cannot solve an empty mesh")]
    EmptyMesh,
    /// The graph and the state describe meshes of different sizes.
    #[error("The mesh graph has {graph} vertices but the solver state has {state}")]
    SizeMismatch {
        /// Vertices in the graph.
        graph: usize,
        /// Vertices in the state.
        state: usize,
    },
    /// The energy became NaN or infinite, usually because the inputs weren't finite.
    #[error("Energy became non-finite ({energy}) at iteration {iteration}")]
    NonFiniteEnergy {
        /// Which outer iteration.
        iteration: usize,
        /// The offending energy.
        energy: f64,
    },
}

/// Errors from analysing the dense Gauss-Newton Hessian.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum AnalysisError {
    /// Nothing to analyse.
    #[error("Cannot analyse an empty mesh")]
    EmptyMesh,
    /// Faer: could not decompose the Hessian.
    #[error("Something went wrong doing SVD in faer")]
    FaerSvd(SvdError),
}

/// Errors from parsing and executing the textual problem representation.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum TextualError {
    /// The text couldn't be parsed.
    #[error("Could not parse problem: {0}")]
    Parse(String),
    /// You referred to a vertex that was never defined.
    #[error("You referred to the vertex {label} but it was never defined")]
    UndefinedVertex {
        /// The undefined vertex.
        label: String,
    },
    /// The same vertex label was declared twice.
    #[error("The vertex {label} was defined more than once")]
    DuplicateVertex {
        /// The repeated label.
        label: String,
    },
    /// Problem had bad weights.
    #[error(transparent)]
    State(#[from] StateError),
    /// Problem described a malformed mesh.
    #[error(transparent)]
    Build(#[from] BuildError),
    /// Solving failed.
    #[error(transparent)]
    Solve(#[from] SolveError),
}
