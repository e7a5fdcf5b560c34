use crate::{BuildError, GraphError, IdGenerator, SolverState, VertexId, vector::V3};

/// Compressed (CSR) neighbour lists for every vertex of a mesh.
///
/// Vertex `i`'s neighbours live at `neighbours[offsets[i]..offsets[i + 1]]`.
/// Each entry adds one regularization residual to vertex `i`'s energy, so an undirected
/// edge should appear in both endpoints' lists.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshGraph {
    offsets: Vec<usize>,
    neighbours: Vec<VertexId>,
}

impl MeshGraph {
    /// Validate and wrap an existing CSR adjacency.
    /// This is the only place indices are checked; kernels trust the graph afterwards.
    pub fn new(offsets: Vec<usize>, neighbours: Vec<VertexId>) -> Result<Self, GraphError> {
        let Some(&first) = offsets.first() else {
            return Err(GraphError::MissingOffsets);
        };
        if first != 0 {
            return Err(GraphError::NonZeroFirstOffset(first));
        }
        for (vertex, window) in offsets.windows(2).enumerate() {
            let (start, end) = (window[0], window[1]);
            if end < start {
                return Err(GraphError::DecreasingOffsets { vertex, start, end });
            }
        }
        let last = offsets[offsets.len() - 1];
        if last != neighbours.len() {
            return Err(GraphError::OffsetsDoNotCoverNeighbours {
                last,
                len: neighbours.len(),
            });
        }
        let graph = Self {
            offsets,
            neighbours,
        };
        let num_vertices = graph.num_vertices();
        for vertex in 0..num_vertices {
            if let Some(&neighbour) = graph
                .neighbours(vertex)
                .iter()
                .find(|&&n| n as usize >= num_vertices)
            {
                return Err(GraphError::VertexOutOfRange {
                    vertex,
                    neighbour,
                    num_vertices,
                });
            }
        }
        Ok(graph)
    }

    /// Build a symmetric graph from undirected edges.
    /// Both endpoints get each other as neighbours. Self-loops and repeated edges are dropped.
    pub fn from_edges(num_vertices: usize, edges: &[(VertexId, VertexId)]) -> Result<Self, GraphError> {
        let mut adjacency: Vec<Vec<VertexId>> = vec![Vec::new(); num_vertices];
        for &(a, b) in edges {
            // Blame the out-of-range endpoint, as seen from the other one.
            for (vertex, neighbour) in [(a, b), (b, a)] {
                if neighbour as usize >= num_vertices {
                    return Err(GraphError::VertexOutOfRange {
                        vertex: vertex as usize,
                        neighbour,
                        num_vertices,
                    });
                }
            }
            if a == b {
                continue;
            }
            for (vertex, neighbour) in [(a, b), (b, a)] {
                let list = &mut adjacency[vertex as usize];
                if !list.contains(&neighbour) {
                    list.push(neighbour);
                }
            }
        }
        let mut offsets = Vec::with_capacity(num_vertices + 1);
        offsets.push(0);
        let mut neighbours = Vec::new();
        for list in adjacency {
            neighbours.extend(list);
            offsets.push(neighbours.len());
        }
        Self::new(offsets, neighbours)
    }

    /// Number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Total number of (directed) neighbour entries.
    #[inline]
    pub fn num_neighbour_entries(&self) -> usize {
        self.neighbours.len()
    }

    /// Neighbours of this vertex.
    #[inline]
    pub fn neighbours(&self, vertex: usize) -> &[VertexId] {
        &self.neighbours[self.offsets[vertex]..self.offsets[vertex + 1]]
    }

    /// The raw CSR offsets (N + 1 entries).
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }
}

/// Incrementally describe a mesh: vertices (with their rest positions), edges and targets.
#[derive(Default)]
pub struct MeshBuilder {
    ids: IdGenerator,
    urshape: Vec<V3>,
    targets: Vec<Option<V3>>,
    edges: Vec<(VertexId, VertexId)>,
    unknown_targets: Vec<VertexId>,
}

impl MeshBuilder {
    /// Add a vertex at this rest position. Returns its ID.
    pub fn add_vertex(&mut self, rest_position: V3) -> VertexId {
        self.urshape.push(rest_position);
        self.targets.push(None);
        self.ids.next_id()
    }

    /// Connect two vertices. The edge contributes to both vertices' regularization terms.
    pub fn add_edge(&mut self, a: VertexId, b: VertexId) -> &mut Self {
        self.edges.push((a, b));
        self
    }

    /// Ask the solver to pull this vertex towards `target`.
    /// Unknown IDs are reported by [`MeshBuilder::build`].
    pub fn set_target(&mut self, vertex: VertexId, target: V3) -> &mut Self {
        if let Some(slot) = self.targets.get_mut(vertex as usize) {
            *slot = Some(target);
        } else {
            self.unknown_targets.push(vertex);
        }
        self
    }

    /// How many vertices were added.
    pub fn num_vertices(&self) -> usize {
        self.ids.len()
    }

    /// Finish the mesh: a symmetric graph, and a state initialised to the rest shape.
    pub fn build(self) -> Result<(MeshGraph, SolverState), BuildError> {
        if let Some(&vertex) = self.unknown_targets.first() {
            return Err(BuildError::UnknownVertex(vertex));
        }
        let graph = MeshGraph::from_edges(self.ids.len(), &self.edges)?;
        let state = SolverState::new(self.urshape, self.targets)?;
        Ok((graph, state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csr_lookup() {
        let graph = MeshGraph::new(vec![0, 2, 3, 3], vec![1, 2, 0]).unwrap();
        assert_eq!(graph.num_vertices(), 3);
        assert_eq!(graph.neighbours(0), &[1, 2]);
        assert_eq!(graph.neighbours(1), &[0]);
        assert!(graph.neighbours(2).is_empty());
    }

    #[test]
    fn rejects_bad_csr() {
        assert_eq!(MeshGraph::new(vec![], vec![]), Err(GraphError::MissingOffsets));
        assert_eq!(
            MeshGraph::new(vec![1, 1], vec![0]),
            Err(GraphError::NonZeroFirstOffset(1))
        );
        assert_eq!(
            MeshGraph::new(vec![0, 2, 1], vec![1, 0]),
            Err(GraphError::DecreasingOffsets {
                vertex: 1,
                start: 2,
                end: 1
            })
        );
        assert_eq!(
            MeshGraph::new(vec![0, 1, 1], vec![1, 0]),
            Err(GraphError::OffsetsDoNotCoverNeighbours { last: 1, len: 2 })
        );
        assert_eq!(
            MeshGraph::new(vec![0, 1, 1], vec![7]),
            Err(GraphError::VertexOutOfRange {
                vertex: 0,
                neighbour: 7,
                num_vertices: 2
            })
        );
    }

    #[test]
    fn edges_are_symmetric_and_deduplicated() {
        let graph = MeshGraph::from_edges(3, &[(0, 1), (1, 0), (1, 2), (2, 2)]).unwrap();
        assert_eq!(graph.neighbours(0), &[1]);
        assert_eq!(graph.neighbours(1), &[0, 2]);
        assert_eq!(graph.neighbours(2), &[1]);
        assert_eq!(graph.num_neighbour_entries(), 4);
    }

    #[test]
    fn edges_must_reference_known_vertices() {
        assert_eq!(
            MeshGraph::from_edges(2, &[(0, 2)]),
            Err(GraphError::VertexOutOfRange {
                vertex: 0,
                neighbour: 2,
                num_vertices: 2
            })
        );
        assert_eq!(
            MeshGraph::from_edges(2, &[(3, 1)]),
            Err(GraphError::VertexOutOfRange {
                vertex: 1,
                neighbour: 3,
                num_vertices: 2
            })
        );
    }

    #[test]
    fn builder_reports_unknown_target() {
        let mut builder = MeshBuilder::default();
        let a = builder.add_vertex(V3::ZERO);
        builder.set_target(a, V3::ONE).set_target(5, V3::ONE);
        assert_eq!(builder.build().err(), Some(BuildError::UnknownVertex(5)));
    }
}
