use indexmap::IndexMap;

use crate::{
    AnalysisError, Config, HessianAnalysis, MeshBuilder, MeshGraph, SolveOutcome,
    SolverState, TextualError, V3, VertexId, Weights, hessian_analysis,
};

use super::{Instruction, Label, Problem};

impl Problem {
    /// Check the weights, resolve every label, and build the mesh.
    pub fn to_system(&self) -> Result<System, TextualError> {
        let weights = Weights::new(self.fitting, self.regularizer)?;

        // Vertices first, so edges and targets can refer to vertices declared after them.
        let mut builder = MeshBuilder::default();
        let mut ids: IndexMap<&str, VertexId> = IndexMap::with_capacity(self.inner_vertices.len());
        for instr in &self.instructions {
            if let Instruction::DeclareVertex(dv) = instr {
                if ids.contains_key(dv.label.0.as_str()) {
                    return Err(TextualError::DuplicateVertex {
                        label: dv.label.0.clone(),
                    });
                }
                let id = builder.add_vertex(dv.rest);
                ids.insert(&dv.label.0, id);
            }
        }
        let lookup = |label: &Label| {
            ids.get(label.0.as_str())
                .copied()
                .ok_or_else(|| TextualError::UndefinedVertex {
                    label: label.0.clone(),
                })
        };

        for instr in &self.instructions {
            match instr {
                Instruction::DeclareVertex(_) => {}
                Instruction::Edge(e) => {
                    builder.add_edge(lookup(&e.endpoints.0)?, lookup(&e.endpoints.1)?);
                }
                Instruction::Face(f) => {
                    for (a, b) in f.edges() {
                        builder.add_edge(lookup(a)?, lookup(b)?);
                    }
                }
            }
        }
        for target in &self.targets {
            builder.set_target(lookup(&target.vertex)?, target.target);
        }

        let (graph, state) = builder.build()?;
        Ok(System {
            labels: self.inner_vertices.clone(),
            graph,
            state,
            weights,
        })
    }

    /// Build the mesh and deform it.
    pub fn solve(&self, config: Config) -> Result<Outcome, TextualError> {
        self.to_system()?.solve(config)
    }
}

/// A problem with every label resolved to a vertex ID.
#[derive(Clone, Debug)]
pub struct System {
    /// Vertex labels, indexed by vertex ID.
    pub labels: Vec<Label>,
    pub graph: MeshGraph,
    pub state: SolverState,
    pub weights: Weights,
}

impl System {
    /// Run the Gauss-Newton driver from the rest shape.
    /// The system keeps the deformed state afterwards.
    pub fn solve(&mut self, config: Config) -> Result<Outcome, TextualError> {
        let outcome = crate::solve(&self.graph, &mut self.state, &self.weights, config)?;
        Ok(self.outcome(outcome))
    }

    /// Rank-analyse the Gauss-Newton Hessian at the current state.
    pub fn analyze(&self) -> Result<HessianAnalysis, AnalysisError> {
        hessian_analysis(&self.graph, &self.state, &self.weights)
    }

    /// Label of each underconstrained vertex in `analysis`.
    pub fn underconstrained_labels<'a>(&'a self, analysis: &HessianAnalysis) -> Vec<&'a Label> {
        analysis
            .underconstrained
            .iter()
            .map(|&id| &self.labels[id as usize])
            .collect()
    }

    fn outcome(&self, outcome: SolveOutcome) -> Outcome {
        let mut vertices = IndexMap::with_capacity(self.labels.len());
        for (i, label) in self.labels.iter().enumerate() {
            vertices.insert(
                label.0.clone(),
                SolvedVertex {
                    position: self.state.positions[i],
                    angles: self.state.angles[i],
                },
            );
        }
        let mut edges = Vec::with_capacity(self.graph.num_neighbour_entries() / 2);
        for (i, label) in self.labels.iter().enumerate() {
            for &j in self.graph.neighbours(i) {
                // Each undirected edge is stored from both ends. Report it once.
                if i < j as usize {
                    edges.push((label.clone(), self.labels[j as usize].clone()));
                }
            }
        }
        Outcome {
            vertices,
            edges,
            outcome,
        }
    }
}

/// Where a vertex ended up.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SolvedVertex {
    pub position: V3,
    /// Rotation angles (about X, Y, then Z) of the vertex's local frame.
    pub angles: V3,
}

#[derive(Debug)]
pub struct Outcome {
    pub vertices: IndexMap<String, SolvedVertex>,
    pub edges: Vec<(Label, Label)>,
    pub outcome: SolveOutcome,
}

impl Outcome {
    pub fn get_vertex(&self, label: &str) -> Option<&SolvedVertex> {
        self.vertices.get(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn system(txt: &str) -> Result<System, TextualError> {
        let problem: Problem = txt.parse().unwrap();
        problem.to_system()
    }

    #[test]
    fn undefined_vertex() {
        let err = system("# mesh\nvertex a (0, 0, 0)\nedge a b\n").unwrap_err();
        assert!(matches!(err, TextualError::UndefinedVertex { label } if label == "b"));

        let err = system("# mesh\nvertex a (0, 0, 0)\n# targets\nz -> (1, 1, 1)\n").unwrap_err();
        assert!(matches!(err, TextualError::UndefinedVertex { label } if label == "z"));
    }

    #[test]
    fn duplicate_vertex() {
        let err = system("# mesh\nvertex a (0, 0, 0)\nvertex a (1, 0, 0)\n").unwrap_err();
        assert!(matches!(err, TextualError::DuplicateVertex { label } if label == "a"));
    }

    #[test]
    fn negative_weight() {
        let err = system("# weights\nfitting = -1\nregularizer = 1\n# mesh\nvertex a (0, 0, 0)\n")
            .unwrap_err();
        assert!(matches!(err, TextualError::State(_)));
    }

    #[test]
    fn edges_may_precede_their_vertices() {
        let system = system("# mesh\nedge a b\nvertex a (0, 0, 0)\nvertex b (1, 0, 0)\n").unwrap();
        assert_eq!(system.graph.neighbours(0), &[1]);
        assert_eq!(system.graph.neighbours(1), &[0]);
    }

    #[test]
    fn face_adds_three_edges() {
        let mut system = system(
            "# mesh\nvertex a (0, 0, 0)\nvertex b (1, 0, 0)\nvertex c (0, 1, 0)\nface a b c\n",
        )
        .unwrap();
        assert_eq!(system.graph.num_neighbour_entries(), 6);
        let outcome = system.solve(Config::default()).unwrap();
        assert_eq!(outcome.edges.len(), 3);
        assert_eq!(outcome.vertices.len(), 3);
        // No targets, and it starts at rest: nothing should move.
        assert_eq!(outcome.get_vertex("c").unwrap().position, V3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn underconstrained_labels() {
        let system = system(
            "# mesh\nvertex a (0, 0, 0)\nvertex b (1, 0, 0)\nvertex loose (5, 5, 5)\nedge a b\n# targets\na -> (0, 0, 0)\nb -> (1, 0, 0)\n",
        )
        .unwrap();
        let analysis = system.analyze().unwrap();
        assert!(analysis.is_underconstrained());
        let labels = system.underconstrained_labels(&analysis);
        // The bar's own axis can't be seen by either end, and "loose" isn't attached to anything.
        assert!(labels.contains(&&Label::from("loose")));
        assert!(labels.contains(&&Label::from("a")));
    }
}
