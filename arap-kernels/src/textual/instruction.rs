use crate::V3;

use super::Label;

#[derive(Debug)]
pub enum Instruction {
    DeclareVertex(DeclareVertex),
    Edge(Edge),
    Face(Face),
}

/// `vertex a (x, y, z)`: a vertex and its rest-shape position.
#[derive(Debug)]
pub struct DeclareVertex {
    pub label: Label,
    pub rest: V3,
}

/// `edge a b`
#[derive(Debug)]
pub struct Edge {
    pub endpoints: (Label, Label),
}

/// `face a b c`: shorthand for the three edges of a triangle.
#[derive(Debug)]
pub struct Face {
    pub corners: (Label, Label, Label),
}

impl Face {
    pub fn edges(&self) -> [(&Label, &Label); 3] {
        let (a, b, c) = &self.corners;
        [(a, b), (b, c), (c, a)]
    }
}
