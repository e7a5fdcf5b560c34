mod executor;
mod instruction;
mod parser;

use std::str::FromStr;

pub use executor::{Outcome, SolvedVertex, System};
pub use instruction::{DeclareVertex, Edge, Face, Instruction};
use winnow::Parser;

use crate::{TextualError, V3};

/// `a -> (x, y, z)`: drag vertex `a` towards a point.
#[derive(Debug, PartialEq)]
pub struct VertexTarget {
    pub vertex: Label,
    pub target: V3,
}

/// A parsed problem: weights, mesh, and targets, all referring to vertices by label.
#[derive(Debug)]
pub struct Problem {
    /// Weight of the fitting term. 1 if the problem has no `# weights` section.
    pub fitting: f64,
    /// Weight of the regularization term. 1 if the problem has no `# weights` section.
    pub regularizer: f64,
    pub instructions: Vec<Instruction>,
    pub inner_vertices: Vec<Label>,
    pub targets: Vec<VertexTarget>,
}

impl FromStr for Problem {
    type Err = TextualError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Problem::parse
            .parse(s)
            .map_err(|e| TextualError::Parse(e.to_string()))
    }
}

impl std::fmt::Display for V3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{},{})", self.x, self.y, self.z)
    }
}

#[derive(Debug, Eq, PartialEq, Clone, Hash)]
pub struct Label(String);

impl From<&str> for Label {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl PartialEq<&str> for Label {
    fn eq(&self, other: &&str) -> bool {
        &self.0 == other
    }
}

impl PartialEq<String> for Label {
    fn eq(&self, other: &String) -> bool {
        &self.0 == other
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl Problem {
    /// Every declared vertex, in declaration order.
    pub fn vertices(&self) -> &[Label] {
        &self.inner_vertices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label() {
        let l = Label("x".to_owned());
        assert_eq!(l, "x");
        assert_eq!(l, "x".to_owned());
        let l2 = Label::from("x");
        assert_eq!(l, l2);
        assert_eq!(l.to_string(), "x");
    }

    #[test]
    fn test_point_str() {
        let p = V3::new(1.0, 2.0, -0.5);
        assert_eq!(p.to_string(), "(1,2,-0.5)");
    }

    #[test]
    fn from_str() {
        let problem: Problem = "# mesh\nvertex a (0, 0, 0)\n".parse().unwrap();
        assert_eq!(problem.vertices(), &[Label::from("a")]);
        assert_eq!(problem.fitting, 1.0);
        assert_eq!(problem.regularizer, 1.0);
        assert!(problem.targets.is_empty());

        let err = "# mesh\nvertex a (0, 0)\n".parse::<Problem>().unwrap_err();
        assert!(matches!(&err, TextualError::Parse(msg) if !msg.is_empty()));
        assert!(err.to_string().starts_with("Could not parse problem"));
    }
}
