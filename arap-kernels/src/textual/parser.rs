use super::{
    Label, Problem, VertexTarget,
    instruction::{DeclareVertex, Edge, Face, Instruction},
};
use crate::V3;
use winnow::{
    Result as WResult,
    ascii::{alphanumeric1, digit1, line_ending, multispace0, space0, space1},
    combinator::{alt, delimited, eof, opt, separated},
    prelude::*,
};

impl Problem {
    pub fn parse(i: &mut &str) -> WResult<Self> {
        ignore_blank_lines(i);
        let (fitting, regularizer) = if opt(weights_header).parse_next(i)?.is_some() {
            line_break.parse_next(i)?;
            let fitting = weight(i, "fitting")?;
            line_break.parse_next(i)?;
            let regularizer = weight(i, "regularizer")?;
            line_break.parse_next(i)?;
            (fitting, regularizer)
        } else {
            (1.0, 1.0)
        };
        mesh_header.parse_next(i)?;
        line_break.parse_next(i)?;
        let instructions: Vec<_> = separated(1.., Instruction::parse, line_break).parse_next(i)?;
        let mut inner_vertices = Vec::new();
        for instr in &instructions {
            if let Instruction::DeclareVertex(dv) = instr {
                inner_vertices.push(dv.label.clone());
            }
        }
        ignore_blank_lines(i);
        let targets = if opt(targets_header).parse_next(i)?.is_some() {
            opt(line_break).parse_next(i)?;
            separated(0.., VertexTarget::parse, line_break).parse_next(i)?
        } else {
            Vec::new()
        };
        end_of_problem.parse_next(i)?;
        Ok(Self {
            fitting,
            regularizer,
            instructions,
            inner_vertices,
            targets,
        })
    }
}

impl VertexTarget {
    // a -> (0, 0, 1)
    pub fn parse(i: &mut &str) -> WResult<Self> {
        (ws, Label::parse, ws, "->", ws, parse_point)
            .map(|(_, vertex, _, _arrow, _, target)| Self { vertex, target })
            .parse_next(i)
    }
}

fn weights_header(i: &mut &str) -> WResult<()> {
    ('#', ws, "weights").map(|_| ()).parse_next(i)
}
fn mesh_header(i: &mut &str) -> WResult<()> {
    ('#', ws, "mesh").map(|_| ()).parse_next(i)
}
fn targets_header(i: &mut &str) -> WResult<()> {
    ('#', ws, "targets").map(|_| ()).parse_next(i)
}

// fitting = 10
fn weight(i: &mut &str, name: &'static str) -> WResult<f64> {
    ignore_ws(i);
    (name, delimited(space0, '=', space0), parse_number)
        .map(|(_name, _equals, value)| value)
        .parse_next(i)
}

impl DeclareVertex {
    pub fn parse(i: &mut &str) -> WResult<Self> {
        ("vertex", space1, Label::parse, space0, parse_point)
            .map(|(_, _, label, _, rest)| Self { label, rest })
            .parse_next(i)
    }
}

impl Edge {
    pub fn parse(i: &mut &str) -> WResult<Self> {
        ("edge", space1, Label::parse, space1, Label::parse)
            .map(|(_, _, a, _, b)| Self { endpoints: (a, b) })
            .parse_next(i)
    }
}

impl Face {
    pub fn parse(i: &mut &str) -> WResult<Self> {
        (
            "face",
            space1,
            Label::parse,
            space1,
            Label::parse,
            space1,
            Label::parse,
        )
            .map(|(_, _, a, _, b, _, c)| Self { corners: (a, b, c) })
            .parse_next(i)
    }
}

impl Instruction {
    fn parse(i: &mut &str) -> WResult<Self> {
        ignore_ws(i);
        alt((
            DeclareVertex::parse.map(Instruction::DeclareVertex),
            Edge::parse.map(Instruction::Edge),
            Face::parse.map(Instruction::Face),
        ))
        .parse_next(i)
    }
}

fn ws(i: &mut &str) -> WResult<()> {
    space0.parse_next(i).map(|_| ())
}

fn ignore_ws(i: &mut &str) {
    let _ = ws.parse_next(i);
}

fn ignore_blank_lines(i: &mut &str) {
    let _: WResult<&str> = multispace0.parse_next(i);
}

fn end_of_problem(i: &mut &str) -> WResult<()> {
    (multispace0, eof).map(|_| ()).parse_next(i)
}

/// End of one line, plus any blank lines after it.
fn line_break(i: &mut &str) -> WResult<()> {
    (space0, line_ending, multispace0).map(|_| ()).parse_next(i)
}

impl Label {
    fn parse(i: &mut &str) -> WResult<Label> {
        alphanumeric1
            .map(|s: &str| Label(s.to_owned()))
            .parse_next(i)
    }
}

// (1, -2.5, 3)
fn parse_point(i: &mut &str) -> WResult<V3> {
    let comma = || delimited(space0, ',', space0);
    delimited(
        ('(', space0),
        (parse_number, comma(), parse_number, comma(), parse_number),
        (space0, ')'),
    )
    .map(|(x, _, y, _, z)| V3::new(x, y, z))
    .parse_next(i)
}

fn parse_number(i: &mut &str) -> WResult<f64> {
    fn myint(input: &mut &str) -> WResult<f64> {
        digit1
            .verify_map(|s: &str| s.parse::<f64>().ok())
            .parse_next(input)
    }

    fn myfloat(i: &mut &str) -> WResult<f64> {
        winnow::ascii::float.parse_next(i)
    }
    alt((myfloat, myint)).parse_next(i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_vertex() {
        let dv = DeclareVertex::parse(&mut "vertex a (1, -2.5, 3)").unwrap();
        assert_eq!(dv.label, "a");
        assert_eq!(dv.rest, V3::new(1.0, -2.5, 3.0));
    }

    #[test]
    fn parse_edge_and_face() {
        let e = Edge::parse(&mut "edge a b").unwrap();
        assert_eq!(e.endpoints, (Label::from("a"), Label::from("b")));
        let f = Face::parse(&mut "face p q r").unwrap();
        let edges = f.edges();
        assert_eq!(edges[2].0, &Label::from("r"));
        assert_eq!(edges[2].1, &Label::from("p"));
    }

    #[test]
    fn parse_target() {
        let t = VertexTarget::parse(&mut "  tip -> (0,0, 2)").unwrap();
        assert_eq!(t.vertex, "tip");
        assert_eq!(t.target, V3::new(0.0, 0.0, 2.0));
    }

    #[test]
    fn parse_whole_problem() {
        let problem = Problem::parse(
            &mut "\
# weights
fitting = 2.5
regularizer = 0.5

# mesh
vertex a (0, 0, 0)
vertex b (1, 0, 0)
vertex c (0, 1, 0)
face a b c

# targets
c -> (0, 1, 1)
",
        )
        .unwrap();
        assert_eq!(problem.fitting, 2.5);
        assert_eq!(problem.regularizer, 0.5);
        assert_eq!(problem.instructions.len(), 4);
        assert_eq!(problem.vertices(), &["a", "b", "c"]);
        assert_eq!(
            problem.targets,
            vec![VertexTarget {
                vertex: Label::from("c"),
                target: V3::new(0.0, 1.0, 1.0),
            }]
        );
    }

    #[test]
    fn targets_are_optional() {
        let problem = Problem::parse(&mut "# mesh\nvertex a (0, 0, 0)\n\n# targets\n").unwrap();
        assert!(problem.targets.is_empty());
        let problem = Problem::parse(&mut "# mesh\nvertex a (0, 0, 0)").unwrap();
        assert!(problem.targets.is_empty());
    }

    #[test]
    fn rejects_unknown_instruction() {
        let result = Problem::parse(&mut "# mesh\nvertex a (0, 0, 0)\nspline a b\n");
        assert!(matches!(result, Err(_)));
    }
}
