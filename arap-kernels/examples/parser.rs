//! Parse the textual problem format, which describes a mesh and its targets,
//! then deform that mesh.
use arap_kernels::{Config, V3, textual::Problem};
use std::str::FromStr;

const EPSILON: f64 = 1e-5;

fn main() {
    let file = "\
# mesh
vertex o (0, 0, 0)
vertex x (1, 0, 0)
vertex y (0, 1, 0)
vertex z (0, 0, 1)
face o x y
face o y z
face o z x
face x y z

# targets
o -> (2, 0, 0)
x -> (3, 0, 0)
y -> (2, 1, 0)
z -> (2, 0, 1)
";
    let problem = Problem::from_str(file).unwrap();
    let solution = problem.solve(Config::default()).unwrap();

    // Every target is reachable by translating the tetrahedron, so it gets there without deforming.
    assert!(solution.outcome.converged());
    assert_points_eq(solution.get_vertex("o").unwrap().position, V3::new(2.0, 0.0, 0.0));
    assert_points_eq(solution.get_vertex("z").unwrap().position, V3::new(2.0, 0.0, 1.0));
    println!("final energy: {}", solution.outcome.final_energy());
}

fn assert_points_eq(l: V3, r: V3) {
    assert!((l.x - r.x).abs() < EPSILON, "{l} != {r}");
    assert!((l.y - r.y).abs() < EPSILON, "{l} != {r}");
    assert!((l.z - r.z).abs() < EPSILON, "{l} != {r}");
}
