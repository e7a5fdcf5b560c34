//! A basic example for how to deform a mesh with the ARAP solver.
use arap_kernels::{Config, MeshBuilder, V3, Weights, solve};

fn main() {
    // Define the rest shape: a unit square split into two triangles.
    let mut mesh = MeshBuilder::default();
    let a = mesh.add_vertex(V3::new(0.0, 0.0, 0.0));
    let b = mesh.add_vertex(V3::new(1.0, 0.0, 0.0));
    let c = mesh.add_vertex(V3::new(1.0, 1.0, 0.0));
    let d = mesh.add_vertex(V3::new(0.0, 1.0, 0.0));
    mesh.add_edge(a, b)
        .add_edge(b, c)
        .add_edge(c, d)
        .add_edge(d, a)
        .add_edge(a, c);

    // Pin one corner, and drag the opposite corner up out of the plane.
    // The other two corners have no target, the solver places them for us.
    mesh.set_target(a, V3::new(0.0, 0.0, 0.0))
        .set_target(c, V3::new(1.0, 1.0, 0.5));

    let (graph, mut state) = mesh.build().expect("the mesh is well-formed");
    let weights = Weights::new(10.0, 1.0).expect("weights are non-negative");

    // Run the solver!
    match solve(&graph, &mut state, &weights, Config::default()) {
        Ok(outcome) => {
            println!(
                "Energy went from {:.4} to {:.4} in {} iterations",
                outcome.initial_energy(),
                outcome.final_energy(),
                outcome.iterations()
            );
            for (name, p) in ["a", "b", "c", "d"].iter().zip(&state.positions) {
                println!("{name} = ({:.3}, {:.3}, {:.3})", p.x, p.y, p.z);
            }
        }
        Err(e) => {
            eprintln!("could not deform this mesh: {e}");
        }
    }
}
