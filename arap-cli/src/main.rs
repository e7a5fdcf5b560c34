use std::{
    hint::black_box,
    io::{self, Read},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use anyhow::{Context, Result};
use arap_kernels::{
    Config, HessianAnalysis,
    textual::{Outcome, Problem, SolvedVertex, System},
};
use clap::Parser;
use tracing::Level;

const NUM_ITERS_BENCHMARK: u32 = 100;

#[derive(Parser)]
#[command(name = "arap", version, about, long_about = None)]
struct Cli {
    /// Path to the problem file.
    /// Use '-' for stdin.
    #[arg(short = 'f', long)]
    filepath: PathBuf,

    /// Show the final position and rotation of each vertex.
    #[arg(long = "show-points")]
    show_points: bool,

    /// Rank-analyse the Gauss-Newton Hessian at the solution,
    /// and report which vertices are free to move.
    #[arg(long)]
    analysis: bool,

    /// Maximum number of Gauss-Newton iterations.
    #[arg(long, default_value_t = Config::default().max_nonlinear_iterations)]
    max_iterations: usize,

    /// Maximum number of PCG iterations per Gauss-Newton iteration.
    #[arg(long, default_value_t = Config::default().max_linear_iterations)]
    max_linear_iterations: usize,

    /// Log solver progress. Repeat for more detail.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn config(&self) -> Config {
        Config::default()
            .with_max_nonlinear_iterations(self.max_iterations)
            .with_max_linear_iterations(self.max_linear_iterations)
    }

    fn log_level(&self) -> Level {
        match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}

struct RunResult {
    outcome: Outcome,
    analysis: Option<(HessianAnalysis, Vec<String>)>,
    duration: Duration,
}

fn main() {
    let cli = Cli::parse();
    init_logger(cli.log_level());
    let soln = match main_inner(&cli) {
        Ok(soln) => soln,
        Err(e) => {
            print_failure_output(&e);
            std::process::exit(1);
        }
    };
    print_output(&soln, cli.show_points);
}

/// Logs go to stderr, so they never interleave with the results on stdout.
/// `RUST_LOG` overrides the level picked by `-v`.
fn init_logger(default_level: Level) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main_inner(cli: &Cli) -> Result<RunResult> {
    let problem_txt = read_problem(cli)?;
    let parsed = Problem::from_str(&problem_txt)?;
    let config = cli.config();

    // Ensure problem can be solved
    let now = std::time::Instant::now();
    let mut system = parsed.to_system()?;
    let pristine = system.clone();
    let outcome = system.solve(config)?;

    // It succeeded. Benchmark its perf
    for _ in 0..NUM_ITERS_BENCHMARK {
        let mut again = pristine.clone();
        black_box(again.solve(config))?;
    }
    let elapsed = now.elapsed();
    let duration = elapsed / NUM_ITERS_BENCHMARK;

    let analysis = if cli.analysis {
        Some(analyze(&system)?)
    } else {
        None
    };
    Ok(RunResult {
        outcome,
        analysis,
        duration,
    })
}

fn analyze(system: &System) -> Result<(HessianAnalysis, Vec<String>)> {
    let analysis = system
        .analyze()
        .context("Could not analyse the Hessian")?;
    let labels = system
        .underconstrained_labels(&analysis)
        .into_iter()
        .map(ToString::to_string)
        .collect();
    Ok((analysis, labels))
}

/// Prints the output nicely to stdout.
fn print_output(soln: &RunResult, show_points: bool) {
    let RunResult {
        outcome,
        analysis,
        duration,
    } = soln;
    print_problem_size(outcome.vertices.len(), outcome.edges.len());
    print_convergence(outcome);
    print_performance(*duration);
    if let Some((analysis, labels)) = analysis {
        print_analysis(analysis, labels);
    }
    if show_points {
        println!("Vertices:");
        for (label, SolvedVertex { position, angles }) in &outcome.vertices {
            let (x, y, z) = (position.x, position.y, position.z);
            let (a, b, c) = (angles.x, angles.y, angles.z);
            println!("\t{label}: ({x:.2}, {y:.2}, {z:.2}), angles = ({a:.3}, {b:.3}, {c:.3})");
        }
    }
}

fn print_problem_size(num_vertices: usize, num_edges: usize) {
    let num_unknowns = 6 * num_vertices;
    println!("Problem size: {num_vertices} vertices, {num_edges} edges, {num_unknowns} unknowns");
}

fn print_convergence(outcome: &Outcome) {
    use colored::Colorize;
    let o = &outcome.outcome;
    let iterations = o.iterations();
    let linear_iterations = o.linear_iterations();
    if o.converged() {
        println!("Iterations needed: {iterations} ({linear_iterations} PCG iterations)");
    } else {
        let msg = format!("Did not converge after {iterations} iterations");
        println!("{} ({linear_iterations} PCG iterations)", msg.yellow());
    }
    let initial = o.initial_energy();
    let fin = o.final_energy();
    println!("Energy: {initial:.6} -> {fin:.6}");
}

fn print_performance(duration: Duration) {
    use colored::Colorize;
    let time = format!("{}μs", duration.as_micros());
    println!("Solved in {time} (mean over {NUM_ITERS_BENCHMARK} iterations)");
    let micros = duration.as_micros().max(1);
    let solves_per_second = Duration::from_secs(1).as_micros() / micros;
    let solves_per_second = if solves_per_second <= 60 {
        solves_per_second.to_string().red()
    } else {
        solves_per_second.to_string().normal()
    };
    println!("i.e. {solves_per_second} solves per second");
}

fn print_analysis(analysis: &HessianAnalysis, labels: &[String]) {
    use colored::Colorize;
    let HessianAnalysis {
        rank,
        degrees_of_freedom,
        ..
    } = analysis;
    print!("Hessian rank {rank}, ");
    if analysis.is_underconstrained() {
        println!("{}", format!("{degrees_of_freedom} degrees of freedom").yellow());
        println!("Underconstrained vertices: {}", labels.join(", "));
    } else {
        println!("fully constrained");
    }
}

fn print_failure_output(error: &anyhow::Error) {
    use colored::Colorize;
    eprintln!("{}: {:#}", "Could not solve problem".red(), error);
}

/// Read the problem text from a file or stdin, depending on user args.
/// They pass a filename, or '-' for stdin, as the first CLI arg.
fn read_problem(cli: &Cli) -> Result<String> {
    // Read from file
    if cli.filepath != PathBuf::from("-") {
        return std::fs::read_to_string(&cli.filepath)
            .with_context(|| format!("Could not read {}", cli.filepath.display()));
    }

    // Read from stdin
    let mut problem_txt = String::with_capacity(100);
    let mut stdin = io::stdin();
    stdin
        .read_to_string(&mut problem_txt)
        .context("Could not read problem from stdin")?;
    Ok(problem_txt)
}
