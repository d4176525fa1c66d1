//! dtsmesh CLI - membrane mesh inspection tool.
//!
//! Usage: dtsmesh <COMMAND> [OPTIONS] <INPUT>
//!
//! Run `dtsmesh --help` for available commands.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand};

use dtsmesh::algo::curvature::{BoxBoundary, CurvatureOptions};
use dtsmesh::algo::progress::Progress;
use dtsmesh::surface::SurfaceMesh;

#[derive(Parser)]
#[command(name = "dtsmesh")]
#[command(author, version, about = "Membrane mesh topology and curvature CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display mesh information and curvature statistics
    Info {
        /// Input topology file (.tsi, .q or .ply)
        input: PathBuf,

        /// Use minimum-image edge vectors in the simulation box
        #[arg(long)]
        periodic: bool,

        /// Use single-threaded execution (for benchmarking)
        #[arg(long)]
        sequential: bool,
    },

    /// Write per-vertex normals, areas and principal curvatures
    Export {
        /// Input topology file (.tsi, .q or .ply)
        input: PathBuf,

        /// Output file (default: standard output)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Use minimum-image edge vectors in the simulation box
        #[arg(long)]
        periodic: bool,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Info {
            input,
            periodic,
            sequential,
        } => {
            let options = curvature_options(periodic).with_parallel(!sequential);
            cmd_info(&input, options)?;
        }

        Commands::Export {
            input,
            output,
            periodic,
        } => {
            cmd_export(&input, output.as_deref(), curvature_options(periodic))?;
        }
    }

    Ok(())
}

fn curvature_options(periodic: bool) -> CurvatureOptions {
    let boundary = if periodic {
        BoxBoundary::Periodic
    } else {
        BoxBoundary::Open
    };
    CurvatureOptions::default().with_boundary(boundary)
}

/// Create a progress reporter that displays a progress bar on the terminal.
fn create_progress() -> Progress {
    let max_percent = Arc::new(AtomicUsize::new(0)); // Track highest percent seen (monotonic)

    Progress::new(move |current, total, message| {
        if total == 0 {
            return;
        }

        let raw_percent = if current >= total {
            100
        } else {
            ((current * 100) + (total / 2)) / total
        };

        let percent = max_percent.fetch_max(raw_percent, Ordering::Relaxed).max(raw_percent);

        let bar_width = 30;
        let filled = (percent * bar_width) / 100;
        let bar = "=".repeat(filled);
        let space = " ".repeat(bar_width - filled);

        // Use carriage return to overwrite the line
        eprint!("\r[{}{}] {:3}% {:<24}", bar, space, percent, message);
        let _ = io::stderr().flush();

        if current >= total {
            eprintln!();
        }
    })
}

fn cmd_info(input: &Path, options: CurvatureOptions) -> Result<(), Box<dyn std::error::Error>> {
    let mode = if options.parallel { "parallel" } else { "sequential" };

    let progress = create_progress();
    let start = Instant::now();
    let surface = SurfaceMesh::load_with_progress(input, options, &progress)?;
    let elapsed = start.elapsed();
    let mesh = surface.mesh();

    println!("File: {}", input.display());
    println!(
        "Vertices: {} ({} active)",
        mesh.num_vertices(),
        mesh.active_vertices().len()
    );
    println!(
        "Triangles: {} ({} active)",
        mesh.num_triangles(),
        mesh.active_triangles().len()
    );
    println!(
        "Links: {} ({} interior pairs, {} boundary)",
        mesh.num_links(),
        mesh.right_links().len(),
        mesh.edge_links().len()
    );
    let simbox = mesh.simbox();
    println!("Box: {:.3} x {:.3} x {:.3}", simbox.x, simbox.y, simbox.z);

    if let Some((min, max)) = mesh.bounding_box() {
        println!(
            "Bounding box: ({:.3}, {:.3}, {:.3}) to ({:.3}, {:.3}, {:.3})",
            min.x, min.y, min.z, max.x, max.y, max.z
        );
    }

    if mesh.edge_vertices().is_empty() {
        println!("Topology: Closed (no boundary)");
    } else {
        println!(
            "Topology: Open ({} edge vertices, {} surface vertices)",
            mesh.edge_vertices().len(),
            mesh.surface_vertices().len()
        );
    }
    println!("Inclusions: {}", surface.inclusions().len());

    let areas = surface.vertex_areas();
    let mean = surface.mean_curvatures();
    let gaussian = surface.gaussian_curvatures();

    println!("\nCurvature ({}, {:.2?}):", mode, elapsed);
    println!("  Surface area: {:.6}", areas.sum());
    if !mean.is_empty() {
        println!(
            "  Mean:     min={:.4}, max={:.4}, avg={:.4}",
            mean.min(),
            mean.max(),
            mean.mean()
        );
        println!(
            "  Gaussian: min={:.4}, max={:.4}, avg={:.4}",
            gaussian.min(),
            gaussian.max(),
            gaussian.mean()
        );
        let integrated: f64 = gaussian.iter().zip(areas.iter()).map(|(k, a)| k * a).sum();
        println!("  Integrated Gaussian / 2pi: {:.3}", integrated / (2.0 * std::f64::consts::PI));
    }

    let degenerate = surface.degenerate_vertices();
    if !degenerate.is_empty() {
        println!("  Degenerate vertices: {}", degenerate.len());
    }

    Ok(())
}

fn cmd_export(
    input: &Path,
    output: Option<&Path>,
    options: CurvatureOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let surface = SurfaceMesh::load_with_progress(input, options, &Progress::logging())?;

    let mut writer: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let ids = surface.active_vertex_ids();
    let positions = surface.vertices();
    let normals = surface.vertex_normals();
    let areas = surface.vertex_areas();
    let curvatures = surface.vertex_curvatures();

    writeln!(writer, "# id x y z nx ny nz area p1 p2")?;
    for (r, id) in ids.iter().enumerate() {
        writeln!(
            writer,
            "{} {:.10} {:.10} {:.10} {:.10} {:.10} {:.10} {:.10} {:.10} {:.10}",
            id,
            positions[(r, 0)],
            positions[(r, 1)],
            positions[(r, 2)],
            normals[(r, 0)],
            normals[(r, 1)],
            normals[(r, 2)],
            areas[r],
            curvatures[(r, 0)],
            curvatures[(r, 1)]
        )?;
    }
    writer.flush()?;

    if let Some(path) = output {
        eprintln!("Saved: {} ({} vertices)", path.display(), ids.len());
    }

    Ok(())
}
