use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use nannou::prelude::*;

use cellmap::terrain::elevation::{DEFAULT_DECREMENT, DEFAULT_JITTER};
use cellmap::util::map_clamp;
use cellmap::{
    generate_terrain, DecayPolicy, HeightCurve, Terrain, TerrainConfig, TerrainSnapshot,
};

/// Water flux at which a downhill chain is drawn as a river.
const RIVER_FLUX: f32 = 20.0;

const SEA_COLOR: (u8, u8, u8) = (0x7d, 0xa8, 0xc4);

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CliDecayPolicy {
    #[value(name = "bfs-multiplicative")]
    BreadthFirstMultiplicative,
    #[value(name = "bfs-subtractive")]
    BreadthFirstSubtractive,
    #[value(name = "recursive-multiplicative")]
    RecursiveMultiplicative,
    #[value(name = "recursive-subtractive")]
    RecursiveSubtractive,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CliHeightCurve {
    Cone,
    Hill,
    Cos,
}

impl From<CliHeightCurve> for HeightCurve {
    fn from(value: CliHeightCurve) -> Self {
        match value {
            CliHeightCurve::Cone => HeightCurve::Cone,
            CliHeightCurve::Hill => HeightCurve::Hill,
            CliHeightCurve::Cos => HeightCurve::Cos,
        }
    }
}

/// Cellmap - elevation and drainage over a relaxed Voronoi cell graph
#[derive(Parser, Debug)]
#[command(name = "cellmap", version, about)]
struct Cli {
    /// Generate once without opening a window
    #[arg(long)]
    headless: bool,

    /// Load the terrain config from a JSON file; other flags override it
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Random seed for generation
    #[arg(long)]
    seed: Option<u64>,

    /// Number of cells
    #[arg(long)]
    points: Option<usize>,

    /// Number of elevation seeds
    #[arg(long)]
    seeds: Option<usize>,

    /// How elevation spreads from the seeds
    #[arg(long, value_enum)]
    policy: Option<CliDecayPolicy>,

    /// Falloff curve for the multiplicative policies (random per seed if omitted)
    #[arg(long, value_enum)]
    curve: Option<CliHeightCurve>,

    /// Height lost per hop for the subtractive policies
    #[arg(long)]
    decrement: Option<f32>,

    /// Skip the square root step
    #[arg(long)]
    no_round: bool,

    /// Skip the neighbor averaging step
    #[arg(long)]
    no_relax: bool,

    /// Skip rescaling the heights into [0, 1]
    #[arg(long)]
    no_normalize: bool,

    /// Export the generated cells to a JSON file (headless only)
    #[arg(long, value_name = "FILE")]
    export: Option<PathBuf>,
}

impl Cli {
    fn terrain_config(&self) -> anyhow::Result<TerrainConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let file = File::open(path)
                    .with_context(|| format!("failed to open config {}", path.display()))?;
                serde_json::from_reader(file)
                    .with_context(|| format!("failed to parse config {}", path.display()))?
            }
            None => TerrainConfig {
                seed: random(),
                ..TerrainConfig::default()
            },
        };

        if let Some(seed) = self.seed {
            config.seed = seed;
        }

        if let Some(points) = self.points {
            config.point_count = points;
        }

        if let Some(seeds) = self.seeds {
            config.seed_count = seeds;
        }

        if let Some(policy) = self.policy {
            let curve = self.curve.map(HeightCurve::from);
            let decrement = self.decrement.unwrap_or(DEFAULT_DECREMENT);

            config.decay = match policy {
                CliDecayPolicy::BreadthFirstMultiplicative => {
                    DecayPolicy::BreadthFirstMultiplicative {
                        curve,
                        jitter: DEFAULT_JITTER,
                    }
                }
                CliDecayPolicy::BreadthFirstSubtractive => {
                    DecayPolicy::BreadthFirstSubtractive { decrement }
                }
                CliDecayPolicy::RecursiveMultiplicative => DecayPolicy::RecursiveMultiplicative {
                    curve,
                    jitter: DEFAULT_JITTER,
                },
                CliDecayPolicy::RecursiveSubtractive => {
                    DecayPolicy::RecursiveSubtractive { decrement }
                }
            };
        }

        config.post.round &= !self.no_round;
        config.post.relax &= !self.no_relax;
        config.post.normalize &= !self.no_normalize;

        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    if cli.headless {
        return run_headless(&cli);
    }

    nannou::app(model).run();

    Ok(())
}

fn run_headless(cli: &Cli) -> anyhow::Result<()> {
    let config = cli.terrain_config()?;

    let now = Instant::now();
    let terrain = generate_terrain(config).context("terrain generation failed")?;

    println!(
        "generated {} cells in {:.4?} (seed {})",
        terrain.graph.len(),
        now.elapsed(),
        terrain.config.seed
    );

    terrain.graph.validate().context("generated graph is inconsistent")?;

    if let Some(path) = &cli.export {
        export_terrain(&terrain, path)?;
    }

    Ok(())
}

fn export_terrain(terrain: &Terrain, path: &Path) -> anyhow::Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create export file {}", path.display()))?;

    serde_json::to_writer(BufWriter::new(file), &TerrainSnapshot::from(terrain))
        .with_context(|| format!("failed to write {}", path.display()))?;

    log::info!("exported terrain to {}", path.display());

    Ok(())
}

struct Model {
    config: TerrainConfig,
    terrain: Option<Terrain>,
    mode: DrawingMode,
}

fn model(app: &App) -> Model {
    let config = match Cli::parse().terrain_config() {
        Ok(config) => config,
        Err(err) => {
            log::error!("{:#}", err);
            TerrainConfig::default()
        }
    };

    app.new_window()
        .size(config.width as u32, config.height as u32)
        .view(view)
        .mouse_released(mouse_released)
        .build()
        .unwrap();

    let terrain = regenerate(config);

    Model {
        config,
        terrain,
        mode: DrawingMode::Render,
    }
}

fn regenerate(config: TerrainConfig) -> Option<Terrain> {
    let now = Instant::now();

    match generate_terrain(config) {
        Ok(terrain) => {
            println!(
                "generated terrain with {:?} cells in {:.4?}",
                terrain.graph.len(),
                now.elapsed(),
            );
            Some(terrain)
        }
        Err(err) => {
            log::error!("terrain generation failed: {}", err);
            None
        }
    }
}

#[derive(Debug, Copy, Clone)]
enum DrawingMode {
    DebugMesh,
    DebugGraphEdges,
    DebugElevation,
    DebugDrainage,
    Render,
}

fn cycle_drawing_mode(mode: DrawingMode) -> DrawingMode {
    match mode {
        DrawingMode::DebugMesh => DrawingMode::DebugGraphEdges,
        DrawingMode::DebugGraphEdges => DrawingMode::DebugElevation,
        DrawingMode::DebugElevation => DrawingMode::DebugDrainage,
        DrawingMode::DebugDrainage => DrawingMode::Render,
        DrawingMode::Render => DrawingMode::DebugMesh,
    }
}

fn mouse_released(_: &App, model: &mut Model, button: MouseButton) {
    if button == MouseButton::Left {
        model.config.seed = random();
        model.terrain = regenerate(model.config);
    }

    if button == MouseButton::Right {
        model.mode = cycle_drawing_mode(model.mode);
    }
}

fn view(app: &App, model: &Model, frame: Frame) {
    let draw = app.draw();

    draw.background().color(SNOW);

    if let Some(terrain) = &model.terrain {
        // The terrain spans [0, w) x [0, h); the window is centered on the origin.
        let draw = draw.xy(-terrain.extent.xy());

        match model.mode {
            DrawingMode::DebugMesh => {
                debug_mesh_polygons(&draw, terrain);
                debug_centres(&draw, terrain);
            }
            DrawingMode::DebugGraphEdges => {
                debug_mesh_polygons(&draw, terrain);
                debug_graph_edges(&draw, terrain);
            }
            DrawingMode::DebugElevation => {
                debug_elevation(&draw, terrain);
            }
            DrawingMode::DebugDrainage => {
                debug_elevation(&draw, terrain);
                debug_drainage(&draw, terrain);
            }
            DrawingMode::Render => {
                debug_elevation(&draw, terrain);
                render_rivers(&draw, terrain);
            }
        }
    }

    draw.to_frame(app, &frame).unwrap();
}

fn debug_centres(draw: &Draw, terrain: &Terrain) {
    for cell in terrain.graph.cells.iter() {
        draw.ellipse().radius(2.0).color(RED).xy(cell.centre);
    }
}

fn debug_graph_edges(draw: &Draw, terrain: &Terrain) {
    for cell in terrain.graph.cells.iter() {
        for n in cell.links.iter().filter(|n| **n > cell.id) {
            let other = terrain.graph.cells[*n].centre;
            draw.line().points(cell.centre, other).color(DIMGREY);
        }
    }
}

fn debug_mesh_polygons(draw: &Draw, terrain: &Terrain) {
    for cell in terrain.graph.cells.iter() {
        let mut points = cell.polygon.clone();
        points.extend(cell.polygon.first().cloned());
        draw.polyline().points(points).color(DIMGREY);
    }
}

fn debug_elevation(draw: &Draw, terrain: &Terrain) {
    for cell in terrain.graph.cells.iter() {
        let color = if cell.height <= 0.0 {
            SEA_COLOR
        } else {
            colorous::YELLOW_ORANGE_BROWN
                .eval_continuous(cell.height as f64)
                .as_tuple()
        };

        let points = cell.polygon.iter().cloned();
        draw.polygon().points(points).color(Rgb::from(color));
    }
}

fn debug_drainage(draw: &Draw, terrain: &Terrain) {
    for cell in terrain.graph.cells.iter() {
        if let Some(next) = cell.downhill {
            let pa = cell.centre;
            let pb = terrain.graph.cells[next].centre;

            let flux = cell.water_flux.unwrap_or(0.0);
            let w = map_clamp(flux.sqrt(), 0.0, 10.0, 1.0, 6.0);

            draw.line()
                .caps_round()
                .weight(w)
                .color(BLACK)
                .points(pa, pb);
        }
    }
}

fn render_rivers(draw: &Draw, terrain: &Terrain) {
    let graph = &terrain.graph;
    let is_river = |i: usize| graph.cells[i].water_flux.unwrap_or(0.0) >= RIVER_FLUX;

    // Trace each river from its source, the first cell of a chain to carry enough flux.
    for cell in graph.cells.iter() {
        if !is_river(cell.id) || cell.uphills.iter().any(|u| is_river(*u)) {
            continue;
        }

        let points: Vec<Vec2> = graph
            .downhill_path(cell.id)
            .map(|i| graph.cells[i].centre)
            .collect();

        let flux = cell.water_flux.unwrap_or(0.0);
        let weight = map_clamp(flux, RIVER_FLUX, RIVER_FLUX * 10.0, 2.0, 5.0);

        draw.polyline()
            .join_round()
            .color(STEELBLUE)
            .weight(weight)
            .points(points);
    }
}
