use nannou::geom::*;
use nannou::rand::rngs::SmallRng;
use nannou::rand::SeedableRng;
use serde::{Deserialize, Serialize};

pub mod cell_graph;
pub mod drainage;
pub mod elevation;
pub mod height;
pub mod points;

pub use cell_graph::{Cell, CellGraph};
pub use drainage::generate_drainage;
pub use elevation::{DecayPolicy, ElevationPropagator, HeightCurve, Seed};
pub use height::PostProcess;

use crate::error::TerrainError;
use crate::util::Timed;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// The seed of the RNG used for every random choice of a run.
    pub seed: u64,
    pub width: f32,
    pub height: f32,
    /// The number of random points (and so cells).
    pub point_count: usize,
    /// The number of randomly placed elevation seeds.
    pub seed_count: usize,
    /// The height given to each seed cell.
    pub seed_height: f32,
    pub decay: DecayPolicy,
    pub post: PostProcess,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            width: 1000.0,
            height: 1000.0,
            point_count: 2000,
            seed_count: 3,
            seed_height: 1.0,
            decay: DecayPolicy::default(),
            post: PostProcess::default(),
        }
    }
}

impl TerrainConfig {
    /// The map extent, spanning `[0, width) x [0, height)`.
    pub fn extent(&self) -> Rect {
        Rect::from_x_y_w_h(self.width * 0.5, self.height * 0.5, self.width, self.height)
    }
}

#[derive(Debug, Clone)]
pub struct Terrain {
    pub config: TerrainConfig,
    /// Extent of generated terrain points.
    pub extent: Rect,
    /// The cells with their elevation and drainage.
    pub graph: CellGraph,
}

/// Run the whole pipeline: sample points, relax them once, build the cell graph, raise the
/// seeds, post-process the heights and derive the drainage.
pub fn generate_terrain(config: TerrainConfig) -> Result<Terrain, TerrainError> {
    let _t = Timed::info("generate terrain");

    let mut rand = SmallRng::seed_from_u64(config.seed);
    let extent = config.extent();

    let points = {
        let _t = Timed::debug("sample points");
        points::seed_points(&mut rand, extent, config.point_count)
    };

    let points = {
        let _t = Timed::debug("relax points");
        points::relax_points(&points, extent)
    };

    let mut graph = {
        let _t = Timed::debug("build cell graph");
        CellGraph::new(&points, extent)?
    };

    let seeds = elevation::random_seeds(&graph, &mut rand, config.seed_count, config.seed_height);

    {
        let _t = Timed::debug("propagate elevation");
        let mut propagator = ElevationPropagator::new(&graph, config.decay);
        propagator.apply_all(&mut graph, &mut rand, &seeds);
    }

    {
        let _t = Timed::debug("post-process heights");
        config.post.apply(&mut graph);
    }

    {
        let _t = Timed::debug("generate drainage");
        generate_drainage(&mut graph)?;
    }

    log::info!(
        "generated {} cells with {} links and {} sinks (seed {})",
        graph.len(),
        graph.cells.iter().map(|c| c.links.len()).sum::<usize>() / 2,
        graph.sinks().len(),
        config.seed
    );

    Ok(Terrain {
        config,
        extent,
        graph,
    })
}

/// A plain, serializable copy of the generated cells for consumers outside the crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainSnapshot {
    pub config: TerrainConfig,
    pub cells: Vec<CellSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellSnapshot {
    pub id: usize,
    pub polygon: Vec<[f32; 2]>,
    pub centre: [f32; 2],
    pub height: f32,
    pub links: Vec<usize>,
    pub downhill: Option<usize>,
    pub water_flux: Option<f32>,
}

impl From<&Terrain> for TerrainSnapshot {
    fn from(terrain: &Terrain) -> Self {
        let cells = terrain
            .graph
            .cells
            .iter()
            .map(|c| CellSnapshot {
                id: c.id,
                polygon: c.polygon.iter().map(|p| [p.x, p.y]).collect(),
                centre: [c.centre.x, c.centre.y],
                height: c.height,
                links: c.links.clone(),
                downhill: c.downhill,
                water_flux: c.water_flux,
            })
            .collect();

        Self {
            config: terrain.config,
            cells,
        }
    }
}
