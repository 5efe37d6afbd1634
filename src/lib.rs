//! Procedural elevation and drainage over a relaxed Voronoi cell graph.
//!
//! The pipeline samples random points, relaxes them once with Lloyd's algorithm, builds a
//! bounded Voronoi cell graph, spreads height outwards from seed cells, post-processes the
//! heights and finally points every cell at its lowest neighbor and accumulates water flux.

pub mod error;
pub mod rand;
pub mod terrain;
pub mod util;

pub use error::TerrainError;
pub use terrain::*;
