use nannou::geom::*;
use nannou::rand::rngs::SmallRng;

use crate::rand::random_point_in_rect;
use crate::util::{polygon_centroid, Voronoi};

/// Generate [count] points drawn independently and uniformly from the [extent].
pub fn seed_points(rand: &mut SmallRng, extent: Rect, count: usize) -> Vec<Vec2> {
    (0..count)
        .map(|_| random_point_in_rect(rand, extent))
        .collect()
}

/// Apply one pass of Lloyd relaxation: replace each point with the centroid of its Voronoi
/// cell clipped to the [extent]. Cells without a usable centroid keep their original point,
/// and a set that cannot be tessellated at all comes back unchanged.
pub fn relax_points(points: &[Vec2], extent: Rect) -> Vec<Vec2> {
    let voronoi = match Voronoi::new(points, extent) {
        Ok(voronoi) => voronoi,
        Err(err) => {
            log::warn!("skipping relaxation: {}", err);
            return points.to_vec();
        }
    };

    let mut fallbacks = 0;

    let relaxed = voronoi
        .cells
        .iter()
        .map(|cell| match polygon_centroid(&cell.polygon) {
            Some(centroid) => centroid,
            None => {
                fallbacks += 1;
                cell.site
            }
        })
        .collect();

    if fallbacks > 0 {
        log::warn!("{} cells kept their original point during relaxation", fallbacks);
    }

    relaxed
}
