use delaunator::next_halfedge;
use delaunator::Triangulation;

use itertools::Itertools;

use nannou::geom::Rect;
use nannou::glam::Vec2;

use ordered_float::OrderedFloat;

use crate::error::TerrainError;
use crate::util::polygon::{polygon_area, LabeledPolygon};

/// Vertices closer than this fraction of the extent diagonal are merged when building cells.
const WELD_TOLERANCE: f32 = 1e-6;

/// A Voronoi tessellation clipped to a bounding rectangle.
#[derive(Debug, Clone)]
pub struct Voronoi {
    /// The Voronoi cells. Each input point has a corresponding cell, in input order.
    pub cells: Vec<VoronoiCell>,
    /// Pairs of input point indices whose cells share a boundary edge, with `a < b`.
    pub links: Vec<(usize, usize)>,
}

#[derive(Debug, Clone)]
pub struct VoronoiCell {
    /// The input point that generated the cell.
    pub site: Vec2,
    /// The counter-clockwise boundary of the cell.
    pub polygon: Vec<Vec2>,
    /// The input point indices of the cells sharing an edge with this one, ascending.
    pub neighbors: Vec<usize>,
}

impl Voronoi {
    pub fn new(points: &[Vec2], extent: Rect) -> Result<Self, TerrainError> {
        if points.len() < 3 {
            return Err(TerrainError::degenerate(format!(
                "need at least 3 points, got {}",
                points.len()
            )));
        }

        if let Some(i) = points.iter().position(|p| !extent.contains(*p)) {
            return Err(TerrainError::degenerate(format!(
                "point {} at {:?} lies outside the extent",
                i, points[i]
            )));
        }

        if let Some((a, b)) = find_duplicate(points) {
            return Err(TerrainError::degenerate(format!(
                "points {} and {} coincide at {:?}",
                a, b, points[a]
            )));
        }

        let triangulation = generate_triangulation(points);

        if triangulation.triangles.is_empty() {
            return Err(TerrainError::degenerate("all points are collinear"));
        }

        let delaunay_neighbors = build_point_neighbor_index(&triangulation, points.len());

        let epsilon = extent.wh().length() * WELD_TOLERANCE;

        let mut cells = Vec::with_capacity(points.len());

        for (i, site) in points.iter().cloned().enumerate() {
            // Points the triangulation skipped (near duplicates) have no neighbors to bound them.
            if delaunay_neighbors[i].is_empty() {
                return Err(TerrainError::degenerate(format!(
                    "point {} at {:?} is not part of the triangulation",
                    i, site
                )));
            }

            let mut polygon = LabeledPolygon::from_rect(extent);

            for j in delaunay_neighbors[i].iter().cloned() {
                polygon.clip_bisector(site, points[j], j);
            }

            polygon.remove_degenerate_edges(epsilon);

            if polygon.is_empty() || polygon_area(&polygon.points) <= 0.0 {
                return Err(TerrainError::degenerate(format!(
                    "point {} at {:?} produced an empty cell",
                    i, site
                )));
            }

            let neighbors = polygon.neighbors().sorted().dedup().collect();

            cells.push(VoronoiCell {
                site,
                polygon: polygon.points,
                neighbors,
            });
        }

        let links = build_links(&cells);

        Ok(Self { cells, links })
    }
}

/// Find a pair of points with identical coordinates.
fn find_duplicate(points: &[Vec2]) -> Option<(usize, usize)> {
    (0..points.len())
        .sorted_by_key(|i| (OrderedFloat(points[*i].x), OrderedFloat(points[*i].y)))
        .tuple_windows()
        .find(|(a, b)| points[*a] == points[*b])
}

fn generate_triangulation(points: &[Vec2]) -> Triangulation {
    let mut input = vec![delaunator::Point::default(); points.len()];

    for (i, p) in points.iter().enumerate() {
        input[i].x = p.x as f64;
        input[i].y = p.y as f64;
    }

    delaunator::triangulate(&input)
}

/// Build an index from point index to the ascending indices of its Delaunay neighbors.
fn build_point_neighbor_index(triangulation: &Triangulation, len: usize) -> Vec<Vec<usize>> {
    let mut result = vec![vec![]; len];

    for e in 0..triangulation.triangles.len() {
        // The half-edge e runs from triangles[e] to triangles[next_halfedge(e)]. Hull edges
        // have no twin, so both directions are recorded here.

        let a = triangulation.triangles[e];
        let b = triangulation.triangles[next_halfedge(e)];

        result[a].push(b);
        result[b].push(a);
    }

    for neighbors in result.iter_mut() {
        neighbors.sort_unstable();
        neighbors.dedup();
    }

    result
}

/// Collect the unique undirected links between cells. A link is reported if either cell has
/// an edge cut by the other one.
fn build_links(cells: &[VoronoiCell]) -> Vec<(usize, usize)> {
    cells
        .iter()
        .enumerate()
        .flat_map(|(i, cell)| {
            cell.neighbors
                .iter()
                .map(move |j| if i < *j { (i, *j) } else { (*j, i) })
        })
        .sorted()
        .dedup()
        .collect()
}
