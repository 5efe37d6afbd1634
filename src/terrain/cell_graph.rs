use nannou::geom::*;

use crate::error::TerrainError;
use crate::util::Voronoi;

/// One convex region of the map. Links, downhill and uphills are indices into the owning
/// [CellGraph].
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub id: usize,
    /// The boundary of the cell, counter-clockwise.
    pub polygon: Vec<Vec2>,
    /// The point that generated the cell.
    pub centre: Vec2,
    pub height: f32,
    /// Neighboring cells, in the order the tessellation reported them.
    pub links: Vec<usize>,
    /// The lowest neighbor, if it is strictly lower than this cell.
    pub downhill: Option<usize>,
    /// The cells whose downhill is this cell.
    pub uphills: Vec<usize>,
    /// Accumulated drainage; None until the flux pass has run.
    pub water_flux: Option<f32>,
}

impl Cell {
    pub fn new(id: usize, polygon: Vec<Vec2>, centre: Vec2) -> Self {
        Self {
            id,
            polygon,
            centre,
            height: 0.0,
            links: vec![],
            downhill: None,
            uphills: vec![],
            water_flux: None,
        }
    }

    pub fn is_sink(&self) -> bool {
        self.downhill.is_none()
    }
}

/// The planar cell graph: an arena of cells with undirected links between neighbors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellGraph {
    pub cells: Vec<Cell>,
}

impl CellGraph {
    /// Tessellate the [points] inside the [extent] and link every pair of cells that share
    /// a boundary edge.
    pub fn new(points: &[Vec2], extent: Rect) -> Result<Self, TerrainError> {
        let voronoi = Voronoi::new(points, extent)?;
        Self::from_voronoi(voronoi)
    }

    /// Build one cell per Voronoi cell (cell id = site index) and resolve every adjacency
    /// through the site index, never through coordinates.
    pub fn from_voronoi(voronoi: Voronoi) -> Result<Self, TerrainError> {
        let cells = voronoi
            .cells
            .into_iter()
            .enumerate()
            .map(|(id, cell)| Cell::new(id, cell.polygon, cell.site))
            .collect();

        let mut graph = Self { cells };

        for (a, b) in voronoi.links.iter().cloned() {
            graph.link(a, b)?;
        }

        Ok(graph)
    }

    /// Insert a symmetric link between two cells. Linking a pair twice is a no-op.
    pub fn link(&mut self, a: usize, b: usize) -> Result<(), TerrainError> {
        if a >= self.cells.len() || b >= self.cells.len() {
            return Err(TerrainError::UnresolvedAdjacency {
                site_a: a,
                site_b: b,
            });
        }

        if a == b || self.cells[a].links.contains(&b) {
            return Ok(());
        }

        self.cells[a].links.push(b);
        self.cells[b].links.push(a);

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn heights(&self) -> Vec<f32> {
        self.cells.iter().map(|c| c.height).collect()
    }

    pub fn set_heights(&mut self, heights: &[f32]) {
        for (cell, h) in self.cells.iter_mut().zip(heights.iter()) {
            cell.height = *h;
        }
    }

    /// The indices of the cells that have no downhill.
    pub fn sinks(&self) -> Vec<usize> {
        self.cells
            .iter()
            .filter(|c| c.is_sink())
            .map(|c| c.id)
            .collect()
    }

    /// Iterate through the downhill chain from [start] to its sink, including both ends.
    pub fn downhill_path(&self, start: usize) -> DownhillPathIterator {
        DownhillPathIterator {
            graph: self,
            curr: Some(start),
            steps: 0,
        }
    }

    /// Check the structural invariants of the graph and its drainage.
    pub fn validate(&self) -> Result<(), TerrainError> {
        let invalid = |cell: usize, reason: String| TerrainError::InvalidGraph { cell, reason };

        for (i, cell) in self.cells.iter().enumerate() {
            if cell.id != i {
                return Err(invalid(i, format!("id {} does not match index", cell.id)));
            }

            for (k, n) in cell.links.iter().cloned().enumerate() {
                if n >= self.cells.len() {
                    return Err(invalid(i, format!("link to missing cell {}", n)));
                }

                if n == i {
                    return Err(invalid(i, "linked to itself".to_string()));
                }

                if cell.links[..k].contains(&n) {
                    return Err(invalid(i, format!("linked to {} more than once", n)));
                }

                if !self.cells[n].links.contains(&i) {
                    return Err(invalid(i, format!("link to {} is not symmetric", n)));
                }
            }

            if let Some(d) = cell.downhill {
                if !cell.links.contains(&d) {
                    return Err(invalid(i, format!("downhill {} is not a neighbor", d)));
                }

                if self.cells[d].height >= cell.height {
                    return Err(invalid(i, format!("downhill {} is not lower", d)));
                }

                if !self.cells[d].uphills.contains(&i) {
                    return Err(invalid(i, format!("missing from uphills of {}", d)));
                }
            }

            if let Some(flux) = cell.water_flux {
                let mut expected = cell.uphills.len() as f32;

                for u in cell.uphills.iter() {
                    expected += self.cells[*u].water_flux.unwrap_or(0.0);
                }

                if (flux - expected).abs() > 1e-3 * expected.max(1.0) {
                    return Err(invalid(
                        i,
                        format!("water flux {} does not match {}", flux, expected),
                    ));
                }
            }
        }

        Ok(())
    }
}

pub struct DownhillPathIterator<'a> {
    graph: &'a CellGraph,
    curr: Option<usize>,
    steps: usize,
}

impl Iterator for DownhillPathIterator<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        let curr = self.curr?;

        // A path can visit each cell at most once; stop rather than loop on a cycle.
        if self.steps > self.graph.cells.len() {
            self.curr = None;
            return None;
        }

        self.steps += 1;
        self.curr = self.graph.cells[curr].downhill;

        Some(curr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_graph() -> CellGraph {
        let rect = Rect::from_x_y_w_h(0.5, 0.5, 1.0, 1.0);
        let points = vec![
            Vec2::new(0.25, 0.25),
            Vec2::new(0.75, 0.25),
            Vec2::new(0.25, 0.75),
            Vec2::new(0.75, 0.75),
        ];

        CellGraph::new(&points, rect).unwrap()
    }

    #[test]
    fn cells_keep_their_sites() {
        let graph = quad_graph();

        assert_eq!(graph.len(), 4);

        for (i, cell) in graph.cells.iter().enumerate() {
            assert_eq!(cell.id, i);
            assert_eq!(cell.height, 0.0);
            assert_eq!(cell.water_flux, None);
            assert!(cell.polygon.len() >= 4);
        }

        assert_eq!(graph.cells[3].centre, Vec2::new(0.75, 0.75));
    }

    #[test]
    fn links_are_symmetric() {
        let graph = quad_graph();

        assert_eq!(graph.cells[0].links, vec![1, 2]);
        assert_eq!(graph.cells[3].links, vec![1, 2]);
        assert!(graph.validate().is_ok());
    }

    #[test]
    fn linking_twice_is_a_no_op() {
        let mut graph = quad_graph();
        graph.link(0, 1).unwrap();
        graph.link(1, 0).unwrap();
        graph.link(2, 2).unwrap();

        assert_eq!(graph.cells[0].links, vec![1, 2]);
        assert_eq!(graph.cells[1].links, vec![0, 3]);
        assert!(graph.cells[2].links.iter().all(|n| *n != 2));
    }

    #[test]
    fn unknown_sites_are_unresolved() {
        let mut graph = quad_graph();
        let result = graph.link(0, 9);

        assert_eq!(
            result,
            Err(TerrainError::UnresolvedAdjacency {
                site_a: 0,
                site_b: 9
            })
        );
    }

    #[test]
    fn downhill_path_ends_at_sink() {
        let mut graph = quad_graph();
        graph.cells[0].downhill = Some(1);
        graph.cells[1].downhill = Some(3);

        assert_eq!(graph.downhill_path(0).collect::<Vec<_>>(), vec![0, 1, 3]);
        assert_eq!(graph.sinks(), vec![2, 3]);
    }

    #[test]
    fn validate_reports_asymmetric_links() {
        let mut graph = quad_graph();
        graph.cells[0].links.push(3);

        assert!(matches!(
            graph.validate(),
            Err(TerrainError::InvalidGraph { cell: 0, .. })
        ));
    }
}
