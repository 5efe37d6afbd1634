use serde::{Deserialize, Serialize};

use crate::terrain::CellGraph;
use crate::util::{indexed_mean, normalize};

/// Which post-processing steps to run after propagation. Enabled steps run in the order
/// round, relax, normalize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostProcess {
    pub round: bool,
    pub relax: bool,
    pub normalize: bool,
}

impl Default for PostProcess {
    fn default() -> Self {
        Self {
            round: true,
            relax: true,
            normalize: true,
        }
    }
}

impl PostProcess {
    pub fn apply(&self, graph: &mut CellGraph) {
        if self.round {
            round_height(graph);
        }

        if self.relax {
            relax_height(graph);
        }

        if self.normalize {
            normalize_height(graph);
        }
    }
}

/// Take the square root of each height.
pub fn round_height(graph: &mut CellGraph) {
    for cell in graph.cells.iter_mut() {
        cell.height = cell.height.max(0.0).sqrt();
    }
}

/// Replace each height with the average of its neighbors' previous heights. Cells without
/// neighbors keep their height.
pub fn relax_height(graph: &mut CellGraph) {
    let heights = graph.heights();

    for (cell, h) in graph.cells.iter_mut().zip(heights.iter()) {
        if !cell.links.is_empty() {
            cell.height = indexed_mean(&heights, &cell.links);
        } else {
            cell.height = *h;
        }
    }
}

/// Rescale the heights linearly into \[0.0, 1.0\]. A flat field becomes all zeros.
pub fn normalize_height(graph: &mut CellGraph) {
    let mut heights = graph.heights();
    normalize(&mut heights);
    graph.set_heights(&heights);
}
