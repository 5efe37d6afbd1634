use thiserror::Error;

/// Errors that abort a terrain generation run.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TerrainError {
    /// The input points cannot produce a bounded tessellation (too few points, collinear
    /// points, duplicated sites or a site whose cell is empty).
    #[error("degenerate tessellation: {reason}")]
    DegenerateTessellation { reason: String },

    /// A tessellation adjacency refers to a site that has no constructed cell.
    #[error("unresolved adjacency between sites {site_a} and {site_b}")]
    UnresolvedAdjacency { site_a: usize, site_b: usize },

    /// The downhill relation loops back on itself through this cell.
    #[error("cyclic drainage detected at cell {cell}")]
    CyclicDrainage { cell: usize },

    /// A graph invariant does not hold.
    #[error("invalid cell graph at cell {cell}: {reason}")]
    InvalidGraph { cell: usize, reason: String },
}

impl TerrainError {
    pub(crate) fn degenerate(reason: impl Into<String>) -> Self {
        TerrainError::DegenerateTessellation {
            reason: reason.into(),
        }
    }
}
