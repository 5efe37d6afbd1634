use ordered_float::OrderedFloat;

use crate::error::TerrainError;
use crate::terrain::CellGraph;

/// Point every cell at its lowest neighbor if that neighbor is strictly lower, and record
/// the inverse relation in `uphills`. Equally low neighbors are resolved to the lowest id.
pub fn generate_downhill(graph: &mut CellGraph) {
    for cell in graph.cells.iter_mut() {
        cell.downhill = None;
        cell.uphills.clear();
        cell.water_flux = None;
    }

    for i in 0..graph.cells.len() {
        let lowest = graph.cells[i]
            .links
            .iter()
            .cloned()
            .min_by_key(|n| (OrderedFloat(graph.cells[*n].height), *n));

        let downhill = match lowest {
            Some(n) if graph.cells[n].height < graph.cells[i].height => Some(n),
            _ => None,
        };

        graph.cells[i].downhill = downhill;

        if let Some(n) = downhill {
            graph.cells[n].uphills.push(i);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Pending,
    Open,
    Done,
}

/// Compute the water flux of every cell: the number of cells draining into it, directly or
/// through other cells. Each cell is evaluated once. Fails if the uphill relation loops.
pub fn generate_flux(graph: &mut CellGraph) -> Result<(), TerrainError> {
    let len = graph.cells.len();

    let mut flux = vec![0f32; len];
    let mut state = vec![Visit::Pending; len];

    // Post-order walk over the uphill forest. A frame is (cell, next uphill to visit).
    let mut stack: Vec<(usize, usize)> = vec![];

    for root in 0..len {
        if state[root] != Visit::Pending {
            continue;
        }

        state[root] = Visit::Open;
        stack.push((root, 0));

        while let Some(frame) = stack.last_mut() {
            let (cell, next) = *frame;
            let uphills = &graph.cells[cell].uphills;

            if next < uphills.len() {
                frame.1 += 1;

                let up = uphills[next];

                match state[up] {
                    Visit::Done => {}
                    Visit::Open => return Err(TerrainError::CyclicDrainage { cell: up }),
                    Visit::Pending => {
                        state[up] = Visit::Open;
                        stack.push((up, 0));
                    }
                }

                continue;
            }

            let upstream: f32 = uphills.iter().map(|u| flux[*u]).sum();

            flux[cell] = uphills.len() as f32 + upstream;
            state[cell] = Visit::Done;
            stack.pop();
        }
    }

    for (cell, f) in graph.cells.iter_mut().zip(flux.into_iter()) {
        cell.water_flux = Some(f);
    }

    Ok(())
}

/// Run both drainage passes.
pub fn generate_drainage(graph: &mut CellGraph) -> Result<(), TerrainError> {
    generate_downhill(graph);
    generate_flux(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::Cell;
    use nannou::geom::Vec2;

    fn graph(heights: &[f32], links: &[(usize, usize)]) -> CellGraph {
        let mut graph = CellGraph {
            cells: (0..heights.len())
                .map(|i| Cell::new(i, vec![], Vec2::new(i as f32, 0.0)))
                .collect(),
        };

        for (a, b) in links.iter().cloned() {
            graph.link(a, b).unwrap();
        }

        graph.set_heights(heights);
        graph
    }

    #[test]
    fn two_cells_drain_into_the_lower() {
        let mut g = graph(&[1.0, 0.0], &[(0, 1)]);
        generate_drainage(&mut g).unwrap();

        assert_eq!(g.cells[0].downhill, Some(1));
        assert_eq!(g.cells[1].downhill, None);
        assert_eq!(g.cells[1].uphills, vec![0]);
        assert_eq!(g.cells[0].water_flux, Some(0.0));
        assert_eq!(g.cells[1].water_flux, Some(1.0));
    }

    #[test]
    fn flux_accumulates_along_a_chain() {
        // 0 -> 1 -> 2 -> 3, with 4 also draining into 2.
        let mut g = graph(
            &[0.9, 0.7, 0.5, 0.1, 0.8],
            &[(0, 1), (1, 2), (2, 3), (4, 2)],
        );
        generate_drainage(&mut g).unwrap();

        let flux: Vec<f32> = g.cells.iter().map(|c| c.water_flux.unwrap()).collect();

        assert_eq!(flux, vec![0.0, 1.0, 3.0, 4.0, 0.0]);
        assert_eq!(g.sinks(), vec![3]);
        assert!(g.validate().is_ok());
    }

    #[test]
    fn steepest_neighbor_wins() {
        let mut g = graph(&[0.5, 0.4, 0.1, 0.3], &[(0, 1), (0, 2), (0, 3)]);
        generate_downhill(&mut g);

        assert_eq!(g.cells[0].downhill, Some(2));
        assert_eq!(g.cells[2].uphills, vec![0]);
    }

    #[test]
    fn ties_break_by_lowest_id() {
        let mut g = graph(&[0.5, 0.2, 0.2, 0.2], &[(0, 3), (0, 2), (0, 1)]);
        generate_downhill(&mut g);

        assert_eq!(g.cells[0].downhill, Some(1));
    }

    #[test]
    fn flat_neighbors_are_sinks() {
        let mut g = graph(&[0.5, 0.5, 0.5], &[(0, 1), (1, 2)]);
        generate_drainage(&mut g).unwrap();

        assert_eq!(g.sinks(), vec![0, 1, 2]);
        assert!(g.cells.iter().all(|c| c.water_flux == Some(0.0)));
    }

    #[test]
    fn cycles_fail_fast() {
        let mut g = graph(&[0.5, 0.5], &[(0, 1)]);
        g.cells[0].downhill = Some(1);
        g.cells[1].uphills.push(0);
        g.cells[1].downhill = Some(0);
        g.cells[0].uphills.push(1);

        assert!(matches!(
            generate_flux(&mut g),
            Err(TerrainError::CyclicDrainage { .. })
        ));
    }

    #[test]
    fn rerunning_downhill_resets_state() {
        let mut g = graph(&[1.0, 0.0], &[(0, 1)]);
        generate_drainage(&mut g).unwrap();

        g.set_heights(&[0.0, 1.0]);
        generate_drainage(&mut g).unwrap();

        assert_eq!(g.cells[0].uphills, vec![1]);
        assert!(g.cells[1].uphills.is_empty());
        assert_eq!(g.cells[0].water_flux, Some(1.0));
    }
}
