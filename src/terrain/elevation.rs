use std::collections::VecDeque;

use nannou::rand::rngs::SmallRng;
use nannou::rand::Rng;
use serde::{Deserialize, Serialize};

use crate::rand::random_jitter;
use crate::terrain::CellGraph;

/// Cells only pass height on to their neighbors while they stand above this height.
pub const PROPAGATION_THRESHOLD: f32 = 0.1;

/// The default amount of random height added at each hop by the multiplicative policies.
pub const DEFAULT_JITTER: f32 = 0.1;

/// The default height lost at each hop by the subtractive policies.
pub const DEFAULT_DECREMENT: f32 = 0.1;

/// The named falloff curves. Each returns how much height is lost on one hop from a parent
/// of the given height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HeightCurve {
    /// Loses a fixed share of the parent height.
    Cone,
    /// Loses a constant amount.
    Hill,
    /// Loses a quarter of the cosine of the parent height.
    Cos,
}

impl HeightCurve {
    pub const ALL: [HeightCurve; 3] = [HeightCurve::Cone, HeightCurve::Hill, HeightCurve::Cos];

    pub fn decay(&self, parent: f32) -> f32 {
        match self {
            HeightCurve::Cone => 0.7 * parent,
            HeightCurve::Hill => 0.7,
            HeightCurve::Cos => parent.cos() / 4.0,
        }
    }

    pub fn random(rand: &mut SmallRng) -> Self {
        Self::ALL[rand.gen_range(0..Self::ALL.len())]
    }
}

/// How height spreads from a seed cell to the rest of the graph.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DecayPolicy {
    /// Queue based spread where each hop subtracts the curve's decay and adds random jitter.
    /// A `None` curve is picked at random for every seed.
    BreadthFirstMultiplicative {
        #[serde(default)]
        curve: Option<HeightCurve>,
        #[serde(default = "default_jitter")]
        jitter: f32,
    },
    /// Queue based spread where each hop subtracts a fixed decrement.
    BreadthFirstSubtractive { decrement: f32 },
    /// Depth first spread that raises any neighbor lower than the candidate height.
    RecursiveMultiplicative {
        #[serde(default)]
        curve: Option<HeightCurve>,
        #[serde(default = "default_jitter")]
        jitter: f32,
    },
    /// Depth first spread with a fixed decrement per hop.
    RecursiveSubtractive { decrement: f32 },
}

fn default_jitter() -> f32 {
    DEFAULT_JITTER
}

impl Default for DecayPolicy {
    fn default() -> Self {
        DecayPolicy::BreadthFirstMultiplicative {
            curve: None,
            jitter: DEFAULT_JITTER,
        }
    }
}

/// A cell to raise and the height to give it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Seed {
    pub cell: usize,
    pub height: f32,
}

/// The per-hop height function resolved for one seed.
#[derive(Debug, Clone, Copy)]
enum Step {
    Curve { curve: HeightCurve, jitter: f32 },
    Decrement(f32),
}

impl Step {
    fn child_height(&self, rand: &mut SmallRng, parent: f32) -> f32 {
        match *self {
            Step::Curve { curve, jitter } => {
                let h = parent - curve.decay(parent) + random_jitter(rand, jitter);
                h.max(0.0)
            }
            Step::Decrement(decrement) => (parent - decrement).max(0.0),
        }
    }
}

/// Spreads seed heights over a cell graph. The visited markers persist across seeds, so a
/// breadth-first seed never spreads into cells an earlier seed already raised above zero.
pub struct ElevationPropagator {
    policy: DecayPolicy,
    visited: Vec<bool>,
}

impl ElevationPropagator {
    /// Cells that already have a non-zero height start out visited.
    pub fn new(graph: &CellGraph, policy: DecayPolicy) -> Self {
        let visited = graph.cells.iter().map(|c| c.height != 0.0).collect();

        Self { policy, visited }
    }

    /// Apply each seed in order.
    pub fn apply_all(&mut self, graph: &mut CellGraph, rand: &mut SmallRng, seeds: &[Seed]) {
        for seed in seeds.iter() {
            self.apply(graph, rand, *seed);
        }
    }

    pub fn apply(&mut self, graph: &mut CellGraph, rand: &mut SmallRng, seed: Seed) {
        let step = match self.policy {
            DecayPolicy::BreadthFirstMultiplicative { curve, jitter }
            | DecayPolicy::RecursiveMultiplicative { curve, jitter } => Step::Curve {
                curve: curve.unwrap_or_else(|| HeightCurve::random(rand)),
                jitter,
            },
            DecayPolicy::BreadthFirstSubtractive { decrement }
            | DecayPolicy::RecursiveSubtractive { decrement } => Step::Decrement(decrement),
        };

        log::debug!(
            "raising cell {} to {} with {:?}",
            seed.cell,
            seed.height,
            step
        );

        match self.policy {
            DecayPolicy::BreadthFirstMultiplicative { .. }
            | DecayPolicy::BreadthFirstSubtractive { .. } => {
                self.breadth_first(graph, rand, seed, step)
            }
            DecayPolicy::RecursiveMultiplicative { .. }
            | DecayPolicy::RecursiveSubtractive { .. } => {
                self.depth_first(graph, rand, seed, step)
            }
        }
    }

    fn breadth_first(
        &mut self,
        graph: &mut CellGraph,
        rand: &mut SmallRng,
        seed: Seed,
        step: Step,
    ) {
        graph.cells[seed.cell].height = seed.height;
        self.visited[seed.cell] = seed.height > 0.0;

        // The direct neighbors of the seed are always (re)assigned. Deeper cells are only
        // queued while unvisited; a cell may be queued by several parents and the last pop
        // wins.
        let mut queue: VecDeque<(usize, f32)> = graph.cells[seed.cell]
            .links
            .iter()
            .map(|n| (*n, seed.height))
            .collect();

        while let Some((cell, parent)) = queue.pop_front() {
            let height = step.child_height(rand, parent);

            // A cell assigned 0 stays unvisited, so later parents and seeds can still reach it.
            graph.cells[cell].height = height;
            self.visited[cell] = height > 0.0;

            if height > PROPAGATION_THRESHOLD {
                for n in graph.cells[cell].links.iter().cloned() {
                    if !self.visited[n] {
                        queue.push_back((n, height));
                    }
                }
            }
        }
    }

    fn depth_first(
        &mut self,
        graph: &mut CellGraph,
        rand: &mut SmallRng,
        seed: Seed,
        step: Step,
    ) {
        // Explicit frames of (cell, height, next link) walk the neighbors first-link-first,
        // exactly as a recursive descent would, without growing the call stack.
        let mut stack: Vec<(usize, f32, usize)> = vec![];

        if graph.cells[seed.cell].height < seed.height {
            self.raise(graph, &mut stack, seed.cell, seed.height);
        }

        while let Some(frame) = stack.last_mut() {
            let (cell, height, next) = *frame;

            if next >= graph.cells[cell].links.len() {
                stack.pop();
                continue;
            }

            frame.2 += 1;

            let neighbor = graph.cells[cell].links[next];
            // Capped at the parent height so a curve that gains height cannot climb forever.
            let candidate = step.child_height(rand, height).min(height);

            if graph.cells[neighbor].height < candidate {
                self.raise(graph, &mut stack, neighbor, candidate);
            }
        }
    }

    fn raise(
        &mut self,
        graph: &mut CellGraph,
        stack: &mut Vec<(usize, f32, usize)>,
        cell: usize,
        height: f32,
    ) {
        graph.cells[cell].height = height;
        self.visited[cell] = height > 0.0;

        if height > PROPAGATION_THRESHOLD {
            stack.push((cell, height, 0));
        }
    }
}

/// Choose [count] seed cells uniformly at random (with replacement), each raised to [height].
pub fn random_seeds(
    graph: &CellGraph,
    rand: &mut SmallRng,
    count: usize,
    height: f32,
) -> Vec<Seed> {
    if graph.is_empty() {
        return vec![];
    }

    (0..count)
        .map(|_| Seed {
            cell: rand.gen_range(0..graph.len()),
            height,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::Cell;
    use nannou::geom::Vec2;
    use nannou::rand::SeedableRng;

    /// A path graph 0 - 1 - 2 - ... - (n - 1).
    fn chain(n: usize) -> CellGraph {
        let mut graph = CellGraph {
            cells: (0..n)
                .map(|i| Cell::new(i, vec![], Vec2::new(i as f32, 0.0)))
                .collect(),
        };

        for i in 1..n {
            graph.link(i - 1, i).unwrap();
        }

        graph
    }

    fn rand() -> SmallRng {
        SmallRng::seed_from_u64(42)
    }

    #[test]
    fn subtractive_breadth_first_steps_down() {
        let mut graph = chain(8);
        let policy = DecayPolicy::BreadthFirstSubtractive { decrement: 0.2 };

        let mut propagator = ElevationPropagator::new(&graph, policy);
        propagator.apply(&mut graph, &mut rand(), Seed { cell: 0, height: 1.0 });

        let expected = [1.0, 0.8, 0.6, 0.4, 0.2, 0.0, 0.0, 0.0];

        for (cell, e) in graph.cells.iter().zip(expected.iter()) {
            assert!((cell.height - e).abs() < 1e-5, "{} != {}", cell.height, e);
        }
    }

    #[test]
    fn cells_below_threshold_do_not_spread() {
        let mut graph = chain(4);
        let policy = DecayPolicy::BreadthFirstSubtractive { decrement: 0.55 };

        let mut propagator = ElevationPropagator::new(&graph, policy);
        propagator.apply(&mut graph, &mut rand(), Seed { cell: 0, height: 0.6 });

        assert!((graph.cells[1].height - 0.05).abs() < 1e-6);
        assert_eq!(graph.cells[2].height, 0.0);
    }

    #[test]
    fn later_seeds_do_not_revisit() {
        let mut graph = chain(5);
        let policy = DecayPolicy::BreadthFirstSubtractive { decrement: 0.25 };

        let mut propagator = ElevationPropagator::new(&graph, policy);
        propagator.apply_all(
            &mut graph,
            &mut rand(),
            &[Seed { cell: 0, height: 1.0 }, Seed { cell: 4, height: 1.0 }],
        );

        // The second seed reassigns its direct neighbor but cannot go past it.
        let heights = graph.heights();
        assert!((heights[0] - 1.0).abs() < 1e-6);
        assert!((heights[1] - 0.75).abs() < 1e-6);
        assert!((heights[2] - 0.5).abs() < 1e-6);
        assert!((heights[3] - 0.75).abs() < 1e-6);
        assert!((heights[4] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn preset_heights_count_as_visited() {
        let mut graph = chain(4);
        graph.cells[2].height = 0.05;

        let policy = DecayPolicy::BreadthFirstSubtractive { decrement: 0.1 };
        let mut propagator = ElevationPropagator::new(&graph, policy);
        propagator.apply(&mut graph, &mut rand(), Seed { cell: 0, height: 1.0 });

        assert!((graph.cells[2].height - 0.05).abs() < 1e-6);
        assert_eq!(graph.cells[3].height, 0.0);
    }

    #[test]
    fn multiplicative_heights_stay_in_range() {
        let mut graph = chain(30);

        for curve in HeightCurve::ALL.iter().cloned() {
            graph.set_heights(&[0.0; 30]);

            let policy = DecayPolicy::BreadthFirstMultiplicative {
                curve: Some(curve),
                jitter: DEFAULT_JITTER,
            };

            let mut propagator = ElevationPropagator::new(&graph, policy);
            propagator.apply(&mut graph, &mut rand(), Seed { cell: 10, height: 1.0 });

            for cell in graph.cells.iter() {
                assert!(cell.height >= 0.0 && cell.height <= 1.0, "{:?}", curve);
            }

            assert_eq!(graph.cells[10].height, 1.0);
        }
    }

    #[test]
    fn cone_without_jitter_is_geometric() {
        let mut graph = chain(4);
        let policy = DecayPolicy::BreadthFirstMultiplicative {
            curve: Some(HeightCurve::Cone),
            jitter: 0.0,
        };

        let mut propagator = ElevationPropagator::new(&graph, policy);
        propagator.apply(&mut graph, &mut rand(), Seed { cell: 0, height: 1.0 });

        // 1.0 -> 0.3 -> 0.09 (below threshold, so cell 3 is untouched)
        assert!((graph.cells[1].height - 0.3).abs() < 1e-5);
        assert!((graph.cells[2].height - 0.09).abs() < 1e-5);
        assert_eq!(graph.cells[3].height, 0.0);
    }

    #[test]
    fn recursive_only_raises_heights() {
        let mut graph = chain(6);
        graph.cells[5].height = 0.9;

        let policy = DecayPolicy::RecursiveSubtractive { decrement: 0.2 };
        let mut propagator = ElevationPropagator::new(&graph, policy);
        propagator.apply(&mut graph, &mut rand(), Seed { cell: 0, height: 1.0 });

        let expected = [1.0, 0.8, 0.6, 0.4, 0.2, 0.9];

        for (cell, e) in graph.cells.iter().zip(expected.iter()) {
            assert!((cell.height - e).abs() < 1e-5, "{} != {}", cell.height, e);
        }

        // A second, taller seed raises its whole neighborhood again.
        propagator.apply(&mut graph, &mut rand(), Seed { cell: 5, height: 1.0 });

        assert!((graph.cells[4].height - 0.8).abs() < 1e-5);
        assert!((graph.cells[3].height - 0.6).abs() < 1e-5);
        assert!((graph.cells[2].height - 0.6).abs() < 1e-5);
    }

    #[test]
    fn recursive_multiplicative_terminates() {
        let mut graph = chain(50);
        for i in 0..48 {
            graph.link(i, i + 2).unwrap();
        }

        let policy = DecayPolicy::RecursiveMultiplicative {
            curve: None,
            jitter: DEFAULT_JITTER,
        };

        let mut propagator = ElevationPropagator::new(&graph, policy);
        let mut rand = rand();
        let seeds = random_seeds(&graph, &mut rand, 3, 1.0);
        propagator.apply_all(&mut graph, &mut rand, &seeds);

        assert!(graph.cells.iter().all(|c| c.height >= 0.0 && c.height <= 1.0));
        assert!(graph.cells.iter().any(|c| c.height == 1.0));
    }

    #[test]
    fn cells_left_at_zero_stay_reachable() {
        let mut graph = chain(5);
        let policy = DecayPolicy::BreadthFirstSubtractive { decrement: 0.3 };

        let mut propagator = ElevationPropagator::new(&graph, policy);
        propagator.apply_all(
            &mut graph,
            &mut rand(),
            &[Seed { cell: 0, height: 0.5 }, Seed { cell: 4, height: 1.0 }],
        );

        // Cell 2 is assigned 0 by the first seed and picked up again by the second.
        let expected = [0.5, 0.2, 0.4, 0.7, 1.0];

        for (cell, e) in graph.cells.iter().zip(expected.iter()) {
            assert!((cell.height - e).abs() < 1e-5, "{} != {}", cell.height, e);
        }
    }

    #[test]
    fn cone_children_of_low_parents_can_gain_jitter() {
        let policy = DecayPolicy::BreadthFirstMultiplicative {
            curve: Some(HeightCurve::Cone),
            jitter: DEFAULT_JITTER,
        };

        let mut highest = 0f32;

        for seed in 0..200 {
            let mut graph = chain(2);
            let mut propagator = ElevationPropagator::new(&graph, policy);
            propagator.apply(
                &mut graph,
                &mut SmallRng::seed_from_u64(seed),
                Seed { cell: 0, height: 0.12 },
            );

            let h = graph.cells[1].height;
            assert!(h >= 0.036 - 1e-6 && h <= 0.136 + 1e-6, "{}", h);
            highest = highest.max(h);
        }

        assert!(highest > 0.12);
    }

    #[test]
    fn recursive_never_lowers_the_seed_cell() {
        let mut graph = chain(3);
        graph.set_heights(&[0.9, 0.7, 0.0]);

        let policy = DecayPolicy::RecursiveSubtractive { decrement: 0.1 };
        let mut propagator = ElevationPropagator::new(&graph, policy);
        propagator.apply(&mut graph, &mut rand(), Seed { cell: 0, height: 0.5 });

        assert_eq!(graph.heights(), vec![0.9, 0.7, 0.0]);
    }

    #[test]
    fn recursive_children_stay_below_their_parent() {
        let mut graph = chain(20);
        let policy = DecayPolicy::RecursiveMultiplicative {
            curve: Some(HeightCurve::Cos),
            jitter: DEFAULT_JITTER,
        };

        let mut propagator = ElevationPropagator::new(&graph, policy);
        propagator.apply(&mut graph, &mut rand(), Seed { cell: 0, height: 3.0 });

        let heights = graph.heights();

        assert_eq!(heights[0], 3.0);
        assert!(heights.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn random_seeds_are_in_range() {
        let graph = chain(10);
        let seeds = random_seeds(&graph, &mut rand(), 25, 0.5);

        assert_eq!(seeds.len(), 25);
        assert!(seeds.iter().all(|s| s.cell < 10 && s.height == 0.5));
        assert!(random_seeds(&CellGraph::default(), &mut rand(), 3, 1.0).is_empty());
    }
}
