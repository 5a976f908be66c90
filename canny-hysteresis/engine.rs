//! Hysteresis thresholding with edge linking.
//!
//! A run has three phases separated by hard barriers:
//!
//! 1. classification: every pixel is labelled strong, weak or suppressed
//!    against the two thresholds. Workers own disjoint slabs of the grid and
//!    join before anything else happens.
//! 2. propagation: strong pixels seed a pooled active list, and the list is
//!    drained single-threaded, queueing every weak-or-strong neighbor that
//!    has not been visited. A pixel is queued at most once, so the loop is
//!    bounded by the grid volume even on closed contours.
//! 3. write-back: confirmed pixels become the edge value, all others the
//!    outside value.

use canny_core::{CannyConfig, Connectivity, Grid, GridShape, NeighborOffsets};
use log::debug;
use rayon::prelude::*;
use std::time::Instant;

use crate::error::{CannyError, CannyResult};
use crate::partition::{partition, split_disjoint};
use crate::pool::{NodePool, SparseList};
use crate::types::{CancelToken, HysteresisOutput, HysteresisStats, PixelState};

#[derive(Debug, Clone, PartialEq)]
pub struct HysteresisEngine {
    upper: f32,
    lower: f32,
    outside_value: f32,
    edge_value: f32,
    connectivity: Connectivity,
    n_threads: usize,
}

impl HysteresisEngine {
    /// Creates an engine with validated thresholds
    pub fn new(upper: f32, lower: f32) -> CannyResult<Self> {
        validate_thresholds(upper, lower)?;
        Ok(Self {
            upper,
            lower,
            outside_value: 0.0,
            edge_value: canny_core::DEFAULT_EDGE_VALUE,
            connectivity: Connectivity::default(),
            n_threads: 1,
        })
    }

    pub fn from_config(cfg: &CannyConfig) -> CannyResult<Self> {
        if cfg.n_threads == 0 {
            return Err(CannyError::InvalidThreadCount(0));
        }
        Ok(Self::new(cfg.upper_threshold, cfg.lower_threshold)?
            .with_outside_value(cfg.outside_value)
            .with_edge_value(cfg.edge_value)
            .with_connectivity(cfg.connectivity)
            .with_threads(cfg.n_threads))
    }

    pub fn with_outside_value(mut self, value: f32) -> Self {
        self.outside_value = value;
        self
    }

    pub fn with_edge_value(mut self, value: f32) -> Self {
        self.edge_value = value;
        self
    }

    pub fn with_connectivity(mut self, connectivity: Connectivity) -> Self {
        self.connectivity = connectivity;
        self
    }

    /// Worker count for the classification pass
    pub fn with_threads(mut self, n_threads: usize) -> Self {
        self.n_threads = n_threads.max(1);
        self
    }

    pub fn upper(&self) -> f32 {
        self.upper
    }

    pub fn lower(&self) -> f32 {
        self.lower
    }

    pub fn outside_value(&self) -> f32 {
        self.outside_value
    }

    pub fn edge_value(&self) -> f32 {
        self.edge_value
    }

    pub fn connectivity(&self) -> Connectivity {
        self.connectivity
    }

    /// Both bounds are inclusive: `upper` is strong, `lower` is weak
    pub fn classify(&self, magnitude: f32) -> PixelState {
        if magnitude >= self.upper {
            PixelState::Strong
        } else if magnitude >= self.lower {
            PixelState::Weak
        } else {
            PixelState::Suppressed
        }
    }

    /// Classifies every pixel of `candidates`, one worker per partition.
    ///
    /// When `sign` is given, pixels where it is zero count as magnitude zero.
    pub fn classify_grid(&self, candidates: &Grid<f32>, sign: Option<&Grid<f32>>) -> CannyResult<Vec<PixelState>> {
        if let Some(sign) = sign {
            candidates.ensure_same_shape(sign)?;
        }
        let shape = candidates.shape();
        let ranges = partition(shape, self.n_threads);
        let mut states = vec![PixelState::Suppressed; shape.volume()];
        let values = candidates.as_slice();
        let signs = sign.map(|s| s.as_slice());

        split_disjoint(&mut states, &ranges)
            .into_par_iter()
            .zip(ranges.par_iter())
            .for_each(|(part, range)| {
                for (state, offset) in part.iter_mut().zip(range.clone()) {
                    let masked = signs.is_some_and(|s| s[offset] == 0.0);
                    let magnitude = if masked { 0.0 } else { values[offset] };
                    *state = self.classify(magnitude);
                }
            });

        Ok(states)
    }

    /// Runs the engine on a precombined candidate-strength grid
    pub fn run(&self, candidates: &Grid<f32>) -> CannyResult<HysteresisOutput> {
        self.run_with_cancel(candidates, None, None)
    }

    /// Runs the engine on a magnitude grid masked by a zero-crossing grid
    pub fn run_masked(&self, magnitude: &Grid<f32>, sign: &Grid<f32>) -> CannyResult<HysteresisOutput> {
        self.run_with_cancel(magnitude, Some(sign), None)
    }

    /// Full entry point; `cancel` is polled before every pop from the active list
    pub fn run_with_cancel(
        &self,
        candidates: &Grid<f32>,
        sign: Option<&Grid<f32>>,
        cancel: Option<&CancelToken>,
    ) -> CannyResult<HysteresisOutput> {
        let t0 = Instant::now();
        let mut states = self.classify_grid(candidates, sign)?;
        let t_classify = t0.elapsed();

        let mut stats = HysteresisStats::default();
        for s in &states {
            match s {
                PixelState::Strong => stats.strong += 1,
                PixelState::Weak => stats.weak += 1,
                _ => {}
            }
        }

        let t1 = Instant::now();
        self.propagate(candidates.shape(), &mut states, cancel, &mut stats)?;
        let t_propagate = t1.elapsed();

        let edges = self.write_back(candidates.shape(), &states)?;
        debug!(
            "hysteresis: strong={} weak={} confirmed={} pushes={} peak={} classify={:?} propagate={:?}",
            stats.strong, stats.weak, stats.confirmed, stats.pushes, stats.peak_active, t_classify, t_propagate
        );

        Ok(HysteresisOutput { edges, stats })
    }

    fn propagate(
        &self,
        shape: &GridShape,
        states: &mut [PixelState],
        cancel: Option<&CancelToken>,
        stats: &mut HysteresisStats,
    ) -> CannyResult<()> {
        if cancel.is_some_and(|c| c.is_cancelled()) {
            return Err(CannyError::Cancelled);
        }
        if !states.contains(&PixelState::Strong) {
            return Ok(());
        }

        let volume = shape.volume();
        let neighbors = NeighborOffsets::new(shape, self.connectivity);
        let mut pool = NodePool::with_capacity(volume);
        let mut list = SparseList::new();

        for (offset, state) in states.iter_mut().enumerate() {
            if *state == PixelState::Strong {
                let node = pool.allocate(offset)?;
                list.push_front(&mut pool, node);
                *state = PixelState::Queued;
                stats.pushes += 1;
            }
        }

        let result = self.drain(shape, states, &neighbors, &mut pool, &mut list, cancel, stats);
        if result.is_err() {
            list.clear(&mut pool);
        }

        stats.peak_active = pool.peak();
        stats.allocations = pool.allocations();
        stats.releases = pool.releases();
        debug_assert_eq!(pool.outstanding(), 0);
        result
    }

    #[allow(clippy::too_many_arguments)]
    fn drain(
        &self,
        shape: &GridShape,
        states: &mut [PixelState],
        neighbors: &NeighborOffsets,
        pool: &mut NodePool,
        list: &mut SparseList,
        cancel: Option<&CancelToken>,
        stats: &mut HysteresisStats,
    ) -> CannyResult<()> {
        let volume = shape.volume();
        let mut coords = vec![0usize; shape.dims()];

        loop {
            if cancel.is_some_and(|c| c.is_cancelled()) {
                return Err(CannyError::Cancelled);
            }
            let Some(node) = list.pop_front(pool) else {
                break;
            };
            let offset = pool.value(node);
            pool.release(node);

            let state = states
                .get_mut(offset)
                .ok_or(CannyError::OutOfBounds { offset, volume })?;
            *state = PixelState::Confirmed;
            stats.confirmed += 1;

            shape.coords_of(offset, &mut coords);
            for (delta, linear) in neighbors.iter() {
                let Some(n) = neighbors.step(shape, offset, &coords, delta, linear) else {
                    continue;
                };
                if states[n].is_linkable() {
                    states[n] = PixelState::Queued;
                    let node = pool.allocate(n)?;
                    list.push_front(pool, node);
                    stats.pushes += 1;
                }
            }
        }
        Ok(())
    }

    fn write_back(&self, shape: &GridShape, states: &[PixelState]) -> CannyResult<Grid<f32>> {
        let data = states
            .par_iter()
            .map(|&s| {
                if s == PixelState::Confirmed {
                    self.edge_value
                } else {
                    self.outside_value
                }
            })
            .collect();
        Ok(Grid::from_vec(shape.clone(), data)?)
    }
}

/// Upper >= Lower >= 0, both finite
pub fn validate_thresholds(upper: f32, lower: f32) -> CannyResult<()> {
    if !upper.is_finite() || !lower.is_finite() || lower < 0.0 || upper < lower {
        return Err(CannyError::InvalidThresholds { upper, lower });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(values: &[f32]) -> Grid<f32> {
        Grid::from_vec(GridShape::new(&[values.len()]).unwrap(), values.to_vec()).unwrap()
    }

    fn edge_indices(out: &HysteresisOutput) -> Vec<usize> {
        out.edges
            .as_slice()
            .iter()
            .enumerate()
            .filter(|(_, &v)| v == 1.0)
            .map(|(i, _)| i)
            .collect()
    }

    const BRIDGE: [f32; 10] = [0.0, 0.0, 6.0, 6.0, 6.0, 2.0, 6.0, 0.0, 0.0, 0.0];

    #[test]
    fn test_weak_pixel_bridges_strong_clusters() {
        let engine = HysteresisEngine::new(5.0, 1.0).unwrap();
        let out = engine.run(&line(&BRIDGE)).unwrap();
        assert_eq!(edge_indices(&out), vec![2, 3, 4, 5, 6]);
        assert_eq!(out.stats.strong, 4);
        assert_eq!(out.stats.weak, 1);
        assert_eq!(out.stats.confirmed, 5);
    }

    #[test]
    fn test_suppressed_pixel_splits_clusters() {
        let engine = HysteresisEngine::new(5.0, 3.0).unwrap();
        let out = engine.run(&line(&BRIDGE)).unwrap();
        assert_eq!(edge_indices(&out), vec![2, 3, 4, 6]);
        assert_eq!(out.edges.as_slice()[5], 0.0);
    }

    #[test]
    fn test_isolated_weak_pixel_is_rejected() {
        let engine = HysteresisEngine::new(5.0, 1.0).unwrap();
        let out = engine.run(&line(&[0.0, 0.0, 3.0, 0.0, 0.0])).unwrap();
        assert!(edge_indices(&out).is_empty());
        assert_eq!(out.stats.pushes, 0);
    }

    #[test]
    fn test_inclusive_threshold_boundaries() {
        let engine = HysteresisEngine::new(5.0, 2.0).unwrap();
        assert_eq!(engine.classify(5.0), PixelState::Strong);
        assert_eq!(engine.classify(2.0), PixelState::Weak);
        assert_eq!(engine.classify(1.999), PixelState::Suppressed);

        let out = engine.run(&line(&[5.0, 2.0, 1.9])).unwrap();
        assert_eq!(edge_indices(&out), vec![0, 1]);
    }

    #[test]
    fn test_closed_ring_terminates() {
        // 7x7 grid with a 5x5 square loop of strong pixels
        let shape = GridShape::new(&[7, 7]).unwrap();
        let mut grid = Grid::new(shape, 0.0f32);
        let mut ring = Vec::new();
        for i in 1..=5 {
            for j in 1..=5 {
                if i == 1 || i == 5 || j == 1 || j == 5 {
                    grid.set(&[i, j], 10.0);
                    ring.push(grid.shape().offset_of(&[i, j]));
                }
            }
        }
        for connectivity in [Connectivity::Face, Connectivity::Full] {
            let engine = HysteresisEngine::new(5.0, 1.0)
                .unwrap()
                .with_connectivity(connectivity);
            let out = engine.run(&grid).unwrap();
            assert_eq!(out.stats.confirmed, ring.len());
            assert_eq!(out.stats.pushes, ring.len());
            for &o in &ring {
                assert_eq!(out.edges.as_slice()[o], 1.0);
            }
        }
    }

    #[test]
    fn test_diagonal_link_depends_on_connectivity() {
        // Strong at (0,0), weak at (1,1)
        let grid = Grid::from_2d(3, 3, vec![9.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 0.0]).unwrap();
        let face = HysteresisEngine::new(5.0, 1.0)
            .unwrap()
            .with_connectivity(Connectivity::Face)
            .run(&grid)
            .unwrap();
        assert_eq!(face.stats.confirmed, 1);

        let full = HysteresisEngine::new(5.0, 1.0)
            .unwrap()
            .with_connectivity(Connectivity::Full)
            .run(&grid)
            .unwrap();
        assert_eq!(full.stats.confirmed, 2);
    }

    #[test]
    fn test_no_wrap_across_rows() {
        // Strong pixel at the end of row 0 must not link to the start of row 1
        let grid = Grid::from_2d(3, 2, vec![0.0, 0.0, 9.0, 2.0, 0.0, 0.0]).unwrap();
        let out = HysteresisEngine::new(5.0, 1.0)
            .unwrap()
            .with_connectivity(Connectivity::Face)
            .run(&grid)
            .unwrap();
        assert_eq!(out.edges.as_slice(), &[0.0, 0.0, 1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_high_dimensional_single_pixel() {
        let grid = Grid::new(GridShape::new(&[1; 16]).unwrap(), 9.0f32);
        let out = HysteresisEngine::new(5.0, 1.0).unwrap().run(&grid).unwrap();
        assert_eq!(out.stats.confirmed, 1);
        assert_eq!(out.edges.as_slice(), &[1.0]);
    }

    #[test]
    fn test_high_dimensional_line_links_along_long_axis() {
        let mut extent = [1usize; 14];
        extent[9] = 6;
        let shape = GridShape::new(&extent).unwrap();
        let grid = Grid::from_vec(shape, vec![9.0, 2.0, 2.0, 0.0, 2.0, 9.0]).unwrap();
        let out = HysteresisEngine::new(5.0, 1.0).unwrap().run(&grid).unwrap();
        assert_eq!(edge_indices(&out), vec![0, 1, 2, 4, 5]);
    }

    #[test]
    fn test_no_seeds_skips_propagation() {
        let out = HysteresisEngine::new(5.0, 1.0)
            .unwrap()
            .run(&line(&[2.0, 3.0, 0.0]))
            .unwrap();
        assert_eq!(out.stats.weak, 2);
        assert_eq!(out.stats.pushes, 0);
        assert_eq!(out.stats.allocations, 0);
        assert!(out.edges.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_three_dimensional_chain() {
        let shape = GridShape::new(&[4, 4, 4]).unwrap();
        let mut grid = Grid::new(shape, 0.0f32);
        grid.set(&[0, 0, 0], 9.0);
        for z in 1..4 {
            grid.set(&[0, 0, z], 2.0);
        }
        grid.set(&[3, 3, 3], 2.0);
        let out = HysteresisEngine::new(5.0, 1.0)
            .unwrap()
            .with_connectivity(Connectivity::Face)
            .run(&grid)
            .unwrap();
        assert_eq!(out.stats.confirmed, 4);
        assert_eq!(out.edges.get(&[0, 0, 3]), Some(&1.0));
        assert_eq!(out.edges.get(&[3, 3, 3]), Some(&0.0));
    }

    #[test]
    fn test_sign_mask_blocks_pixels() {
        let magnitude = line(&BRIDGE);
        let sign = line(&[0.0, 0.0, 1.0, 1.0, 1.0, 0.0, 1.0, 0.0, 0.0, 0.0]);
        let out = HysteresisEngine::new(5.0, 1.0)
            .unwrap()
            .run_masked(&magnitude, &sign)
            .unwrap();
        assert_eq!(edge_indices(&out), vec![2, 3, 4, 6]);
    }

    #[test]
    fn test_sign_shape_mismatch() {
        let result = HysteresisEngine::new(5.0, 1.0)
            .unwrap()
            .run_masked(&line(&BRIDGE), &line(&[1.0; 4]));
        assert!(matches!(result, Err(CannyError::Grid(_))));
    }

    #[test]
    fn test_outside_and_edge_values() {
        let engine = HysteresisEngine::new(5.0, 1.0)
            .unwrap()
            .with_outside_value(-1.0)
            .with_edge_value(255.0);
        let out = engine.run(&line(&BRIDGE)).unwrap();
        for &v in out.edges.as_slice() {
            assert!(v == -1.0 || v == 255.0);
        }
        assert_eq!(out.edges.as_slice()[5], 255.0);
        assert_eq!(out.edges.as_slice()[0], -1.0);
    }

    #[test]
    fn test_pool_balanced_after_run() {
        let engine = HysteresisEngine::new(5.0, 1.0).unwrap();
        let out = engine.run(&line(&BRIDGE)).unwrap();
        assert_eq!(out.stats.allocations, out.stats.releases);
        assert_eq!(out.stats.allocations, out.stats.pushes);
        assert!(out.stats.pushes <= BRIDGE.len());
    }

    #[test]
    fn test_cancelled_run_fails_as_a_whole() {
        let token = CancelToken::new();
        token.cancel();
        let engine = HysteresisEngine::new(5.0, 1.0).unwrap();
        let result = engine.run_with_cancel(&line(&BRIDGE), None, Some(&token));
        assert!(matches!(result, Err(CannyError::Cancelled)));
    }

    #[test]
    fn test_parallel_classification_matches_serial() {
        let shape = GridShape::new(&[31, 17]).unwrap();
        let data: Vec<f32> = (0..shape.volume()).map(|i| ((i * 7919) % 101) as f32 / 10.0).collect();
        let grid = Grid::from_vec(shape, data).unwrap();
        let serial = HysteresisEngine::new(6.0, 2.0).unwrap().run(&grid).unwrap();
        let parallel = HysteresisEngine::new(6.0, 2.0)
            .unwrap()
            .with_threads(8)
            .run(&grid)
            .unwrap();
        assert_eq!(serial.edges, parallel.edges);
        assert_eq!(serial.stats, parallel.stats);
    }

    #[test]
    fn test_invalid_thresholds() {
        assert!(matches!(
            HysteresisEngine::new(1.0, 2.0),
            Err(CannyError::InvalidThresholds { .. })
        ));
        assert!(matches!(
            HysteresisEngine::new(1.0, -0.5),
            Err(CannyError::InvalidThresholds { .. })
        ));
        assert!(HysteresisEngine::new(f32::NAN, 0.0).is_err());
        assert!(HysteresisEngine::new(2.0, 2.0).is_ok());
    }
}
