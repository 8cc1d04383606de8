//! The ClosestPointGrid (CPG): a block-tiled cached conservative distance
//! field over a rectangular window.
//!
//! # Memory layout
//!
//! The cell array is organized into `n_block_rows × n_block_cols` blocks,
//! each `block_width × block_height` cells, laid out contiguously. Every
//! worker thread owns a contiguous region during both the parallel build and
//! its hot-path queries during render, which is the whole point of the blocking.
//!
//! ```text
//! block 0          block 1
//! ┌───────────┐    ┌───────────┐
//! │ cells...   │    │ cells...   │   ...one block per (2^⌊log2 N⌋) workers
//! └───────────┘    └───────────┘
//! ```
//!
//! # Conservative bound
//!
//! Every cell stores the distance from its anchor (bottom-left corner) to
//! the nearest boundary. For any point `p` inside the cell, the true
//! distance from `p` to the boundary is at least `cell.dist - ‖p - anchor‖`,
//! a lower bound cheap enough to use as a Walk-on-Spheres step radius
//! without resampling the scene.

use euclid::Point2D;
use rayon::prelude::*;

use crate::error::PreconditionError;
use crate::storage::scene::Scene;
use crate::storage::vec_types::{Vec2, Vec3};

/// Casts to `f32` rounding toward zero when necessary, so the stored value
/// never exceeds the true `f64` distance. A plain `as f32` cast can round
/// up by a ULP, which would turn the cached distance into an unsound upper
/// bound instead of a lower one.
fn conservative_f32(x: f64) -> f32 {
    let v = x as f32;
    if (v as f64) > x {
        f32::from_bits(v.to_bits() - 1)
    } else {
        v
    }
}

/// One cached cell: distance from the cell's anchor to the nearest
/// boundary, and that boundary's color.
#[derive(Debug, Clone, Copy)]
pub struct GridCell {
    pub dist: f32,
    pub boundary: Vec3,
}

/// Grid-local integer coordinate, used only for indexing arithmetic.
struct GridSpace;
type GridPoint = Point2D<i64, GridSpace>;

pub struct ClosestPointGrid {
    bl: Vec2,
    tr: Vec2,
    cell_length: f64,
    grid_width: i64,
    grid_height: i64,
    n_block_cols: i64,
    block_width: i64,
    block_height: i64,
    block_size: i64,
    cells: Vec<GridCell>,
}

/// `2^⌊log2 n⌋`, and the aspect-ratio heuristic for splitting that count
/// into columns and rows. No tuning knob is exposed for it; nothing
/// downstream needs one.
fn block_layout(requested_threads: usize) -> (i64, i64, i64) {
    let n = (requested_threads.max(1) as f64).log2().floor() as i64;
    let num_usable = 1i64 << n;
    let n_block_cols = if n == 0 || n % 2 != 0 { n + 1 } else { n };
    let n_block_cols = n_block_cols.max(1);
    let n_block_rows = (num_usable / n_block_cols).max(1);
    (num_usable, n_block_cols, n_block_rows)
}

impl ClosestPointGrid {
    /// How many workers actually participate, after coercing the requested
    /// count down to a power of two. Exposed so callers can size their
    /// worker pool identically to the grid's block count.
    pub fn num_usable_threads(requested_threads: usize) -> usize {
        block_layout(requested_threads).0 as usize
    }

    /// Build the grid in parallel over its blocks. No two blocks share a
    /// cell, so no synchronization is needed between block workers.
    pub fn build(scene: &Scene, bl: Vec2, tr: Vec2, cell_length: f64, requested_threads: usize) -> ClosestPointGrid {
        let width = tr.x - bl.x;
        let height = tr.y - bl.y;
        let grid_width = (width / cell_length).ceil() as i64 + 1;
        let grid_height = (height / cell_length).ceil() as i64 + 1;

        let (num_usable, n_block_cols, n_block_rows) = block_layout(requested_threads);
        if num_usable as usize != requested_threads {
            tracing::warn!(
                requested_threads,
                num_usable,
                "CPG only utilizes 2^n blocks; using {num_usable} of {requested_threads} requested workers"
            );
        }

        let block_width = (grid_width as f64 / n_block_cols as f64).ceil() as i64;
        let block_height = (grid_height as f64 / n_block_rows as f64).ceil() as i64;
        let block_size = block_width * block_height;
        let n_blocks = n_block_cols * n_block_rows;

        let mut cells = vec![
            GridCell {
                dist: 0.0,
                boundary: Vec3::ZERO,
            };
            (n_blocks * block_size) as usize
        ];

        cells
            .par_chunks_mut(block_size as usize)
            .enumerate()
            .take(n_blocks as usize)
            .for_each(|(bid, block_cells)| {
                let bidy = bid as i64 / n_block_cols;
                let bidx = bid as i64 % n_block_cols;
                let max_idx = block_width.min(grid_width - block_width * bidx);
                let max_idy = block_height.min(grid_height - block_height * bidy);
                let block_x = bidx * block_width;
                let block_y = bidy * block_height;

                for idy in 0..max_idy {
                    for idx in 0..max_idx {
                        let id = (idx + idy * block_width) as usize;
                        let gp = Vec2::new(
                            bl.x + cell_length * (block_x + idx) as f64,
                            bl.y + cell_length * (block_y + idy) as f64,
                        );
                        let (_, boundary, dist) = scene.closest_point(gp);
                        block_cells[id] = GridCell {
                            dist: conservative_f32(dist),
                            boundary,
                        };
                    }
                }
            });

        ClosestPointGrid {
            bl,
            tr,
            cell_length,
            grid_width,
            grid_height,
            n_block_cols,
            block_width,
            block_height,
            block_size,
            cells,
        }
    }

    pub fn num_grid_points(&self) -> usize {
        (self.grid_width * self.grid_height) as usize
    }

    /// `true` iff `p` falls within `[bl, tr)`; queries outside this range
    /// must not be issued against the grid.
    pub fn point_in_range(&self, p: Vec2) -> bool {
        p.x >= self.bl.x && p.x < self.tr.x && p.y >= self.bl.y && p.y < self.tr.y
    }

    fn grid_coords(&self, p: Vec2) -> GridPoint {
        GridPoint::new(
            ((p.x - self.bl.x) / self.cell_length).floor() as i64,
            ((p.y - self.bl.y) / self.cell_length).floor() as i64,
        )
    }

    fn block_of(&self, g: GridPoint) -> (i64, i64) {
        (g.x / self.block_width, g.y / self.block_height)
    }

    fn cell_index(&self, g: GridPoint) -> usize {
        let (bx, by) = self.block_of(g);
        let bid = bx + by * self.n_block_cols;
        let local = (g.x - bx * self.block_width) + (g.y - by * self.block_height) * self.block_width;
        (local + bid * self.block_size) as usize
    }

    fn anchor(&self, g: GridPoint) -> Vec2 {
        Vec2::new(
            self.bl.x + self.cell_length * g.x as f64,
            self.bl.y + self.cell_length * g.y as f64,
        )
    }

    /// The id of the block owning `p`'s enclosing cell, the routing key
    /// used by the `RandomWalkManager`. Precondition: `p` is in
    /// range; callers check `point_in_range` first.
    pub fn block_id(&self, p: Vec2) -> Result<usize, PreconditionError> {
        if !self.point_in_range(p) {
            return Err(PreconditionError::PointOutOfGridRange { x: p.x, y: p.y });
        }
        let g = self.grid_coords(p);
        let (bx, by) = self.block_of(g);
        Ok((bx + by * self.n_block_cols) as usize)
    }

    /// Cached `(boundary, dist, gridDist)` for the cell enclosing `p`.
    /// Fails if `p` is outside `[bl, tr)`.
    pub fn get_dist_to_closest_point(&self, p: Vec2) -> Result<(Vec3, f64, f64), PreconditionError> {
        if !self.point_in_range(p) {
            return Err(PreconditionError::PointOutOfGridRange { x: p.x, y: p.y });
        }
        let g = self.grid_coords(p);
        let idx = self.cell_index(g);
        let cell = &self.cells[idx];
        let anchor = self.anchor(g);
        let grid_dist = (p - anchor).length();
        Ok((cell.boundary, cell.dist as f64, grid_dist))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::scene::{Disk, Scene, Window};

    fn disk_scene() -> Scene {
        Scene::new(
            "t".into(),
            Window { xmin: 0.0, ymin: 0.0, xmax: 10.0, ymax: 10.0 },
            vec![Disk {
                center: Vec2::new(5.0, 5.0),
                radius: 2.0,
                boundary: Vec3::new(0.3, 0.6, 0.9),
            }],
        )
    }

    #[test]
    fn block_layout_replicates_the_aspect_ratio_heuristic() {
        assert_eq!(block_layout(1), (1, 1, 1));
        assert_eq!(block_layout(4), (4, 2, 2));
        assert_eq!(block_layout(8), (8, 4, 2));
        assert_eq!(block_layout(6), (4, 2, 2));
    }

    #[test]
    fn conservative_bound_holds_for_many_samples() {
        let scene = disk_scene();
        let cpg = ClosestPointGrid::build(&scene, Vec2::new(0.0, 0.0), Vec2::new(10.0, 10.0), 0.1, 4);
        let mut rng_state: u64 = 0x1234_5678;
        for _ in 0..10_000 {
            rng_state = rng_state.wrapping_mul(6364136223846793005).wrapping_add(1);
            let x = ((rng_state >> 33) as f64 / u32::MAX as f64) * 10.0;
            rng_state = rng_state.wrapping_mul(6364136223846793005).wrapping_add(1);
            let y = ((rng_state >> 33) as f64 / u32::MAX as f64) * 10.0;
            let p = Vec2::new(x, y);
            let (_, _, true_dist) = scene.closest_point(p);
            let (_, dist, grid_dist) = cpg.get_dist_to_closest_point(p).unwrap();
            assert!(
                true_dist >= dist - grid_dist - 1e-9,
                "bound violated at ({x}, {y}): true={true_dist} bound={}",
                dist - grid_dist
            );
        }
    }

    #[test]
    fn out_of_range_query_is_a_precondition_error() {
        let scene = disk_scene();
        let cpg = ClosestPointGrid::build(&scene, Vec2::new(0.0, 0.0), Vec2::new(10.0, 10.0), 0.5, 1);
        assert!(cpg.get_dist_to_closest_point(Vec2::new(100.0, 100.0)).is_err());
    }

    #[test]
    fn identical_inputs_yield_identical_cells() {
        let scene = disk_scene();
        let a = ClosestPointGrid::build(&scene, Vec2::new(0.0, 0.0), Vec2::new(10.0, 10.0), 0.25, 4);
        let b = ClosestPointGrid::build(&scene, Vec2::new(0.0, 0.0), Vec2::new(10.0, 10.0), 0.25, 4);
        assert_eq!(a.cells.len(), b.cells.len());
        for (ca, cb) in a.cells.iter().zip(b.cells.iter()) {
            assert_eq!(ca.dist, cb.dist);
            assert_eq!(ca.boundary, cb.boundary);
        }
    }
}
