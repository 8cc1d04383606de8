//! The MCWoG driver: the parallel worker loop that ties the
//! `ClosestPointGrid`, `RandomWalk`, and `RandomWalkManager` mesh together
//! to complete a pixel budget with bounded memory, plus the `advance` step
//! kernel.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Instant;

use rand::Rng;
use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::comp::grid::ClosestPointGrid;
use crate::comp::manager::{Mesh, RandomWalkManager};
use crate::comp::random_walk::RandomWalk;
use crate::storage::image::Image;
use crate::storage::scene::Scene;
use crate::storage::stats::{Stats, ThreadStats};
use crate::storage::vec_types::{Vec2, Vec3, sample_circle_point};

/// The ε-shell radius inside which a walk is considered absorbed.
pub const BOUNDARY_EPSILON: f64 = 1e-2;

/// Tunable parameters for an MCWoG (or WoG) render.
#[derive(Debug, Clone, Copy)]
pub struct McwogConfig {
    pub spp: u32,
    pub rr_prob: f64,
    /// CPG cell length multiplier (`--cellsize`, default 1).
    pub cell_size: f64,
    pub seed: Option<u64>,
}

impl Default for McwogConfig {
    fn default() -> McwogConfig {
        McwogConfig { spp: 16, rr_prob: 0.99, cell_size: 1.0, seed: None }
    }
}

fn thread_rng_for(tid: usize, seed: Option<u64>) -> SmallRng {
    match seed {
        Some(s) => SmallRng::seed_from_u64(s.wrapping_add(tid as u64)),
        None => SmallRng::from_os_rng(),
    }
}

/// The WoS step kernel: reaches for the cached grid bound first, falls back
/// to a direct closest-point query near the boundary or outside the grid,
/// then either absorbs, kills by Russian roulette, or steps to a random
/// point on the circle of radius `R`.
pub fn advance(
    rw: &mut RandomWalk,
    scene: &Scene,
    cpg: &ClosestPointGrid,
    rng: &mut impl Rng,
    min_grid_r: f64,
    rr_prob: f64,
    stats: &ThreadStats,
) -> bool {
    let (boundary, r, used_grid) = if cpg.point_in_range(rw.p) {
        stats.grid_queries.fetch_add(1, Ordering::Relaxed);
        let cpg_start = std::time::Instant::now();
        let (cached_b, dist, grid_dist) = cpg
            .get_dist_to_closest_point(rw.p)
            .expect("point_in_range just confirmed this query is valid");
        stats.add_cpg(cpg_start.elapsed());
        let conservative_r = dist - grid_dist;
        if conservative_r < min_grid_r {
            stats.closest_point_queries.fetch_add(1, Ordering::Relaxed);
            let cpq_start = std::time::Instant::now();
            let (_, b, dist) = scene.closest_point(rw.p);
            stats.add_cpq(cpq_start.elapsed());
            (b, dist, false)
        } else {
            (cached_b, conservative_r, true)
        }
    } else {
        stats.closest_point_queries.fetch_add(1, Ordering::Relaxed);
        let cpq_start = std::time::Instant::now();
        let (_, b, dist) = scene.closest_point(rw.p);
        stats.add_cpq(cpq_start.elapsed());
        (b, dist, false)
    };

    if r < BOUNDARY_EPSILON {
        rw.terminate(boundary);
    } else if rng.random::<f64>() < (1.0 - rr_prob) {
        rw.terminate(Vec3::ZERO);
    } else {
        let delta = sample_circle_point(r, rng.random::<f64>());
        rw.take_step(delta, (1.0 / rr_prob) as f32);
    }
    used_grid
}

/// `cellLength = cellSize · min(dx/res.x, dy/res.y)`, `minGridR = √2·ℓ`
/// configuration for a render.
pub fn cell_length(scene: &Scene, res: (u32, u32), cell_size: f64) -> f64 {
    cell_size * (scene.window.dx() / res.0 as f64).min(scene.window.dy() / res.1 as f64)
}

/// World coordinate of pixel `(x, y)` for a `res`-resolution image over
/// `window`, origin top-left, `(x+0.5, res.y-y-0.5)` pixel centers.
pub fn pixel_to_world(scene: &Scene, res: (u32, u32), x: u32, y: u32) -> Vec2 {
    let dx = scene.window.dx() / res.0 as f64;
    let dy = scene.window.dy() / res.1 as f64;
    Vec2::new(
        scene.window.xmin + (x as f64 + 0.5) * dx,
        scene.window.ymin + (res.1 as f64 - y as f64 - 0.5) * dy,
    )
}

/// Render with the full parallel MCWoG mesh scheduler.
pub fn render(scene: &Scene, res: (u32, u32), requested_threads: usize, cfg: McwogConfig, stats: &Stats) -> Image {
    let image = Image::new(euclid::Size2D::new(res.0, res.1));
    let window = scene.window;
    let bl = Vec2::new(window.xmin, window.ymin);
    let tr = Vec2::new(window.xmax, window.ymax);

    let ell = cell_length(scene, res, cfg.cell_size);
    let min_grid_r = std::f64::consts::SQRT_2 * ell;

    let grid_build_start = Instant::now();
    let cpg = Arc::new(ClosestPointGrid::build(scene, bl, tr, ell, requested_threads));
    *stats.grid_creation_time.lock().unwrap() = grid_build_start.elapsed();
    stats.grid_points.store(cpg.num_grid_points() as u64, Ordering::Relaxed);

    let n_usable = ClosestPointGrid::num_usable_threads(requested_threads);
    let mesh = Arc::new(Mesh::new(n_usable));

    let mut managers: Vec<RandomWalkManager> = (0..n_usable)
        .map(|tid| RandomWalkManager::new(mesh.clone(), cpg.clone(), tid))
        .collect();

    for iy in 0..res.1 {
        for ix in 0..res.0 {
            let coord = pixel_to_world(scene, res, ix, iy);
            let pixel_id = (ix + iy * res.0) as usize;
            let owner = managers[0].owner_of(coord);
            let rw = RandomWalk::new(owner, pixel_id, coord, cfg.spp);
            managers[owner].add_walk_to_buffer(rw);
        }
    }

    // One count per pixel: a pixel retires when all `spp` samples have
    // accumulated, not once per sample.
    let walks_remaining = Arc::new(AtomicI64::new(image.num_pixels() as i64));
    let image = Arc::new(image);

    std::thread::scope(|scope| {
        for (tid, manager) in managers.into_iter().enumerate() {
            let scene = &*scene;
            let cpg = cpg.clone();
            let image = image.clone();
            let walks_remaining = walks_remaining.clone();
            let thread_stats = &stats.threads[tid];
            let seed = cfg.seed;
            scope.spawn(move || {
                let thread_start = Instant::now();
                let mut rng = thread_rng_for(tid, seed);
                let mut manager = manager;
                loop {
                    let recv_start = Instant::now();
                    let active = manager.recv_active_walks();
                    thread_stats.add_recv(recv_start.elapsed());
                    let had_active = !active.is_empty();
                    for mut rw in active {
                        let _ = advance(&mut rw, scene, &cpg, &mut rng, min_grid_r, cfg.rr_prob, thread_stats);
                        manager.add_walk_to_buffer(rw);
                    }

                    let recv_start = Instant::now();
                    let terminated = manager.recv_terminated_walks();
                    thread_stats.add_recv(recv_start.elapsed());
                    let had_terminated = !terminated.is_empty();
                    let mut num_completed: i64 = 0;
                    for mut rw in terminated {
                        if rw.n_samples_left == 0 {
                            image.set(rw.pixel_id, rw.val * (1.0 / cfg.spp as f32));
                            num_completed += 1;
                        } else {
                            rw.initialize_walk();
                            manager.add_walk_to_buffer(rw);
                        }
                    }
                    if num_completed > 0 {
                        walks_remaining.fetch_sub(num_completed, Ordering::Relaxed);
                    }

                    let send_start = Instant::now();
                    manager.send_walks();
                    thread_stats.add_send(send_start.elapsed());

                    if walks_remaining.load(Ordering::Relaxed) <= 0 {
                        break;
                    }
                    if !had_active && !had_terminated {
                        std::thread::yield_now();
                    }
                }
                thread_stats.add_total(thread_start.elapsed());
            });
        }
    });

    Arc::try_unwrap(image).unwrap_or_else(|_| unreachable!("all worker threads have joined"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::scene::{Disk, Window};

    fn degenerate_disk_scene() -> Scene {
        Scene::new(
            "degenerate".into(),
            Window { xmin: -1.0, ymin: -1.0, xmax: 1.0, ymax: 1.0 },
            vec![Disk { center: Vec2::new(0.0, 0.0), radius: 0.5, boundary: Vec3::new(1.0, 0.0, 0.0) }],
        )
    }

    #[test]
    fn every_pixel_written_exactly_once() {
        let scene = degenerate_disk_scene();
        let stats = Stats::new(4);
        let cfg = McwogConfig { spp: 4, seed: Some(1), ..Default::default() };
        let image = render(&scene, (16, 16), 4, cfg, &stats);
        assert_eq!(image.num_pixels(), 256);
    }

    #[test]
    fn single_red_disk_never_produces_green_or_blue() {
        // the scene's only boundary color is pure red, and Russian-roulette
        // kills contribute pure black, so no pixel can ever pick up green
        // or blue regardless of how the walk wanders.
        let scene = degenerate_disk_scene();
        let stats = Stats::new(1);
        let cfg = McwogConfig { spp: 32, seed: Some(42), ..Default::default() };
        let image = render(&scene, (8, 8), 1, cfg, &stats);
        for idx in 0..image.num_pixels() {
            let px = image.pixel_for_test(idx);
            assert_eq!(px.g, 0.0);
            assert_eq!(px.b, 0.0);
        }
    }
}
