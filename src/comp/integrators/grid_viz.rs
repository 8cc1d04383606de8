//! Grid visualization: builds the `ClosestPointGrid` and renders its cached
//! conservative distance field directly, the fastest way to see whether the
//! CPG's conservative-bound invariant looks right before trusting it inside
//! a random walk.

use rayon::prelude::*;

use crate::comp::grid::ClosestPointGrid;
use crate::comp::integrators::RenderConfig;
use crate::comp::mcwog::{cell_length, pixel_to_world};
use crate::storage::image::Image;
use crate::storage::scene::Scene;
use crate::storage::stats::Stats;
use crate::storage::vec_types::{Vec2, Vec3};

pub fn render(scene: &Scene, cfg: RenderConfig, stats: &Stats) -> Image {
    let window = scene.window;
    let bl = Vec2::new(window.xmin, window.ymin);
    let tr = Vec2::new(window.xmax, window.ymax);
    let ell = cell_length(scene, cfg.res, cfg.cell_size);

    let start = std::time::Instant::now();
    let cpg = ClosestPointGrid::build(scene, bl, tr, ell, cfg.nthreads);
    *stats.grid_creation_time.lock().unwrap() = start.elapsed();
    stats.grid_points.store(cpg.num_grid_points() as u64, std::sync::atomic::Ordering::Relaxed);

    let image = Image::new(euclid::Size2D::new(cfg.res.0, cfg.res.1));
    (0..image.num_pixels()).into_par_iter().for_each(|idx| {
        let ix = (idx as u32) % cfg.res.0;
        let iy = (idx as u32) / cfg.res.0;
        let p = pixel_to_world(scene, cfg.res, ix, iy);
        let dist = if cpg.point_in_range(p) {
            let (_, dist, grid_dist) = cpg.get_dist_to_closest_point(p).unwrap();
            (dist - grid_dist).max(0.0)
        } else {
            let (_, _, dist) = scene.closest_point(p);
            dist
        };
        image.set(idx, Vec3::new(dist as f32, dist as f32, dist as f32));
    });
    image
}
