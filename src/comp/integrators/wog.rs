//! Single-threaded Walk-on-Grid: WoS accelerated by the `ClosestPointGrid`
//! but without the worker mesh. The natural stepping stone between `wos`
//! and `mcwog`, and useful as a single-threaded correctness oracle for the
//! mesh-routed driver.

use rand::SeedableRng;
use rand::rngs::SmallRng;

use crate::comp::grid::ClosestPointGrid;
use crate::comp::integrators::RenderConfig;
use crate::comp::mcwog::{advance, cell_length, pixel_to_world};
use crate::comp::random_walk::RandomWalk;
use crate::storage::image::Image;
use crate::storage::scene::Scene;
use crate::storage::stats::Stats;
use crate::storage::vec_types::Vec2;

const RR_PROB: f64 = 0.99;

pub fn render(scene: &Scene, cfg: RenderConfig, stats: &Stats) -> Image {
    let window = scene.window;
    let bl = Vec2::new(window.xmin, window.ymin);
    let tr = Vec2::new(window.xmax, window.ymax);
    let ell = cell_length(scene, cfg.res, cfg.cell_size);
    let min_grid_r = std::f64::consts::SQRT_2 * ell;

    let start = std::time::Instant::now();
    let cpg = ClosestPointGrid::build(scene, bl, tr, ell, 1);
    *stats.grid_creation_time.lock().unwrap() = start.elapsed();
    stats.grid_points.store(cpg.num_grid_points() as u64, std::sync::atomic::Ordering::Relaxed);

    let image = Image::new(euclid::Size2D::new(cfg.res.0, cfg.res.1));
    let mut rng = match cfg.seed {
        Some(s) => SmallRng::seed_from_u64(s),
        None => SmallRng::from_os_rng(),
    };
    let thread_stats = &stats.threads[0];

    for iy in 0..cfg.res.1 {
        for ix in 0..cfg.res.0 {
            let p = pixel_to_world(scene, cfg.res, ix, iy);
            let pixel_id = (ix + iy * cfg.res.0) as usize;
            let mut rw = RandomWalk::new(0, pixel_id, p, cfg.spp);
            for _ in 0..cfg.spp {
                loop {
                    let _ = advance(&mut rw, scene, &cpg, &mut rng, min_grid_r, RR_PROB, thread_stats);
                    if rw.terminated {
                        break;
                    }
                }
                if rw.n_samples_left > 0 {
                    rw.initialize_walk();
                }
            }
            image.set(pixel_id, rw.val * (1.0 / cfg.spp as f32));
        }
    }
    image
}
