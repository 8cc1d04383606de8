//! Single-threaded grid-usage visualization: same walk kernel as `wog`, but
//! the pixel value is the fraction of steps that were satisfied by the
//! cached grid bound rather than falling back to a direct closest-point
//! query. A profiling aid for tuning `minGridR`.

use rand::SeedableRng;
use rand::rngs::SmallRng;

use crate::comp::integrators::RenderConfig;
use crate::comp::mcwog::{advance, cell_length, pixel_to_world};
use crate::comp::random_walk::RandomWalk;
use crate::comp::grid::ClosestPointGrid;
use crate::storage::image::Image;
use crate::storage::scene::Scene;
use crate::storage::stats::Stats;
use crate::storage::vec_types::Vec2;
use crate::storage::vec_types::Vec3;

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
            let mut grid_steps = 0u32;
            let mut total_steps = 0u32;
            for _ in 0..cfg.spp {
                loop {
                    let used_grid = advance(&mut rw, scene, &cpg, &mut rng, min_grid_r, RR_PROB, thread_stats);
                    total_steps += 1;
                    if used_grid {
                        grid_steps += 1;
                    }
                    if rw.terminated {
                        break;
                    }
                }
                if rw.n_samples_left > 0 {
                    rw.initialize_walk();
                }
            }
            let frac = if total_steps > 0 { grid_steps as f32 / total_steps as f32 } else { 0.0 };
            image.set(pixel_id, Vec3::new(frac, frac, frac));
        }
    }
    image
}
