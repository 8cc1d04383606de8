//! Plain Walk-on-Spheres: no cached grid, a direct closest-point query every
//! step. The simplest correct estimator, and a single-threaded oracle to
//! compare the mesh-routed `mcwog` output against.

use rand::Rng;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::comp::integrators::RenderConfig;
use crate::comp::mcwog::{pixel_to_world, BOUNDARY_EPSILON};
use crate::storage::image::Image;
use crate::storage::scene::Scene;
use crate::storage::stats::Stats;
use crate::storage::vec_types::{Vec3, sample_circle_point};

const RR_PROB: f64 = 0.99;

/// Run `spp` independent samples of plain WoS starting from `p`.
pub fn estimate(scene: &Scene, p: crate::storage::vec_types::Vec2, spp: u32, rng: &mut impl Rng) -> Vec3 {
    let mut val = Vec3::ZERO;
    for _ in 0..spp {
        let mut pos = p;
        let mut f = 1.0f32;
        loop {
            let (_, b, r) = scene.closest_point(pos);
            if r < BOUNDARY_EPSILON {
                val = val + b * f;
                break;
            }
            if rng.random::<f64>() < (1.0 - RR_PROB) {
                break; // roulette kill contributes zero
            }
            let delta = sample_circle_point(r, rng.random::<f64>());
            pos += delta.to_vector();
            f *= (1.0 / RR_PROB) as f32;
        }
    }
    val * (1.0 / spp as f32)
}

pub fn render(scene: &Scene, cfg: RenderConfig, _stats: &Stats) -> Image {
    let image = Image::new(euclid::Size2D::new(cfg.res.0, cfg.res.1));
    let n = image.num_pixels();
    (0..n).into_par_iter().for_each(|idx| {
        let ix = (idx as u32) % cfg.res.0;
        let iy = (idx as u32) / cfg.res.0;
        let p = pixel_to_world(scene, cfg.res, ix, iy);
        let mut rng = match cfg.seed {
            Some(s) => SmallRng::seed_from_u64(s.wrapping_add(idx as u64)),
            None => SmallRng::from_os_rng(),
        };
        let val = estimate(scene, p, cfg.spp, &mut rng);
        image.set(idx, val);
    });
    image
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::scene::{Disk, Window};
    use crate::storage::vec_types::Vec2;

    #[test]
    fn point_inside_a_disk_terminates_in_zero_steps() {
        let scene = Scene::new(
            "t".into(),
            Window { xmin: -1.0, ymin: -1.0, xmax: 1.0, ymax: 1.0 },
            vec![Disk { center: Vec2::new(0.0, 0.0), radius: 0.5, boundary: Vec3::new(1.0, 0.0, 0.0) }],
        );
        // distance from (0.499, 0) to the boundary circle is 0.001 < EPSILON
        let mut rng = SmallRng::seed_from_u64(7);
        let val = estimate(&scene, Vec2::new(0.499, 0.0), 1, &mut rng);
        assert_eq!(val, Vec3::new(1.0, 0.0, 0.0));
    }
}
