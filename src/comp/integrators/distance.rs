//! Distance visualization: one closest-point query per pixel, no random
//! walk at all. A fast sanity check of the `Scene` contract independent of
//! everything downstream of it.

use rayon::prelude::*;

use crate::comp::integrators::RenderConfig;
use crate::comp::mcwog::pixel_to_world;
use crate::storage::image::Image;
use crate::storage::scene::Scene;
use crate::storage::vec_types::Vec3;

pub fn render(scene: &Scene, cfg: RenderConfig) -> Image {
    let image = Image::new(euclid::Size2D::new(cfg.res.0, cfg.res.1));
    (0..image.num_pixels()).into_par_iter().for_each(|idx| {
        let ix = (idx as u32) % cfg.res.0;
        let iy = (idx as u32) / cfg.res.0;
        let p = pixel_to_world(scene, cfg.res, ix, iy);
        let (_, _, dist) = scene.closest_point(p);
        image.set(idx, Vec3::new(dist as f32, dist as f32, dist as f32));
    });
    image
}
