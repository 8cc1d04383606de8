//! The seven integrators selectable via `--integrator`. `mcwog` is the
//! core estimator (see [`crate::comp::mcwog`]); the rest are thin variants
//! built from the same pieces, useful as correctness oracles and profiling
//! aids for it.

pub mod distance;
pub mod grid_viz;
pub mod mcwog_viz;
pub mod wog;
pub mod wog_viz;
pub mod wos;

use std::str::FromStr;

use crate::comp::mcwog::McwogConfig;
use crate::error::ConfigError;
use crate::storage::image::Image;
use crate::storage::scene::Scene;
use crate::storage::stats::Stats;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegratorKind {
    Wos,
    Distance,
    GridViz,
    Wog,
    WogViz,
    Mcwog,
    McwogViz,
}

impl IntegratorKind {
    pub fn name(&self) -> &'static str {
        match self {
            IntegratorKind::Wos => "wos",
            IntegratorKind::Distance => "dist",
            IntegratorKind::GridViz => "gridviz",
            IntegratorKind::Wog => "wog",
            IntegratorKind::WogViz => "wogviz",
            IntegratorKind::Mcwog => "mcwog",
            IntegratorKind::McwogViz => "mcwogviz",
        }
    }
}

impl FromStr for IntegratorKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<IntegratorKind, ConfigError> {
        match s {
            "wos" => Ok(IntegratorKind::Wos),
            "dist" => Ok(IntegratorKind::Distance),
            "gridviz" => Ok(IntegratorKind::GridViz),
            "wog" => Ok(IntegratorKind::Wog),
            "wogviz" => Ok(IntegratorKind::WogViz),
            "mcwog" => Ok(IntegratorKind::Mcwog),
            "mcwogviz" => Ok(IntegratorKind::McwogViz),
            other => Err(ConfigError::UnknownIntegrator(other.to_string())),
        }
    }
}

/// Parameters shared by every integrator, built once from parsed CLI flags.
#[derive(Debug, Clone, Copy)]
pub struct RenderConfig {
    pub res: (u32, u32),
    pub spp: u32,
    pub nthreads: usize,
    pub cell_size: f64,
    pub seed: Option<u64>,
}

/// Build and run the named integrator, returning the finished image.
pub fn run(kind: IntegratorKind, scene: &Scene, cfg: RenderConfig, stats: &Stats) -> Image {
    match kind {
        IntegratorKind::Wos => wos::render(scene, cfg, stats),
        IntegratorKind::Distance => distance::render(scene, cfg),
        IntegratorKind::GridViz => grid_viz::render(scene, cfg, stats),
        IntegratorKind::Wog => wog::render(scene, cfg, stats),
        IntegratorKind::WogViz => wog_viz::render(scene, cfg, stats),
        IntegratorKind::Mcwog => {
            let mcwog_cfg = McwogConfig { spp: cfg.spp, cell_size: cfg.cell_size, seed: cfg.seed, ..Default::default() };
            crate::comp::mcwog::render(scene, cfg.res, cfg.nthreads, mcwog_cfg, stats)
        }
        IntegratorKind::McwogViz => mcwog_viz::render(scene, cfg, stats),
    }
}

// end of file
