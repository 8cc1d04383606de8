// Main program for wos-render

mod cli;
mod comp;
mod error;
mod storage;

use std::path::Path;
use std::time::Instant;

use clap::Parser;

use crate::cli::{Cli, Config};
use crate::comp::integrators::{self, RenderConfig};
use crate::error::{ConfigError, RenderError};
use crate::storage::scene::Scene;
use crate::storage::stats::Stats;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), RenderError> {
    let cli = Cli::parse();
    let cfg: Config = cli.try_into().map_err(RenderError::Config)?;

    let scene = Scene::load(Path::new(&cfg.scene_file)).map_err(RenderError::Config)?;
    if cfg.nthreads == 0 {
        return Err(ConfigError::InvalidFlag { flag: "nthreads", value: "0".to_string() }.into());
    }

    let stats = Stats::new(cfg.nthreads.max(1));
    let render_cfg = RenderConfig {
        res: cfg.res,
        spp: cfg.spp,
        nthreads: cfg.nthreads,
        cell_size: cfg.cellsize,
        seed: cfg.seed,
    };

    let total_start = Instant::now();
    tracing::info!(
        integrator = cfg.integrator.name(),
        scene = scene.name.as_str(),
        spp = cfg.spp,
        nthreads = cfg.nthreads,
        "starting render"
    );
    let image = integrators::run(cfg.integrator, &scene, render_cfg, &stats);
    *stats.total_time.lock().unwrap() = total_start.elapsed();

    let filename = format!(
        "{}_scene={}_spp={}_nthreads={}.hdr",
        cfg.integrator.name(),
        scene.name,
        cfg.spp,
        cfg.nthreads
    );
    image.save_hdr(Path::new(&filename)).map_err(RenderError::Output)?;

    println!("{}", stats.report());
    tracing::info!(path = filename.as_str(), "wrote image");

    Ok(())
}

// end of file
