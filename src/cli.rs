//! Command-line interface. One positional argument (the scene file
//! path) and several optional flags.

use clap::Parser;

use crate::comp::integrators::IntegratorKind;
use crate::error::ConfigError;

#[derive(Parser, Debug)]
#[command(name = "wos-render", version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Path to the scene file
    pub scene_file: String,

    /// Samples per pixel
    #[arg(long, default_value_t = 16)]
    pub spp: u32,

    /// Worker thread count
    #[arg(long, default_value_t = 1)]
    pub nthreads: usize,

    /// Output resolution, width then height
    #[arg(long, num_args = 2, default_values_t = [128u32, 128u32])]
    pub res: Vec<u32>,

    /// Integrator: wos|dist|gridviz|wog|wogviz|mcwog|mcwogviz
    #[arg(long, default_value = "wos")]
    pub integrator: String,

    /// CPG cell length multiplier
    #[arg(long, default_value_t = 1.0)]
    pub cellsize: f64,

    /// Fixed RNG seed, for reproducible renders (not present in the
    /// original; needed to make fixed-seed comparisons testable at all)
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Parsed, validated configuration ready to hand to an integrator.
pub struct Config {
    pub scene_file: String,
    pub spp: u32,
    pub nthreads: usize,
    pub res: (u32, u32),
    pub integrator: IntegratorKind,
    pub cellsize: f64,
    pub seed: Option<u64>,
}

impl TryFrom<Cli> for Config {
    type Error = ConfigError;

    fn try_from(cli: Cli) -> Result<Config, ConfigError> {
        let integrator: IntegratorKind = cli.integrator.parse()?;
        if cli.res.len() != 2 {
            return Err(ConfigError::InvalidFlag { flag: "res", value: format!("{:?}", cli.res) });
        }
        if cli.cellsize <= 0.0 {
            return Err(ConfigError::InvalidFlag { flag: "cellsize", value: cli.cellsize.to_string() });
        }
        if cli.spp == 0 {
            return Err(ConfigError::InvalidFlag { flag: "spp", value: cli.spp.to_string() });
        }
        Ok(Config {
            scene_file: cli.scene_file,
            spp: cli.spp,
            nthreads: cli.nthreads.max(1),
            res: (cli.res[0], cli.res[1]),
            integrator,
            cellsize: cli.cellsize,
            seed: cli.seed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_integrator() {
        let cli = Cli { scene_file: "x".into(), spp: 16, nthreads: 1, res: vec![4, 4], integrator: "bogus".into(), cellsize: 1.0, seed: None };
        assert!(Config::try_from(cli).is_err());
    }

    #[test]
    fn accepts_default_wos() {
        let cli = Cli { scene_file: "x".into(), spp: 16, nthreads: 1, res: vec![4, 4], integrator: "wos".into(), cellsize: 1.0, seed: None };
        let cfg = Config::try_from(cli).unwrap();
        assert_eq!(cfg.integrator, IntegratorKind::Wos);
        assert_eq!(cfg.res, (4, 4));
    }
}
