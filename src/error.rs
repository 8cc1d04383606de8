//! Error taxonomy, matching the classification in the design's error
//! handling section: configuration errors, precondition violations, and
//! output failures. All three terminate the process with a single
//! diagnostic line; there is no partial-result recovery.

use thiserror::Error;

/// Malformed input discovered before any render work starts: bad CLI flags,
/// an unopenable or malformed scene file, an unknown integrator name.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown integrator '{0}' (expected one of: wos, dist, gridviz, wog, wogviz, mcwog, mcwogviz)")]
    UnknownIntegrator(String),

    #[error("scene file '{path}' could not be opened: {source}")]
    SceneUnopenable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("scene file '{path}' line {line}: malformed record '{content}'")]
    MalformedSceneLine {
        path: String,
        line: usize,
        content: String,
    },

    #[error("scene file '{path}' has no window line")]
    MissingWindow { path: String },

    #[error("scene '{path}' contains no geometry")]
    EmptyScene { path: String },

    #[error("invalid value for --{flag}: '{value}'")]
    InvalidFlag { flag: &'static str, value: String },
}

/// A driver invariant was violated. These indicate a bug in the scheduler or
/// grid, not bad input, and are always fatal.
#[derive(Debug, Error)]
pub enum PreconditionError {
    #[error("point ({x}, {y}) is outside the closest-point grid's range")]
    PointOutOfGridRange { x: f64, y: f64 },
}

/// Failure to produce the final artifact.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to write image '{path}': {source}")]
    ImageWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Top-level error type surfaced to `main`, aggregating all three
/// categories so the process can exit non-zero with a single diagnostic.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Precondition(#[from] PreconditionError),
    #[error(transparent)]
    Output(#[from] OutputError),
}
