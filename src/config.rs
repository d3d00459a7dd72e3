use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::domain::grid2d::GridDimensions2D;
use crate::error::{ConfigError, PartialConfig};

pub const DEFAULT_LX: usize = 1;
pub const DEFAULT_LY: usize = 1;
pub const DEFAULT_RESOLUTION: usize = 20;
pub const DEFAULT_CONVERGENCE_ITER: usize = 20;
pub const DEFAULT_TAU_AD: f64 = 1.0;

/// Run parameters of the advection-diffusion lattice.
///
/// Everything else (`nx`, `ny`, `max_iterations`, `omega`) is derived at
/// construction and never changes afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationParameters {
    lx: usize,
    ly: usize,
    resolution: usize,
    convergence_iter: usize,
    tau_ad: f64,
    nx: usize,
    ny: usize,
    max_iterations: usize,
}

impl SimulationParameters {
    /// Fails if the derived lattice sizes do not fit in `usize`.
    pub fn new(
        lx: usize,
        ly: usize,
        resolution: usize,
        convergence_iter: usize,
        tau_ad: f64,
    ) -> Result<Self, ConfigError> {
        let mut params = Self {
            convergence_iter,
            tau_ad,
            ..Self::default()
        };
        params.resize("resolution", lx, ly, resolution)?;
        Ok(params)
    }

    pub fn lx(&self) -> usize {
        self.lx
    }

    pub fn ly(&self) -> usize {
        self.ly
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    pub fn convergence_iter(&self) -> usize {
        self.convergence_iter
    }

    pub fn tau_ad(&self) -> f64 {
        self.tau_ad
    }

    pub fn nx(&self) -> usize {
        self.nx
    }

    pub fn ny(&self) -> usize {
        self.ny
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn dimensions(&self) -> GridDimensions2D {
        GridDimensions2D(self.nx, self.ny)
    }

    /// Relaxation rate `1/tau`.
    pub fn omega(&self) -> f64 {
        1.0 / self.tau_ad
    }

    /// Physical grid spacing. Zero resolution falls back to unit spacing.
    pub fn dx(&self) -> f64 {
        if self.resolution == 0 {
            1.0
        } else {
            1.0 / self.resolution as f64
        }
    }

    /// BGK is only linearly stable for `0 < omega < 2`. Not enforced.
    pub fn is_stable(&self) -> bool {
        let omega = self.omega();
        omega.is_finite() && omega > 0.0 && omega < 2.0
    }

    /// Replaces the extents and re-derives the lattice sizes. On overflow
    /// `self` is left as it was and the error names `field`.
    fn resize(
        &mut self,
        field: &'static str,
        lx: usize,
        ly: usize,
        resolution: usize,
    ) -> Result<(), ConfigError> {
        let (nx, ny, max_iterations) =
            lattice_sizes(lx, ly, resolution).ok_or_else(|| ConfigError::InvalidField {
                field,
                reason: format!(
                    "lattice size overflows for lx = {lx}, ly = {ly}, resolution = {resolution}"
                ),
            })?;
        *self = Self {
            lx,
            ly,
            resolution,
            nx,
            ny,
            max_iterations,
            ..*self
        };
        Ok(())
    }
}

/// `(nx, ny, max_iterations)`, or `None` if any of them overflows.
fn lattice_sizes(lx: usize, ly: usize, resolution: usize) -> Option<(usize, usize, usize)> {
    let nx = lx.checked_mul(resolution)?.checked_add(1)?;
    let ny = ly.checked_mul(resolution)?.checked_add(1)?;
    let max_iterations = resolution.checked_mul(resolution)?;
    Some((nx, ny, max_iterations))
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            lx: DEFAULT_LX,
            ly: DEFAULT_LY,
            resolution: DEFAULT_RESOLUTION,
            convergence_iter: DEFAULT_CONVERGENCE_ITER,
            tau_ad: DEFAULT_TAU_AD,
            nx: DEFAULT_LX * DEFAULT_RESOLUTION + 1,
            ny: DEFAULT_LY * DEFAULT_RESOLUTION + 1,
            max_iterations: DEFAULT_RESOLUTION * DEFAULT_RESOLUTION,
        }
    }
}

/// Reads the entries in document order and stops at the first failure,
/// leaving later entries as they were.
fn read_inputs(params: &mut SimulationParameters, inputs: &Value) -> Result<(), ConfigError> {
    let lx = read_integer(inputs, "lx")?;
    params.resize("lx", lx, params.ly, params.resolution)?;
    let ly = read_integer(inputs, "ly")?;
    params.resize("ly", params.lx, ly, params.resolution)?;
    let resolution = read_integer(inputs, "resolution")?;
    params.resize("resolution", params.lx, params.ly, resolution)?;
    params.convergence_iter = read_integer(inputs, "convergenceIter")?;
    params.tau_ad = read_real(inputs, "tau_ad")?;
    Ok(())
}

fn read_integer(inputs: &Value, field: &'static str) -> Result<usize, ConfigError> {
    let value = inputs.get(field).ok_or(ConfigError::MissingField(field))?;
    let n = value.as_u64().ok_or_else(|| ConfigError::InvalidField {
        field,
        reason: format!("expected a non-negative integer, found {value}"),
    })?;
    usize::try_from(n).map_err(|e| ConfigError::InvalidField {
        field,
        reason: e.to_string(),
    })
}

fn read_real(inputs: &Value, field: &'static str) -> Result<f64, ConfigError> {
    let value = inputs.get(field).ok_or(ConfigError::MissingField(field))?;
    value.as_f64().ok_or_else(|| ConfigError::InvalidField {
        field,
        reason: format!("expected a number, found {value}"),
    })
}

/// Parses a parameter document of the form
/// `{"inputs": {"lx": .., "ly": .., "resolution": .., "convergenceIter": .., "tau_ad": ..}}`.
pub fn parse_parameters(document: &str) -> Result<SimulationParameters, PartialConfig> {
    let mut params = SimulationParameters::default();
    match parse_into(document, &mut params) {
        Ok(()) => Ok(params),
        Err(error) => Err(PartialConfig {
            error,
            fallback: params,
        }),
    }
}

fn parse_into(document: &str, params: &mut SimulationParameters) -> Result<(), ConfigError> {
    let root: Value = serde_json::from_str(document)?;
    info!("CONFIGURATION\n{}", serde_json::to_string_pretty(&root)?);
    let section = root.get("inputs").ok_or(ConfigError::MissingField("inputs"))?;
    read_inputs(params, section)
}

/// Loads the parameter document at `path`.
///
/// On failure the error carries the parameters built from whatever was read
/// before it, so the caller decides whether to continue with them.
pub fn load_parameters<P: AsRef<Path>>(path: P) -> Result<SimulationParameters, PartialConfig> {
    let path = path.as_ref();
    match fs::read_to_string(path) {
        Ok(document) => parse_parameters(&document),
        Err(source) => Err(PartialConfig {
            error: ConfigError::Io {
                path: path.display().to_string(),
                source,
            },
            fallback: SimulationParameters::default(),
        }),
    }
}
