use nalgebra::DMatrix;
use tracing::debug;

use crate::domain::grid2d::{GridDimensions2D, Region2D};
use crate::error::GridError;

/// Number of discrete velocities in the D2Q5 set.
pub const Q: usize = 5;

/// Population offsets `f_i - t_i` of one node.
pub type Populations = [f64; Q];

/// Lattice velocities: rest, west, south, east, north.
pub const C: [[i32; 2]; Q] = [[0, 0], [-1, 0], [0, -1], [1, 0], [0, 1]];

/// Lattice weights.
pub const T: [f64; Q] = [1.0 / 3.0, 1.0 / 6.0, 1.0 / 6.0, 1.0 / 6.0, 1.0 / 6.0];

/// Inverse squared lattice sound speed (`c_s^2 = 1/3`).
pub const INV_CS2: f64 = 3.0;

/// Index of the velocity pointing the other way.
pub const fn opposite(i: usize) -> usize {
    match i {
        0 => 0,
        1 | 2 => i + 2,
        _ => i - 2,
    }
}

/// Equilibrium offsets for concentration `c` advected with velocity `u`:
/// `t_i (c - 1) + t_i c (c_i . u) / c_s^2`.
///
/// At `c = 1`, `u = 0` every offset is exactly zero.
pub fn equilibrium(concentration: f64, velocity: [f64; 2]) -> Populations {
    let rho_bar = concentration - 1.0;
    let mut feq = [0.0; Q];
    for (i, f) in feq.iter_mut().enumerate() {
        let c_u = C[i][0] as f64 * velocity[0] + C[i][1] as f64 * velocity[1];
        *f = T[i] * rho_bar + T[i] * concentration * c_u * INV_CS2;
    }
    feq
}

/// Concentration carried by a node, `1 + sum(offsets)`.
pub fn concentration(populations: &Populations) -> f64 {
    1.0 + populations.iter().sum::<f64>()
}

/// D2Q5 populations for every node of an `nx x ny` lattice.
///
/// Storage is column-major with `x` as the row index, so all nodes of a
/// lattice row `y` are contiguous. A second buffer of the same shape is the
/// streaming target.
#[derive(Debug, Clone)]
pub struct LatticeState {
    dimensions: GridDimensions2D,
    populations: DMatrix<Populations>,
    scratch: DMatrix<Populations>,
}

impl LatticeState {
    /// Every node starts at zero offsets, i.e. concentration 1.
    pub fn new(dimensions: GridDimensions2D) -> Result<Self, GridError> {
        dimensions.validate()?;
        let GridDimensions2D(nx, ny) = dimensions;
        Ok(Self {
            dimensions,
            populations: DMatrix::from_element(nx, ny, [0.0; Q]),
            scratch: DMatrix::from_element(nx, ny, [0.0; Q]),
        })
    }

    pub fn dimensions(&self) -> GridDimensions2D {
        self.dimensions
    }

    pub fn populations(&self) -> &DMatrix<Populations> {
        &self.populations
    }

    pub fn get(&self, x: usize, y: usize) -> &Populations {
        &self.populations[(x, y)]
    }

    pub fn get_mut(&mut self, x: usize, y: usize) -> &mut Populations {
        &mut self.populations[(x, y)]
    }

    pub fn concentration_at(&self, x: usize, y: usize) -> f64 {
        concentration(self.get(x, y))
    }

    /// Sum of the concentration over all nodes.
    pub fn total_mass(&self) -> f64 {
        self.populations.iter().map(concentration).sum()
    }

    /// Overwrites every node of `region` (clipped to the lattice) with the
    /// equilibrium for `(concentration, velocity)`.
    pub fn initialize_at_equilibrium(
        &mut self,
        region: Region2D,
        concentration: f64,
        velocity: [f64; 2],
    ) {
        let Some(region) = region.clip(self.dimensions) else {
            return;
        };
        let feq = equilibrium(concentration, velocity);
        for (x, y) in region.cells() {
            self.populations[(x, y)] = feq;
        }
    }

    /// Emits every population of node `(x, y)` and its concentration at debug level.
    pub fn log_populations(&self, x: usize, y: usize, label: &str) {
        let cell = self.get(x, y);
        debug!("printing {} @ x,y = {},{}", label, x, y);
        for (i, offset) in cell.iter().enumerate() {
            debug!("i = {}; population = {}", i, offset + T[i]);
        }
        debug!("concentration = {}", concentration(cell));
    }

    /// Current populations (read side) and streaming target (write side).
    pub(crate) fn buffers_mut(&mut self) -> (&mut [Populations], &mut [Populations]) {
        (self.populations.as_mut_slice(), self.scratch.as_mut_slice())
    }

    /// Makes the streaming target the current state.
    pub(crate) fn swap_buffers(&mut self) {
        std::mem::swap(&mut self.populations, &mut self.scratch);
    }
}
