use crate::domain::grid2d::{GridDimensions2D, Region2D};
use crate::domain::lattice::LatticeState;

/// When a [`DirichletBoundary`] is imposed on the lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoundaryPolicy {
    /// Only at setup; streaming is then free to change the boundary nodes.
    SetupOnly,
    /// At setup and again after every collision-stream step.
    #[default]
    EveryStep,
}

/// Fixed concentration on a rectangle of nodes, imposed by replacing their
/// populations with the zero-velocity equilibrium.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirichletBoundary {
    pub region: Region2D,
    pub concentration: f64,
}

impl DirichletBoundary {
    pub fn new(region: Region2D, concentration: f64) -> Self {
        Self {
            region,
            concentration,
        }
    }

    /// The whole bottom row, `y = 0`.
    pub fn south(dimensions: GridDimensions2D, concentration: f64) -> Self {
        let GridDimensions2D(nx, _) = dimensions;
        Self::new(Region2D::row(0, 0, nx.saturating_sub(1)), concentration)
    }

    pub fn apply(&self, lattice: &mut LatticeState) {
        lattice.initialize_at_equilibrium(self.region, self.concentration, [0.0, 0.0]);
    }
}
