pub mod collision;
pub mod partition;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

use crate::boundary::bc2d::{BoundaryPolicy, DirichletBoundary};
use crate::domain::grid2d::GridDimensions2D;
use crate::domain::lattice::{concentration, equilibrium, opposite, LatticeState, Populations, C, Q};
use crate::error::SimulationError;
use collision::{Bgk, CollisionOperator};
use partition::{exchange_halos, partition_rows, split_bands, split_bands_mut, Band, BandView};

/// Advances a [`LatticeState`] by collide-then-stream steps.
///
/// Rows are split into contiguous bands, one per worker. Collision is
/// band-local; before streaming every band receives copies of its
/// neighbours' edge rows, so the result does not depend on the number of
/// workers.
#[derive(Debug)]
pub struct CollisionStreamEngine {
    dimensions: GridDimensions2D,
    omega: f64,
    velocity: [f64; 2],
    operator: Box<dyn CollisionOperator>,
    boundary: Option<DirichletBoundary>,
    policy: BoundaryPolicy,
    bands: Vec<Band>,
    pool: ThreadPool,
}

impl CollisionStreamEngine {
    pub fn new(
        dimensions: GridDimensions2D,
        omega: f64,
        workers: usize,
    ) -> Result<Self, SimulationError> {
        dimensions.validate()?;
        if workers == 0 {
            return Err(SimulationError::InvalidParameter(
                "worker count must be positive".to_string(),
            ));
        }
        let bands = partition_rows(dimensions.1, workers);
        let pool = ThreadPoolBuilder::new().num_threads(bands.len()).build()?;
        debug!("Partitioned {} rows into {} bands", dimensions.1, bands.len());
        Ok(Self {
            dimensions,
            omega,
            velocity: [0.0, 0.0],
            operator: Box::new(Bgk),
            boundary: None,
            policy: BoundaryPolicy::default(),
            bands,
            pool,
        })
    }

    pub fn with_operator(mut self, operator: Box<dyn CollisionOperator>) -> Self {
        self.operator = operator;
        self
    }

    /// Uniform advection velocity used in the local equilibrium.
    pub fn with_velocity(mut self, velocity: [f64; 2]) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_boundary(mut self, boundary: DirichletBoundary, policy: BoundaryPolicy) -> Self {
        self.boundary = Some(boundary);
        self.policy = policy;
        self
    }

    pub fn omega(&self) -> f64 {
        self.omega
    }

    pub fn workers(&self) -> usize {
        self.bands.len()
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    /// One full time step. Only the populations change.
    pub fn step(&self, lattice: &mut LatticeState) -> Result<(), SimulationError> {
        if lattice.dimensions() != self.dimensions {
            return Err(SimulationError::LatticeMismatch {
                expected: self.dimensions,
                found: lattice.dimensions(),
            });
        }
        let GridDimensions2D(nx, ny) = self.dimensions;
        let (current, next) = lattice.buffers_mut();

        self.pool.install(|| {
            split_bands_mut(&mut *current, &self.bands, nx)
                .into_par_iter()
                .for_each(|cells| self.collide(cells));

            let halos = exchange_halos(current, &self.bands, nx, ny);

            let reads = split_bands(current, &self.bands, nx);
            split_bands_mut(next, &self.bands, nx)
                .into_par_iter()
                .zip(reads.into_par_iter())
                .zip(halos.par_iter())
                .zip(self.bands.par_iter())
                .for_each(|(((out, cells), halo), band)| {
                    let view = BandView::new(*band, nx, cells, halo);
                    stream_band(&view, out, nx, ny);
                });
        });

        lattice.swap_buffers();

        if self.policy == BoundaryPolicy::EveryStep {
            if let Some(boundary) = &self.boundary {
                boundary.apply(lattice);
            }
        }
        Ok(())
    }

    fn collide(&self, cells: &mut [Populations]) {
        for f in cells.iter_mut() {
            let feq = equilibrium(concentration(f), self.velocity);
            *f = self.operator.relax(f, &feq, self.omega);
        }
    }
}

/// Pull streaming into `out` for every node of `view.band`.
///
/// A population whose source lies outside the domain is replaced by the
/// node's own opposite population (bounce-back), so closed edges carry no flux.
fn stream_band(view: &BandView<'_>, out: &mut [Populations], nx: usize, ny: usize) {
    for y in view.band.y0..view.band.y1 {
        for x in 0..nx {
            let Some(own) = view.get(x, y) else { continue };
            let target = &mut out[x + (y - view.band.y0) * nx];
            for i in 0..Q {
                let sx = x as isize - C[i][0] as isize;
                let sy = y as isize - C[i][1] as isize;
                let inside = sx >= 0 && sy >= 0 && (sx as usize) < nx && (sy as usize) < ny;
                let source = if inside {
                    view.get(sx as usize, sy as usize)
                } else {
                    None
                };
                target[i] = match source {
                    Some(neighbour) => neighbour[i],
                    None => own[opposite(i)],
                };
            }
        }
    }
}
