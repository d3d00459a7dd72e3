use std::fmt::Debug;

use crate::domain::lattice::{Populations, Q};

/// Local relaxation of a node's populations toward their equilibrium.
pub trait CollisionOperator: Debug + Send + Sync {
    fn relax(
        &self,
        populations: &Populations,
        equilibrium: &Populations,
        omega: f64,
    ) -> Populations;
}

/// Single-relaxation-time operator: `f_i' = f_i - omega (f_i - f_i^eq)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bgk;

impl CollisionOperator for Bgk {
    fn relax(
        &self,
        populations: &Populations,
        equilibrium: &Populations,
        omega: f64,
    ) -> Populations {
        let mut relaxed = [0.0; Q];
        for i in 0..Q {
            relaxed[i] = populations[i] - omega * (populations[i] - equilibrium[i]);
        }
        relaxed
    }
}
