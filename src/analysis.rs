//! Diagnostic fields derived from the lattice. Nothing here mutates the lattice.
//!
//! All derivatives are in lattice units (node spacing 1); physical scaling is
//! applied by the output writers.

use nalgebra::DMatrix;

use crate::domain::grid2d::Region2D;
use crate::domain::lattice::{concentration, LatticeState};
use crate::numerical::derive::{central_difference, DerivativeDirection};
use crate::numerical::{magnitude, region_average};

/// Two-component field, both components indexed `(x, y)`.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorField {
    pub x: DMatrix<f64>,
    pub y: DMatrix<f64>,
}

impl VectorField {
    pub fn at(&self, x: usize, y: usize) -> [f64; 2] {
        [self.x[(x, y)], self.y[(x, y)]]
    }

    pub fn shape(&self) -> (usize, usize) {
        self.x.shape()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DerivedFields {
    pub density: DMatrix<f64>,
    pub gradient: VectorField,
    pub norm: DMatrix<f64>,
    /// Gradient of `norm`; an approximation kept as-is, not a true Laplacian.
    pub laplacian: VectorField,
}

impl DerivedFields {
    /// Every diagnostic over the whole lattice.
    pub fn compute(lattice: &LatticeState) -> Self {
        let density = density(lattice, Region2D::whole(lattice.dimensions()));
        let gradient = gradient(&density);
        let norm = norm(&gradient);
        let laplacian = self::gradient(&norm);
        Self {
            density,
            gradient,
            norm,
            laplacian,
        }
    }

    /// Mean gradient norm over the whole lattice ("average flux").
    pub fn average_flux(&self) -> f64 {
        let (nx, ny) = self.norm.shape();
        region_average(
            &self.norm,
            Region2D::new(0, nx.saturating_sub(1), 0, ny.saturating_sub(1)),
        )
    }
}

/// Concentration of every node in `region`, indexed relative to the region's
/// lower-left corner. A region outside the lattice yields an empty matrix.
pub fn density(lattice: &LatticeState, region: Region2D) -> DMatrix<f64> {
    match region.clip(lattice.dimensions()) {
        Some(r) => DMatrix::from_fn(r.width(), r.height(), |i, j| {
            concentration(lattice.get(r.x0 + i, r.y0 + j))
        }),
        None => DMatrix::zeros(0, 0),
    }
}

pub fn gradient(field: &DMatrix<f64>) -> VectorField {
    VectorField {
        x: central_difference(field, 1.0, DerivativeDirection::X),
        y: central_difference(field, 1.0, DerivativeDirection::Y),
    }
}

pub fn norm(field: &VectorField) -> DMatrix<f64> {
    magnitude(&field.x, &field.y)
}

pub fn gradient_norm(field: &DMatrix<f64>) -> DMatrix<f64> {
    norm(&gradient(field))
}

/// `gradient(norm(gradient(density)))`.
pub fn laplacian_approx(density: &DMatrix<f64>) -> VectorField {
    gradient(&gradient_norm(density))
}

pub fn average(field: &DMatrix<f64>, region: Region2D) -> f64 {
    region_average(field, region)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::grid2d::GridDimensions2D;
    use approx::assert_relative_eq;

    fn linear_field(nx: usize, ny: usize, a: f64, b: f64, c: f64) -> DMatrix<f64> {
        DMatrix::from_fn(nx, ny, |x, y| a * x as f64 + b * y as f64 + c)
    }

    #[test]
    fn test_density_after_equilibrium() {
        let dims = GridDimensions2D(6, 4);
        let mut lattice = LatticeState::new(dims).unwrap();
        lattice.initialize_at_equilibrium(Region2D::whole(dims), 0.35, [0.0, 0.0]);
        let rho = density(&lattice, Region2D::whole(dims));
        assert_eq!(rho.shape(), (6, 4));
        for value in rho.iter() {
            assert_relative_eq!(*value, 0.35, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_density_sub_region() {
        let dims = GridDimensions2D(5, 5);
        let mut lattice = LatticeState::new(dims).unwrap();
        lattice.initialize_at_equilibrium(Region2D::new(0, 0, 2, 2), 0.0, [0.0, 0.0]);
        let column = density(&lattice, Region2D::column(0, 0, 4));
        assert_eq!(column.shape(), (1, 5));
        assert_relative_eq!(column[(0, 2)], 0.0, epsilon = 1e-12);
        assert_eq!(column[(0, 1)], 1.0);
        assert_eq!(density(&lattice, Region2D::row(9, 0, 4)).len(), 0);
    }

    #[test]
    fn test_gradient_of_linear_field() {
        let (a, b) = (0.3, -1.2);
        let field = linear_field(7, 6, a, b, 2.0);
        let grad = gradient(&field);
        let n = norm(&grad);
        for x in 0..7 {
            for y in 0..6 {
                assert_relative_eq!(grad.at(x, y)[0], a, epsilon = 1e-12);
                assert_relative_eq!(grad.at(x, y)[1], b, epsilon = 1e-12);
                assert_relative_eq!(n[(x, y)], (a * a + b * b).sqrt(), epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_laplacian_of_linear_field_vanishes() {
        let field = linear_field(5, 5, 1.0, 2.0, 0.0);
        let lap = laplacian_approx(&field);
        assert!(lap.x.iter().chain(lap.y.iter()).all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_laplacian_is_gradient_of_norm() {
        // f = x^2 along x: |grad f| in the interior is 2x, so its gradient is 2.
        let field = DMatrix::from_fn(7, 3, |x, _| (x * x) as f64);
        let lap = laplacian_approx(&field);
        for x in 2..5 {
            assert_relative_eq!(lap.x[(x, 1)], 2.0, epsilon = 1e-12);
            assert_relative_eq!(lap.y[(x, 1)], 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_derived_fields_from_lattice() {
        let dims = GridDimensions2D(4, 4);
        let mut lattice = LatticeState::new(dims).unwrap();
        lattice.initialize_at_equilibrium(Region2D::whole(dims), 0.0, [0.0, 0.0]);
        lattice.initialize_at_equilibrium(Region2D::row(0, 0, 3), 1.0, [0.0, 0.0]);
        let fields = DerivedFields::compute(&lattice);
        assert_eq!(fields.density.shape(), (4, 4));
        assert_eq!(fields.gradient.shape(), (4, 4));
        assert_eq!(fields.laplacian.shape(), (4, 4));
        // One-sided at y = 0, central at y = 1.
        assert_relative_eq!(fields.gradient.at(2, 0)[1], -1.0, epsilon = 1e-12);
        assert_relative_eq!(fields.gradient.at(2, 1)[1], -0.5, epsilon = 1e-12);
        assert_relative_eq!(fields.norm[(2, 2)], 0.0, epsilon = 1e-12);
        // Rows 0..=3 have norms 1, 0.5, 0, 0.
        assert_relative_eq!(fields.average_flux(), 1.5 / 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_average_over_region() {
        let field = linear_field(3, 3, 1.0, 0.0, 0.0);
        assert_relative_eq!(average(&field, Region2D::column(2, 0, 2)), 2.0);
        assert_relative_eq!(
            average(&field, Region2D::whole(GridDimensions2D(3, 3))),
            1.0
        );
    }
}
