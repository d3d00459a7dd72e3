pub mod analytic;
pub mod derive;

use nalgebra::DMatrix;

use crate::domain::grid2d::{GridDimensions2D, Region2D};

/// Arithmetic mean of `field` over `region` (clipped to the field).
/// An empty intersection averages to zero.
pub fn region_average(field: &DMatrix<f64>, region: Region2D) -> f64 {
    let dims = GridDimensions2D(field.nrows(), field.ncols());
    let Some(region) = region.clip(dims) else {
        return 0.0;
    };
    let view = field.view((region.x0, region.y0), (region.width(), region.height()));
    view.sum() / view.len() as f64
}

/// Element-wise Euclidean magnitude of a two-component field.
pub fn magnitude(x: &DMatrix<f64>, y: &DMatrix<f64>) -> DMatrix<f64> {
    x.zip_map(y, |a, b| a.hypot(b))
}
