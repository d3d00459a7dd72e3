use nalgebra::DMatrix;

/// Specifies the direction in which to take the derivative.
///
/// Fields are indexed `(x, y)`, so `X` runs along the rows of the matrix
/// and `Y` along its columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivativeDirection {
    X,
    Y,
}

/// Computes the derivative of a 2D field and returns a matrix of the same shape.
///
/// Central differences are used at interior points and first-order one-sided
/// differences on the two edges of the derivative direction. Along an axis with
/// a single node the derivative is zero.
///
/// # Arguments
/// - `field`: The input field, indexed `(x, y)`.
/// - `d`: The spacing (step size) in the derivative direction.
/// - `dir`: The direction (`X` or `Y`) in which to compute the derivative.
///
/// # Example
/// ```
/// use lbm_diffusion::numerical::derive::{central_difference, DerivativeDirection};
/// use nalgebra::DMatrix;
///
/// let field = DMatrix::from_fn(4, 3, |x, _| (x * x) as f64);
/// let deriv = central_difference(&field, 1.0, DerivativeDirection::X);
/// assert_eq!(deriv[(0, 0)], 1.0); // forward difference
/// assert_eq!(deriv[(1, 0)], 2.0); // (4 - 0) / 2
/// assert_eq!(deriv[(3, 0)], 5.0); // backward difference
/// ```
pub fn central_difference(field: &DMatrix<f64>, d: f64, dir: DerivativeDirection) -> DMatrix<f64> {
    let (nrows, ncols) = field.shape();
    let mut deriv = DMatrix::<f64>::zeros(nrows, ncols);

    match dir {
        DerivativeDirection::X => {
            if nrows < 2 {
                return deriv;
            }
            for c in 0..ncols {
                for r in 1..nrows - 1 {
                    deriv[(r, c)] = (field[(r + 1, c)] - field[(r - 1, c)]) / (2.0 * d);
                }
                deriv[(0, c)] = (field[(1, c)] - field[(0, c)]) / d;
                deriv[(nrows - 1, c)] = (field[(nrows - 1, c)] - field[(nrows - 2, c)]) / d;
            }
        }
        DerivativeDirection::Y => {
            if ncols < 2 {
                return deriv;
            }
            for r in 0..nrows {
                for c in 1..ncols - 1 {
                    deriv[(r, c)] = (field[(r, c + 1)] - field[(r, c - 1)]) / (2.0 * d);
                }
                deriv[(r, 0)] = (field[(r, 1)] - field[(r, 0)]) / d;
                deriv[(r, ncols - 1)] = (field[(r, ncols - 1)] - field[(r, ncols - 2)]) / d;
            }
        }
    }

    deriv
}
