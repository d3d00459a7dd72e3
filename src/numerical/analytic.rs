//! Closed-form reference for 1-D diffusion into a semi-infinite medium held
//! at unit concentration on its boundary and initially empty.

/// Lattice diffusivity of the D2Q5 BGK model, `c_s^2 (tau - 1/2)`.
pub fn diffusivity(tau: f64) -> f64 {
    (tau - 0.5) / 3.0
}

const ERFC_COEFFICIENTS: [f64; 10] = [
    -1.26551223,
    1.00002368,
    0.37409196,
    0.09678418,
    -0.18628806,
    0.27886807,
    -1.13520398,
    1.48851587,
    -0.82215223,
    0.17087277,
];

/// Complementary error function, fractional error below 1.2e-7.
pub fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let poly = ERFC_COEFFICIENTS
        .iter()
        .rev()
        .fold(0.0, |acc, &c| c + t * acc);
    let ans = t * (-z * z + poly).exp();
    if x >= 0.0 { ans } else { 2.0 - ans }
}

/// `erfc(depth / (2 sqrt(D t)))`, the concentration at `depth` after `time`.
pub fn semi_infinite_profile(depth: f64, time: f64, diffusivity: f64) -> f64 {
    let spread = diffusivity * time;
    if spread <= 0.0 {
        return if depth <= 0.0 { 1.0 } else { 0.0 };
    }
    erfc(depth / (2.0 * spread.sqrt()))
}

/// Reference concentration at lattice nodes `0..len` after `steps` steps,
/// in lattice units.
pub fn reference_profile(len: usize, steps: usize, tau: f64) -> Vec<f64> {
    let d = diffusivity(tau);
    (0..len).map(|y| semi_infinite_profile(y as f64, steps as f64, d)).collect()
}

/// Largest absolute difference between two profiles over their common length.
pub fn max_deviation(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(p, q)| (p - q).abs()).fold(0.0, f64::max)
}
