//! Helpers for tests across the radar-nowcast workspace.
//!
//! Grid generators, payload encoders matching what radar providers
//! publish, and a few fixed points and instants. Nothing here depends on
//! other workspace crates, so any of them can take it as a dev-dependency.

pub mod encoders;
pub mod fixtures;
pub mod generators;

pub use encoders::*;
pub use fixtures::*;
pub use generators::*;

/// Assert `|left - right| <= epsilon`, comparing as `f64`.
///
/// ```
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(0.1_f32 + 0.2_f32, 0.3, 1e-6);
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let (left, right, epsilon) = ($left as f64, $right as f64, $epsilon as f64);
        let diff = (left - right).abs();
        assert!(
            diff <= epsilon,
            "values differ by {} (tolerance {}): {} vs {}",
            diff,
            epsilon,
            left,
            right
        );
    }};
}

/// Element-wise [`assert_approx_eq!`] over two equally long sequences.
#[macro_export]
macro_rules! assert_series_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let (left, right) = (&$left, &$right);
        assert_eq!(left.len(), right.len(), "series lengths differ");
        let epsilon = $epsilon as f64;
        if let Some((i, l, r)) = left
            .iter()
            .zip(right.iter())
            .enumerate()
            .map(|(i, (l, r))| (i, *l as f64, *r as f64))
            .find(|(_, l, r)| (l - r).abs() > epsilon)
        {
            panic!("series differ at index {}: {} vs {}", i, l, r);
        }
    }};
}
