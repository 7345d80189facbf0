use crate::{Error, Result};

/// Index of the first occurrence of `value` in a non-decreasing array.
///
/// Behaves like `numpy.searchsorted(a, value, side="left")` followed by an exact
/// equality check, so the lookup is `O(log n)`.
///
/// # Parameters
/// * `sorted` : (N,) non-decreasing array to search.
/// * `value` : Value to locate. Matching is exact; no tolerance is applied.
///
/// # Errors
/// [Error::NotFound] when no element equals `value`. `NaN` is never found.
///
/// # Panics
/// In debug builds, if `sorted` is not non-decreasing. Release builds return an
/// unspecified (but in-bounds) result for unsorted input.
///
/// # Examples
/// ```
/// use cfc_rs_core::num_rs::find_first;
///
/// let freqs = [1., 2., 2., 3., 5.];
/// assert_eq!(find_first(&freqs, 2.).unwrap(), 1);
/// assert_eq!(find_first(&freqs, 5.).unwrap(), 4);
/// assert!(find_first(&freqs, 4.).is_err());
/// ```
pub fn find_first(sorted: &[f64], value: f64) -> Result<usize> {
    debug_assert!(
        sorted.windows(2).all(|w| w[0] <= w[1]),
        "find_first requires a non-decreasing array"
    );
    let idx = sorted.partition_point(|&x| x < value);
    match sorted.get(idx) {
        Some(&x) if x == value => Ok(idx),
        _ => Err(Error::NotFound { value }),
    }
}
