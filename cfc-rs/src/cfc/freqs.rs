//! Frequency axis lookup and `f1`/`f2` grid selection.

use core::cmp::Ordering;

use cfc_rs_core::num_rs::find_first;
use ndarray::{Array1, ArrayView1};

use crate::kernel::{ConfigError, Read1D};

/// Frequency axis of an FFT tensor with `O(log n)` exact-value lookup.
///
/// The axis does not have to be sorted: FFT outputs that carry negative
/// frequencies after the positive ones are accepted as-is. A stably sorted copy
/// plus the permutation back to axis positions is kept for the lookups.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyAxis {
    values: Array1<f64>,
    sorted: Vec<f64>,
    order: Vec<usize>,
}

impl FrequencyAxis {
    /// Build an axis from any contiguous 1D input.
    pub fn try_new<I>(freqs: &I) -> Result<Self, ConfigError>
    where
        I: Read1D<f64> + ?Sized,
    {
        let freqs = freqs.read_slice()?;
        if freqs.is_empty() {
            return Err(ConfigError::EmptyInput { arg: "freqs" });
        }
        if freqs.iter().any(|f| !f.is_finite()) {
            return Err(ConfigError::InvalidArgument {
                arg: "freqs",
                reason: "frequencies must be finite",
            });
        }

        let mut order: Vec<usize> = (0..freqs.len()).collect();
        // stable, so equal values keep axis order
        order.sort_by(|&a, &b| freqs[a].partial_cmp(&freqs[b]).unwrap_or(Ordering::Equal));
        let sorted = order.iter().map(|&i| freqs[i]).collect();

        Ok(Self {
            values: Array1::from(freqs.to_vec()),
            sorted,
            order,
        })
    }

    /// Number of frequency bins.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the axis has no bins. Always `false` for a constructed axis.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Frequencies in axis order.
    pub fn values(&self) -> ArrayView1<'_, f64> {
        self.values.view()
    }

    /// Index of the first axis bin holding exactly `value`.
    pub fn find_first(&self, value: f64) -> cfc_rs_core::Result<usize> {
        let pos = find_first(&self.sorted, value)?;
        Ok(self.order[pos])
    }

    /// Whether `value` is an exact member of the axis.
    pub fn contains(&self, value: f64) -> bool {
        self.find_first(value).is_ok()
    }
}

/// Validated low (`f1`) and high (`f2`) frequency grids.
///
/// No ordering is imposed between the grids; cells with `f1 >= f2` are left
/// undefined by the coupling kernels.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencySelection {
    f1: Vec<f64>,
    f2: Vec<f64>,
}

impl FrequencySelection {
    /// Validate `f1` and `f2` against `axis`. `None` selects the whole axis.
    pub fn try_new<I1, I2>(
        axis: &FrequencyAxis,
        f1: Option<&I1>,
        f2: Option<&I2>,
    ) -> Result<Self, ConfigError>
    where
        I1: Read1D<f64> + ?Sized,
        I2: Read1D<f64> + ?Sized,
    {
        Ok(Self {
            f1: select_grid(axis, "f1", f1)?,
            f2: select_grid(axis, "f2", f2)?,
        })
    }

    /// Low frequencies.
    pub fn f1(&self) -> &[f64] {
        &self.f1
    }

    /// High frequencies.
    pub fn f2(&self) -> &[f64] {
        &self.f2
    }

    /// Consume the selection into `(f1, f2)` arrays.
    pub fn into_arrays(self) -> (Array1<f64>, Array1<f64>) {
        (Array1::from(self.f1), Array1::from(self.f2))
    }
}

pub(crate) fn select_grid<I>(
    axis: &FrequencyAxis,
    arg: &'static str,
    grid: Option<&I>,
) -> Result<Vec<f64>, ConfigError>
where
    I: Read1D<f64> + ?Sized,
{
    let Some(grid) = grid else {
        return Ok(axis.values().to_vec());
    };
    let grid = grid.read_slice()?;
    if grid.is_empty() {
        return Err(ConfigError::EmptyInput { arg });
    }
    if grid.iter().any(|f| !f.is_finite()) {
        return Err(ConfigError::InvalidArgument {
            arg,
            reason: "frequencies must be finite",
        });
    }

    let missing: Vec<f64> = grid
        .iter()
        .copied()
        .filter(|&f| !axis.contains(f))
        .collect();
    if !missing.is_empty() {
        return Err(ConfigError::FrequencyNotFound {
            arg,
            values: missing,
        });
    }
    Ok(grid.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn axis_lookup_on_sorted_axis() {
        let axis = FrequencyAxis::try_new(&[0., 1., 2., 3., 4.]).expect("valid axis");
        assert_eq!(axis.len(), 5);
        assert_eq!(axis.find_first(3.).expect("member"), 3);
        assert!(axis.find_first(2.5).is_err());
    }

    #[test]
    fn axis_lookup_on_fft_ordered_axis() {
        // [0, pos..., neg...] as produced by a two-sided FFT
        let axis = FrequencyAxis::try_new(&array![0., 1., 2., -2., -1.]).expect("valid axis");
        assert_eq!(axis.find_first(-2.).expect("member"), 3);
        assert_eq!(axis.find_first(-1.).expect("member"), 4);
        assert_eq!(axis.find_first(2.).expect("member"), 2);
        assert_eq!(axis.values().to_vec(), vec![0., 1., 2., -2., -1.]);
    }

    #[test]
    fn axis_lookup_returns_first_duplicate() {
        let axis = FrequencyAxis::try_new(&[5., 1., 5., 1.]).expect("valid axis");
        assert_eq!(axis.find_first(5.).expect("member"), 0);
        assert_eq!(axis.find_first(1.).expect("member"), 1);
    }

    #[test]
    fn axis_rejects_empty_and_non_finite() {
        let empty: [f64; 0] = [];
        assert_eq!(
            FrequencyAxis::try_new(&empty).expect_err("empty axis"),
            ConfigError::EmptyInput { arg: "freqs" }
        );
        assert!(matches!(
            FrequencyAxis::try_new(&[1., f64::NAN]),
            Err(ConfigError::InvalidArgument { arg: "freqs", .. })
        ));
    }

    #[test]
    fn none_selects_whole_axis() {
        let axis = FrequencyAxis::try_new(&[1., 2., 3.]).expect("valid axis");
        let selection = FrequencySelection::try_new(&axis, None::<&[f64]>, None::<&[f64]>)
            .expect("defaults are valid");
        assert_eq!(selection.f1(), &[1., 2., 3.]);
        assert_eq!(selection.f2(), &[1., 2., 3.]);
    }

    #[test]
    fn explicit_grids_are_kept_in_request_order() {
        let axis = FrequencyAxis::try_new(&[1., 2., 3., 4., 5.]).expect("valid axis");
        let selection = FrequencySelection::try_new(&axis, Some(&[2., 1.]), Some(&vec![5., 3.]))
            .expect("members are valid");
        let (f1, f2) = selection.into_arrays();
        assert_eq!(f1, array![2., 1.]);
        assert_eq!(f2, array![5., 3.]);
    }

    #[test]
    fn non_members_are_all_reported() {
        let axis = FrequencyAxis::try_new(&[1., 2., 3., 4., 5.]).expect("valid axis");
        let err = FrequencySelection::try_new(&axis, Some(&[2.5, 3., 7.]), None::<&[f64]>)
            .expect_err("2.5 and 7 are not on the axis");
        assert_eq!(
            err,
            ConfigError::FrequencyNotFound {
                arg: "f1",
                values: vec![2.5, 7.],
            }
        );
        assert!(err.to_string().contains("2.5"));
    }

    #[test]
    fn empty_grid_is_rejected() {
        let axis = FrequencyAxis::try_new(&[1., 2.]).expect("valid axis");
        let err = FrequencySelection::try_new(&axis, None::<&[f64]>, Some(&Vec::<f64>::new()))
            .expect_err("empty f2");
        assert_eq!(err, ConfigError::EmptyInput { arg: "f2" });
    }
}
