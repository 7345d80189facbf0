use super::ConfigError;

use ndarray::{Array1, ArrayView1};

/// Adapter trait for reading contiguous 1D input.
///
/// Lets channel indices and frequency grids be passed as slices, arrays,
/// `Vec`s or contiguous `ndarray` vectors.
pub trait Read1D<T> {
    /// Borrow the underlying input as a contiguous slice.
    fn read_slice(&self) -> Result<&[T], ConfigError>;
}

impl<T> Read1D<T> for [T] {
    fn read_slice(&self) -> Result<&[T], ConfigError> {
        Ok(self)
    }
}

impl<T, const N: usize> Read1D<T> for [T; N] {
    fn read_slice(&self) -> Result<&[T], ConfigError> {
        Ok(self)
    }
}

impl<T> Read1D<T> for Vec<T> {
    fn read_slice(&self) -> Result<&[T], ConfigError> {
        Ok(self.as_slice())
    }
}

impl<T> Read1D<T> for Array1<T> {
    fn read_slice(&self) -> Result<&[T], ConfigError> {
        self.as_slice()
            .ok_or(ConfigError::NonContiguous { arg: "array" })
    }
}

impl<'a, T> Read1D<T> for ArrayView1<'a, T> {
    fn read_slice(&self) -> Result<&[T], ConfigError> {
        self.as_slice()
            .ok_or(ConfigError::NonContiguous { arg: "array_view" })
    }
}

#[cfg(test)]
mod tests {
    use super::Read1D;
    use crate::kernel::ConfigError;
    use ndarray::{s, Array1, Array2};

    #[test]
    fn slice_vec_and_array_adapters() {
        let a = [0usize, 1, 2];
        assert_eq!(a.read_slice().expect("array adapter").len(), 3);

        let s: &[usize] = &a;
        assert_eq!(s.read_slice().expect("slice adapter")[1], 1);

        let v = vec![4.0f64, 8.0];
        assert_eq!(v.read_slice().expect("vec adapter"), &[4.0, 8.0]);
    }

    #[test]
    fn ndarray_adapters() {
        let arr = Array1::from(vec![1.0f64, 2.0, 3.0]);
        assert_eq!(arr.read_slice().expect("array1 read")[2], 3.0);
        assert_eq!(arr.view().read_slice().expect("view read").len(), 3);
    }

    #[test]
    fn strided_views_are_rejected() {
        let grid = Array2::<f64>::zeros((3, 3));
        let column = grid.slice(s![.., 0]);
        assert_eq!(
            column.read_slice().expect_err("column view is strided"),
            ConfigError::NonContiguous { arg: "array_view" }
        );
    }
}
