//! Seed/target channel pairs.

use itertools::iproduct;

use crate::kernel::{ConfigError, Read1D};

/// Ordered `(seed, target)` channel pairs to compute coupling for.
///
/// The order of the pairs is the order of the connection axis in the results.
/// Repeated pairs are kept and computed again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connections {
    seeds: Vec<usize>,
    targets: Vec<usize>,
}

impl Connections {
    /// Every ordered pair of `n_channels` channels, self-pairs included, seed-major.
    pub fn all(n_channels: usize) -> Self {
        let (seeds, targets) = iproduct!(0..n_channels, 0..n_channels).unzip();
        Self { seeds, targets }
    }

    /// Validate explicit seed and target indices against the channel count.
    pub fn try_new<I1, I2>(seeds: &I1, targets: &I2, n_channels: usize) -> Result<Self, ConfigError>
    where
        I1: Read1D<usize> + ?Sized,
        I2: Read1D<usize> + ?Sized,
    {
        let seeds = seeds.read_slice()?;
        let targets = targets.read_slice()?;
        if seeds.len() != targets.len() {
            return Err(ConfigError::LengthMismatch {
                arg: "targets",
                expected: seeds.len(),
                got: targets.len(),
            });
        }
        if seeds.is_empty() {
            return Err(ConfigError::EmptyInput { arg: "indices" });
        }
        check_range("seeds", seeds, n_channels)?;
        check_range("targets", targets, n_channels)?;

        Ok(Self {
            seeds: seeds.to_vec(),
            targets: targets.to_vec(),
        })
    }

    /// Seed channel of each connection.
    pub fn seeds(&self) -> &[usize] {
        &self.seeds
    }

    /// Target channel of each connection.
    pub fn targets(&self) -> &[usize] {
        &self.targets
    }

    /// Number of connections.
    pub fn len(&self) -> usize {
        self.seeds.len()
    }

    /// Whether there are no connections.
    pub fn is_empty(&self) -> bool {
        self.seeds.is_empty()
    }

    /// The `(seed, target)` pair at `index`.
    pub fn get(&self, index: usize) -> Option<(usize, usize)> {
        Some((*self.seeds.get(index)?, *self.targets.get(index)?))
    }

    /// Iterate over `(seed, target)` pairs in connection order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (usize, usize)> + '_ {
        self.seeds.iter().copied().zip(self.targets.iter().copied())
    }
}

fn check_range(arg: &'static str, indices: &[usize], bound: usize) -> Result<(), ConfigError> {
    match indices.iter().position(|&i| i >= bound) {
        Some(position) => Err(ConfigError::IndexOutOfRange {
            arg,
            position,
            index: indices[position],
            bound,
        }),
        None => Ok(()),
    }
}
