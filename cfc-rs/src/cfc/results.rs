//! Immutable coupling results.

use itertools::Itertools;
use ndarray::{Array1, Array2, Array3, Array4, ArrayView1, ArrayView3, Axis};

use super::{select_grid, Connections, FrequencyAxis};
use crate::kernel::{ConfigError, Read1D};

/// Coupling of one `compute` call with the metadata needed to interpret it.
///
/// Nothing can be changed after construction; accessors hand out read-only
/// views or owned copies.
#[derive(Debug, Clone, PartialEq)]
pub struct Results {
    coupling: Array3<f64>,
    connections: Connections,
    f1: Array1<f64>,
    f2: Array1<f64>,
    name: String,
}

/// Results arranged as `[seeds, targets, f2, f1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct CompactResults {
    /// Sorted unique seed channels, indexing the first axis.
    pub seeds: Vec<usize>,
    /// Sorted unique target channels, indexing the second axis.
    pub targets: Vec<usize>,
    /// Coupling; `NaN` for seed/target pairs that were not computed.
    pub coupling: Array4<f64>,
}

impl Results {
    /// Bundle a `[connections, f2, f1]` coupling array with its metadata.
    pub fn try_new(
        coupling: Array3<f64>,
        connections: Connections,
        f1: Array1<f64>,
        f2: Array1<f64>,
        name: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let (n_conns, n_f2, n_f1) = coupling.dim();
        if n_conns != connections.len() {
            return Err(ConfigError::LengthMismatch {
                arg: "connections",
                expected: n_conns,
                got: connections.len(),
            });
        }
        if n_f2 != f2.len() {
            return Err(ConfigError::LengthMismatch {
                arg: "f2",
                expected: n_f2,
                got: f2.len(),
            });
        }
        if n_f1 != f1.len() {
            return Err(ConfigError::LengthMismatch {
                arg: "f1",
                expected: n_f1,
                got: f1.len(),
            });
        }
        let name = name.into();
        if name.is_empty() {
            return Err(ConfigError::EmptyInput { arg: "name" });
        }
        Ok(Self {
            coupling,
            connections,
            f1,
            f2,
            name,
        })
    }

    /// Coupling as `[connections, f2, f1]`.
    pub fn coupling(&self) -> ArrayView3<'_, f64> {
        self.coupling.view()
    }

    /// Connections of the first coupling axis.
    pub fn connections(&self) -> &Connections {
        &self.connections
    }

    /// Low frequencies of the last coupling axis.
    pub fn f1(&self) -> ArrayView1<'_, f64> {
        self.f1.view()
    }

    /// High frequencies of the second coupling axis.
    pub fn f2(&self) -> ArrayView1<'_, f64> {
        self.f2.view()
    }

    /// Metric name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of connections.
    pub fn n_connections(&self) -> usize {
        self.connections.len()
    }

    /// Owned copy of the `[connections, f2, f1]` coupling.
    pub fn get_results(&self) -> Array3<f64> {
        self.coupling.clone()
    }

    /// Owned `[f2, f1]` coupling of the connection at `index`.
    pub fn connection(&self, index: usize) -> Option<Array2<f64>> {
        (index < self.n_connections()).then(|| self.coupling.index_axis(Axis(0), index).to_owned())
    }

    /// `true` for `[f2, f1]` cells where `f1 < f2`, the only cells that can hold a score.
    pub fn valid_mask(&self) -> Array2<bool> {
        Array2::from_shape_fn((self.f2.len(), self.f1.len()), |(i, j)| self.f1[j] < self.f2[i])
    }

    /// Owned copy arranged by unique seed and target channel.
    pub fn get_results_compact(&self) -> CompactResults {
        let seeds: Vec<usize> = self.connections.seeds().iter().copied().sorted().dedup().collect();
        let targets: Vec<usize> = self
            .connections
            .targets()
            .iter()
            .copied()
            .sorted()
            .dedup()
            .collect();

        let mut coupling = Array4::from_elem(
            (seeds.len(), targets.len(), self.f2.len(), self.f1.len()),
            f64::NAN,
        );
        for (index, (seed, target)) in self.connections.iter().enumerate() {
            // both lists are sorted and hold every channel used
            let (Ok(s), Ok(t)) = (seeds.binary_search(&seed), targets.binary_search(&target)) else {
                continue;
            };
            coupling
                .index_axis_mut(Axis(0), s)
                .index_axis_mut(Axis(0), t)
                .assign(&self.coupling.index_axis(Axis(0), index));
        }

        CompactResults {
            seeds,
            targets,
            coupling,
        }
    }

    /// Restrict the results to a subset of their frequencies.
    ///
    /// `None` keeps the whole grid. Requested frequencies must be exact members
    /// of the stored grids and may be given in any order.
    pub fn select<I1, I2>(&self, f1: Option<&I1>, f2: Option<&I2>) -> Result<Self, ConfigError>
    where
        I1: Read1D<f64> + ?Sized,
        I2: Read1D<f64> + ?Sized,
    {
        let f1_axis = FrequencyAxis::try_new(&self.f1)?;
        let f2_axis = FrequencyAxis::try_new(&self.f2)?;
        let f1 = select_grid(&f1_axis, "f1", f1)?;
        let f2 = select_grid(&f2_axis, "f2", f2)?;

        // members were checked above
        let f1_idcs: Vec<usize> = f1.iter().filter_map(|&f| f1_axis.find_first(f).ok()).collect();
        let f2_idcs: Vec<usize> = f2.iter().filter_map(|&f| f2_axis.find_first(f).ok()).collect();
        let coupling = self
            .coupling
            .select(Axis(1), &f2_idcs)
            .select(Axis(2), &f1_idcs);

        Self::try_new(
            coupling,
            self.connections.clone(),
            Array1::from(f1),
            Array1::from(f2),
            self.name.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn results() -> Results {
        let connections = Connections::try_new(&[0, 0, 1], &[1, 2, 2], 3).expect("valid pairs");
        let coupling = Array3::from_shape_fn((3, 2, 3), |(c, i, j)| (c * 100 + i * 10 + j) as f64);
        Results::try_new(
            coupling,
            connections,
            array![1., 2., 3.],
            array![4., 5.],
            "PPC",
        )
        .expect("consistent shapes")
    }

    #[test]
    fn metadata_is_exposed() {
        let res = results();
        assert_eq!(res.name(), "PPC");
        assert_eq!(res.n_connections(), 3);
        assert_eq!(res.f1(), array![1., 2., 3.]);
        assert_eq!(res.f2(), array![4., 5.]);
        assert_eq!(res.connections().seeds(), &[0, 0, 1]);
        assert_eq!(res.coupling().dim(), (3, 2, 3));
    }

    #[test]
    fn copies_do_not_alias() {
        let res = results();
        let mut copy = res.get_results();
        copy.fill(-1.0);
        assert_eq!(res.coupling()[[0, 0, 0]], 0.0);

        let mut single = res.connection(2).expect("connection 2 exists");
        assert_eq!(single[[1, 2]], 212.0);
        single.fill(0.0);
        assert_eq!(res.coupling()[[2, 1, 2]], 212.0);
        assert!(res.connection(3).is_none());
    }

    #[test]
    fn inconsistent_shapes_are_rejected() {
        let connections = Connections::all(2);
        let err = Results::try_new(
            Array3::zeros((3, 1, 1)),
            connections,
            array![1.],
            array![2.],
            "PPC",
        )
        .expect_err("4 connections, 3 rows");
        assert_eq!(
            err,
            ConfigError::LengthMismatch {
                arg: "connections",
                expected: 3,
                got: 4,
            }
        );
    }

    #[test]
    fn valid_mask_marks_low_below_high() {
        let connections = Connections::all(1);
        let res = Results::try_new(
            Array3::from_elem((1, 2, 2), f64::NAN),
            connections,
            array![1., 3.],
            array![2., 3.],
            "PPC",
        )
        .expect("consistent shapes");
        assert_eq!(res.valid_mask(), array![[true, false], [true, false]]);
    }

    #[test]
    fn compact_form_places_pairs_and_fills_gaps() {
        let compact = results().get_results_compact();
        assert_eq!(compact.seeds, vec![0, 1]);
        assert_eq!(compact.targets, vec![1, 2]);
        assert_eq!(compact.coupling.dim(), (2, 2, 2, 3));
        // (0, 1) -> connection 0, (0, 2) -> 1, (1, 2) -> 2, (1, 1) missing
        assert_eq!(compact.coupling[[0, 0, 1, 2]], 12.0);
        assert_eq!(compact.coupling[[0, 1, 0, 0]], 100.0);
        assert_eq!(compact.coupling[[1, 1, 1, 1]], 211.0);
        assert!(compact.coupling[[1, 0, 0, 0]].is_nan());
    }

    #[test]
    fn select_restricts_and_reorders_grids() {
        let res = results();
        let sub = res
            .select(Some(&[3., 1.]), None::<&[f64]>)
            .expect("members of f1");
        assert_eq!(sub.f1(), array![3., 1.]);
        assert_eq!(sub.f2(), array![4., 5.]);
        assert_eq!(sub.coupling().dim(), (3, 2, 2));
        assert_eq!(sub.coupling()[[1, 1, 0]], 112.0);
        assert_eq!(sub.coupling()[[1, 1, 1]], 110.0);

        let err = res
            .select(None::<&[f64]>, Some(&[6.]))
            .expect_err("6 is not a stored f2");
        assert_eq!(
            err,
            ConfigError::FrequencyNotFound {
                arg: "f2",
                values: vec![6.],
            }
        );
    }
}
