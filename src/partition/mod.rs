// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Partitioning of visibilities (by w, or by time) and of images (by facet).
//!
//! A visibility partitioner first assigns every row a partition label; the
//! masks it yields are then derived from the labels. This makes the partitions
//! exhaustive and disjoint by construction, and the iteration can be repeated
//! any number of times with identical results.

mod error;
mod facets;
#[cfg(test)]
mod tests;

pub use error::{FacetError, PartitionError};
pub use facets::{facets, Facet, FacetIter, Taper};

use std::str::FromStr;

use itertools::Itertools;
use log::trace;
use serde::{Deserialize, Serialize};

use crate::vis::Visibility;

/// How many partitions visibilities should be split into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "VisSlicesRepr", into = "VisSlicesRepr")]
pub enum VisSlices {
    Count(usize),
    /// One partition per distinct time.
    Auto,
}

impl Default for VisSlices {
    fn default() -> Self {
        VisSlices::Count(1)
    }
}

impl std::fmt::Display for VisSlices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VisSlices::Count(n) => write!(f, "{n}"),
            VisSlices::Auto => write!(f, "auto"),
        }
    }
}

impl FromStr for VisSlices {
    type Err = PartitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("auto") {
            return Ok(VisSlices::Auto);
        }
        match s.trim().parse::<usize>() {
            Ok(0) => Err(PartitionError::ZeroSlices),
            Ok(n) => Ok(VisSlices::Count(n)),
            Err(_) => Err(PartitionError::ParseVisSlices(s.to_string())),
        }
    }
}

// Allows "vis_slices = 4" and "vis_slices = "auto"" in argument files.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum VisSlicesRepr {
    Count(usize),
    Name(String),
}

impl TryFrom<VisSlicesRepr> for VisSlices {
    type Error = PartitionError;

    fn try_from(repr: VisSlicesRepr) -> Result<Self, Self::Error> {
        match repr {
            VisSlicesRepr::Count(0) => Err(PartitionError::ZeroSlices),
            VisSlicesRepr::Count(n) => Ok(VisSlices::Count(n)),
            VisSlicesRepr::Name(s) => s.parse(),
        }
    }
}

impl From<VisSlices> for VisSlicesRepr {
    fn from(slices: VisSlices) -> Self {
        match slices {
            VisSlices::Count(n) => VisSlicesRepr::Count(n),
            VisSlices::Auto => VisSlicesRepr::Name("auto".to_string()),
        }
    }
}

/// The ways visibilities can be split into partitions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum VisPartitioner {
    /// All rows in one partition.
    Single,

    /// Rows grouped by their w coordinate in wavelengths. If `wstep` is given,
    /// it sets the width of each w bin, empty bins are dropped and `slices`
    /// is ignored.
    WStack { slices: VisSlices, wstep: Option<f64> },

    /// Rows grouped into contiguous blocks of time.
    Timeslice { slices: VisSlices },
}

impl VisPartitioner {
    /// Label every row with its partition, and return the labels along with
    /// the number of partitions. Some partitions may be empty.
    pub fn labels(&self, vis: &Visibility) -> Result<(Vec<usize>, usize), PartitionError> {
        match *self {
            VisPartitioner::Single => Ok((vec![0; vis.num_rows()], 1)),

            VisPartitioner::WStack { slices, wstep } => {
                let ws: Vec<f64> = (0..vis.num_rows())
                    .map(|row| vis.uvw_lambda(row).w)
                    .collect();
                let (w_min, w_max) = ws
                    .iter()
                    .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &w| {
                        (lo.min(w), hi.max(w))
                    });
                let (num_bins, step) = match (wstep, slices) {
                    (Some(step), _) if step <= 0.0 || !step.is_finite() => {
                        return Err(PartitionError::NonPositiveWStep(step))
                    }
                    (Some(step), _) => {
                        // Only occupied bins become partitions, so there are
                        // never more partitions than rows.
                        let bins: Vec<f64> =
                            ws.iter().map(|&w| ((w - w_min) / step).floor()).collect();
                        let occupied: Vec<f64> = bins
                            .iter()
                            .copied()
                            .sorted_by(|a, b| a.total_cmp(b))
                            .dedup()
                            .collect();
                        let labels = bins
                            .iter()
                            .map(|b| {
                                occupied
                                    .binary_search_by(|o| o.total_cmp(b))
                                    .unwrap_or_else(|i| i)
                            })
                            .collect();
                        trace!(
                            "w-stacking into {} occupied bins of {step} wavelengths",
                            occupied.len()
                        );
                        return Ok((labels, occupied.len().max(1)));
                    }
                    (None, VisSlices::Auto) => return Err(PartitionError::AutoWStack),
                    (None, VisSlices::Count(0)) => return Err(PartitionError::ZeroSlices),
                    (None, VisSlices::Count(n)) => (n, (w_max - w_min) / n as f64),
                };
                let labels = ws
                    .iter()
                    .map(|&w| {
                        if step > 0.0 {
                            (((w - w_min) / step).floor() as usize).min(num_bins - 1)
                        } else {
                            0
                        }
                    })
                    .collect();
                trace!("w-stacking into {num_bins} bins of {step} wavelengths");
                Ok((labels, num_bins))
            }

            VisPartitioner::Timeslice { slices } => {
                let times = vis.unique_times();
                let time_index = |t: f64| {
                    times
                        .binary_search_by(|probe| probe.total_cmp(&t))
                        .unwrap_or_else(|i| i)
                };
                match slices {
                    VisSlices::Auto => {
                        let labels = vis.time.iter().map(|&t| time_index(t)).collect();
                        Ok((labels, times.len()))
                    }
                    VisSlices::Count(0) => Err(PartitionError::ZeroSlices),
                    VisSlices::Count(n) => {
                        let num_times = times.len().max(1);
                        let labels = vis
                            .time
                            .iter()
                            .map(|&t| time_index(t) * n / num_times)
                            .collect();
                        Ok((labels, n))
                    }
                }
            }
        }
    }

    /// Iterate over the row-selection masks of the partitions, in partition
    /// order. Empty partitions are yielded as all-`false` masks.
    pub fn iter(&self, vis: &Visibility) -> Result<VisPartitionIter, PartitionError> {
        let (labels, num_partitions) = self.labels(vis)?;
        Ok(VisPartitionIter {
            labels,
            num_partitions,
            next: 0,
        })
    }
}

/// A lazy sequence of row-selection masks.
pub struct VisPartitionIter {
    labels: Vec<usize>,
    num_partitions: usize,
    next: usize,
}

impl Iterator for VisPartitionIter {
    type Item = Vec<bool>;

    fn next(&mut self) -> Option<Vec<bool>> {
        if self.next >= self.num_partitions {
            return None;
        }
        let partition = self.next;
        self.next += 1;
        Some(self.labels.iter().map(|&l| l == partition).collect())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.num_partitions - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for VisPartitionIter {}
