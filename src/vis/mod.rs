// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Visibility containers.
//!
//! [`Visibility`] stores one measurement per row: a baseline, a time and a
//! frequency with a value and a weight for each polarisation. Rows are never
//! reordered; subsets are always selected with boolean masks.
//! [`BlockVisibility`] stores the same information in regular
//! `[time][baseline][channel][polarisation]` blocks, and can be coalesced into
//! rows and back without loss.

mod block;
mod error;

pub use block::BlockVisibility;
pub use error::VisError;

use std::{borrow::Cow, collections::HashMap};

use log::trace;
use ndarray::prelude::*;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::{c64, constants::VEL_C, coord::RADec, coord::UVW};

/// The polarisation products held by visibilities and images.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Display, EnumIter, EnumString, Serialize, Deserialize,
)]
pub enum PolarisationFrame {
    /// Stokes I only.
    #[strum(serialize = "stokesI")]
    #[serde(rename = "stokesI")]
    StokesI,

    /// Stokes I, Q, U and V.
    #[strum(serialize = "stokesIQUV")]
    #[serde(rename = "stokesIQUV")]
    StokesIQUV,

    /// XX, XY, YX and YY.
    #[strum(serialize = "linear")]
    #[serde(rename = "linear")]
    Linear,
}

impl PolarisationFrame {
    pub fn num_pols(self) -> usize {
        match self {
            PolarisationFrame::StokesI => 1,
            PolarisationFrame::StokesIQUV | PolarisationFrame::Linear => 4,
        }
    }

    /// The polarisation indices that respond to an unpolarised source. These
    /// are the polarisations used when solving for antenna gains.
    pub fn parallel_hands(self) -> &'static [usize] {
        match self {
            PolarisationFrame::StokesI | PolarisationFrame::StokesIQUV => &[0],
            PolarisationFrame::Linear => &[0, 3],
        }
    }
}

/// Row-based visibilities.
#[derive(Clone, Debug)]
pub struct Visibility {
    /// Baseline coordinates \[metres\].
    pub uvw: Vec<UVW>,
    /// Time of each row \[GPS seconds\].
    pub time: Vec<f64>,
    /// Frequency of each row \[Hz\].
    pub frequency: Vec<f64>,
    /// Bandwidth of each row \[Hz\].
    pub channel_bandwidth: Vec<f64>,
    pub antenna1: Vec<usize>,
    pub antenna2: Vec<usize>,
    /// `[row][pol]`
    pub vis: Array2<c64>,
    /// `[row][pol]`
    pub weight: Array2<f64>,

    pub phase_centre: RADec,
    pub polarisation_frame: PolarisationFrame,
    pub num_antennas: usize,
}

impl Visibility {
    pub fn num_rows(&self) -> usize {
        self.uvw.len()
    }

    pub fn num_pols(&self) -> usize {
        self.polarisation_frame.num_pols()
    }

    /// Check that every column has one element per row and every antenna index
    /// is in range.
    pub fn validate(&self) -> Result<(), VisError> {
        if self.num_antennas == 0 {
            return Err(VisError::NoAntennas);
        }
        let expected = self.num_rows();
        for (column, len) in [
            ("time", self.time.len()),
            ("frequency", self.frequency.len()),
            ("channel_bandwidth", self.channel_bandwidth.len()),
            ("antenna1", self.antenna1.len()),
            ("antenna2", self.antenna2.len()),
            ("vis", self.vis.len_of(Axis(0))),
            ("weight", self.weight.len_of(Axis(0))),
        ] {
            if len != expected {
                return Err(VisError::InconsistentColumns {
                    column,
                    len,
                    expected,
                });
            }
        }
        for (column, len) in [
            ("vis", self.vis.len_of(Axis(1))),
            ("weight", self.weight.len_of(Axis(1))),
        ] {
            if len != self.num_pols() {
                return Err(VisError::InconsistentColumns {
                    column,
                    len,
                    expected: self.num_pols(),
                });
            }
        }
        for (row, (&a1, &a2)) in self.antenna1.iter().zip(self.antenna2.iter()).enumerate() {
            let antenna = a1.max(a2);
            if antenna >= self.num_antennas {
                return Err(VisError::AntennaOutOfRange {
                    row,
                    antenna,
                    num_antennas: self.num_antennas,
                });
            }
        }
        Ok(())
    }

    /// The UVW of a row in units of wavelengths.
    pub fn uvw_lambda(&self, row: usize) -> UVW {
        self.uvw[row] * (self.frequency[row] / VEL_C)
    }

    /// The distinct times of these visibilities, in ascending order.
    pub fn unique_times(&self) -> Vec<f64> {
        let mut times = self.time.clone();
        times.sort_unstable_by(f64::total_cmp);
        times.dedup();
        times
    }

    /// The distinct frequencies of these visibilities, in ascending order.
    pub fn unique_frequencies(&self) -> Vec<f64> {
        let mut freqs = self.frequency.clone();
        freqs.sort_unstable_by(f64::total_cmp);
        freqs.dedup();
        freqs
    }

    /// A copy of these visibilities with all values set to zero. Weights are
    /// kept.
    pub fn zeroed(&self) -> Visibility {
        let mut vis = self.clone();
        vis.vis.fill(c64::default());
        vis
    }

    /// Materialise the rows selected by `mask`, preserving their order.
    pub fn select_rows(&self, mask: &[bool]) -> Result<Visibility, VisError> {
        if mask.len() != self.num_rows() {
            return Err(VisError::MaskLength {
                mask: mask.len(),
                rows: self.num_rows(),
            });
        }
        let indices: Vec<usize> = mask
            .iter()
            .enumerate()
            .filter(|(_, &m)| m)
            .map(|(i, _)| i)
            .collect();
        trace!("Selecting {} of {} rows", indices.len(), mask.len());

        fn pick<T: Copy>(column: &[T], indices: &[usize]) -> Vec<T> {
            indices.iter().map(|&i| column[i]).collect()
        }

        Ok(Visibility {
            uvw: pick(&self.uvw, &indices),
            time: pick(&self.time, &indices),
            frequency: pick(&self.frequency, &indices),
            channel_bandwidth: pick(&self.channel_bandwidth, &indices),
            antenna1: pick(&self.antenna1, &indices),
            antenna2: pick(&self.antenna2, &indices),
            vis: self.vis.select(Axis(0), &indices),
            weight: self.weight.select(Axis(0), &indices),
            phase_centre: self.phase_centre,
            polarisation_frame: self.polarisation_frame,
            num_antennas: self.num_antennas,
        })
    }
}

/// Anything that can be used as visibilities by the imaging engines. The
/// engines work on rows; other layouts are converted on the way in and back on
/// the way out.
pub trait VisibilityData: Clone + Send + Sync {
    /// Get these visibilities as rows.
    fn to_rows(&self) -> Cow<'_, Visibility>;

    /// Make a copy of `self` with values and weights taken from `rows`, which
    /// must have been derived from `self` with [`VisibilityData::to_rows`].
    fn with_rows(&self, rows: Visibility) -> Result<Self, VisError>;
}

impl VisibilityData for Visibility {
    fn to_rows(&self) -> Cow<'_, Visibility> {
        Cow::Borrowed(self)
    }

    fn with_rows(&self, rows: Visibility) -> Result<Self, VisError> {
        if rows.num_rows() != self.num_rows() {
            return Err(VisError::RowCountMismatch {
                left: self.num_rows(),
                right: rows.num_rows(),
            });
        }
        Ok(rows)
    }
}

/// Materialise the rows selected by `mask`, preserving their order.
pub fn create_visibility_from_rows(
    vis: &Visibility,
    mask: &[bool],
) -> Result<Visibility, VisError> {
    vis.select_rows(mask)
}

fn check_compatible(left: &Visibility, right: &Visibility) -> Result<(), VisError> {
    if left.num_rows() != right.num_rows() {
        return Err(VisError::RowCountMismatch {
            left: left.num_rows(),
            right: right.num_rows(),
        });
    }
    if left.polarisation_frame != right.polarisation_frame {
        return Err(VisError::PolarisationMismatch {
            left: left.polarisation_frame,
            right: right.polarisation_frame,
        });
    }
    Ok(())
}

/// Copies of the visibilities with all values set to zero.
pub fn zero_vislist(vis_list: &[Visibility]) -> Vec<Visibility> {
    vis_list.iter().map(Visibility::zeroed).collect()
}

/// `vis - model`. Weights are taken from `vis`.
pub fn subtract_visibility(vis: &Visibility, model: &Visibility) -> Result<Visibility, VisError> {
    check_compatible(vis, model)?;
    let mut residual = vis.clone();
    residual.vis -= &model.vis;
    Ok(residual)
}

pub fn subtract_vislist(
    vis_list: &[Visibility],
    model_list: &[Visibility],
) -> Result<Vec<Visibility>, VisError> {
    if vis_list.len() != model_list.len() {
        return Err(VisError::RowCountMismatch {
            left: vis_list.len(),
            right: model_list.len(),
        });
    }
    vis_list
        .iter()
        .zip(model_list)
        .map(|(v, m)| subtract_visibility(v, m))
        .collect()
}

/// Divide visibilities by a model, producing visibilities referenced to a unit
/// point source at the phase centre. The weights become `w |M|^2` so that a
/// weighted least-squares fit against the result is identical to one against
/// the undivided visibilities. Where the model is zero, the value and weight
/// are zeroed.
pub fn divide_visibility(vis: &Visibility, model: &Visibility) -> Result<Visibility, VisError> {
    check_compatible(vis, model)?;
    let mut point = vis.clone();
    point
        .vis
        .iter_mut()
        .zip(point.weight.iter_mut())
        .zip(model.vis.iter())
        .for_each(|((v, w), m)| {
            let m_norm_sqr = m.norm_sqr();
            if m_norm_sqr > 0.0 {
                *v = *v / *m;
                *w *= m_norm_sqr;
            } else {
                *v = c64::default();
                *w = 0.0;
            }
        });
    Ok(point)
}

/// Concatenate visibilities into one set, keeping the rows of each input in
/// order.
pub fn visibility_gather(vis_list: &[Visibility]) -> Result<Visibility, VisError> {
    let first = vis_list.first().ok_or(VisError::EmptyList)?;
    for vis in &vis_list[1..] {
        if vis.polarisation_frame != first.polarisation_frame {
            return Err(VisError::PolarisationMismatch {
                left: first.polarisation_frame,
                right: vis.polarisation_frame,
            });
        }
    }

    let num_rows = vis_list.iter().map(Visibility::num_rows).sum();
    let num_pols = first.num_pols();
    let mut gathered = Visibility {
        uvw: Vec::with_capacity(num_rows),
        time: Vec::with_capacity(num_rows),
        frequency: Vec::with_capacity(num_rows),
        channel_bandwidth: Vec::with_capacity(num_rows),
        antenna1: Vec::with_capacity(num_rows),
        antenna2: Vec::with_capacity(num_rows),
        vis: Array2::zeros((num_rows, num_pols)),
        weight: Array2::zeros((num_rows, num_pols)),
        phase_centre: first.phase_centre,
        polarisation_frame: first.polarisation_frame,
        num_antennas: vis_list.iter().map(|v| v.num_antennas).max().unwrap_or(0),
    };
    let mut start = 0;
    for vis in vis_list {
        let end = start + vis.num_rows();
        gathered.uvw.extend_from_slice(&vis.uvw);
        gathered.time.extend_from_slice(&vis.time);
        gathered.frequency.extend_from_slice(&vis.frequency);
        gathered
            .channel_bandwidth
            .extend_from_slice(&vis.channel_bandwidth);
        gathered.antenna1.extend_from_slice(&vis.antenna1);
        gathered.antenna2.extend_from_slice(&vis.antenna2);
        gathered
            .vis
            .slice_mut(s![start..end, ..])
            .assign(&vis.vis);
        gathered
            .weight
            .slice_mut(s![start..end, ..])
            .assign(&vis.weight);
        start = end;
    }
    Ok(gathered)
}

/// Collapse the frequency axis: all rows that share a time and an antenna pair
/// are combined into one row with the weighted-mean value, the summed weight,
/// the mean frequency and the summed bandwidth. Output rows are in order of
/// first appearance.
pub fn integrate_visibility_by_channel(vis: &Visibility) -> Visibility {
    let mut groups: HashMap<(u64, usize, usize), usize> = HashMap::new();
    let mut first_rows = vec![];
    let mut group_of_row = Vec::with_capacity(vis.num_rows());
    for row in 0..vis.num_rows() {
        let key = (vis.time[row].to_bits(), vis.antenna1[row], vis.antenna2[row]);
        let next = groups.len();
        let group = *groups.entry(key).or_insert_with(|| {
            first_rows.push(row);
            next
        });
        group_of_row.push(group);
    }

    let num_groups = first_rows.len();
    let num_pols = vis.num_pols();
    let mut weighted_sum: Array2<c64> = Array2::zeros((num_groups, num_pols));
    let mut weight_sum: Array2<f64> = Array2::zeros((num_groups, num_pols));
    let mut freq_sum = vec![0.0; num_groups];
    let mut bandwidth_sum = vec![0.0; num_groups];
    let mut counts = vec![0_usize; num_groups];
    for (row, &group) in group_of_row.iter().enumerate() {
        for pol in 0..num_pols {
            let w = vis.weight[(row, pol)];
            weighted_sum[(group, pol)] += vis.vis[(row, pol)] * w;
            weight_sum[(group, pol)] += w;
        }
        freq_sum[group] += vis.frequency[row];
        bandwidth_sum[group] += vis.channel_bandwidth[row];
        counts[group] += 1;
    }
    weighted_sum
        .iter_mut()
        .zip(weight_sum.iter())
        .for_each(|(v, &w)| {
            *v = if w > 0.0 { *v / w } else { c64::default() };
        });

    Visibility {
        uvw: first_rows.iter().map(|&r| vis.uvw[r]).collect(),
        time: first_rows.iter().map(|&r| vis.time[r]).collect(),
        frequency: freq_sum
            .iter()
            .zip(counts.iter())
            .map(|(f, &c)| f / c as f64)
            .collect(),
        channel_bandwidth: bandwidth_sum,
        antenna1: first_rows.iter().map(|&r| vis.antenna1[r]).collect(),
        antenna2: first_rows.iter().map(|&r| vis.antenna2[r]).collect(),
        vis: weighted_sum,
        weight: weight_sum,
        phase_centre: vis.phase_centre,
        polarisation_frame: vis.polarisation_frame,
        num_antennas: vis.num_antennas,
    }
}
