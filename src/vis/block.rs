// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Block-based visibilities.

use std::borrow::Cow;

use log::debug;
use ndarray::prelude::*;

use super::{PolarisationFrame, VisError, Visibility, VisibilityData};
use crate::{c64, coord::RADec, coord::UVW};

/// Visibilities in regular blocks. Every time has every baseline, and every
/// baseline has every channel.
#[derive(Clone, Debug)]
pub struct BlockVisibility {
    /// \[GPS seconds\]
    pub times: Vec<f64>,
    /// \[Hz\]
    pub frequencies: Vec<f64>,
    /// \[Hz\]
    pub channel_bandwidths: Vec<f64>,
    /// The antenna pair of each baseline.
    pub baselines: Vec<(usize, usize)>,
    /// `[time][baseline]` \[metres\]
    pub uvw: Array2<UVW>,
    /// `[time][baseline][channel][pol]`
    pub vis: Array4<c64>,
    /// `[time][baseline][channel][pol]`
    pub weight: Array4<f64>,

    pub phase_centre: RADec,
    pub polarisation_frame: PolarisationFrame,
    pub num_antennas: usize,
}

impl BlockVisibility {
    /// Make new block visibilities with zero values and unit weights.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        times: Vec<f64>,
        frequencies: Vec<f64>,
        channel_bandwidths: Vec<f64>,
        baselines: Vec<(usize, usize)>,
        uvw: Array2<UVW>,
        phase_centre: RADec,
        polarisation_frame: PolarisationFrame,
        num_antennas: usize,
    ) -> Result<BlockVisibility, VisError> {
        if num_antennas == 0 {
            return Err(VisError::NoAntennas);
        }
        if channel_bandwidths.len() != frequencies.len() {
            return Err(VisError::InconsistentColumns {
                column: "channel_bandwidths",
                len: channel_bandwidths.len(),
                expected: frequencies.len(),
            });
        }
        if uvw.dim() != (times.len(), baselines.len()) {
            return Err(VisError::InconsistentColumns {
                column: "uvw",
                len: uvw.len(),
                expected: times.len() * baselines.len(),
            });
        }
        let shape = (
            times.len(),
            baselines.len(),
            frequencies.len(),
            polarisation_frame.num_pols(),
        );
        Ok(BlockVisibility {
            times,
            frequencies,
            channel_bandwidths,
            baselines,
            uvw,
            vis: Array4::zeros(shape),
            weight: Array4::ones(shape),
            phase_centre,
            polarisation_frame,
            num_antennas,
        })
    }

    /// `(num_times, num_baselines, num_chans, num_pols)`
    pub fn dim(&self) -> (usize, usize, usize, usize) {
        self.vis.dim()
    }

    /// Convert to rows. Rows are ordered by time, then baseline, then channel.
    pub fn coalesce(&self) -> Visibility {
        let (num_times, num_baselines, num_chans, num_pols) = self.dim();
        let num_rows = num_times * num_baselines * num_chans;
        debug!("Coalescing {num_times} times, {num_baselines} baselines and {num_chans} channels into {num_rows} rows");
        let unflatten = |row: usize| {
            (
                row / (num_baselines * num_chans),
                (row / num_chans) % num_baselines,
                row % num_chans,
            )
        };

        let mut rows = Visibility {
            uvw: Vec::with_capacity(num_rows),
            time: Vec::with_capacity(num_rows),
            frequency: Vec::with_capacity(num_rows),
            channel_bandwidth: Vec::with_capacity(num_rows),
            antenna1: Vec::with_capacity(num_rows),
            antenna2: Vec::with_capacity(num_rows),
            vis: Array2::from_shape_fn((num_rows, num_pols), |(row, pol)| {
                let (t, b, c) = unflatten(row);
                self.vis[(t, b, c, pol)]
            }),
            weight: Array2::from_shape_fn((num_rows, num_pols), |(row, pol)| {
                let (t, b, c) = unflatten(row);
                self.weight[(t, b, c, pol)]
            }),
            phase_centre: self.phase_centre,
            polarisation_frame: self.polarisation_frame,
            num_antennas: self.num_antennas,
        };
        for (i_time, &time) in self.times.iter().enumerate() {
            for (i_bl, &(ant1, ant2)) in self.baselines.iter().enumerate() {
                let uvw = self.uvw[(i_time, i_bl)];
                for (&freq, &bw) in self.frequencies.iter().zip(self.channel_bandwidths.iter()) {
                    rows.uvw.push(uvw);
                    rows.time.push(time);
                    rows.frequency.push(freq);
                    rows.channel_bandwidth.push(bw);
                    rows.antenna1.push(ant1);
                    rows.antenna2.push(ant2);
                }
            }
        }
        rows
    }

    /// Convert rows made by [`BlockVisibility::coalesce`] back into blocks,
    /// taking the metadata from `self` and the values and weights from `rows`.
    pub fn decoalesce(&self, rows: &Visibility) -> Result<BlockVisibility, VisError> {
        let (num_times, num_baselines, num_chans, _) = self.dim();
        let num_rows = num_times * num_baselines * num_chans;
        if rows.num_rows() != num_rows {
            return Err(VisError::RowCountMismatch {
                left: num_rows,
                right: rows.num_rows(),
            });
        }
        if rows.polarisation_frame != self.polarisation_frame {
            return Err(VisError::PolarisationMismatch {
                left: self.polarisation_frame,
                right: rows.polarisation_frame,
            });
        }

        let mut block = self.clone();
        block
            .vis
            .iter_mut()
            .zip(rows.vis.iter())
            .for_each(|(b, &r)| *b = r);
        block
            .weight
            .iter_mut()
            .zip(rows.weight.iter())
            .for_each(|(b, &r)| *b = r);
        Ok(block)
    }
}

impl VisibilityData for BlockVisibility {
    fn to_rows(&self) -> Cow<'_, Visibility> {
        Cow::Owned(self.coalesce())
    }

    fn with_rows(&self, rows: Visibility) -> Result<Self, VisError> {
        self.decoalesce(&rows)
    }
}
