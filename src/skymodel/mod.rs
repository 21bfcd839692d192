// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Sky models: an optional image plus any number of point components.

#[cfg(test)]
mod tests;

use ndarray::prelude::*;

use crate::{coord::RADec, image::Image, vis::PolarisationFrame};

/// A point source.
#[derive(Clone, Debug)]
pub struct SkyComponent {
    pub direction: RADec,
    /// \[Hz\]
    pub frequencies: Vec<f64>,
    /// `[channel][pol]` \[Jy\]
    pub flux: Array2<f64>,
    pub polarisation_frame: PolarisationFrame,
}

impl SkyComponent {
    /// An unpolarised point source with the same flux density at every
    /// frequency.
    pub fn unpolarised(
        direction: RADec,
        frequencies: Vec<f64>,
        stokes_i: f64,
        polarisation_frame: PolarisationFrame,
    ) -> SkyComponent {
        let mut flux = Array2::zeros((frequencies.len(), polarisation_frame.num_pols()));
        for &pol in polarisation_frame.parallel_hands() {
            flux.column_mut(pol).fill(stokes_i);
        }
        SkyComponent {
            direction,
            frequencies,
            flux,
            polarisation_frame,
        }
    }

    /// The flux densities of the channel nearest to `freq_hz`. A component with
    /// one channel is flat in frequency.
    pub fn flux_at(&self, freq_hz: f64) -> Option<ArrayView1<f64>> {
        let chan = match self.frequencies.len() {
            0 => return None,
            1 => 0,
            _ => self
                .frequencies
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| (*a - freq_hz).abs().total_cmp(&(*b - freq_hz).abs()))
                .map(|(i, _)| i)?,
        };
        Some(self.flux.row(chan))
    }
}

/// A model of the sky.
#[derive(Clone, Debug, Default)]
pub struct SkyModel {
    pub image: Option<Image>,
    pub components: Vec<SkyComponent>,
}

impl SkyModel {
    pub fn from_image(image: Image) -> SkyModel {
        SkyModel {
            image: Some(image),
            components: vec![],
        }
    }

    pub fn from_components(components: Vec<SkyComponent>) -> SkyModel {
        SkyModel {
            image: None,
            components,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.image.is_none() && self.components.is_empty()
    }
}
