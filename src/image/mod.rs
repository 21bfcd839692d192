// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Image planes.
//!
//! Image data are stored as `[channel][pol][y][x]`. Pixel (x,y) maps to the
//! direction cosines `l = (x - x_ref) * cell`, `m = (y - y_ref) * cell` with
//! an orthographic (SIN) projection about the phase centre.

#[cfg(test)]
mod tests;

use ndarray::prelude::*;

use crate::{
    coord::{RADec, LMN},
    vis::{PolarisationFrame, Visibility},
};

/// Everything about an image except its pixel values.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageGeometry {
    pub phase_centre: RADec,
    /// \[radians\]
    pub cell_size: f64,
    /// The (x,y) pixel coordinates of the phase centre. May be fractional or
    /// outside of the image.
    pub reference_pixel: (f64, f64),
    /// \[Hz\]
    pub frequencies: Vec<f64>,
    /// \[Hz\]
    pub channel_bandwidths: Vec<f64>,
    pub polarisation_frame: PolarisationFrame,
}

impl ImageGeometry {
    /// The direction cosines of a pixel. Returns `None` if the pixel is not on
    /// the celestial sphere.
    pub fn pixel_to_lmn(&self, x: f64, y: f64) -> Option<LMN> {
        let l = (x - self.reference_pixel.0) * self.cell_size;
        let m = (y - self.reference_pixel.1) * self.cell_size;
        LMN::from_lm(l, m)
    }

    /// The (fractional) pixel coordinates of a direction.
    pub fn radec_to_pixel(&self, radec: RADec) -> (f64, f64) {
        let LMN { l, m, .. } = radec.to_lmn(self.phase_centre);
        (
            l / self.cell_size + self.reference_pixel.0,
            m / self.cell_size + self.reference_pixel.1,
        )
    }

    /// The image channel closest in frequency to `freq_hz`. A single-channel
    /// image takes every frequency. Returns `None` if there are no channels.
    pub fn channel_of(&self, freq_hz: f64) -> Option<usize> {
        match self.frequencies.len() {
            0 => None,
            1 => Some(0),
            _ => self
                .frequencies
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| (*a - freq_hz).abs().total_cmp(&(*b - freq_hz).abs()))
                .map(|(i, _)| i),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Image {
    /// `[channel][pol][y][x]`
    pub data: Array4<f64>,
    pub geometry: ImageGeometry,
}

impl Image {
    /// A zero-valued image with `num_y` by `num_x` pixels.
    pub fn new(geometry: ImageGeometry, num_y: usize, num_x: usize) -> Image {
        let data = Array4::zeros((
            geometry.frequencies.len(),
            geometry.polarisation_frame.num_pols(),
            num_y,
            num_x,
        ));
        Image { data, geometry }
    }

    /// A square zero-valued image with the phase centre on pixel
    /// `(npixel / 2, npixel / 2)`.
    pub fn create(
        npixel: usize,
        cell_size: f64,
        phase_centre: RADec,
        frequencies: Vec<f64>,
        channel_bandwidths: Vec<f64>,
        polarisation_frame: PolarisationFrame,
    ) -> Image {
        let centre = (npixel / 2) as f64;
        Image::new(
            ImageGeometry {
                phase_centre,
                cell_size,
                reference_pixel: (centre, centre),
                frequencies,
                channel_bandwidths,
                polarisation_frame,
            },
            npixel,
            npixel,
        )
    }

    /// `(num_chans, num_pols, num_y, num_x)`
    pub fn dim(&self) -> (usize, usize, usize, usize) {
        self.data.dim()
    }

    /// The largest absolute pixel value and its `(chan, pol, y, x)` index.
    pub fn peak(&self) -> Option<(f64, (usize, usize, usize, usize))> {
        self.data
            .indexed_iter()
            .max_by(|(_, a), (_, b)| a.abs().total_cmp(&b.abs()))
            .map(|(i, &v)| (v, i))
    }

    pub fn rms(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        (self.data.iter().map(|v| v * v).sum::<f64>() / self.data.len() as f64).sqrt()
    }
}

/// A zero-valued image with the same geometry and shape as `image`.
pub fn create_empty_image_like(image: &Image) -> Image {
    Image {
        data: Array4::zeros(image.data.raw_dim()),
        geometry: image.geometry.clone(),
    }
}

/// A zero-valued image with twice the extent of `image` on each axis, with
/// the same cell size and with the phase centre on the same offset from the
/// image centre. A psf made on this template covers the offset between any
/// two pixels of `image`, so subtracting it during CLEAN never runs off its
/// edge.
pub fn create_psf_template(image: &Image) -> Image {
    let (_, _, num_y, num_x) = image.dim();
    let (ref_x, ref_y) = image.geometry.reference_pixel;
    let geometry = ImageGeometry {
        reference_pixel: (ref_x + (num_x / 2) as f64, ref_y + (num_y / 2) as f64),
        ..image.geometry.clone()
    };
    Image::new(geometry, 2 * num_y, 2 * num_x)
}

/// A square zero-valued image matching some visibilities. If `spectral` is
/// true, the image has one channel per distinct visibility frequency;
/// otherwise it has a single channel at the mean frequency with the total
/// bandwidth.
pub fn create_image_from_visibility(
    vis: &Visibility,
    npixel: usize,
    cell_size: f64,
    spectral: bool,
) -> Image {
    let freqs = vis.unique_frequencies();
    let (frequencies, channel_bandwidths) = if spectral {
        let bandwidths = freqs
            .iter()
            .map(|f| {
                vis.frequency
                    .iter()
                    .position(|vf| vf == f)
                    .map(|row| vis.channel_bandwidth[row])
                    .unwrap_or(0.0)
            })
            .collect();
        (freqs, bandwidths)
    } else if freqs.is_empty() {
        (vec![], vec![])
    } else {
        let mean = freqs.iter().sum::<f64>() / freqs.len() as f64;
        let total_bandwidth = freqs
            .iter()
            .filter_map(|f| vis.frequency.iter().position(|vf| vf == f))
            .map(|row| vis.channel_bandwidth[row])
            .sum();
        (vec![mean], vec![total_bandwidth])
    };
    Image::create(
        npixel,
        cell_size,
        vis.phase_centre,
        frequencies,
        channel_bandwidths,
        vis.polarisation_frame,
    )
}
