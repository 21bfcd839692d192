// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Image facets.
//!
//! Each image axis is cut into `facets` equal pieces. A facet covers its own
//! piece (the "core") plus up to `overlap` pixels of each neighbour, clipped
//! to the image. Every facet carries a weight per pixel; at every image pixel
//! the weights of all facets covering it sum to one, so multiplying by the
//! weights and adding facets back into an image reconstructs it exactly.
//!
//! With no taper, the weight is one in the core and zero in the overlap. With
//! a taper, weights ramp across the `2 * overlap` pixels centred on each
//! internal facet boundary, one facet's ramp complementing its neighbour's.

use std::ops::Range;

use ndarray::{prelude::*, Zip};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use super::FacetError;
use crate::{
    image::Image,
    math::{linear_ramp, tukey_ramp},
};

/// The window applied across facet overlaps.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Display,
    EnumIter,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Taper {
    #[default]
    None,
    Linear,
    Tukey,
}

impl Taper {
    fn ramp(self, t: f64) -> f64 {
        match self {
            Taper::None => {
                if t < 0.5 {
                    0.0
                } else {
                    1.0
                }
            }
            Taper::Linear => linear_ramp(t),
            Taper::Tukey => tukey_ramp(t),
        }
    }
}

/// The extent and weights of a facet along one axis.
#[derive(Clone, Debug)]
struct FacetAxis {
    range: Range<usize>,
    weights: Vec<f64>,
}

fn facet_axes(
    axis_len: usize,
    facets: usize,
    overlap: usize,
    taper: Taper,
) -> Result<Vec<FacetAxis>, FacetError> {
    if facets == 0 {
        return Err(FacetError::ZeroFacets);
    }
    if axis_len < facets || axis_len % facets != 0 {
        return Err(FacetError::NotDivisible { axis_len, facets });
    }
    if facets == 1 {
        return Ok(vec![FacetAxis {
            range: 0..axis_len,
            weights: vec![1.0; axis_len],
        }]);
    }
    let facet_size = axis_len / facets;
    if 2 * overlap > facet_size {
        return Err(FacetError::OverlapTooLarge {
            overlap,
            facet_size,
        });
    }

    let axes = (0..facets)
        .map(|k| {
            let core = k * facet_size..(k + 1) * facet_size;
            let range = core.start.saturating_sub(overlap)..(core.end + overlap).min(axis_len);
            let weights = range
                .clone()
                .map(|p| {
                    if overlap == 0 || taper == Taper::None {
                        return if core.contains(&p) { 1.0 } else { 0.0 };
                    }
                    let ramp_width = (2 * overlap) as f64;
                    let mut weight = 1.0;
                    // Rising into this facet across its lower boundary.
                    if k > 0 && p < core.start + overlap {
                        let t = ((p + overlap - core.start) as f64 + 0.5) / ramp_width;
                        weight *= taper.ramp(t);
                    }
                    // Falling out of this facet across its upper boundary.
                    if k + 1 < facets && p + overlap >= core.end {
                        let t = ((p + overlap - core.end) as f64 + 0.5) / ramp_width;
                        weight *= 1.0 - taper.ramp(t);
                    }
                    weight
                })
                .collect();
            FacetAxis { range, weights }
        })
        .collect();
    Ok(axes)
}

/// A facet of an image. This describes a region of an image, and is used to
/// make, cut out and add back facet images; it doesn't hold any pixel values.
#[derive(Clone, Debug)]
pub struct Facet {
    /// The position of this facet in raster order.
    pub index: usize,
    pub y: Range<usize>,
    pub x: Range<usize>,
    weights_y: Vec<f64>,
    weights_x: Vec<f64>,
}

impl Facet {
    /// `[y][x]` weights of this facet's pixels.
    pub fn weights(&self) -> Array2<f64> {
        Array2::from_shape_fn((self.weights_y.len(), self.weights_x.len()), |(y, x)| {
            self.weights_y[y] * self.weights_x[x]
        })
    }

    /// A zero-valued image covering this facet of `image`. The reference pixel
    /// is shifted so that every facet pixel has the same direction as the
    /// corresponding pixel of `image`.
    pub fn template(&self, image: &Image) -> Image {
        let mut geometry = image.geometry.clone();
        geometry.reference_pixel.0 -= self.x.start as f64;
        geometry.reference_pixel.1 -= self.y.start as f64;
        Image::new(geometry, self.y.len(), self.x.len())
    }

    /// Cut this facet out of `image`, multiplying by the facet weights.
    pub fn extract(&self, image: &Image) -> Image {
        let mut facet = self.template(image);
        let weights = self.weights();
        facet.data.assign(&image.data.slice(s![
            ..,
            ..,
            self.y.clone(),
            self.x.clone()
        ]));
        for mut chan in facet.data.outer_iter_mut() {
            for mut pol in chan.outer_iter_mut() {
                pol *= &weights;
            }
        }
        facet
    }

    /// Add the weighted pixels of `facet` into this facet's region of `image`.
    pub fn insert(&self, image: &mut Image, facet: &Image) {
        assert_eq!(
            facet.data.dim(),
            (
                image.data.len_of(Axis(0)),
                image.data.len_of(Axis(1)),
                self.y.len(),
                self.x.len()
            ),
            "Facet image doesn't match the facet region"
        );
        let weights = self.weights();
        let mut region = image
            .data
            .slice_mut(s![.., .., self.y.clone(), self.x.clone()]);
        for (mut region_chan, facet_chan) in region.outer_iter_mut().zip(facet.data.outer_iter()) {
            for (mut region_pol, facet_pol) in
                region_chan.outer_iter_mut().zip(facet_chan.outer_iter())
            {
                Zip::from(&mut region_pol)
                    .and(&facet_pol)
                    .and(&weights)
                    .for_each(|r, &f, &w| *r += f * w);
            }
        }
    }
}

/// A lazy sequence of facets in raster order (y outer, x inner).
pub struct FacetIter {
    y_axes: Vec<FacetAxis>,
    x_axes: Vec<FacetAxis>,
    next: usize,
}

impl Iterator for FacetIter {
    type Item = Facet;

    fn next(&mut self) -> Option<Facet> {
        let num_x = self.x_axes.len();
        if self.next >= self.y_axes.len() * num_x {
            return None;
        }
        let index = self.next;
        self.next += 1;
        let y_axis = &self.y_axes[index / num_x];
        let x_axis = &self.x_axes[index % num_x];
        Some(Facet {
            index,
            y: y_axis.range.clone(),
            x: x_axis.range.clone(),
            weights_y: y_axis.weights.clone(),
            weights_x: x_axis.weights.clone(),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.y_axes.len() * self.x_axes.len() - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for FacetIter {}

/// Iterate over the `facets * facets` facets of an image.
pub fn facets(
    image: &Image,
    facets: usize,
    overlap: usize,
    taper: Taper,
) -> Result<FacetIter, FacetError> {
    let (_, _, num_y, num_x) = image.dim();
    Ok(FacetIter {
        y_axes: facet_axes(num_y, facets, overlap, taper)?,
        x_axes: facet_axes(num_x, facets, overlap, taper)?,
        next: 0,
    })
}
