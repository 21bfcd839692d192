// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Minor-cycle deconvolution and restoring.
//!
//! The major-cycle pipelines only need something implementing [`Deconvolve`]
//! and something implementing [`Restore`]. Hogbom CLEAN and a Gaussian
//! restoring beam are supplied.

mod error;
#[cfg(test)]
mod tests;

pub use error::DeconvolveError;

use log::{debug, info};
use ndarray::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    constants::{
        DEFAULT_CLEAN_FRACTIONAL_THRESHOLD, DEFAULT_CLEAN_GAIN, DEFAULT_CLEAN_NITER,
        DEFAULT_CLEAN_THRESHOLD, FWHM_TO_SIGMA,
    },
    image::Image,
};

/// A summary of one deconvolution.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeconvolveInfo {
    /// The number of components added to the model over all image planes.
    pub num_components: usize,

    /// The largest absolute residual left over all image planes.
    pub peak_residual: f64,
}

/// Improves a sky model image given a residual image and the point-spread
/// function.
pub trait Deconvolve: Send + Sync {
    /// Return the updated model. `prefix` labels this call in logs, e.g.
    /// "cycle 2".
    fn deconvolve(
        &self,
        residual: &Image,
        psf: &Image,
        model: &Image,
        prefix: &str,
    ) -> Result<(Image, DeconvolveInfo), DeconvolveError>;
}

/// Combines a model, the point-spread function and a residual into a restored
/// image.
pub trait Restore: Send + Sync {
    fn restore(&self, model: &Image, psf: &Image, residual: &Image)
        -> Result<Image, DeconvolveError>;
}

/// Hogbom CLEAN, applied to every channel and polarisation independently.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HogbomClean {
    /// The fraction of the peak removed each iteration.
    pub gain: f64,

    /// Stop when the peak residual is below this \[Jy\].
    pub threshold: f64,

    /// Stop when the peak residual is below this fraction of the starting
    /// peak residual.
    pub fractional_threshold: f64,

    /// The maximum number of components per image plane.
    pub niter: usize,
}

impl Default for HogbomClean {
    fn default() -> Self {
        HogbomClean {
            gain: DEFAULT_CLEAN_GAIN,
            threshold: DEFAULT_CLEAN_THRESHOLD,
            fractional_threshold: DEFAULT_CLEAN_FRACTIONAL_THRESHOLD,
            niter: DEFAULT_CLEAN_NITER,
        }
    }
}

fn check_shape(what: &'static str, image: &Image, residual: &Image) -> Result<(), DeconvolveError> {
    if image.dim() != residual.dim() {
        return Err(DeconvolveError::ShapeMismatch {
            what,
            got: image.dim(),
            expected: residual.dim(),
        });
    }
    Ok(())
}

/// The psf plane to use for a residual plane. A psf may have a single channel
/// or polarisation, in which case it is used for all of them.
fn psf_plane<'a>(
    psf: &'a Image,
    residual: &Image,
    chan: usize,
    pol: usize,
) -> Result<ArrayView2<'a, f64>, DeconvolveError> {
    let (num_chans, num_pols, _, _) = residual.dim();
    let (psf_chans, psf_pols, _, _) = psf.dim();
    let psf_chan = match psf_chans {
        n if n == num_chans => chan,
        1 => 0,
        _ => {
            return Err(DeconvolveError::ShapeMismatch {
                what: "psf",
                got: psf.dim(),
                expected: residual.dim(),
            })
        }
    };
    let psf_pol = match psf_pols {
        n if n == num_pols => pol,
        1 => 0,
        _ => {
            return Err(DeconvolveError::ShapeMismatch {
                what: "psf",
                got: psf.dim(),
                expected: residual.dim(),
            })
        }
    };
    Ok(psf.data.slice(s![psf_chan, psf_pol, .., ..]))
}

/// The location and value of the largest pixel of a psf plane.
fn psf_peak(psf: ArrayView2<f64>) -> Option<((usize, usize), f64)> {
    psf.indexed_iter()
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(i, &v)| (i, v))
}

/// Subtract `amplitude` times the psf, with its peak at `(y, x)`, from
/// `image`.
fn subtract_psf(
    mut image: ArrayViewMut2<f64>,
    psf: ArrayView2<f64>,
    psf_centre: (usize, usize),
    (y, x): (usize, usize),
    amplitude: f64,
) {
    let (num_y, num_x) = image.dim();
    let (psf_y, psf_x) = psf.dim();
    // The overlap of the shifted psf with the image.
    let y0 = y.saturating_sub(psf_centre.0);
    let x0 = x.saturating_sub(psf_centre.1);
    let y1 = (y + psf_y - psf_centre.0).min(num_y);
    let x1 = (x + psf_x - psf_centre.1).min(num_x);
    for iy in y0..y1 {
        let py = iy + psf_centre.0 - y;
        for ix in x0..x1 {
            let px = ix + psf_centre.1 - x;
            image[(iy, ix)] -= amplitude * psf[(py, px)];
        }
    }
}

impl HogbomClean {
    /// CLEAN a single plane, returning the number of components found and
    /// the final peak residual.
    fn clean_plane(
        &self,
        mut residual: ArrayViewMut2<f64>,
        mut model: ArrayViewMut2<f64>,
        psf: ArrayView2<f64>,
        psf_centre: (usize, usize),
        psf_peak: f64,
    ) -> (usize, f64) {
        let find_peak = |image: &ArrayViewMut2<f64>| {
            image
                .indexed_iter()
                .max_by(|(_, a), (_, b)| a.abs().total_cmp(&b.abs()))
                .map(|(i, &v)| (i, v))
        };
        let Some((_, start)) = find_peak(&residual) else {
            return (0, 0.0);
        };
        let stop = self.threshold.max(self.fractional_threshold * start.abs());

        let mut num_components = 0;
        while num_components < self.niter {
            let Some((location, peak)) = find_peak(&residual) else {
                break;
            };
            if peak.abs() <= stop || peak.abs() == 0.0 {
                break;
            }
            let amplitude = self.gain * peak / psf_peak;
            model[location] += amplitude;
            subtract_psf(residual.view_mut(), psf, psf_centre, location, amplitude);
            num_components += 1;
        }
        let peak_residual = find_peak(&residual).map(|(_, v)| v.abs()).unwrap_or(0.0);
        (num_components, peak_residual)
    }
}

impl Deconvolve for HogbomClean {
    fn deconvolve(
        &self,
        residual: &Image,
        psf: &Image,
        model: &Image,
        prefix: &str,
    ) -> Result<(Image, DeconvolveInfo), DeconvolveError> {
        if !(self.gain > 0.0 && self.gain <= 1.0) {
            return Err(DeconvolveError::BadGain(self.gain));
        }
        check_shape("model", model, residual)?;
        let (num_chans, num_pols, _, _) = residual.dim();

        // Validate every psf plane before doing any work.
        let mut psfs = Vec::with_capacity(num_chans * num_pols);
        for chan in 0..num_chans {
            for pol in 0..num_pols {
                let plane = psf_plane(psf, residual, chan, pol)?;
                match psf_peak(plane) {
                    Some((centre, peak)) if peak > 0.0 => psfs.push((plane, centre, peak)),
                    other => {
                        return Err(DeconvolveError::NonPositivePsfPeak {
                            chan,
                            pol,
                            peak: other.map(|(_, p)| p).unwrap_or(0.0),
                        })
                    }
                }
            }
        }

        let mut new_model = model.clone();
        let mut work = residual.data.clone();
        let results: Vec<(usize, f64)> = new_model
            .data
            .outer_iter_mut()
            .into_par_iter()
            .zip(work.outer_iter_mut().into_par_iter())
            .zip(psfs.par_chunks(num_pols.max(1)))
            .flat_map_iter(|((mut model_chan, mut residual_chan), chan_psfs)| {
                model_chan
                    .outer_iter_mut()
                    .zip(residual_chan.outer_iter_mut())
                    .zip(chan_psfs.iter())
                    .map(|((model_plane, residual_plane), &(psf, centre, peak))| {
                        self.clean_plane(residual_plane, model_plane, psf, centre, peak)
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        for (i, &(num_components, peak_residual)) in results.iter().enumerate() {
            debug!(
                "{prefix}: channel {} pol {}: {num_components} components, peak residual {peak_residual:.4e}",
                i / num_pols.max(1),
                i % num_pols.max(1)
            );
        }
        let info = DeconvolveInfo {
            num_components: results.iter().map(|(n, _)| n).sum(),
            peak_residual: results.iter().fold(0.0, |acc, &(_, p)| acc.max(p)),
        };
        info!(
            "{prefix}: CLEANed {} components; peak residual is now {:.4e}",
            info.num_components, info.peak_residual
        );
        Ok((new_model, info))
    }
}

/// Restore by convolving the model with an elliptical Gaussian matched to the
/// psf's main lobe, then adding the residual.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GaussianRestore {
    /// The `(y, x)` FWHM of the restoring beam \[pixels\]. If this isn't
    /// given, it is measured from the psf.
    pub fwhm: Option<(f64, f64)>,
}

/// The distance from the peak to where the psf falls to half of it, along one
/// direction, with linear interpolation between pixels.
fn half_width(profile: impl Iterator<Item = f64>, peak: f64) -> f64 {
    let half = peak / 2.0;
    let mut previous = peak;
    let mut distance = 0.0;
    for (i, value) in profile.enumerate() {
        if value < half {
            return i as f64 + (previous - half) / (previous - value);
        }
        previous = value;
        distance = (i + 1) as f64;
    }
    distance
}

/// The `(y, x)` FWHM of a psf plane's main lobe \[pixels\].
pub fn fit_psf_fwhm(psf: ArrayView2<f64>) -> Option<(f64, f64)> {
    let ((py, px), peak) = psf_peak(psf)?;
    if peak <= 0.0 {
        return None;
    }
    let row = psf.row(py);
    let col = psf.column(px);
    let hw_x = (half_width(row.iter().skip(px + 1).copied(), peak)
        + half_width(row.iter().take(px).rev().copied(), peak))
        / 2.0;
    let hw_y = (half_width(col.iter().skip(py + 1).copied(), peak)
        + half_width(col.iter().take(py).rev().copied(), peak))
        / 2.0;
    // A main lobe narrower than a pixel can't be measured.
    Some(((2.0 * hw_y).max(1.0), (2.0 * hw_x).max(1.0)))
}

impl Restore for GaussianRestore {
    fn restore(
        &self,
        model: &Image,
        psf: &Image,
        residual: &Image,
    ) -> Result<Image, DeconvolveError> {
        check_shape("model", model, residual)?;
        let (num_chans, num_pols, num_y, num_x) = residual.dim();
        let mut restored = residual.clone();

        for chan in 0..num_chans {
            // The beam is measured from a parallel hand.
            let plane = psf_plane(psf, residual, chan, 0)?;
            let fwhm = match self.fwhm {
                Some(fwhm) => fwhm,
                None => fit_psf_fwhm(plane).ok_or(DeconvolveError::NonPositivePsfPeak {
                    chan,
                    pol: 0,
                    peak: psf_peak(plane).map(|(_, p)| p).unwrap_or(0.0),
                })?,
            };
            let sigma = (fwhm.0 * FWHM_TO_SIGMA, fwhm.1 * FWHM_TO_SIGMA);
            debug!(
                "Restoring channel {chan} with a {:.2} x {:.2} pixel beam",
                fwhm.0, fwhm.1
            );
            // Beyond this many pixels, the beam is negligible.
            let reach_y = (5.0 * sigma.0).ceil() as usize;
            let reach_x = (5.0 * sigma.1).ceil() as usize;

            for pol in 0..num_pols {
                let model_plane = model.data.slice(s![chan, pol, .., ..]);
                let mut out = restored.data.slice_mut(s![chan, pol, .., ..]);
                for ((y, x), &amplitude) in model_plane.indexed_iter() {
                    if amplitude == 0.0 {
                        continue;
                    }
                    for iy in y.saturating_sub(reach_y)..(y + reach_y + 1).min(num_y) {
                        let dy = (iy as f64 - y as f64) / sigma.0;
                        for ix in x.saturating_sub(reach_x)..(x + reach_x + 1).min(num_x) {
                            let dx = (ix as f64 - x as f64) / sigma.1;
                            out[(iy, ix)] += amplitude * (-0.5 * (dx * dx + dy * dy)).exp();
                        }
                    }
                }
            }
        }
        Ok(restored)
    }
}
