// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Transforms between visibilities and images.
//!
//! All of the transforms here are direct Fourier transforms; they differ only
//! in how the w term of each visibility is handled. The phase of pixel
//! `(l, m, n)` on a baseline `(u, v, w)` (in wavelengths) is
//! `2 pi (u l + v m + w_eff (n - 1))`:
//!
//! - [`TwoD`] ignores w (`w_eff = 0`);
//! - [`WStack`] gives every row of a partition the partition's mean w;
//! - [`WProjection`] uses each row's exact w;
//! - [`Timeslice`] fits a plane `w = a u + b v` to the partition and uses the
//!   plane's w, which is what re-projecting a snapshot image achieves.
//!
//! Because predict and invert of the same transform use the same phases,
//! predicting a point source and inverting it again with the same partition
//! always recovers the source exactly.

mod error;
#[cfg(test)]
mod tests;

pub use error::TransformError;

use std::f64::consts::TAU;

use log::trace;
use ndarray::{parallel::prelude::*, prelude::*};

use crate::{
    c64,
    coord::{LMN, UVW},
    image::{create_empty_image_like, Image},
    math::{cexp, fit_uvw_plane},
    skymodel::SkyComponent,
    vis::Visibility,
};

/// A way of getting from visibilities to an image and back again.
///
/// Implementors need only say how w is to be treated; the default `predict`
/// and `invert` methods do the rest. Neither method may modify its inputs.
pub trait Transform: Send + Sync {
    /// A short name used in logs.
    fn name(&self) -> &'static str;

    /// The w coordinate \[wavelengths\] used in the phase of each row, given
    /// the UVWs of every row \[wavelengths\].
    fn effective_w(&self, uvws: &[UVW]) -> Vec<f64>;

    /// Predict visibilities from `model`. The returned visibilities are a copy
    /// of `vis` with the values replaced.
    fn predict(&self, vis: &Visibility, model: &Image) -> Result<Visibility, TransformError> {
        check_polarisations(vis, model)?;
        let uvws = uvws_lambda(vis);
        let ws = self.effective_w(&uvws);
        trace!(
            "{}: predicting {} rows from a {:?} image",
            self.name(),
            vis.num_rows(),
            model.dim()
        );
        Ok(dft_predict(vis, model, &uvws, &ws))
    }

    /// Make a dirty image (or, if `do_psf` is true, a point-spread function)
    /// on the grid of `template`. Also returned is the sum of the weights for
    /// each `[channel][pol]` of the image. If `normalize` is true, the image is
    /// divided by the sum of the weights.
    fn invert(
        &self,
        vis: &Visibility,
        template: &Image,
        do_psf: bool,
        normalize: bool,
    ) -> Result<(Image, Array2<f64>), TransformError> {
        check_polarisations(vis, template)?;
        let uvws = uvws_lambda(vis);
        let ws = self.effective_w(&uvws);
        trace!(
            "{}: inverting {} rows onto a {:?} image (psf: {do_psf})",
            self.name(),
            vis.num_rows(),
            template.dim()
        );
        let (mut image, sumwt) = dft_invert(vis, template, &uvws, &ws, do_psf);
        if normalize {
            normalize_by_weights(&mut image, &sumwt);
        }
        Ok((image, sumwt))
    }
}

/// No w term.
#[derive(Debug, Clone, Copy, Default)]
pub struct TwoD;

/// The mean w of the visibilities.
#[derive(Debug, Clone, Copy, Default)]
pub struct WStack;

/// The exact w of every visibility.
#[derive(Debug, Clone, Copy, Default)]
pub struct WProjection;

/// The w of a plane fitted to the visibilities.
#[derive(Debug, Clone, Copy, Default)]
pub struct Timeslice;

impl Transform for TwoD {
    fn name(&self) -> &'static str {
        "2d"
    }

    fn effective_w(&self, uvws: &[UVW]) -> Vec<f64> {
        vec![0.0; uvws.len()]
    }
}

impl Transform for WStack {
    fn name(&self) -> &'static str {
        "wstack"
    }

    fn effective_w(&self, uvws: &[UVW]) -> Vec<f64> {
        if uvws.is_empty() {
            return vec![];
        }
        let mean = uvws.iter().map(|uvw| uvw.w).sum::<f64>() / uvws.len() as f64;
        vec![mean; uvws.len()]
    }
}

impl Transform for WProjection {
    fn name(&self) -> &'static str {
        "wprojection"
    }

    fn effective_w(&self, uvws: &[UVW]) -> Vec<f64> {
        uvws.iter().map(|uvw| uvw.w).collect()
    }
}

impl Transform for Timeslice {
    fn name(&self) -> &'static str {
        "timeslice"
    }

    fn effective_w(&self, uvws: &[UVW]) -> Vec<f64> {
        let (a, b) = fit_uvw_plane(uvws.iter().map(|uvw| (uvw.u, uvw.v, uvw.w)));
        trace!("timeslice: w plane fit a = {a}, b = {b}");
        uvws.iter().map(|uvw| a * uvw.u + b * uvw.v).collect()
    }
}

fn check_polarisations(vis: &Visibility, image: &Image) -> Result<(), TransformError> {
    if vis.polarisation_frame != image.geometry.polarisation_frame {
        return Err(TransformError::PolarisationMismatch {
            vis: vis.polarisation_frame,
            image: image.geometry.polarisation_frame,
        });
    }
    Ok(())
}

fn uvws_lambda(vis: &Visibility) -> Vec<UVW> {
    (0..vis.num_rows()).map(|row| vis.uvw_lambda(row)).collect()
}

/// The phase of a direction on a baseline. `w` is the effective w.
#[inline]
fn phasor(uvw: UVW, w: f64, lmn: LMN) -> c64 {
    cexp(TAU * (uvw.u * lmn.l + uvw.v * lmn.m + w * (lmn.n - 1.0)))
}

/// A non-zero pixel of a model image.
struct ModelPixel {
    lmn: LMN,
    /// One value per polarisation.
    values: Vec<f64>,
}

fn dft_predict(vis: &Visibility, model: &Image, uvws: &[UVW], ws: &[f64]) -> Visibility {
    let geometry = &model.geometry;
    // Only non-zero pixels contribute; model images are usually mostly
    // empty.
    let pixels: Vec<Vec<ModelPixel>> = model
        .data
        .outer_iter()
        .map(|chan| {
            let (_, num_y, num_x) = chan.dim();
            let mut pixels = vec![];
            for y in 0..num_y {
                for x in 0..num_x {
                    let values = chan.slice(s![.., y, x]);
                    if values.iter().all(|&v| v == 0.0) {
                        continue;
                    }
                    if let Some(lmn) = geometry.pixel_to_lmn(x as f64, y as f64) {
                        pixels.push(ModelPixel {
                            lmn,
                            values: values.to_vec(),
                        });
                    }
                }
            }
            pixels
        })
        .collect();

    let mut predicted = vis.zeroed();
    predicted
        .vis
        .outer_iter_mut()
        .into_par_iter()
        .zip(uvws.par_iter())
        .zip(ws.par_iter())
        .zip(vis.frequency.par_iter())
        .for_each(|(((mut vis_row, &uvw), &w), &freq)| {
            let Some(chan) = geometry.channel_of(freq) else {
                return;
            };
            for pixel in &pixels[chan] {
                let p = phasor(uvw, w, pixel.lmn);
                vis_row
                    .iter_mut()
                    .zip(pixel.values.iter())
                    .for_each(|(v, &value)| *v += p * value);
            }
        });
    predicted
}

fn dft_invert(
    vis: &Visibility,
    template: &Image,
    uvws: &[UVW],
    ws: &[f64],
    do_psf: bool,
) -> (Image, Array2<f64>) {
    let mut image = create_empty_image_like(template);
    let (num_chans, num_pols, _, _) = image.dim();
    let mut sumwt = Array2::zeros((num_chans, num_pols));

    // Group the rows by image channel.
    let mut chan_rows: Vec<Vec<usize>> = vec![vec![]; num_chans];
    for (row, &freq) in vis.frequency.iter().enumerate() {
        if let Some(chan) = template.geometry.channel_of(freq) {
            chan_rows[chan].push(row);
            for (total, &w) in sumwt
                .slice_mut(s![chan, ..])
                .iter_mut()
                .zip(vis.weight.slice(s![row, ..]).iter())
            {
                *total += w;
            }
        }
    }

    let geometry = &template.geometry;
    for (chan_image, rows) in image.data.outer_iter_mut().zip(chan_rows.iter()) {
        if rows.is_empty() {
            continue;
        }
        // [y][x][pol]
        let mut pixels = chan_image.permuted_axes([1, 2, 0]);
        pixels
            .outer_iter_mut()
            .into_par_iter()
            .enumerate()
            .for_each(|(y, mut image_row)| {
                for (x, mut pols) in image_row.outer_iter_mut().enumerate() {
                    let Some(lmn) = geometry.pixel_to_lmn(x as f64, y as f64) else {
                        continue;
                    };
                    for &row in rows {
                        // Conjugate phase; we're going the other way.
                        let p = phasor(uvws[row], ws[row], lmn).conj();
                        for (pol, pixel) in pols.iter_mut().enumerate() {
                            let weight = vis.weight[(row, pol)];
                            let value = if do_psf {
                                p.re
                            } else {
                                (vis.vis[(row, pol)] * p).re
                            };
                            *pixel += weight * value;
                        }
                    }
                }
            });
    }
    (image, sumwt)
}

/// Divide each `[channel][pol]` plane of an image by its weight. Planes with
/// no weight are left alone.
pub(crate) fn normalize_by_weights(image: &mut Image, sumwt: &Array2<f64>) {
    for (mut chan, chan_wt) in image.data.outer_iter_mut().zip(sumwt.outer_iter()) {
        for (mut plane, &wt) in chan.outer_iter_mut().zip(chan_wt.iter()) {
            if wt > 0.0 {
                plane /= wt;
            }
        }
    }
}

/// Predict the visibilities of point components with an exact direct Fourier
/// transform. The components are added to the values already in `vis`.
pub fn predict_skycomponent_visibility(
    vis: &mut Visibility,
    components: &[SkyComponent],
) -> Result<(), TransformError> {
    for comp in components {
        if comp.polarisation_frame != vis.polarisation_frame {
            return Err(TransformError::PolarisationMismatch {
                vis: vis.polarisation_frame,
                image: comp.polarisation_frame,
            });
        }
        if comp.flux.len_of(Axis(0)) != comp.frequencies.len() {
            return Err(TransformError::ComponentChannels {
                got: comp.flux.len_of(Axis(0)),
                expected: comp.frequencies.len(),
            });
        }
    }
    let lmns: Vec<LMN> = components
        .iter()
        .map(|comp| comp.direction.to_lmn(vis.phase_centre))
        .collect();
    let uvws = uvws_lambda(vis);

    vis.vis
        .outer_iter_mut()
        .into_par_iter()
        .zip(uvws.par_iter())
        .zip(vis.frequency.par_iter())
        .for_each(|((mut vis_row, &uvw), &freq)| {
            for (comp, &lmn) in components.iter().zip(lmns.iter()) {
                let Some(flux) = comp.flux_at(freq) else {
                    continue;
                };
                let p = phasor(uvw, uvw.w, lmn);
                vis_row
                    .iter_mut()
                    .zip(flux.iter())
                    .for_each(|(v, &f)| *v += p * f);
            }
        });
    Ok(())
}
