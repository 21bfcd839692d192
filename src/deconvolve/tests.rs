// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;

use super::*;
use crate::{
    image::{create_empty_image_like, create_image_from_visibility},
    imaging::{invert, predict, ImagingParams},
    simulate::{add_point_sources, create_visibility, SimulationParams},
};

/// A dirty image of one 3 Jy source at pixel (x 20, y 12) and its psf. The
/// psf is twice the size of the image so that it covers every offset.
fn dirty_and_psf() -> (Image, Image) {
    let vis = create_visibility(&SimulationParams {
        num_times: 4,
        ..Default::default()
    })
    .unwrap();
    let mut model = create_image_from_visibility(&vis, 32, 0.002, false);
    add_point_sources(&mut model, &[(20, 12, 3.0)]);
    let params = ImagingParams::default();
    let observed = predict(&vis, &model, "2d", &params).unwrap();
    let template = create_empty_image_like(&model);
    let (dirty, _) = invert(&observed, &template, false, true, "2d", &params).unwrap();
    let psf_template = create_image_from_visibility(&vis, 64, 0.002, false);
    let (psf, _) = invert(&observed, &psf_template, true, true, "2d", &params).unwrap();
    (dirty, psf)
}

fn gaussian_psf(npixel: usize, sigma: f64) -> Image {
    let vis = create_visibility(&SimulationParams::default()).unwrap();
    let mut psf = create_image_from_visibility(&vis, npixel, 0.002, false);
    let c = (npixel / 2) as f64;
    psf.data
        .slice_mut(s![0, 0, .., ..])
        .indexed_iter_mut()
        .for_each(|((y, x), v)| {
            let r2 = (y as f64 - c).powi(2) + (x as f64 - c).powi(2);
            *v = (-r2 / (2.0 * sigma * sigma)).exp();
        });
    psf
}

#[test]
fn test_clean_finds_point_source() {
    let (dirty, psf) = dirty_and_psf();
    let clean = HogbomClean {
        fractional_threshold: 0.001,
        ..Default::default()
    };
    let empty = create_empty_image_like(&dirty);
    let (model, info) = clean.deconvolve(&dirty, &psf, &empty, "cycle 0").unwrap();

    // Every component lands on the source.
    assert_abs_diff_eq!(model.data[(0, 0, 12, 20)], 3.0, epsilon = 3e-3);
    let elsewhere: f64 =
        model.data.iter().map(|v| v.abs()).sum::<f64>() - model.data[(0, 0, 12, 20)];
    assert_abs_diff_eq!(elsewhere, 0.0, epsilon = 1e-12);
    assert!(info.num_components > 0);
    assert!(info.peak_residual <= 3e-3);
}

#[test]
fn test_clean_adds_to_existing_model() {
    let (dirty, psf) = dirty_and_psf();
    let clean = HogbomClean {
        niter: 1,
        ..Default::default()
    };
    let mut start = create_empty_image_like(&dirty);
    start.data[(0, 0, 3, 4)] = 0.5;
    let (model, info) = clean.deconvolve(&dirty, &psf, &start, "cycle 1").unwrap();
    assert_eq!(info.num_components, 1);
    assert_abs_diff_eq!(model.data[(0, 0, 3, 4)], 0.5);
    assert_abs_diff_eq!(model.data[(0, 0, 12, 20)], 0.3, epsilon = 1e-10);
}

#[test]
fn test_clean_threshold_stops_immediately() {
    let (dirty, psf) = dirty_and_psf();
    let clean = HogbomClean {
        threshold: 10.0,
        ..Default::default()
    };
    let empty = create_empty_image_like(&dirty);
    let (model, info) = clean.deconvolve(&dirty, &psf, &empty, "cycle 0").unwrap();
    assert_eq!(info.num_components, 0);
    assert_abs_diff_eq!(info.peak_residual, 3.0, epsilon = 1e-10);
    assert!(model.data.iter().all(|&v| v == 0.0));
}

#[test]
fn test_clean_errors() {
    let (dirty, psf) = dirty_and_psf();
    let empty = create_empty_image_like(&dirty);

    let bad_psf = gaussian_psf(32, 2.0);
    let bad_psf = Image {
        data: -bad_psf.data,
        ..bad_psf
    };
    assert!(matches!(
        HogbomClean::default().deconvolve(&dirty, &bad_psf, &empty, ""),
        Err(DeconvolveError::NonPositivePsfPeak { chan: 0, pol: 0, .. })
    ));

    let small = gaussian_psf(16, 2.0);
    assert!(matches!(
        HogbomClean::default().deconvolve(&dirty, &psf, &psf, ""),
        Err(DeconvolveError::ShapeMismatch { what: "model", .. })
    ));
    // A smaller psf is fine.
    assert!(HogbomClean::default()
        .deconvolve(&dirty, &small, &empty, "")
        .is_ok());

    let clean = HogbomClean {
        gain: 1.5,
        ..Default::default()
    };
    assert!(matches!(
        clean.deconvolve(&dirty, &psf, &empty, ""),
        Err(DeconvolveError::BadGain(_))
    ));
}

#[test]
fn test_fit_psf_fwhm() {
    let psf = gaussian_psf(32, 2.0);
    let (fwhm_y, fwhm_x) = fit_psf_fwhm(psf.data.slice(s![0, 0, .., ..])).unwrap();
    let expected = 2.0 / FWHM_TO_SIGMA;
    assert_abs_diff_eq!(fwhm_y, expected, epsilon = 0.1);
    assert_abs_diff_eq!(fwhm_x, expected, epsilon = 0.1);

    let empty = create_empty_image_like(&psf);
    assert!(fit_psf_fwhm(empty.data.slice(s![0, 0, .., ..])).is_none());
}

#[test]
fn test_restore() {
    let psf = gaussian_psf(32, 2.0);
    let mut model = create_empty_image_like(&psf);
    model.data[(0, 0, 10, 10)] = 1.0;
    let empty = create_empty_image_like(&psf);

    let restored = GaussianRestore::default()
        .restore(&model, &psf, &empty)
        .unwrap();
    assert_abs_diff_eq!(restored.data[(0, 0, 10, 10)], 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(
        restored.data[(0, 0, 10, 11)],
        (-1.0_f64 / 8.0).exp(),
        epsilon = 1e-2
    );
    assert_abs_diff_eq!(restored.data[(0, 0, 10, 30)], 0.0, epsilon = 1e-12);

    // The residual is added as-is.
    let mut residual = create_empty_image_like(&psf);
    residual.data[(0, 0, 0, 0)] = 0.25;
    residual.data[(0, 0, 10, 10)] = -0.5;
    let with_residual = GaussianRestore::default()
        .restore(&model, &psf, &residual)
        .unwrap();
    assert_abs_diff_eq!(
        &with_residual.data - &restored.data,
        residual.data,
        epsilon = 1e-12
    );

    // A fixed beam doesn't need a psf.
    let fixed = GaussianRestore {
        fwhm: Some((1.0, 1.0)),
    };
    let restored = fixed.restore(&model, &empty, &empty).unwrap();
    assert_abs_diff_eq!(restored.data[(0, 0, 10, 10)], 1.0, epsilon = 1e-12);
}
