// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;

use super::*;
use crate::{
    coord::RADec,
    image::create_image_from_visibility,
    simulate::{add_point_sources, create_visibility, SimulationParams},
    vis::PolarisationFrame,
};

fn get_vis(frequencies: Vec<f64>, polarisation_frame: PolarisationFrame) -> Visibility {
    create_visibility(&SimulationParams {
        frequencies,
        polarisation_frame,
        ..Default::default()
    })
    .unwrap()
}

fn transforms() -> [&'static dyn Transform; 4] {
    [&TwoD, &WStack, &WProjection, &Timeslice]
}

#[test]
fn test_point_source_round_trip() {
    let vis = get_vis(vec![150e6], PolarisationFrame::StokesI);
    let mut model = create_image_from_visibility(&vis, 32, 0.002, false);
    add_point_sources(&mut model, &[(20, 12, 3.0)]);

    for transform in transforms() {
        let predicted = transform.predict(&vis, &model).unwrap();
        assert_eq!(predicted.num_rows(), vis.num_rows());
        let (dirty, sumwt) = transform.invert(&predicted, &model, false, true).unwrap();
        assert_abs_diff_eq!(sumwt[(0, 0)], vis.num_rows() as f64);
        assert_abs_diff_eq!(dirty.data[(0, 0, 12, 20)], 3.0, epsilon = 1e-10);
        let (peak, _) = dirty.peak().unwrap();
        assert_abs_diff_eq!(peak, 3.0, epsilon = 1e-10);
    }
}

#[test]
fn test_source_at_phase_centre_is_flat() {
    let vis = get_vis(vec![150e6], PolarisationFrame::Linear);
    let mut model = create_image_from_visibility(&vis, 16, 0.002, false);
    add_point_sources(&mut model, &[(8, 8, 2.0)]);

    for transform in transforms() {
        let predicted = transform.predict(&vis, &model).unwrap();
        for row in predicted.vis.outer_iter() {
            assert_abs_diff_eq!(row[0], c64::new(2.0, 0.0), epsilon = 1e-12);
            assert_abs_diff_eq!(row[1], c64::new(0.0, 0.0));
            assert_abs_diff_eq!(row[2], c64::new(0.0, 0.0));
            assert_abs_diff_eq!(row[3], c64::new(2.0, 0.0), epsilon = 1e-12);
        }
    }
}

#[test]
fn test_predict_is_linear() {
    let vis = get_vis(vec![150e6], PolarisationFrame::StokesI);
    let mut model_a = create_image_from_visibility(&vis, 16, 0.002, false);
    let mut model_b = model_a.clone();
    add_point_sources(&mut model_a, &[(3, 4, 1.0)]);
    add_point_sources(&mut model_b, &[(11, 9, 2.0)]);
    let mut model_ab = model_a.clone();
    model_ab.data += &model_b.data;

    let a = WProjection.predict(&vis, &model_a).unwrap();
    let b = WProjection.predict(&vis, &model_b).unwrap();
    let ab = WProjection.predict(&vis, &model_ab).unwrap();
    assert_abs_diff_eq!(ab.vis, &a.vis + &b.vis, epsilon = 1e-12);
}

#[test]
fn test_psf_peak_is_unity() {
    let vis = get_vis(vec![140e6, 160e6], PolarisationFrame::StokesI);
    let template = create_image_from_visibility(&vis, 16, 0.002, true);
    let (psf, sumwt) = TwoD.invert(&vis, &template, true, true).unwrap();
    assert_eq!(psf.dim(), (2, 1, 16, 16));
    // Each channel gets half of the rows.
    assert_abs_diff_eq!(sumwt[(0, 0)], vis.num_rows() as f64 / 2.0);
    assert_abs_diff_eq!(sumwt[(1, 0)], vis.num_rows() as f64 / 2.0);
    assert_abs_diff_eq!(psf.data[(0, 0, 8, 8)], 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(psf.data[(1, 0, 8, 8)], 1.0, epsilon = 1e-12);
    assert!(psf.data.iter().all(|&v| v <= 1.0 + 1e-12));
}

#[test]
fn test_unnormalised_invert_scales_with_weights() {
    let mut vis = get_vis(vec![150e6], PolarisationFrame::StokesI);
    let template = create_image_from_visibility(&vis, 8, 0.002, false);
    let (psf, sumwt) = TwoD.invert(&vis, &template, true, false).unwrap();
    vis.weight.fill(2.0);
    let (psf2, sumwt2) = TwoD.invert(&vis, &template, true, false).unwrap();
    assert_abs_diff_eq!(sumwt2, &sumwt * 2.0);
    assert_abs_diff_eq!(psf2.data, &psf.data * 2.0, epsilon = 1e-10);
}

#[test]
fn test_zero_weights_give_zero_image() {
    let mut vis = get_vis(vec![150e6], PolarisationFrame::StokesI);
    vis.weight.fill(0.0);
    let template = create_image_from_visibility(&vis, 8, 0.002, false);
    let (image, sumwt) = TwoD.invert(&vis, &template, true, true).unwrap();
    assert_abs_diff_eq!(sumwt[(0, 0)], 0.0);
    assert!(image.data.iter().all(|&v| v == 0.0));
}

#[test]
fn test_polarisation_mismatch() {
    let vis = get_vis(vec![150e6], PolarisationFrame::StokesI);
    let mut template = create_image_from_visibility(&vis, 8, 0.002, false);
    template.geometry.polarisation_frame = PolarisationFrame::Linear;
    assert!(matches!(
        TwoD.invert(&vis, &template, false, true),
        Err(TransformError::PolarisationMismatch { .. })
    ));
    assert!(matches!(
        WStack.predict(&vis, &template),
        Err(TransformError::PolarisationMismatch { .. })
    ));
}

#[test]
fn test_effective_w() {
    let uvws: Vec<UVW> = [(10.0, 5.0), (-3.0, 7.0), (4.0, -8.0), (1.0, 1.0)]
        .into_iter()
        .map(|(u, v)| UVW {
            u,
            v,
            w: 0.1 * u - 0.2 * v,
        })
        .collect();

    assert!(TwoD.effective_w(&uvws).iter().all(|&w| w == 0.0));

    let mean = uvws.iter().map(|uvw| uvw.w).sum::<f64>() / 4.0;
    for w in WStack.effective_w(&uvws) {
        assert_abs_diff_eq!(w, mean);
    }

    for (w, uvw) in WProjection.effective_w(&uvws).into_iter().zip(&uvws) {
        assert_abs_diff_eq!(w, uvw.w);
    }

    // Coplanar baselines are fitted exactly.
    for (w, uvw) in Timeslice.effective_w(&uvws).into_iter().zip(&uvws) {
        assert_abs_diff_eq!(w, uvw.w, epsilon = 1e-12);
    }

    assert!(WStack.effective_w(&[]).is_empty());
}

#[test]
fn test_predict_skycomponents() {
    let mut vis = get_vis(vec![150e6, 170e6], PolarisationFrame::StokesI);
    let centre = SkyComponent::unpolarised(
        vis.phase_centre,
        vec![150e6],
        1.5,
        PolarisationFrame::StokesI,
    );
    let offset = SkyComponent::unpolarised(
        RADec::new(vis.phase_centre.ra + 0.01, vis.phase_centre.dec + 0.005),
        vec![150e6],
        2.0,
        PolarisationFrame::StokesI,
    );

    predict_skycomponent_visibility(&mut vis, &[centre.clone()]).unwrap();
    for v in vis.vis.iter() {
        assert_abs_diff_eq!(*v, c64::new(1.5, 0.0), epsilon = 1e-12);
    }

    // Components are added to what's already there.
    predict_skycomponent_visibility(&mut vis, &[offset]).unwrap();
    for v in vis.vis.iter() {
        assert_abs_diff_eq!((*v - c64::new(1.5, 0.0)).norm(), 2.0, epsilon = 1e-12);
    }

    let mut bad = centre;
    bad.polarisation_frame = PolarisationFrame::Linear;
    assert!(matches!(
        predict_skycomponent_visibility(&mut vis, &[bad]),
        Err(TransformError::PolarisationMismatch { .. })
    ));
}
