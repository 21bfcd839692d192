// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Library-level runs of the pipelines through the public API.

use approx::assert_abs_diff_eq;

use mwa_hyperimage::{
    continuum_imaging, create_empty_image_like,
    image::create_image_from_visibility,
    invert, predict,
    simulate::{add_point_sources, create_blockvisibility, SimulationParams},
    GaussianRestore, ImagingParams, PipelineParams,
};

#[test]
fn test_continuum_imaging_of_block_visibilities() {
    let block = create_blockvisibility(&SimulationParams {
        num_times: 3,
        frequencies: vec![140e6, 160e6],
        ..Default::default()
    })
    .unwrap();
    let rows = block.coalesce();
    let mut sky = create_image_from_visibility(&rows, 32, 0.002, false);
    add_point_sources(&mut sky, &[(16, 16, 2.0)]);
    let observed = predict(&block, &sky, "2d", &ImagingParams::default()).unwrap();
    assert_eq!(observed.dim(), block.dim());

    let params = PipelineParams {
        nmajor: 2,
        ..Default::default()
    };
    let outputs = continuum_imaging(
        &[observed],
        &[create_empty_image_like(&sky)],
        &params,
        &params.clean,
        &GaussianRestore::default(),
    )
    .unwrap();
    let model = &outputs.models[0];
    assert_eq!(model.peak().unwrap().1, (0, 0, 16, 16));
    assert_abs_diff_eq!(model.data[(0, 0, 16, 16)], 2.0, epsilon = 1e-2);
}

#[test]
fn test_faceted_invert_matches_whole_image() {
    let block = create_blockvisibility(&SimulationParams::default()).unwrap();
    let rows = block.coalesce();
    let mut sky = create_image_from_visibility(&rows, 32, 0.002, false);
    add_point_sources(&mut sky, &[(5, 9, 1.0), (20, 27, 0.5)]);
    let params = ImagingParams {
        facets: 4,
        ..Default::default()
    };
    let observed = predict(&rows, &sky, "2d", &params).unwrap();
    let template = create_empty_image_like(&sky);

    let (whole, whole_sumwt) = invert(&observed, &template, false, true, "2d", &params).unwrap();
    let (faceted, faceted_sumwt) =
        invert(&observed, &template, false, true, "facets", &params).unwrap();
    assert_abs_diff_eq!(faceted.data, whole.data, epsilon = 1e-10);
    assert_abs_diff_eq!(faceted_sumwt, whole_sumwt, epsilon = 1e-10);
}
