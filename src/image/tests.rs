// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;

use super::*;

fn get_image() -> Image {
    Image::create(
        16,
        0.001,
        RADec::from_degrees(15.0, -30.0),
        vec![100e6, 120e6, 140e6],
        vec![1e6; 3],
        PolarisationFrame::StokesI,
    )
}

#[test]
fn test_create() {
    let image = get_image();
    assert_eq!(image.dim(), (3, 1, 16, 16));
    assert_eq!(image.geometry.reference_pixel, (8.0, 8.0));

    let lmn = image.geometry.pixel_to_lmn(10.0, 5.0).unwrap();
    assert_abs_diff_eq!(lmn.l, 0.002, epsilon = 1e-15);
    assert_abs_diff_eq!(lmn.m, -0.003, epsilon = 1e-15);
}

#[test]
fn test_radec_to_pixel_inverts_pixel_to_lmn() {
    let image = get_image();
    let pc = image.geometry.phase_centre;
    let (x, y) = image.geometry.radec_to_pixel(pc);
    assert_abs_diff_eq!(x, 8.0, epsilon = 1e-10);
    assert_abs_diff_eq!(y, 8.0, epsilon = 1e-10);

    let offset = RADec::new(pc.ra + 0.003 / pc.dec.cos(), pc.dec);
    let (x, _) = image.geometry.radec_to_pixel(offset);
    assert_abs_diff_eq!(x, 11.0, epsilon = 1e-3);
}

#[test]
fn test_channel_of() {
    let image = get_image();
    assert_eq!(image.geometry.channel_of(99e6), Some(0));
    assert_eq!(image.geometry.channel_of(125e6), Some(1));
    assert_eq!(image.geometry.channel_of(1e9), Some(2));

    let mut geometry = image.geometry.clone();
    geometry.frequencies = vec![150e6];
    assert_eq!(geometry.channel_of(1e9), Some(0));
    geometry.frequencies.clear();
    assert_eq!(geometry.channel_of(1e9), None);
}

#[test]
fn test_peak_and_empty_like() {
    let mut image = get_image();
    image.data[(1, 0, 3, 4)] = -5.0;
    image.data[(2, 0, 7, 7)] = 2.0;
    let (value, index) = image.peak().unwrap();
    assert_abs_diff_eq!(value, -5.0);
    assert_eq!(index, (1, 0, 3, 4));

    let empty = create_empty_image_like(&image);
    assert_eq!(empty.dim(), image.dim());
    assert_eq!(empty.geometry, image.geometry);
    assert!(empty.data.iter().all(|&v| v == 0.0));
    assert_abs_diff_eq!(empty.rms(), 0.0);
}

#[test]
fn test_psf_template_doubles_the_extent() {
    let image = get_image();
    let template = create_psf_template(&image);
    assert_eq!(template.dim(), (3, 1, 32, 32));
    assert_eq!(template.geometry.reference_pixel, (16.0, 16.0));
    assert_abs_diff_eq!(template.geometry.cell_size, image.geometry.cell_size);
    assert_eq!(template.geometry.phase_centre, image.geometry.phase_centre);
    assert_eq!(template.geometry.frequencies, image.geometry.frequencies);

    // Directions are unchanged relative to the phase centre.
    let lmn = image.geometry.pixel_to_lmn(10.0, 5.0).unwrap();
    let psf_lmn = template.geometry.pixel_to_lmn(18.0, 13.0).unwrap();
    assert_abs_diff_eq!(lmn.l, psf_lmn.l, epsilon = 1e-15);
    assert_abs_diff_eq!(lmn.m, psf_lmn.m, epsilon = 1e-15);

    // An off-centre phase centre keeps its offset from the image centre.
    let mut shifted = get_image();
    shifted.geometry.reference_pixel = (3.0, 12.5);
    let template = create_psf_template(&shifted);
    assert_eq!(template.geometry.reference_pixel, (11.0, 20.5));
}
