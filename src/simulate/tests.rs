// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;

use super::*;

#[test]
fn test_create_visibility_shape() {
    let params = SimulationParams {
        num_antennas: 6,
        num_times: 4,
        frequencies: vec![140e6, 150e6],
        ..Default::default()
    };
    let block = create_blockvisibility(&params).unwrap();
    assert_eq!(block.dim(), (4, 15, 2, 1));
    assert_abs_diff_eq!(block.times[1] - block.times[0], 120.0, epsilon = 1e-6);
    assert!(block.weight.iter().all(|&w| w == 1.0));

    let vis = block.coalesce();
    assert_eq!(vis.num_rows(), 4 * 15 * 2);
    vis.validate().unwrap();
    // The Earth rotates, so the baselines change with time.
    assert!((vis.uvw[0].u - vis.uvw[30].u).abs() > 1e-3);
    // Off zenith, there are w terms.
    assert!(vis.uvw.iter().any(|uvw| uvw.w.abs() > 1.0));
}

#[test]
fn test_flagged_antennas_are_excluded() {
    let params = SimulationParams {
        num_antennas: 6,
        flagged_antennas: [2].into_iter().collect(),
        ..Default::default()
    };
    let block = create_blockvisibility(&params).unwrap();
    assert_eq!(block.baselines.len(), 10);
    assert!(block
        .baselines
        .iter()
        .all(|&(ant1, ant2)| ant1 != 2 && ant2 != 2));
}

#[test]
fn test_no_antennas_is_an_error() {
    let params = SimulationParams {
        num_antennas: 0,
        ..Default::default()
    };
    assert!(matches!(
        create_visibility(&params),
        Err(VisError::NoAntennas)
    ));
}

#[test]
fn test_antenna_layout_fits_in_radius() {
    let xyzs = antenna_layout(32, 100.0, 0.0);
    assert_eq!(xyzs.len(), 32);
    for xyz in xyzs {
        // At the equator, y is east and z is north.
        assert!(xyz.y.hypot(xyz.z) <= 100.0 + 1e-9);
    }
}

#[test]
fn test_add_point_sources() {
    let mut image = Image::create(
        8,
        0.01,
        RADec::default(),
        vec![150e6, 160e6],
        vec![1e6; 2],
        PolarisationFrame::Linear,
    );
    add_point_sources(&mut image, &[(2, 5, 3.0)]);
    assert_abs_diff_eq!(image.data[(1, 0, 5, 2)], 3.0);
    assert_abs_diff_eq!(image.data[(1, 3, 5, 2)], 3.0);
    assert_abs_diff_eq!(image.data[(1, 1, 5, 2)], 0.0);
    assert_abs_diff_eq!(image.data.sum(), 12.0);
}

#[test]
fn test_simulate_gains() {
    let gains = simulate_gains(5, 0.0, 0.0);
    for g in gains {
        assert_abs_diff_eq!(g, c64::new(1.0, 0.0));
    }
    let gains = simulate_gains(5, 0.1, 0.2);
    for g in gains {
        assert!((g.norm() - 1.0).abs() <= 0.1 + 1e-12);
        assert!(g.arg().abs() <= 0.2 + 1e-12);
    }
}
