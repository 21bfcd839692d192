// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;

use super::*;
use crate::constants::PI;

#[test]
fn test_cexp() {
    assert_abs_diff_eq!(cexp(PI), c64::new(-1.0, 0.0), epsilon = 1e-15);
    assert_abs_diff_eq!(cexp(FRAC_PI_2), c64::new(0.0, 1.0), epsilon = 1e-15);
}

#[test]
fn test_generate_tile_baseline_maps() {
    let total_num_tiles = 128;
    let mut tile_flags = HashSet::new();
    let maps = TileBaselineMaps::new(total_num_tiles, &tile_flags);
    assert_eq!(maps.unflagged_cross_baseline_to_tile_map[&0], (0, 1));

    tile_flags.insert(1);
    let maps = TileBaselineMaps::new(total_num_tiles, &tile_flags);
    assert_eq!(maps.unflagged_cross_baseline_to_tile_map[&0], (0, 2));
    assert_eq!(maps.unflagged_cross_baseline_to_tile_map[&126], (2, 3));

    let baselines = maps.baselines();
    assert_eq!(baselines.len(), 127 * 126 / 2);
    assert_eq!(baselines[0], (0, 2));
    assert_eq!(baselines[126], (2, 3));
}

#[test]
fn test_fit_uvw_plane() {
    let points = [
        (1.0, 0.0, 0.5),
        (0.0, 1.0, -0.25),
        (2.0, 3.0, 0.25),
        (-4.0, 1.0, -2.25),
    ];
    let (a, b) = fit_uvw_plane(points);
    assert_abs_diff_eq!(a, 0.5, epsilon = 1e-12);
    assert_abs_diff_eq!(b, -0.25, epsilon = 1e-12);

    // Collinear points don't define a plane.
    let (a, b) = fit_uvw_plane([(1.0, 1.0, 3.0), (2.0, 2.0, 1.0)]);
    assert_abs_diff_eq!(a, 0.0);
    assert_abs_diff_eq!(b, 0.0);
}

#[test]
fn test_ramps_are_complementary() {
    for i in 0..=10 {
        let t = i as f64 / 10.0;
        assert_abs_diff_eq!(linear_ramp(t) + linear_ramp(1.0 - t), 1.0, epsilon = 1e-15);
        assert_abs_diff_eq!(tukey_ramp(t) + tukey_ramp(1.0 - t), 1.0, epsilon = 1e-15);
    }
    assert_abs_diff_eq!(tukey_ramp(0.0), 0.0);
    assert_abs_diff_eq!(tukey_ramp(1.0), 1.0);
    assert_abs_diff_eq!(tukey_ramp(0.5), 0.5, epsilon = 1e-15);
}
