// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Some helper mathematics.

#[cfg(test)]
mod tests;

use std::collections::{HashMap, HashSet};

use itertools::Itertools;

use crate::{c64, constants::FRAC_PI_2};

/// Complex exponential. The argument is assumed to be purely imaginary.
///
/// This function doesn't actually use complex numbers; it just returns the real
/// and imag components from Euler's formula (i.e. e^{ix} = cos{x} + i sin{x}).
///
/// # Examples
///
/// `assert_abs_diff_eq!(cexp(PI), c64::new(-1.0, 0.0));`
#[inline]
pub(crate) fn cexp(x: f64) -> c64 {
    let (im, re) = x.sin_cos();
    c64::new(re, im)
}

/// Maps cross-correlation baseline indices to antenna pairs, skipping flagged
/// antennas.
pub(crate) struct TileBaselineMaps {
    pub(crate) unflagged_cross_baseline_to_tile_map: HashMap<usize, (usize, usize)>,
}

impl TileBaselineMaps {
    pub(crate) fn new(total_num_tiles: usize, tile_flags: &HashSet<usize>) -> TileBaselineMaps {
        let mut unflagged_cross_baseline_to_tile_map = HashMap::new();
        let unflagged = (0..total_num_tiles).filter(|tile| !tile_flags.contains(tile));
        for (bl, (tile1, tile2)) in unflagged.tuple_combinations().enumerate() {
            unflagged_cross_baseline_to_tile_map.insert(bl, (tile1, tile2));
        }

        Self {
            unflagged_cross_baseline_to_tile_map,
        }
    }

    /// The unflagged baselines as tile pairs, in baseline order.
    pub(crate) fn baselines(&self) -> Vec<(usize, usize)> {
        (0..self.unflagged_cross_baseline_to_tile_map.len())
            .map(|bl| self.unflagged_cross_baseline_to_tile_map[&bl])
            .collect()
    }
}

/// Fit the plane `w = a*u + b*v` to a set of points by least squares, and
/// return `(a, b)`. If the points don't constrain a plane (e.g. there are
/// fewer than two, or they're collinear), `(0, 0)` is returned.
pub(crate) fn fit_uvw_plane<I>(uvws: I) -> (f64, f64)
where
    I: IntoIterator<Item = (f64, f64, f64)>,
{
    let (mut suu, mut suv, mut svv, mut suw, mut svw) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for (u, v, w) in uvws {
        suu += u * u;
        suv += u * v;
        svv += v * v;
        suw += u * w;
        svw += v * w;
    }
    let det = suu * svv - suv * suv;
    // Relative to the scale of the problem.
    if det.abs() <= f64::EPSILON * (suu * svv).max(f64::MIN_POSITIVE) {
        return (0.0, 0.0);
    }
    let a = (svv * suw - suv * svw) / det;
    let b = (suu * svw - suv * suw) / det;
    (a, b)
}

/// A rising ramp on `t` in \[0, 1\]. Linear ramps are straight lines; Tukey
/// ramps are the rising half of a cosine-squared window. Both are complemented
/// exactly by `1 - ramp(t)`.
#[inline]
pub(crate) fn linear_ramp(t: f64) -> f64 {
    t.clamp(0.0, 1.0)
}

#[inline]
pub(crate) fn tukey_ramp(t: f64) -> f64 {
    let s = (t.clamp(0.0, 1.0) * FRAC_PI_2).sin();
    s * s
}
