// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Useful constants.

All constants *must* be double precision. `hyperimage` should do as many
calculations as possible in double precision before converting to a lower
precision, if it is ever required.
 */

pub use std::f64::consts::{FRAC_PI_2, LN_2, PI, TAU};

/// Speed of light \[metres/second\].
pub const VEL_C: f64 = 299_792_458.0;

/// The rotation rate of the Earth relative to the stars \[radians/second\].
pub const EARTH_ROTATION_RATE: f64 = 7.292_115_0e-5;

/// Used to lay out synthetic antennas on a spiral.
pub const GOLDEN_RATIO: f64 = 1.618_033_988_749_895;

/// The number of major cycles to perform after the initial deconvolution.
pub const DEFAULT_NMAJOR: usize = 5;

/// The maximum number of times to iterate when solving for antenna gains.
pub const DEFAULT_MAX_ITERATIONS: u32 = 50;

/// The threshold to satisfy convergence when solving for antenna gains.
pub const DEFAULT_STOP_THRESHOLD: f64 = 1e-8;

/// The minimum threshold to satisfy convergence when solving for antenna
/// gains. Reaching this threshold counts as "converged", but it's not as good
/// as the stop threshold.
pub const DEFAULT_MIN_THRESHOLD: f64 = 1e-4;

/// The loop gain used by CLEAN.
pub const DEFAULT_CLEAN_GAIN: f64 = 0.1;

/// The maximum number of CLEAN iterations per image plane per major cycle.
pub const DEFAULT_CLEAN_NITER: usize = 1000;

/// CLEAN stops when the peak residual falls below this fraction of the
/// initial peak residual.
pub const DEFAULT_CLEAN_FRACTIONAL_THRESHOLD: f64 = 0.1;

/// CLEAN stops when the peak residual falls below this value \[Jy\].
pub const DEFAULT_CLEAN_THRESHOLD: f64 = 0.0;

/// The default solution interval of a "G" calibration term \[seconds\].
pub const DEFAULT_G_TIMESLICE: f64 = 60.0;

/// More than this many antennas need to have solutions for a gain solution to
/// be considered good.
pub const MIN_NUM_ANTENNAS: usize = 4;

/// Multiply a Gaussian FWHM by this to get its standard deviation.
pub const FWHM_TO_SIGMA: f64 = 0.424_660_900_144_009_5;
