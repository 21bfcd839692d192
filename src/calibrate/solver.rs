// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The antenna-gain solver.

use ndarray::prelude::*;

use super::CalibrationControls;
use crate::{c64, constants::MIN_NUM_ANTENNAS};

/// A single measurement going into a gain solution.
#[derive(Clone, Copy, Debug)]
pub(super) struct Measurement {
    pub(super) antenna1: usize,
    pub(super) antenna2: usize,
    pub(super) data: c64,
    pub(super) model: c64,
    pub(super) weight: f64,
}

#[derive(Debug)]
pub(crate) struct CalibrationResult {
    pub(crate) num_iterations: u32,
    pub(crate) converged: bool,
    pub(crate) max_precision: f64,
    pub(crate) num_failed: usize,
}

/// Solve for the complex gain of each antenna such that
/// `data ~ g1 conj(g2) model`. `gains` holds the initial guess and is
/// overwritten with the solution; antennas that couldn't be solved are set to
/// NaN. If `phase_only` is true, the gains are constrained to unit amplitude.
///
/// This function is intended to be run in parallel; for that reason, no
/// parallel code is inside this function.
pub(super) fn calibrate(
    measurements: &[Measurement],
    mut gains: ArrayViewMut1<c64>,
    controls: &CalibrationControls,
    phase_only: bool,
) -> CalibrationResult {
    let num_antennas = gains.len();
    let stop_threshold = controls.stop_threshold;

    let mut old_gains: Array1<c64> = Array1::zeros(num_antennas);
    let mut top: Array1<c64> = Array1::zeros(num_antennas);
    let mut bot: Array1<f64> = Array1::zeros(num_antennas);
    // The convergence precision of each antenna.
    let mut precisions: Array1<f64> = Array1::zeros(num_antennas);
    let mut failed: Array1<bool> = Array1::from_elem(num_antennas, false);

    let constrain = |g: c64| -> c64 {
        if phase_only && g.norm() > 0.0 {
            g / g.norm()
        } else {
            g
        }
    };

    let mut iteration = 0;
    while iteration < controls.max_iterations {
        iteration += 1;
        // Re-initialise top and bot.
        top.fill(c64::default());
        bot.fill(0.0);

        calibration_loop(measurements, gains.view(), top.view_mut(), bot.view_mut());

        // Do a once-off check to see if `top` and `bot` are already identical.
        // This occurs with antennas without data, or with data that already
        // matches the model.
        if iteration == 1 {
            let top_and_bot_are_equal = top
                .iter()
                .zip(bot.iter())
                .all(|(&t, &b)| (t - b).norm() <= stop_threshold);
            if top_and_bot_are_equal {
                // If there's no data at all, nothing could be solved.
                let top_and_bot_are_zeros = top
                    .iter()
                    .zip(bot.iter())
                    .all(|(t, b)| t.norm() <= f64::EPSILON && b.abs() <= f64::EPSILON);
                if top_and_bot_are_zeros {
                    failed.fill(true);
                }
                break;
            }
        }

        // Obtain the new gains from "top" and "bot".
        gains
            .iter_mut()
            .zip(old_gains.iter_mut())
            .zip(top.iter())
            .zip(bot.iter())
            .zip(failed.iter_mut())
            .filter(|(_, &mut failed)| !failed)
            .for_each(|((((gain, old_gain), &top), &bot), failed)| {
                let div = top / bot;
                if div.is_nan() {
                    *failed = true;
                    *gain = c64::default();
                    *old_gain = c64::default();
                } else {
                    *gain = constrain(div);
                }
            });

        // More than `MIN_NUM_ANTENNAS` antennas need to be present to get a
        // good solution.
        let num_failed = failed.iter().filter(|&&f| f).count();
        if num_antennas - num_failed <= MIN_NUM_ANTENNAS {
            break;
        }

        // On every even iteration, we test for convergence and set the new
        // gain solution as the average of the last two, as per StefCal. This
        // speeds up convergence.
        if iteration % 2 == 0 {
            gains
                .iter_mut()
                .zip(old_gains.iter())
                .zip(precisions.iter_mut())
                .zip(failed.iter())
                .filter(|(_, &failed)| !failed)
                .for_each(|(((gain, &old_gain), precision), _)| {
                    *precision = (*gain - old_gain).norm_sqr();
                    *gain = constrain((*gain + old_gain) * 0.5);
                });

            // Stop iterating if we have reached the stop threshold.
            if precisions
                .iter()
                .zip(failed.iter())
                .filter(|(_, &failed)| !failed)
                .all(|(&p, _)| p < stop_threshold)
            {
                break;
            }
        }
        old_gains.assign(&gains);
    }

    // Set failed antennas to NaN.
    gains
        .iter_mut()
        .zip(failed.iter())
        .filter(|(_, &failed)| failed)
        .for_each(|(gain, _)| *gain = c64::new(f64::NAN, f64::NAN));

    let max_precision = precisions
        .iter()
        .zip(failed.iter())
        .filter(|(_, &failed)| !failed)
        .fold(f64::MIN, |acc, (&p, _)| acc.max(p));

    let num_failed = failed.iter().filter(|&&f| f).count();
    // If only `MIN_NUM_ANTENNAS` or fewer antennas remain, or we never
    // reached the minimum threshold level, the solution has failed.
    let converged =
        num_antennas - num_failed > MIN_NUM_ANTENNAS && max_precision <= controls.min_threshold;

    if converged {
        reference_phases(gains.view_mut(), failed.view());
    }

    CalibrationResult {
        num_iterations: iteration,
        converged,
        max_precision,
        num_failed,
    }
}

/// Remove the overall phase ambiguity by making the first unfailed antenna's
/// gain real.
fn reference_phases(mut gains: ArrayViewMut1<c64>, failed: ArrayView1<bool>) {
    let reference = gains
        .iter()
        .zip(failed.iter())
        .find(|(g, &failed)| !failed && g.norm() > 0.0)
        .map(|(g, _)| g.conj() / g.norm());
    if let Some(reference) = reference {
        gains
            .iter_mut()
            .zip(failed.iter())
            .filter(|(_, &failed)| !failed)
            .for_each(|(g, _)| *g *= reference);
    }
}

/// The scalar form of "MitchCal", equation 11 of Mitchell et al.
/// <https://ui.adsabs.harvard.edu/abs/2008ISTSP...2..707M/abstract>
///
/// The next iteration of gains is determined by summing the numerator ("top")
/// and denominator ("bot") of each antenna separately.
fn calibration_loop(
    measurements: &[Measurement],
    gains: ArrayView1<c64>,
    mut top: ArrayViewMut1<c64>,
    mut bot: ArrayViewMut1<f64>,
) {
    #[allow(non_snake_case)]
    for &Measurement {
        antenna1,
        antenna2,
        data: D,
        model: M,
        weight,
    } in measurements
    {
        // Antenna 1: D = g1 (conj(g2) M); let Z = conj(g2) M.
        {
            let Z = gains[antenna2].conj() * M;
            top[antenna1] += D * Z.conj() * weight;
            bot[antenna1] += Z.norm_sqr() * weight;
        }
        // Antenna 2: conj(D) = g2 (conj(g1) conj(M)); let Z = conj(g1) conj(M).
        {
            let Z = (gains[antenna1] * M).conj();
            top[antenna2] += D.conj() * Z.conj() * weight;
            bot[antenna2] += Z.norm_sqr() * weight;
        }
    }
}
