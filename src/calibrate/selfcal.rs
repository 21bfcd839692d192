// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Self-calibration of lists of visibility partitions.

use log::debug;
use rayon::prelude::*;

use super::{
    apply_calibration_function, calibrate_function, parse_calibration_context,
    solve_calibrate_function, CalibrateError, CalibrationControls, CalibrationTerm, GainTable,
};
use crate::vis::{divide_visibility, integrate_visibility_by_channel, visibility_gather, Visibility};

/// The gain tables solved for each calibration term, in the order they were
/// solved.
pub type GainTables = Vec<(CalibrationTerm, GainTable)>;

/// Calibrates visibility partitions against their model visibilities, either
/// with one solution shared by all partitions (global) or independently per
/// partition (local).
#[derive(Clone, Debug)]
pub struct SelfCalibrator {
    calibration_context: String,
    pub controls: CalibrationControls,
    pub global_solution: bool,
}

impl SelfCalibrator {
    pub fn new(
        calibration_context: &str,
        controls: CalibrationControls,
        global_solution: bool,
    ) -> Result<SelfCalibrator, CalibrateError> {
        // Bad contexts should fail before any visibilities are touched.
        parse_calibration_context(calibration_context)?;
        Ok(SelfCalibrator {
            calibration_context: calibration_context.to_string(),
            controls,
            global_solution,
        })
    }

    pub fn calibration_context(&self) -> &str {
        &self.calibration_context
    }

    /// Correct each visibility partition using its model. The outputs are
    /// aligned index-for-index with the inputs.
    ///
    /// `iteration` is the major cycle; terms are only solved from their
    /// `first_selfcal` cycle onwards.
    pub fn calibrate(
        &self,
        vis_list: &[Visibility],
        model_list: &[Visibility],
        iteration: usize,
    ) -> Result<Vec<(Visibility, GainTables)>, CalibrateError> {
        if vis_list.len() != model_list.len() {
            return Err(CalibrateError::ListLength {
                vis: vis_list.len(),
                model: model_list.len(),
            });
        }

        if self.global_solution {
            debug!(
                "Solving one '{}' calibration for {} visibility partitions",
                self.calibration_context,
                vis_list.len()
            );
            // Referencing every partition to a unit point source makes them
            // all measurements of the same thing, so they can be combined.
            let points = vis_list
                .iter()
                .zip(model_list)
                .map(|(vis, model)| divide_visibility(vis, model))
                .collect::<Result<Vec<_>, _>>()?;
            let gathered = visibility_gather(&points)?;
            let integrated = integrate_visibility_by_channel(&gathered);
            let tables = solve_calibrate_function(
                &integrated,
                None,
                &self.calibration_context,
                &self.controls,
                iteration,
            )?;
            Ok(vis_list
                .iter()
                .map(|vis| (apply_calibration_function(vis, &tables), tables.clone()))
                .collect())
        } else {
            debug!(
                "Solving '{}' calibrations for each of {} visibility partitions",
                self.calibration_context,
                vis_list.len()
            );
            vis_list
                .par_iter()
                .zip(model_list.par_iter())
                .map(|(vis, model)| {
                    calibrate_function(
                        vis,
                        Some(model),
                        &self.calibration_context,
                        &self.controls,
                        iteration,
                    )
                })
                .collect()
        }
    }
}

/// Calibrate each visibility partition against its model visibilities. See
/// [`SelfCalibrator::calibrate`].
pub fn calibrate_list(
    vis_list: &[Visibility],
    model_list: &[Visibility],
    calibration_context: &str,
    controls: &CalibrationControls,
    global_solution: bool,
    iteration: usize,
) -> Result<Vec<(Visibility, GainTables)>, CalibrateError> {
    SelfCalibrator::new(calibration_context, controls.clone(), global_solution)?.calibrate(
        vis_list,
        model_list,
        iteration,
    )
}
