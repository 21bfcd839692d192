// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Model partitions: sky models, each with its own gains.
//!
//! A model partition associates every sky model with a gain table. The
//! visibilities of the partition are the sum of each sky model's predicted
//! visibilities, corrupted by its gains. Gains are refined with an
//! expectation-maximisation loop: each sky model's gains are solved against
//! the visibilities with every other (corrupted) sky model subtracted.

use log::debug;

use super::{
    apply_gaintable, solve_gaintable, CalibrateError, CalibrationControls, GainTable, TermControls,
};
use crate::{
    imaging::{predict, ImagingParams},
    skymodel::SkyModel,
    transform::predict_skycomponent_visibility,
    vis::Visibility,
};

/// Pair a copy of each sky model with a unity gain table suited to `vis`.
pub fn create_modelpartition(
    vis: &Visibility,
    skymodels: &[SkyModel],
    term: &TermControls,
) -> Result<Vec<(SkyModel, GainTable)>, CalibrateError> {
    skymodels
        .iter()
        .map(|skymodel| {
            let gain_table = GainTable::unity(vis, term.timeslice, term.per_channel)?;
            Ok((skymodel.clone(), gain_table))
        })
        .collect()
}

/// Predict the (uncorrupted) visibilities of a sky model: its image with the
/// imaging context, and its components exactly.
pub fn predict_skymodel_visibility(
    vis: &Visibility,
    skymodel: &SkyModel,
    context: &str,
    params: &ImagingParams,
) -> Result<Visibility, CalibrateError> {
    let mut predicted = match &skymodel.image {
        Some(image) => predict(vis, image, context, params)?,
        None => vis.zeroed(),
    };
    predict_skycomponent_visibility(&mut predicted, &skymodel.components)?;
    Ok(predicted)
}

/// Predict the visibilities of every sky model, corrupt them by their gains
/// and sum them.
pub fn predict_modelpartition(
    vis: &Visibility,
    modelpartition: &[(SkyModel, GainTable)],
    context: &str,
    params: &ImagingParams,
) -> Result<Visibility, CalibrateError> {
    let mut total = vis.zeroed();
    for (skymodel, gain_table) in modelpartition {
        let predicted = predict_skymodel_visibility(vis, skymodel, context, params)?;
        total.vis += &apply_gaintable(&predicted, gain_table, false).vis;
    }
    Ok(total)
}

/// Refine the gains of a model partition with `niter` expectation-maximisation
/// iterations. The sky models themselves are not changed.
pub fn modelpartition_solve(
    vis: &Visibility,
    modelpartition: Vec<(SkyModel, GainTable)>,
    term: &TermControls,
    controls: &CalibrationControls,
    context: &str,
    params: &ImagingParams,
    niter: usize,
) -> Result<Vec<(SkyModel, GainTable)>, CalibrateError> {
    // The uncorrupted predictions don't change between iterations.
    let predictions = modelpartition
        .iter()
        .map(|(skymodel, _)| predict_skymodel_visibility(vis, skymodel, context, params))
        .collect::<Result<Vec<_>, _>>()?;
    let mut modelpartition = modelpartition;

    for iter in 0..niter {
        debug!("Model partition iteration {iter}");
        let corrupted: Vec<Visibility> = predictions
            .iter()
            .zip(modelpartition.iter())
            .map(|(predicted, (_, gain_table))| apply_gaintable(predicted, gain_table, false))
            .collect();
        let mut total = vis.zeroed();
        for c in &corrupted {
            total.vis += &c.vis;
        }

        // Expectation: each sky model's share of the data. Maximisation: its
        // gains against that share.
        let mut updated = Vec::with_capacity(modelpartition.len());
        for (((skymodel, _), predicted), own) in modelpartition
            .into_iter()
            .zip(predictions.iter())
            .zip(corrupted.iter())
        {
            let mut expected = vis.clone();
            expected.vis = &vis.vis - &total.vis + &own.vis;
            let gain_table = solve_gaintable(&expected, Some(predicted), term, controls)?;
            updated.push((skymodel, gain_table));
        }
        modelpartition = updated;
    }
    Ok(modelpartition)
}
