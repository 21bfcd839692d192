// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Major-cycle imaging pipelines.

Every pipeline follows the same cycle:

1. make the point-spread function (on a grid twice the size of the model, so
   that CLEAN can subtract it anywhere) and a first residual image;
2. deconvolve ("cycle 0");
3. for each of `nmajor` major cycles, make a new residual against the latest
   model (optionally self-calibrating first) and deconvolve again;
4. make a final residual and restore.

Any failure aborts the whole pipeline.
 */

mod error;

pub use error::PipelineError;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{debug, info, warn};
use ndarray::prelude::*;
use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::{
    calibrate::{CalibrationControls, GainTables, SelfCalibrator},
    constants::DEFAULT_NMAJOR,
    deconvolve::{Deconvolve, HogbomClean, Restore},
    image::{create_psf_template, Image},
    imaging::{invert_list, predict_list, residual_list, ImagingParams},
    vis::{subtract_vislist, zero_vislist, Visibility, VisibilityData},
    PROGRESS_BARS,
};

/// Everything that controls a pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineParams {
    /// The imaging context, e.g. "2d" or "facets_wstack".
    pub context: String,

    /// The calibration terms to solve when self-calibrating, e.g. "TG".
    pub calibration_context: String,

    pub do_selfcal: bool,

    /// Solve one calibration shared by every visibility set, rather than one
    /// for each.
    pub global_solution: bool,

    /// The number of major cycles after the first deconvolution.
    pub nmajor: usize,

    #[serde(flatten)]
    pub imaging: ImagingParams,

    pub calibration: CalibrationControls,

    pub clean: HogbomClean,
}

impl Default for PipelineParams {
    fn default() -> Self {
        PipelineParams {
            context: "2d".to_string(),
            calibration_context: "TG".to_string(),
            do_selfcal: false,
            global_solution: true,
            nmajor: DEFAULT_NMAJOR,
            imaging: ImagingParams::default(),
            calibration: CalibrationControls::default(),
            clean: HogbomClean::default(),
        }
    }
}

/// Where a pipeline is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum PipelineStage {
    Init,
    PsfAndResidual,
    Deconvolve,
    Calibrate,
    PredictResidual,
    FinalRestore,
    Done,
}

/// The state carried from one major cycle to the next.
#[derive(Clone, Debug)]
pub struct PipelineState {
    pub stage: PipelineStage,

    /// The current major cycle; 0 until the first major cycle starts.
    pub cycle: usize,

    pub models: Vec<Image>,
    pub psfs: Vec<Image>,

    /// Each residual image with its sum of weights.
    pub residuals: Vec<(Image, Array2<f64>)>,

    /// The latest gains for each visibility set. Empty unless
    /// self-calibrating.
    pub gain_tables: Vec<GainTables>,
}

impl PipelineState {
    fn new(models: Vec<Image>) -> PipelineState {
        PipelineState {
            stage: PipelineStage::Init,
            cycle: 0,
            models,
            psfs: vec![],
            residuals: vec![],
            gain_tables: vec![],
        }
    }

    fn enter(&mut self, stage: PipelineStage) {
        debug!("Cycle {}: {} -> {stage}", self.cycle, self.stage);
        self.stage = stage;
    }
}

/// The products of a pipeline, one for each visibility set.
#[derive(Clone, Debug)]
pub struct PipelineOutputs {
    pub models: Vec<Image>,
    pub residuals: Vec<(Image, Array2<f64>)>,
    pub restored: Vec<Image>,
    pub gain_tables: Vec<GainTables>,
}

fn make_major_cycle_progress_bar(nmajor: usize) -> ProgressBar {
    ProgressBar::with_draw_target(
        Some(nmajor as _),
        if PROGRESS_BARS.load() {
            ProgressDrawTarget::stdout()
        } else {
            ProgressDrawTarget::hidden()
        },
    )
    .with_style(
        ProgressStyle::default_bar()
            .template("{msg}: [{wide_bar:.blue}] {pos:2}/{len:2} ({elapsed_precise}<{eta_precise})")
            .unwrap()
            .progress_chars("=> "),
    )
    .with_position(0)
    .with_message("Major cycles")
}

/// Predict model visibilities, calibrate against them, subtract them and
/// image what's left. Returns the corrected visibilities, their gains and
/// the residual images.
fn selfcal_residuals(
    vis_list: &[Visibility],
    models: &[Image],
    calibrator: &SelfCalibrator,
    iteration: usize,
    params: &PipelineParams,
) -> Result<(Vec<Visibility>, Vec<GainTables>, Vec<(Image, Array2<f64>)>), PipelineError> {
    let model_vis = predict_list(
        &zero_vislist(vis_list),
        models,
        &params.context,
        &params.imaging,
    )?;

    let (corrected, gain_tables) = if models.iter().all(|m| m.data.iter().all(|&v| v == 0.0)) {
        // Nothing to calibrate against.
        warn!("The model is empty; not self-calibrating in cycle {iteration}");
        (vis_list.to_vec(), vec![vec![]; vis_list.len()])
    } else {
        calibrator
            .calibrate(vis_list, &model_vis, iteration)?
            .into_iter()
            .unzip()
    };

    let residual_vis = subtract_vislist(&corrected, &model_vis)?;
    let residuals = invert_list(
        &residual_vis,
        models,
        false,
        true,
        &params.context,
        &params.imaging,
    )?;
    Ok((corrected, gain_tables, residuals))
}

fn deconvolve_all(
    state: &mut PipelineState,
    deconvolver: &dyn Deconvolve,
    prefix: &str,
) -> Result<(), PipelineError> {
    state.enter(PipelineStage::Deconvolve);
    let mut models = Vec::with_capacity(state.models.len());
    for ((model, psf), (residual, _)) in state
        .models
        .iter()
        .zip(state.psfs.iter())
        .zip(state.residuals.iter())
    {
        let (new_model, info) = deconvolver.deconvolve(residual, psf, model, prefix)?;
        debug!("{prefix}: {info:?}");
        models.push(new_model);
    }
    state.models = models;
    Ok(())
}

fn log_residuals(state: &PipelineState) {
    for (i, (residual, _)) in state.residuals.iter().enumerate() {
        let peak = residual.peak().map(|(v, _)| v.abs()).unwrap_or(0.0);
        info!(
            "Cycle {}: residual {i} has peak {peak:.4e} and rms {:.4e}",
            state.cycle,
            residual.rms()
        );
    }
}

/// Iterative calibration and imaging. Each model image is paired with the
/// visibility set at the same index.
pub fn ical<V: VisibilityData>(
    vis_list: &[V],
    model_list: &[Image],
    params: &PipelineParams,
    deconvolver: &dyn Deconvolve,
    restorer: &dyn Restore,
) -> Result<PipelineOutputs, PipelineError> {
    if params.nmajor == 0 {
        return Err(PipelineError::InvalidNmajor(params.nmajor));
    }
    if vis_list.len() != model_list.len() {
        return Err(PipelineError::ListLength {
            vis: vis_list.len(),
            models: model_list.len(),
        });
    }
    let calibrator = if params.do_selfcal {
        Some(SelfCalibrator::new(
            &params.calibration_context,
            params.calibration.clone(),
            params.global_solution,
        )?)
    } else {
        None
    };
    let original_rows: Vec<Visibility> =
        vis_list.iter().map(|v| v.to_rows().into_owned()).collect();
    // The visibilities residuals are made from; these are corrected when
    // self-calibrating.
    let mut vis_rows = original_rows.clone();
    let context = params.context.as_str();

    let mut state = PipelineState::new(model_list.to_vec());
    state.enter(PipelineStage::PsfAndResidual);
    let psf_templates: Vec<Image> = model_list.iter().map(create_psf_template).collect();
    state.psfs = invert_list(&vis_rows, &psf_templates, true, true, context, &params.imaging)?
        .into_iter()
        .map(|(psf, _)| psf)
        .collect();
    state.residuals = match &calibrator {
        Some(calibrator) => {
            state.enter(PipelineStage::Calibrate);
            let (corrected, gain_tables, residuals) =
                selfcal_residuals(&vis_rows, &state.models, calibrator, 0, params)?;
            state.gain_tables = gain_tables;
            vis_rows = corrected;
            residuals
        }
        None => residual_list(&vis_rows, &state.models, context, &params.imaging)?,
    };
    log_residuals(&state);
    deconvolve_all(&mut state, deconvolver, "cycle 0")?;

    let pb = make_major_cycle_progress_bar(params.nmajor);
    for cycle in 0..params.nmajor {
        state.cycle = cycle + 1;
        info!("Starting major cycle {} of {}", cycle + 1, params.nmajor);
        match &calibrator {
            Some(calibrator) => {
                state.enter(PipelineStage::Calibrate);
                // Calibrate the original data every cycle; corrections don't
                // accumulate.
                let (corrected, gain_tables, residuals) =
                    selfcal_residuals(&original_rows, &state.models, calibrator, cycle, params)?;
                state.enter(PipelineStage::PredictResidual);
                state.gain_tables = gain_tables;
                state.residuals = residuals;
                vis_rows = corrected;
            }
            None => {
                state.enter(PipelineStage::PredictResidual);
                state.residuals =
                    residual_list(&vis_rows, &state.models, context, &params.imaging)?;
            }
        }
        log_residuals(&state);
        deconvolve_all(&mut state, deconvolver, &format!("cycle {}", cycle + 1))?;
        pb.inc(1);
    }
    pb.finish_with_message("Major cycles complete");

    state.enter(PipelineStage::FinalRestore);
    state.residuals = residual_list(&vis_rows, &state.models, context, &params.imaging)?;
    log_residuals(&state);
    let restored = state
        .models
        .iter()
        .zip(state.psfs.iter())
        .zip(state.residuals.iter())
        .map(|((model, psf), (residual, _))| restorer.restore(model, psf, residual))
        .collect::<Result<Vec<_>, _>>()?;
    state.enter(PipelineStage::Done);

    Ok(PipelineOutputs {
        models: state.models,
        residuals: state.residuals,
        restored,
        gain_tables: state.gain_tables,
    })
}

/// [`ical`] without self-calibration.
pub fn continuum_imaging<V: VisibilityData>(
    vis_list: &[V],
    model_list: &[Image],
    params: &PipelineParams,
    deconvolver: &dyn Deconvolve,
    restorer: &dyn Restore,
) -> Result<PipelineOutputs, PipelineError> {
    let params = PipelineParams {
        do_selfcal: false,
        ..params.clone()
    };
    ical(vis_list, model_list, &params, deconvolver, restorer)
}

/// Continuum imaging after subtracting the visibilities of a continuum model,
/// if one is given.
pub fn spectral_line_imaging<V: VisibilityData>(
    vis_list: &[V],
    model_list: &[Image],
    continuum_model_list: Option<&[Image]>,
    params: &PipelineParams,
    deconvolver: &dyn Deconvolve,
    restorer: &dyn Restore,
) -> Result<PipelineOutputs, PipelineError> {
    let vis_rows: Vec<Visibility> = vis_list.iter().map(|v| v.to_rows().into_owned()).collect();
    let line_rows = match continuum_model_list {
        Some(continuum) => {
            info!("Subtracting the continuum model");
            let continuum_vis = predict_list(
                &zero_vislist(&vis_rows),
                continuum,
                &params.context,
                &params.imaging,
            )?;
            subtract_vislist(&vis_rows, &continuum_vis)?
        }
        None => vis_rows,
    };
    continuum_imaging(&line_rows, model_list, params, deconvolver, restorer)
}
