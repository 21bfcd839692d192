// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors from the major-cycle pipelines.

use thiserror::Error;

use crate::{
    calibrate::CalibrateError, deconvolve::DeconvolveError, imaging::ImagingError, vis::VisError,
};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("The number of major cycles must be at least 1; got {0}")]
    InvalidNmajor(usize),

    #[error("Got {vis} visibility sets but {models} model images")]
    ListLength { vis: usize, models: usize },

    #[error(transparent)]
    Imaging(#[from] ImagingError),

    #[error(transparent)]
    Calibrate(#[from] CalibrateError),

    #[error(transparent)]
    Deconvolve(#[from] DeconvolveError),

    #[error(transparent)]
    Vis(#[from] VisError),
}
