// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all calibration-related errors.

use thiserror::Error;

use crate::{imaging::ImagingError, transform::TransformError, vis::VisError};

#[derive(Error, Debug)]
pub enum CalibrateError {
    #[error("Unknown calibration term '{0}' in the calibration context; supported terms are: {terms}", terms = *super::CALIBRATION_TERMS)]
    UnknownTerm(char),

    #[error("Calibration solution intervals must be positive; got {0} seconds")]
    NonPositiveInterval(f64),

    #[error("Only {num_antennas} antennas have data; more than {min} are needed to calibrate", min = crate::constants::MIN_NUM_ANTENNAS)]
    TooFewAntennas { num_antennas: usize },

    #[error("Got {vis} visibility sets but {model} model visibility sets")]
    ListLength { vis: usize, model: usize },

    #[error(transparent)]
    Vis(#[from] VisError),

    #[error(transparent)]
    Imaging(#[from] ImagingError),

    #[error(transparent)]
    Transform(#[from] TransformError),
}
