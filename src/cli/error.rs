// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all hyperimage-related errors. This should be the *only*
//! error enum that is publicly visible.

use thiserror::Error;

use super::{common::PipelineArgsError, ical::IcalArgsError};
use crate::{
    calibrate::CalibrateError, deconvolve::DeconvolveError, imaging::ImagingError,
    partition::PartitionError, pipeline::PipelineError, vis::VisError,
};

/// The *only* publicly visible error from hyperimage. Each error message
/// should include a hint, unless it's "generic".
#[derive(Error, Debug)]
pub enum HyperimageError {
    /// An error related to describing the simulated observation.
    #[error("{0}\n\nCheck the OBSERVATION arguments (see --help).")]
    Observation(String),

    /// An error related to imaging (contexts, partitions, facets).
    #[error("{0}\n\nCheck the IMAGING arguments (see --help).")]
    Imaging(String),

    /// An error related to self-calibration.
    #[error("{0}\n\nCheck the CALIBRATION arguments (see --help).")]
    Calibrate(String),

    /// An error related to deconvolution or restoring.
    #[error("{0}\n\nCheck the DECONVOLUTION arguments (see --help).")]
    Deconvolve(String),

    /// An error related to argument files.
    #[error("{0}\n\nArgument files are toml or json; see --save-toml for an example.")]
    ArgFile(String),

    /// A generic error that can't be clarified further, e.g. IO errors.
    #[error("{0}")]
    Generic(String),
}

// When changing the error propagation below, ensure `Self::from(e)` uses the
// correct `e`!

impl From<PipelineArgsError> for HyperimageError {
    fn from(e: PipelineArgsError) -> Self {
        match e {
            PipelineArgsError::VisSlices(e) => Self::from(e),
            PipelineArgsError::UnknownTaper(_)
            | PipelineArgsError::UnknownContext(_)
            | PipelineArgsError::ZeroNmajor => Self::Imaging(e.to_string()),
            PipelineArgsError::CleanGain(_) | PipelineArgsError::RestoreFwhm(_) => {
                Self::Deconvolve(e.to_string())
            }
            _ => Self::Observation(e.to_string()),
        }
    }
}

impl From<IcalArgsError> for HyperimageError {
    fn from(e: IcalArgsError) -> Self {
        match e {
            IcalArgsError::TooFewAntennas(_) => Self::Observation(e.to_string()),
            IcalArgsError::ZeroMaxIterations
            | IcalArgsError::StopAboveMin { .. }
            | IcalArgsError::ParseSolutionInterval(_) => Self::Calibrate(e.to_string()),
        }
    }
}

impl From<PipelineError> for HyperimageError {
    fn from(e: PipelineError) -> Self {
        let s = e.to_string();
        match e {
            PipelineError::InvalidNmajor(_) | PipelineError::ListLength { .. } => Self::Generic(s),
            PipelineError::Imaging(e) => Self::from(e),
            PipelineError::Calibrate(e) => Self::from(e),
            PipelineError::Deconvolve(e) => Self::from(e),
            PipelineError::Vis(e) => Self::from(e),
        }
    }
}

impl From<ImagingError> for HyperimageError {
    fn from(e: ImagingError) -> Self {
        Self::Imaging(e.to_string())
    }
}

impl From<PartitionError> for HyperimageError {
    fn from(e: PartitionError) -> Self {
        Self::Imaging(e.to_string())
    }
}

impl From<CalibrateError> for HyperimageError {
    fn from(e: CalibrateError) -> Self {
        let s = e.to_string();
        match e {
            CalibrateError::Imaging(e) => Self::from(e),
            CalibrateError::Vis(e) => Self::from(e),
            _ => Self::Calibrate(s),
        }
    }
}

impl From<DeconvolveError> for HyperimageError {
    fn from(e: DeconvolveError) -> Self {
        Self::Deconvolve(e.to_string())
    }
}

impl From<VisError> for HyperimageError {
    fn from(e: VisError) -> Self {
        match e {
            VisError::NoAntennas => Self::Observation(e.to_string()),
            _ => Self::Generic(e.to_string()),
        }
    }
}

impl From<std::io::Error> for HyperimageError {
    fn from(e: std::io::Error) -> Self {
        Self::Generic(e.to_string())
    }
}
