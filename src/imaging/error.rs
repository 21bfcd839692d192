// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with the partitioned imaging engines.

use thiserror::Error;

use crate::{
    context::ContextError,
    partition::{FacetError, PartitionError},
    transform::TransformError,
    vis::{PolarisationFrame, VisError},
};

#[derive(Error, Debug)]
pub enum ImagingError {
    #[error("Unknown imaging context '{0}'; supported contexts are: {contexts}", contexts = *crate::context::IMAGING_CONTEXTS)]
    UnknownContext(String),

    #[error("No visibility partition had any valid data")]
    NoValidData,

    #[error("Got {left} visibility sets but {right} {what}")]
    ShapeMismatch {
        what: &'static str,
        left: usize,
        right: usize,
    },

    #[error("Visibilities are in the {vis} polarisation frame, but the image is in {image}")]
    PolarisationMismatch {
        vis: PolarisationFrame,
        image: PolarisationFrame,
    },

    #[error(transparent)]
    Facet(#[from] FacetError),

    #[error(transparent)]
    Partition(#[from] PartitionError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Vis(#[from] VisError),
}

impl From<ContextError> for ImagingError {
    fn from(e: ContextError) -> Self {
        match e {
            ContextError::UnknownContext(c) => ImagingError::UnknownContext(c),
        }
    }
}
