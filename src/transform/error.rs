// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with transforming between visibilities and images.

use thiserror::Error;

use crate::vis::PolarisationFrame;

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Visibilities are in the {vis} polarisation frame, but the image is in {image}")]
    PolarisationMismatch {
        vis: PolarisationFrame,
        image: PolarisationFrame,
    },

    #[error("Sky component has {got} flux-density channels, but {expected} frequencies")]
    ComponentChannels { got: usize, expected: usize },
}
