// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with deconvolution and restoring.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeconvolveError {
    #[error("The {what} image has shape {got:?}, but the residual image has shape {expected:?}")]
    ShapeMismatch {
        what: &'static str,
        got: (usize, usize, usize, usize),
        expected: (usize, usize, usize, usize),
    },

    #[error("The point-spread function peak of channel {chan} pol {pol} is {peak}; it must be positive")]
    NonPositivePsfPeak { chan: usize, pol: usize, peak: f64 },

    #[error("CLEAN loop gain must be between 0 and 1; got {0}")]
    BadGain(f64),
}
