// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with visibility containers.

use thiserror::Error;

use super::PolarisationFrame;

#[derive(Error, Debug)]
pub enum VisError {
    #[error("The row mask has {mask} elements, but the visibilities have {rows} rows")]
    MaskLength { mask: usize, rows: usize },

    #[error("Visibility column '{column}' has {len} elements; expected {expected}")]
    InconsistentColumns {
        column: &'static str,
        len: usize,
        expected: usize,
    },

    #[error("Row {row} refers to antenna {antenna}, but there are only {num_antennas} antennas")]
    AntennaOutOfRange {
        row: usize,
        antenna: usize,
        num_antennas: usize,
    },

    #[error("No antennas were supplied")]
    NoAntennas,

    #[error("Cannot combine visibilities with {left} and {right} rows")]
    RowCountMismatch { left: usize, right: usize },

    #[error("Cannot combine visibilities in the {left} and {right} polarisation frames")]
    PolarisationMismatch {
        left: PolarisationFrame,
        right: PolarisationFrame,
    },

    #[error("Cannot gather an empty list of visibilities")]
    EmptyList,
}
