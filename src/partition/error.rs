// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with partitioning visibilities and images.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PartitionError {
    #[error("The number of visibility slices must be at least 1")]
    ZeroSlices,

    #[error("w-stacking needs an explicit number of slices or a w step; \"auto\" only applies to time slicing")]
    AutoWStack,

    #[error("The w step must be positive, but got {0}")]
    NonPositiveWStep(f64),

    #[error("Couldn't parse '{0}' as a number of visibility slices; expected a positive integer or \"auto\"")]
    ParseVisSlices(String),
}

#[derive(Error, Debug)]
pub enum FacetError {
    #[error("The number of facets per axis must be at least 1")]
    ZeroFacets,

    #[error("An image axis of {axis_len} pixels can't be split into {facets} facets")]
    NotDivisible { axis_len: usize, facets: usize },

    #[error("A facet overlap of {overlap} pixels is too large for facets of {facet_size} pixels; twice the overlap must not exceed the facet size")]
    OverlapTooLarge { overlap: usize, facet_size: usize },
}
