// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Imaging contexts.

An imaging context names a combination of a visibility partitioning, an image
partitioning and a [`Transform`]. The table of contexts is fixed at compile
time; strings are only used to look up an [`ImagingContext`].
 */

mod error;

pub use error::ContextError;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

use crate::{
    image::Image,
    imaging::ImagingParams,
    partition::{facets, FacetError, FacetIter, VisPartitioner},
    transform::{Timeslice, Transform, TwoD, WProjection, WStack},
};

lazy_static::lazy_static! {
    pub(crate) static ref IMAGING_CONTEXTS: String = ImagingContext::iter().join(", ");
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter, EnumString, Serialize, Deserialize,
)]
pub enum ImagingContext {
    /// The whole visibility set onto the whole image.
    #[strum(serialize = "2d")]
    #[serde(rename = "2d")]
    TwoD,

    /// Visibilities grouped by w.
    #[strum(serialize = "wstack")]
    #[serde(rename = "wstack")]
    WStack,

    /// The whole visibility set with exact w terms.
    #[strum(serialize = "wprojection")]
    #[serde(rename = "wprojection")]
    WProjection,

    /// Visibilities grouped by time, each group fitted by a w plane.
    #[strum(serialize = "timeslice")]
    #[serde(rename = "timeslice")]
    Timeslice,

    /// The whole visibility set onto each image facet.
    #[strum(serialize = "facets")]
    #[serde(rename = "facets")]
    Facets,

    #[strum(serialize = "facets_timeslice")]
    #[serde(rename = "facets_timeslice")]
    FacetsTimeslice,

    #[strum(serialize = "facets_wstack")]
    #[serde(rename = "facets_wstack")]
    FacetsWStack,

    /// Visibilities grouped by w, each group with exact w terms.
    #[strum(serialize = "wprojection_wstack")]
    #[serde(rename = "wprojection_wstack")]
    WProjectionWStack,
}

/// The ways visibilities may be partitioned. The number of partitions is
/// supplied separately in [`ImagingParams`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VisPartitionKind {
    Single,
    WStack,
    Timeslice,
}

/// Everything needed to image with a context.
#[derive(Clone, Copy)]
pub struct ImagingStrategy {
    pub context: ImagingContext,
    pub vis_partition: VisPartitionKind,
    /// If false, images are never split into facets, whatever the requested
    /// number of facets.
    pub faceted: bool,
    pub transform: &'static dyn Transform,
}

impl std::fmt::Debug for ImagingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImagingStrategy")
            .field("context", &self.context)
            .field("vis_partition", &self.vis_partition)
            .field("faceted", &self.faceted)
            .field("transform", &self.transform.name())
            .finish()
    }
}

impl ImagingContext {
    pub fn strategy(self) -> ImagingStrategy {
        use VisPartitionKind as K;
        let (vis_partition, faceted, transform): (_, _, &'static dyn Transform) = match self {
            ImagingContext::TwoD => (K::Single, false, &TwoD),
            ImagingContext::WStack => (K::WStack, false, &WStack),
            ImagingContext::WProjection => (K::Single, false, &WProjection),
            ImagingContext::Timeslice => (K::Timeslice, false, &Timeslice),
            ImagingContext::Facets => (K::Single, true, &TwoD),
            ImagingContext::FacetsTimeslice => (K::Timeslice, true, &Timeslice),
            ImagingContext::FacetsWStack => (K::WStack, true, &WStack),
            ImagingContext::WProjectionWStack => (K::WStack, false, &WProjection),
        };
        ImagingStrategy {
            context: self,
            vis_partition,
            faceted,
            transform,
        }
    }
}

impl ImagingStrategy {
    /// The visibility partitioner for these imaging parameters.
    pub fn vis_partitioner(&self, params: &ImagingParams) -> VisPartitioner {
        match self.vis_partition {
            VisPartitionKind::Single => VisPartitioner::Single,
            VisPartitionKind::WStack => VisPartitioner::WStack {
                slices: params.vis_slices,
                wstep: params.wstep,
            },
            VisPartitionKind::Timeslice => VisPartitioner::Timeslice {
                slices: params.vis_slices,
            },
        }
    }

    /// The number of facets per image axis actually used.
    pub fn facets_per_axis(&self, params: &ImagingParams) -> usize {
        if self.faceted {
            params.facets
        } else {
            1
        }
    }

    /// The facets of `image` for these imaging parameters.
    pub fn facets(&self, image: &Image, params: &ImagingParams) -> Result<FacetIter, FacetError> {
        facets(
            image,
            self.facets_per_axis(params),
            params.overlap,
            params.taper,
        )
    }
}

/// Look up the strategy of a context by name.
pub fn resolve(context: &str) -> Result<ImagingStrategy, ContextError> {
    let context: ImagingContext = context
        .parse()
        .map_err(|_| ContextError::UnknownContext(context.to_string()))?;
    Ok(context.strategy())
}
