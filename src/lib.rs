// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Partitioned imaging and self-calibration for radio interferometers.

Visibilities are split into partitions (by w, by time, or not at all), the
image plane is split into facets, and each (partition, facet) pair is handed to
a [`Transform`]. The partial results are recombined with careful bookkeeping of
the accumulated weights. On top of this, major-cycle pipelines (ICAL,
continuum imaging, spectral-line imaging) drive repeated
invert/predict/calibrate/deconvolve rounds.
 */

pub mod calibrate;
mod cli;
pub mod constants;
pub mod context;
pub mod coord;
pub mod deconvolve;
pub mod image;
pub mod imaging;
pub(crate) mod math;
pub mod partition;
pub mod pipeline;
pub mod simulate;
pub mod skymodel;
pub mod transform;
pub mod vis;

use crossbeam_utils::atomic::AtomicCell;

/// Complex double-precision float.
#[allow(non_camel_case_types)]
pub type c64 = num_complex::Complex<f64>;

/// Should we draw progress bars? Progress bars are only drawn if this is
/// `true`; the command-line interface sets it.
pub static PROGRESS_BARS: AtomicCell<bool> = AtomicCell::new(false);

// Re-exports.
pub use calibrate::{
    calibrate_list, CalibrationControls, CalibrationTerm, GainTable, SelfCalibrator,
};
pub use cli::{Hyperimage, HyperimageError};
pub use context::{resolve, ImagingContext, ImagingStrategy};
pub use coord::{RADec, XyzGeodetic, UVW};
pub use deconvolve::{Deconvolve, GaussianRestore, HogbomClean, Restore};
pub use image::{create_empty_image_like, Image, ImageGeometry};
pub use imaging::{
    invert, invert_list, predict, predict_list, residual, residual_list, Execution,
    ImagingError, ImagingParams,
};
pub use partition::{Facet, Taper, VisPartitioner, VisSlices};
pub use pipeline::{
    continuum_imaging, ical, spectral_line_imaging, PipelineError, PipelineOutputs,
    PipelineParams,
};
pub use transform::Transform;
pub use vis::{BlockVisibility, PolarisationFrame, Visibility, VisibilityData};
