// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Partitioned invert and predict.

The visibilities are split by the context's partitioner, and the image plane
is split into facets. Every non-empty partition is transformed into (or from)
every facet; partitions are independent and may be evaluated concurrently.
Each partition produces an owned partial result, and the partial results are
summed in partition order by the calling thread, so results don't depend on
how the partitions were executed.

Images are only normalised by the accumulated weights once all partitions
have been summed.
 */

mod error;

pub use error::ImagingError;

use log::{debug, trace, warn};
use ndarray::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::{
    c64,
    context::{resolve, ImagingStrategy},
    image::{create_empty_image_like, Image},
    partition::{Taper, VisSlices},
    transform::normalize_by_weights,
    vis::{subtract_visibility, Visibility, VisibilityData},
};

/// How visibility partitions are evaluated.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Display,
    EnumIter,
    EnumString,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Execution {
    /// One partition after another on the calling thread.
    Serial,

    /// Partitions are spread over the rayon thread pool.
    #[default]
    Parallel,
}

impl Execution {
    /// Apply `f` to every item, keeping the order of the items.
    pub(crate) fn map<T, R, F>(self, items: Vec<T>, f: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Send + Sync,
    {
        match self {
            Execution::Serial => items.into_iter().map(f).collect(),
            Execution::Parallel => items.into_par_iter().map(f).collect(),
        }
    }
}

/// Parameters controlling how visibilities and images are partitioned.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagingParams {
    /// The number of visibility partitions, or "auto" for one partition per
    /// time.
    pub vis_slices: VisSlices,

    /// The width of w-stacking bins \[wavelengths\]. If set, this overrides
    /// `vis_slices` for w-stacking contexts.
    pub wstep: Option<f64>,

    /// The number of facets along each image axis. Only used by faceted
    /// contexts.
    pub facets: usize,

    /// The number of pixels each facet extends into its neighbours.
    pub overlap: usize,

    pub taper: Taper,

    pub execution: Execution,
}

impl Default for ImagingParams {
    fn default() -> Self {
        ImagingParams {
            vis_slices: VisSlices::default(),
            wstep: None,
            facets: 1,
            overlap: 0,
            taper: Taper::None,
            execution: Execution::default(),
        }
    }
}

/// The row-selection masks of the partitions that have at least one row.
fn partitions_with_data(
    strategy: &ImagingStrategy,
    vis: &Visibility,
    params: &ImagingParams,
) -> Result<Vec<Vec<bool>>, ImagingError> {
    let all = strategy.vis_partitioner(params).iter(vis)?;
    let num_partitions = all.len();
    let masks: Vec<Vec<bool>> = all.filter(|mask| mask.iter().any(|&m| m)).collect();
    debug!(
        "{}: {} of {num_partitions} visibility partitions have data",
        strategy.context,
        masks.len()
    );
    Ok(masks)
}

fn check_polarisations(vis: &Visibility, image: &Image) -> Result<(), ImagingError> {
    if vis.polarisation_frame != image.geometry.polarisation_frame {
        return Err(ImagingError::PolarisationMismatch {
            vis: vis.polarisation_frame,
            image: image.geometry.polarisation_frame,
        });
    }
    Ok(())
}

fn invert_rows(
    strategy: &ImagingStrategy,
    vis: &Visibility,
    template: &Image,
    do_psf: bool,
    normalize: bool,
    params: &ImagingParams,
) -> Result<(Image, Array2<f64>), ImagingError> {
    check_polarisations(vis, template)?;
    // Bad facet parameters should be reported before any work is done.
    let num_facets = strategy.facets(template, params)?.len();
    let masks = partitions_with_data(strategy, vis, params)?;
    if masks.is_empty() {
        return Err(ImagingError::NoValidData);
    }

    let (num_chans, num_pols, _, _) = template.dim();
    let partials = params.execution.map(masks, |mask| {
        let partition = vis.select_rows(&mask)?;
        let mut work = create_empty_image_like(template);
        let mut sumwt = Array2::zeros((num_chans, num_pols));
        for facet in strategy.facets(&work, params)? {
            trace!(
                "Inverting {} rows into facet {} of {num_facets}",
                partition.num_rows(),
                facet.index
            );
            let (facet_image, facet_sumwt) =
                strategy
                    .transform
                    .invert(&partition, &facet.template(&work), do_psf, false)?;
            facet.insert(&mut work, &facet_image);
            // Every facet of a partition sees the same rows, so the weights
            // are only counted once per partition.
            sumwt = facet_sumwt;
        }
        Ok::<_, ImagingError>((work, sumwt))
    });

    let mut image = create_empty_image_like(template);
    let mut sumwt: Array2<f64> = Array2::zeros((num_chans, num_pols));
    for partial in partials {
        let (work, partial_sumwt) = partial?;
        image.data += &work.data;
        sumwt += &partial_sumwt;
    }
    if sumwt.iter().all(|&w| w <= 0.0) {
        return Err(ImagingError::NoValidData);
    }

    if normalize {
        for ((chan, pol), &w) in sumwt.indexed_iter() {
            if w <= 0.0 {
                warn!("Image channel {chan} pol {pol} has no weight; leaving it unnormalised");
            }
        }
        normalize_by_weights(&mut image, &sumwt);
    }
    Ok((image, sumwt))
}

fn predict_rows(
    strategy: &ImagingStrategy,
    vis: &Visibility,
    model: &Image,
    params: &ImagingParams,
) -> Result<Visibility, ImagingError> {
    check_polarisations(vis, model)?;
    let num_facets = strategy.facets(model, params)?.len();
    let masks = partitions_with_data(strategy, vis, params)?;
    let mut predicted = vis.zeroed();
    if masks.is_empty() {
        warn!("No visibilities to predict");
        return Ok(predicted);
    }

    let num_pols = vis.num_pols();
    let partials = params.execution.map(masks, |mask| {
        let partition = vis.select_rows(&mask)?;
        let mut accum: Array2<c64> = Array2::zeros((partition.num_rows(), num_pols));
        // Each facet holds a (weighted) piece of the sky; the pieces sum to
        // the whole model, so their visibilities are summed too.
        for facet in strategy.facets(model, params)? {
            trace!(
                "Predicting {} rows from facet {} of {num_facets}",
                partition.num_rows(),
                facet.index
            );
            let facet_vis = strategy
                .transform
                .predict(&partition, &facet.extract(model))?;
            accum += &facet_vis.vis;
        }
        Ok::<_, ImagingError>((mask, accum))
    });

    for partial in partials {
        let (mask, accum) = partial?;
        let rows = mask
            .iter()
            .enumerate()
            .filter(|(_, &m)| m)
            .map(|(row, _)| row);
        for (row, partition_row) in rows.zip(accum.outer_iter()) {
            let mut out = predicted.vis.row_mut(row);
            out += &partition_row;
        }
    }
    Ok(predicted)
}

/// Make an image (or point-spread function) from each of the visibility sets
/// with the corresponding template. Along with each image is the sum of
/// weights for each `[channel][pol]`.
///
/// Fails with [`ImagingError::NoValidData`] if a visibility set has no rows
/// or no weight.
pub fn invert_list<V: VisibilityData>(
    vis_list: &[V],
    templates: &[Image],
    do_psf: bool,
    normalize: bool,
    context: &str,
    params: &ImagingParams,
) -> Result<Vec<(Image, Array2<f64>)>, ImagingError> {
    if vis_list.len() != templates.len() {
        return Err(ImagingError::ShapeMismatch {
            what: "template images",
            left: vis_list.len(),
            right: templates.len(),
        });
    }
    let strategy = resolve(context)?;
    vis_list
        .iter()
        .zip(templates)
        .map(|(vis, template)| {
            invert_rows(
                &strategy,
                &vis.to_rows(),
                template,
                do_psf,
                normalize,
                params,
            )
        })
        .collect()
}

/// [`invert_list`] for a single visibility set.
pub fn invert<V: VisibilityData>(
    vis: &V,
    template: &Image,
    do_psf: bool,
    normalize: bool,
    context: &str,
    params: &ImagingParams,
) -> Result<(Image, Array2<f64>), ImagingError> {
    let mut results = invert_list(
        std::slice::from_ref(vis),
        std::slice::from_ref(template),
        do_psf,
        normalize,
        context,
        params,
    )?;
    assert_eq!(results.len(), 1, "Expected one image per visibility set");
    Ok(results.remove(0))
}

/// Predict the visibilities of each model image. The returned visibilities
/// are copies of the inputs with their values replaced.
pub fn predict_list<V: VisibilityData>(
    vis_list: &[V],
    models: &[Image],
    context: &str,
    params: &ImagingParams,
) -> Result<Vec<V>, ImagingError> {
    if vis_list.len() != models.len() {
        return Err(ImagingError::ShapeMismatch {
            what: "model images",
            left: vis_list.len(),
            right: models.len(),
        });
    }
    let strategy = resolve(context)?;
    vis_list
        .iter()
        .zip(models)
        .map(|(vis, model)| {
            let predicted = predict_rows(&strategy, &vis.to_rows(), model, params)?;
            Ok(vis.with_rows(predicted)?)
        })
        .collect()
}

/// [`predict_list`] for a single visibility set.
pub fn predict<V: VisibilityData>(
    vis: &V,
    model: &Image,
    context: &str,
    params: &ImagingParams,
) -> Result<V, ImagingError> {
    let mut results = predict_list(
        std::slice::from_ref(vis),
        std::slice::from_ref(model),
        context,
        params,
    )?;
    assert_eq!(results.len(), 1, "Expected one prediction per visibility set");
    Ok(results.remove(0))
}

/// The normalised dirty image of `vis - predict(model)`.
pub fn residual<V: VisibilityData>(
    vis: &V,
    model: &Image,
    context: &str,
    params: &ImagingParams,
) -> Result<(Image, Array2<f64>), ImagingError> {
    let mut results = residual_list(
        std::slice::from_ref(vis),
        std::slice::from_ref(model),
        context,
        params,
    )?;
    assert_eq!(results.len(), 1, "Expected one residual per visibility set");
    Ok(results.remove(0))
}

/// [`residual`] for each pair of visibility set and model image.
pub fn residual_list<V: VisibilityData>(
    vis_list: &[V],
    models: &[Image],
    context: &str,
    params: &ImagingParams,
) -> Result<Vec<(Image, Array2<f64>)>, ImagingError> {
    if vis_list.len() != models.len() {
        return Err(ImagingError::ShapeMismatch {
            what: "model images",
            left: vis_list.len(),
            right: models.len(),
        });
    }
    let strategy = resolve(context)?;
    vis_list
        .iter()
        .zip(models)
        .map(|(vis, model)| {
            let rows = vis.to_rows();
            let model_vis = predict_rows(&strategy, &rows, model, params)?;
            let residual_vis = subtract_visibility(&rows, &model_vis)?;
            invert_rows(&strategy, &residual_vis, model, false, true, params)
        })
        .collect()
}
