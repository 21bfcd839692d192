// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;
use ndarray::prelude::*;

use super::*;
use crate::{
    coord::RADec,
    image::Image,
    simulate::{create_visibility, SimulationParams},
    vis::PolarisationFrame,
};

fn get_vis() -> Visibility {
    create_visibility(&SimulationParams {
        num_antennas: 7,
        num_times: 5,
        frequencies: vec![140e6, 160e6],
        ..Default::default()
    })
    .unwrap()
}

fn get_image(npixel: usize) -> Image {
    let mut image = Image::create(
        npixel,
        0.001,
        RADec::from_degrees(0.0, -45.0),
        vec![150e6],
        vec![1e6],
        PolarisationFrame::StokesI,
    );
    image
        .data
        .indexed_iter_mut()
        .for_each(|((_, _, y, x), v)| *v = (y * 100 + x) as f64);
    image
}

/// Every row must be selected by exactly one mask.
fn assert_exhaustive_and_disjoint(masks: &[Vec<bool>], num_rows: usize) {
    for row in 0..num_rows {
        let count = masks.iter().filter(|mask| mask[row]).count();
        assert_eq!(count, 1, "row {row} was selected {count} times");
    }
}

#[test]
fn test_partitions_are_exhaustive_and_disjoint() {
    let vis = get_vis();
    for partitioner in [
        VisPartitioner::Single,
        VisPartitioner::WStack {
            slices: VisSlices::Count(4),
            wstep: None,
        },
        VisPartitioner::WStack {
            slices: VisSlices::Count(1),
            wstep: Some(2.0),
        },
        VisPartitioner::Timeslice {
            slices: VisSlices::Auto,
        },
        VisPartitioner::Timeslice {
            slices: VisSlices::Count(2),
        },
        VisPartitioner::Timeslice {
            slices: VisSlices::Count(9),
        },
    ] {
        let masks: Vec<Vec<bool>> = partitioner.iter(&vis).unwrap().collect();
        assert!(!masks.is_empty(), "{partitioner:?}");
        assert!(masks.iter().all(|m| m.len() == vis.num_rows()));
        assert_exhaustive_and_disjoint(&masks, vis.num_rows());
    }
}

#[test]
fn test_partitions_are_restartable() {
    let vis = get_vis();
    let partitioner = VisPartitioner::WStack {
        slices: VisSlices::Count(3),
        wstep: None,
    };
    let first: Vec<Vec<bool>> = partitioner.iter(&vis).unwrap().collect();
    let second: Vec<Vec<bool>> = partitioner.iter(&vis).unwrap().collect();
    assert_eq!(first, second);
    assert_eq!(partitioner.iter(&vis).unwrap().len(), 3);
}

#[test]
fn test_timeslice_auto_gives_one_partition_per_time() {
    let vis = get_vis();
    let times = vis.unique_times();
    let masks: Vec<Vec<bool>> = VisPartitioner::Timeslice {
        slices: VisSlices::Auto,
    }
    .iter(&vis)
    .unwrap()
    .collect();
    assert_eq!(masks.len(), times.len());
    for (mask, &time) in masks.iter().zip(times.iter()) {
        for (row, &selected) in mask.iter().enumerate() {
            assert_eq!(selected, vis.time[row] == time);
        }
    }
}

#[test]
fn test_timeslice_groups_are_contiguous() {
    let vis = get_vis();
    let (labels, num) = VisPartitioner::Timeslice {
        slices: VisSlices::Count(2),
    }
    .labels(&vis)
    .unwrap();
    assert_eq!(num, 2);
    let times = vis.unique_times();
    // 5 times into 2 groups: the first 3 and the last 2.
    for (row, &label) in labels.iter().enumerate() {
        let expected = if vis.time[row] <= times[2] { 0 } else { 1 };
        assert_eq!(label, expected);
    }
}

#[test]
fn test_wstack_bins_are_ordered_by_w() {
    let vis = get_vis();
    let (labels, num) = VisPartitioner::WStack {
        slices: VisSlices::Count(4),
        wstep: None,
    }
    .labels(&vis)
    .unwrap();
    assert_eq!(num, 4);
    for a in 0..vis.num_rows() {
        for b in 0..vis.num_rows() {
            if vis.uvw_lambda(a).w < vis.uvw_lambda(b).w {
                assert!(labels[a] <= labels[b]);
            }
        }
    }
    // The extremes are in the outermost bins.
    let w = |row| vis.uvw_lambda(row).w;
    let min_row = (0..vis.num_rows())
        .min_by(|&a, &b| w(a).total_cmp(&w(b)))
        .unwrap();
    let max_row = (0..vis.num_rows())
        .max_by(|&a, &b| w(a).total_cmp(&w(b)))
        .unwrap();
    assert_eq!(labels[min_row], 0);
    assert_eq!(labels[max_row], 3);
}

#[test]
fn test_tiny_wstep_gives_at_most_one_partition_per_row() {
    let vis = get_vis();
    let num_rows = vis.num_rows();
    for wstep in [1e-300, 1e-4] {
        let partitioner = VisPartitioner::WStack {
            slices: VisSlices::Count(1),
            wstep: Some(wstep),
        };
        let (labels, num) = partitioner.labels(&vis).unwrap();
        assert!(num <= num_rows);
        assert!(labels.iter().all(|&l| l < num));
        let masks: Vec<Vec<bool>> = partitioner.iter(&vis).unwrap().collect();
        assert_eq!(masks.len(), num);
        // No partition is empty.
        assert!(masks.iter().all(|mask| mask.iter().any(|&b| b)));
        assert_exhaustive_and_disjoint(&masks, num_rows);
    }

    // A step wider than the w range puts everything in one partition.
    let (labels, num) = VisPartitioner::WStack {
        slices: VisSlices::Count(1),
        wstep: Some(1e12),
    }
    .labels(&vis)
    .unwrap();
    assert_eq!(num, 1);
    assert!(labels.iter().all(|&l| l == 0));
}

#[test]
fn test_partition_errors() {
    let vis = get_vis();
    assert!(matches!(
        VisPartitioner::WStack {
            slices: VisSlices::Auto,
            wstep: None
        }
        .iter(&vis),
        Err(PartitionError::AutoWStack)
    ));
    assert!(matches!(
        VisPartitioner::WStack {
            slices: VisSlices::Count(2),
            wstep: Some(-1.0)
        }
        .iter(&vis),
        Err(PartitionError::NonPositiveWStep(_))
    ));
    assert!(matches!(
        VisPartitioner::Timeslice {
            slices: VisSlices::Count(0)
        }
        .iter(&vis),
        Err(PartitionError::ZeroSlices)
    ));
}

#[test]
fn test_empty_vis_yields_empty_masks() {
    let vis = get_vis();
    let empty = vis.select_rows(&vec![false; vis.num_rows()]).unwrap();
    let masks: Vec<Vec<bool>> = VisPartitioner::Single.iter(&empty).unwrap().collect();
    assert_eq!(masks.len(), 1);
    assert!(masks[0].is_empty());
    let masks: Vec<Vec<bool>> = VisPartitioner::Timeslice {
        slices: VisSlices::Auto,
    }
    .iter(&empty)
    .unwrap()
    .collect();
    assert!(masks.is_empty());
}

#[test]
fn test_vis_slices_parsing() {
    assert_eq!("auto".parse::<VisSlices>().unwrap(), VisSlices::Auto);
    assert_eq!(" 4 ".parse::<VisSlices>().unwrap(), VisSlices::Count(4));
    assert!(matches!(
        "0".parse::<VisSlices>(),
        Err(PartitionError::ZeroSlices)
    ));
    assert!(matches!(
        "lots".parse::<VisSlices>(),
        Err(PartitionError::ParseVisSlices(_))
    ));

    #[derive(serde::Deserialize)]
    struct Wrapper {
        slices: VisSlices,
    }
    let w: Wrapper = serde_json::from_str(r#"{"slices": "auto"}"#).unwrap();
    assert_eq!(w.slices, VisSlices::Auto);
    let w: Wrapper = serde_json::from_str(r#"{"slices": 3}"#).unwrap();
    assert_eq!(w.slices, VisSlices::Count(3));
    assert!(serde_json::from_str::<Wrapper>(r#"{"slices": 0}"#).is_err());
}

#[test]
fn test_one_facet_is_the_whole_image() {
    let image = get_image(16);
    let all: Vec<Facet> = facets(&image, 1, 0, Taper::None).unwrap().collect();
    assert_eq!(all.len(), 1);
    let facet = &all[0];
    assert_eq!(facet.x, 0..16);
    assert_eq!(facet.y, 0..16);

    let extracted = facet.extract(&image);
    assert_eq!(extracted.geometry, image.geometry);
    assert_abs_diff_eq!(extracted.data, image.data);

    // Overlaps and tapers mean nothing with a single facet.
    let all: Vec<Facet> = facets(&image, 1, 4, Taper::Tukey).unwrap().collect();
    assert_eq!(all.len(), 1);
    assert!(all[0].weights().iter().all(|&w| w == 1.0));
}

#[test]
fn test_facets_are_in_raster_order() {
    let image = get_image(16);
    let all: Vec<Facet> = facets(&image, 2, 0, Taper::None).unwrap().collect();
    assert_eq!(all.len(), 4);
    let extents: Vec<_> = all.iter().map(|f| (f.y.clone(), f.x.clone())).collect();
    assert_eq!(
        extents,
        vec![(0..8, 0..8), (0..8, 8..16), (8..16, 0..8), (8..16, 8..16)]
    );
    for (i, facet) in all.iter().enumerate() {
        assert_eq!(facet.index, i);
    }
}

#[test]
fn test_facet_overlap_is_clipped() {
    let image = get_image(24);
    let all: Vec<Facet> = facets(&image, 3, 2, Taper::Linear).unwrap().collect();
    assert_eq!(all[0].x, 0..10);
    assert_eq!(all[1].x, 6..18);
    assert_eq!(all[2].x, 14..24);
}

#[test]
fn test_facet_weights_sum_to_one() {
    let image = get_image(24);
    for taper in [Taper::None, Taper::Linear, Taper::Tukey] {
        for overlap in [0, 1, 4] {
            let mut total = Array2::<f64>::zeros((24, 24));
            for facet in facets(&image, 3, overlap, taper).unwrap() {
                let mut region = total.slice_mut(s![facet.y.clone(), facet.x.clone()]);
                region += &facet.weights();
            }
            assert_abs_diff_eq!(total, Array2::ones((24, 24)), epsilon = 1e-14);
        }
    }
}

#[test]
fn test_extract_and_insert_reconstruct_the_image() {
    let image = get_image(16);
    for taper in [Taper::None, Taper::Tukey] {
        let mut rebuilt = crate::image::create_empty_image_like(&image);
        for facet in facets(&image, 2, 3, taper).unwrap() {
            // Inserting an unweighted cut-out applies the weights once.
            let mut cut = facet.template(&image);
            cut.data.assign(&image.data.slice(s![
                ..,
                ..,
                facet.y.clone(),
                facet.x.clone()
            ]));
            facet.insert(&mut rebuilt, &cut);
        }
        assert_abs_diff_eq!(rebuilt.data, image.data, epsilon = 1e-12);

        // Weighted cut-outs also sum to the image.
        let mut summed = crate::image::create_empty_image_like(&image);
        for facet in facets(&image, 2, 3, taper).unwrap() {
            let cut = facet.extract(&image);
            summed
                .data
                .slice_mut(s![.., .., facet.y.clone(), facet.x.clone()])
                .zip_mut_with(&cut.data, |s, &c| *s += c);
        }
        assert_abs_diff_eq!(summed.data, image.data, epsilon = 1e-12);
    }
}

#[test]
fn test_facet_template_keeps_directions() {
    let image = get_image(16);
    let facet = facets(&image, 2, 2, Taper::None).unwrap().nth(3).unwrap();
    assert_eq!(facet.y, 6..16);
    let template = facet.template(&image);
    assert_eq!(template.dim(), (1, 1, 10, 10));
    let full = image.geometry.pixel_to_lmn(9.0, 12.0).unwrap();
    let local = template.geometry.pixel_to_lmn(3.0, 6.0).unwrap();
    assert_abs_diff_eq!(full.l, local.l, epsilon = 1e-15);
    assert_abs_diff_eq!(full.m, local.m, epsilon = 1e-15);
}

#[test]
fn test_facet_errors() {
    let image = get_image(16);
    assert!(matches!(
        facets(&image, 0, 0, Taper::None),
        Err(FacetError::ZeroFacets)
    ));
    assert!(matches!(
        facets(&image, 3, 0, Taper::None),
        Err(FacetError::NotDivisible {
            axis_len: 16,
            facets: 3
        })
    ));
    assert!(matches!(
        facets(&image, 4, 3, Taper::Linear),
        Err(FacetError::OverlapTooLarge {
            overlap: 3,
            facet_size: 4
        })
    ));
}

#[test]
fn test_taper_strings() {
    assert_eq!("tukey".parse::<Taper>().unwrap(), Taper::Tukey);
    assert_eq!(Taper::None.to_string(), "none");
    assert_eq!(Taper::default(), Taper::None);
}
