// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;
use ndarray::array;

use super::*;

#[test]
fn test_unpolarised_component() {
    let comp = SkyComponent::unpolarised(
        RADec::default(),
        vec![150e6, 160e6],
        2.5,
        PolarisationFrame::Linear,
    );
    assert_eq!(comp.flux.dim(), (2, 4));
    assert_abs_diff_eq!(comp.flux.row(1), array![2.5, 0.0, 0.0, 2.5]);
}

#[test]
fn test_flux_at_nearest_channel() {
    let comp = SkyComponent {
        direction: RADec::default(),
        frequencies: vec![100e6, 200e6],
        flux: array![[1.0], [3.0]],
        polarisation_frame: PolarisationFrame::StokesI,
    };
    assert_abs_diff_eq!(comp.flux_at(120e6).unwrap()[0], 1.0);
    assert_abs_diff_eq!(comp.flux_at(180e6).unwrap()[0], 3.0);

    let flat = SkyComponent::unpolarised(
        RADec::default(),
        vec![150e6],
        4.0,
        PolarisationFrame::StokesI,
    );
    assert_abs_diff_eq!(flat.flux_at(1e9).unwrap()[0], 4.0);

    let none = SkyComponent::unpolarised(RADec::default(), vec![], 4.0, PolarisationFrame::StokesI);
    assert!(none.flux_at(150e6).is_none());
}

#[test]
fn test_skymodel_is_empty() {
    assert!(SkyModel::default().is_empty());
    let comp = SkyComponent::unpolarised(
        RADec::default(),
        vec![150e6],
        1.0,
        PolarisationFrame::StokesI,
    );
    assert!(!SkyModel::from_components(vec![comp]).is_empty());
}
