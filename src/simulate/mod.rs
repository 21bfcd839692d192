// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Generate synthetic observations.
//!
//! There's no measurement-set I/O here; visibilities are created from an
//! antenna layout and the rotation of the Earth, and sky models are placed on
//! image pixels.

#[cfg(test)]
mod tests;

use std::collections::HashSet;

use hifitime::{Duration, Epoch};
use log::debug;
use ndarray::prelude::*;

use crate::{
    c64,
    constants::{EARTH_ROTATION_RATE, GOLDEN_RATIO, TAU},
    coord::{HADec, RADec, XyzGeodetic},
    image::Image,
    math::TileBaselineMaps,
    vis::{BlockVisibility, PolarisationFrame, VisError, Visibility},
};

/// Everything needed to make synthetic visibilities.
#[derive(Clone, Debug)]
pub struct SimulationParams {
    pub num_antennas: usize,
    /// The radius of the array \[metres\].
    pub array_radius: f64,
    /// The geodetic latitude of the array \[radians\].
    pub latitude_rad: f64,
    pub phase_centre: RADec,
    /// The time of the first timestep.
    pub start: Epoch,
    /// The hour angle of the phase centre at the first timestep \[radians\].
    pub start_ha_rad: f64,
    pub integration_time: Duration,
    pub num_times: usize,
    /// \[Hz\]
    pub frequencies: Vec<f64>,
    /// \[Hz\]
    pub channel_bandwidth: f64,
    pub polarisation_frame: PolarisationFrame,
    /// Antennas that don't take part in the observation.
    pub flagged_antennas: HashSet<usize>,
}

impl Default for SimulationParams {
    fn default() -> Self {
        SimulationParams {
            num_antennas: 8,
            array_radius: 300.0,
            latitude_rad: (-26.7_f64).to_radians(),
            phase_centre: RADec::from_degrees(0.0, -45.0),
            start: Epoch::from_gpst_seconds(1090008640.0),
            start_ha_rad: -0.1,
            integration_time: Duration::from_seconds(120.0),
            num_times: 3,
            frequencies: vec![150e6],
            channel_bandwidth: 1e6,
            polarisation_frame: PolarisationFrame::StokesI,
            flagged_antennas: HashSet::new(),
        }
    }
}

/// Antenna positions on a golden-angle spiral, which gives a non-redundant
/// layout with no need for random numbers. The heights rise gently with
/// radius so that the array isn't perfectly coplanar.
pub fn antenna_layout(num_antennas: usize, radius: f64, latitude_rad: f64) -> Vec<XyzGeodetic> {
    let golden_angle = TAU * (1.0 - 1.0 / GOLDEN_RATIO);
    (0..num_antennas)
        .map(|i| {
            let r = radius * ((i as f64 + 0.5) / num_antennas as f64).sqrt();
            let theta = i as f64 * golden_angle;
            let (s, c) = theta.sin_cos();
            XyzGeodetic::from_enh(r * c, r * s, 0.01 * r, latitude_rad)
        })
        .collect()
}

/// Make block visibilities with zero values and unit weights.
pub fn create_blockvisibility(params: &SimulationParams) -> Result<BlockVisibility, VisError> {
    if params.num_antennas == 0 {
        return Err(VisError::NoAntennas);
    }
    let xyzs = antenna_layout(
        params.num_antennas,
        params.array_radius,
        params.latitude_rad,
    );
    let maps = TileBaselineMaps::new(params.num_antennas, &params.flagged_antennas);
    let baselines = maps.baselines();

    let times: Vec<f64> = (0..params.num_times)
        .map(|i| {
            let offset = Duration::from_seconds(i as f64 * params.integration_time.to_seconds());
            (params.start + offset).to_gpst_seconds()
        })
        .collect();
    let t0 = times.first().copied().unwrap_or_default();
    let uvw = Array2::from_shape_fn((times.len(), baselines.len()), |(i_time, i_bl)| {
        let ha = params.start_ha_rad + EARTH_ROTATION_RATE * (times[i_time] - t0);
        let (ant1, ant2) = baselines[i_bl];
        (xyzs[ant1] - xyzs[ant2]).to_uvw(HADec {
            ha,
            dec: params.phase_centre.dec,
        })
    });
    debug!(
        "Simulating {} times, {} baselines and {} channels",
        times.len(),
        baselines.len(),
        params.frequencies.len()
    );

    BlockVisibility::new(
        times,
        params.frequencies.clone(),
        vec![params.channel_bandwidth; params.frequencies.len()],
        baselines,
        uvw,
        params.phase_centre,
        params.polarisation_frame,
        params.num_antennas,
    )
}

/// Make row-based visibilities with zero values and unit weights.
pub fn create_visibility(params: &SimulationParams) -> Result<Visibility, VisError> {
    Ok(create_blockvisibility(params)?.coalesce())
}

/// Put point sources onto pixels of an image. Each source is given as
/// `(x, y, flux)`; the flux goes into every channel and into the polarisations
/// an unpolarised source appears in.
pub fn add_point_sources(image: &mut Image, sources: &[(usize, usize, f64)]) {
    let pols = image.geometry.polarisation_frame.parallel_hands();
    for &(x, y, flux) in sources {
        for mut chan in image.data.outer_iter_mut() {
            for &pol in pols {
                chan[(pol, y, x)] += flux;
            }
        }
    }
}

/// Deterministic per-antenna gain errors. Amplitudes scatter about 1 by up to
/// `amplitude_error` and phases by up to `phase_error_rad`.
pub fn simulate_gains(num_antennas: usize, amplitude_error: f64, phase_error_rad: f64) -> Vec<c64> {
    (0..num_antennas)
        .map(|i| {
            let i = i as f64;
            let amplitude = 1.0 + amplitude_error * (1.7 * i + 0.3).sin();
            let phase = phase_error_rad * (2.3 * i + 0.7).sin();
            c64::from_polar(amplitude, phase)
        })
        .collect()
}
