// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Antenna-gain calibration.

A calibration context is a string of term characters, e.g. "TGB". Each term is
solved in turn against the visibilities corrected by the terms before it:

- `T`: a phase-only gain for every solution interval (by default, every
  time);
- `G`: an amplitude and phase gain over long solution intervals;
- `B`: an amplitude and phase gain for every channel over all times.

Gains are scalar per antenna and apply equally to every polarisation.
 */

mod error;
pub mod modelpartition;
mod selfcal;
mod solver;

pub use error::CalibrateError;
pub use modelpartition::{create_modelpartition, predict_modelpartition};
pub use selfcal::{calibrate_list, GainTables, SelfCalibrator};

use std::collections::BTreeSet;

use itertools::Itertools;
use lazy_static::lazy_static;
use log::{debug, trace, warn};
use ndarray::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

use crate::{
    c64,
    constants::{
        DEFAULT_G_TIMESLICE, DEFAULT_MAX_ITERATIONS, DEFAULT_MIN_THRESHOLD,
        DEFAULT_STOP_THRESHOLD, MIN_NUM_ANTENNAS,
    },
    vis::Visibility,
};
use solver::{calibrate, Measurement};

lazy_static! {
    pub(crate) static ref CALIBRATION_TERMS: String = CalibrationTerm::iter().join(", ");
}

/// A term of the calibration equation.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter, EnumString, Serialize, Deserialize,
)]
pub enum CalibrationTerm {
    /// Phase-only "troposphere" gains, solved often.
    #[strum(serialize = "T")]
    T,

    /// Complex electronic gains, solved rarely.
    #[strum(serialize = "G")]
    G,

    /// Complex bandpass gains, solved per channel.
    #[strum(serialize = "B")]
    B,
}

/// Parse a calibration context (e.g. "TGB") into its terms, in order.
/// Whitespace is ignored.
pub fn parse_calibration_context(context: &str) -> Result<Vec<CalibrationTerm>, CalibrateError> {
    context
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| {
            let mut buf = [0; 4];
            c.encode_utf8(&mut buf)
                .parse::<CalibrationTerm>()
                .map_err(|_| CalibrateError::UnknownTerm(c))
        })
        .collect()
}

/// How long a gain solution is valid for.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolutionInterval {
    /// One solution for every distinct time.
    Auto,

    /// One solution for all times.
    All,

    /// Solutions every this many seconds.
    Seconds(f64),
}

/// Controls for a single calibration term.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TermControls {
    /// The first major cycle in which this term is solved.
    pub first_selfcal: usize,

    /// Constrain gains to unit amplitude.
    pub phase_only: bool,

    pub timeslice: SolutionInterval,

    /// Solve for every channel separately.
    pub per_channel: bool,
}

impl Default for TermControls {
    fn default() -> Self {
        TermControls {
            first_selfcal: 0,
            phase_only: false,
            timeslice: SolutionInterval::Seconds(DEFAULT_G_TIMESLICE),
            per_channel: false,
        }
    }
}

impl TermControls {
    /// The usual controls for a calibration term.
    pub fn default_for(term: CalibrationTerm) -> TermControls {
        match term {
            CalibrationTerm::T => TermControls {
                phase_only: true,
                timeslice: SolutionInterval::Auto,
                ..Default::default()
            },
            CalibrationTerm::G => TermControls::default(),
            CalibrationTerm::B => TermControls {
                timeslice: SolutionInterval::All,
                per_channel: true,
                ..Default::default()
            },
        }
    }
}

/// Controls for every calibration term, along with the solver's convergence
/// criteria.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationControls {
    #[serde(rename = "T")]
    pub t: TermControls,

    #[serde(rename = "G")]
    pub g: TermControls,

    #[serde(rename = "B")]
    pub b: TermControls,

    /// The maximum number of solver iterations.
    pub max_iterations: u32,

    /// The solver stops once every antenna's precision is better than this.
    pub stop_threshold: f64,

    /// A solution is considered converged if every antenna's precision is
    /// better than this.
    pub min_threshold: f64,
}

impl Default for CalibrationControls {
    fn default() -> Self {
        CalibrationControls {
            t: TermControls::default_for(CalibrationTerm::T),
            g: TermControls::default_for(CalibrationTerm::G),
            b: TermControls::default_for(CalibrationTerm::B),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            stop_threshold: DEFAULT_STOP_THRESHOLD,
            min_threshold: DEFAULT_MIN_THRESHOLD,
        }
    }
}

impl CalibrationControls {
    pub fn term(&self, term: CalibrationTerm) -> &TermControls {
        match term {
            CalibrationTerm::T => &self.t,
            CalibrationTerm::G => &self.g,
            CalibrationTerm::B => &self.b,
        }
    }
}

/// Antenna gains for a set of solution intervals and channels.
#[derive(Clone, Debug)]
pub struct GainTable {
    /// `[slot][antenna][channel]`
    pub gains: Array3<c64>,

    /// The first time of each solution slot \[GPS seconds\], ascending.
    pub times: Vec<f64>,

    /// The frequency of each gain channel \[Hz\]. If gains aren't solved per
    /// channel, there is only one.
    pub frequencies: Vec<f64>,
}

impl GainTable {
    /// A table of unity gains with solution slots and channels suited to
    /// `vis`.
    pub fn unity(
        vis: &Visibility,
        interval: SolutionInterval,
        per_channel: bool,
    ) -> Result<GainTable, CalibrateError> {
        let unique_times = vis.unique_times();
        let times = match interval {
            SolutionInterval::Auto => unique_times,
            SolutionInterval::All => unique_times.into_iter().take(1).collect(),
            SolutionInterval::Seconds(secs) => {
                if secs <= 0.0 || !secs.is_finite() {
                    return Err(CalibrateError::NonPositiveInterval(secs));
                }
                match unique_times.first() {
                    None => vec![],
                    Some(&t0) => unique_times
                        .iter()
                        .map(|&t| ((t - t0) / secs).floor() as usize)
                        .dedup()
                        .map(|slot| t0 + slot as f64 * secs)
                        .collect(),
                }
            }
        };
        let frequencies = if per_channel {
            vis.unique_frequencies()
        } else if vis.num_rows() == 0 {
            vec![]
        } else {
            vec![vis.frequency.iter().sum::<f64>() / vis.num_rows() as f64]
        };
        // Keep at least one slot and channel so that the table can always be
        // applied.
        let num_slots = times.len().max(1);
        let num_chans = frequencies.len().max(1);
        Ok(GainTable {
            gains: Array3::from_elem(
                (num_slots, vis.num_antennas, num_chans),
                c64::new(1.0, 0.0),
            ),
            times,
            frequencies,
        })
    }

    pub fn num_antennas(&self) -> usize {
        self.gains.len_of(Axis(1))
    }

    /// The solution slot that contains `time`: the last slot starting at or
    /// before it.
    pub fn slot_of(&self, time: f64) -> usize {
        self.times
            .iter()
            .rposition(|&start| start <= time)
            .unwrap_or(0)
    }

    /// The gain channel nearest to `freq`.
    pub fn chan_of(&self, freq: f64) -> usize {
        self.frequencies
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| (*a - freq).abs().total_cmp(&(*b - freq).abs()))
            .map(|(i, _)| i)
            .unwrap_or(0)
    }
}

/// Solve for the gains of one calibration term, such that
/// `vis ~ g1 conj(g2) model`. Without a model, the visibilities are assumed
/// to be of a unit point source at the phase centre.
///
/// Solution slots are solved in parallel. Any slot and channel whose solution
/// does not converge is left at unity.
pub fn solve_gaintable(
    vis: &Visibility,
    model: Option<&Visibility>,
    term: &TermControls,
    controls: &CalibrationControls,
) -> Result<GainTable, CalibrateError> {
    if let Some(model) = model {
        if model.num_rows() != vis.num_rows() {
            return Err(CalibrateError::Vis(crate::vis::VisError::RowCountMismatch {
                left: vis.num_rows(),
                right: model.num_rows(),
            }));
        }
    }
    let parallel_hands = vis.polarisation_frame.parallel_hands();
    let has_data = |row: usize| parallel_hands.iter().any(|&p| vis.weight[(row, p)] > 0.0);

    let antennas_with_data: BTreeSet<usize> = (0..vis.num_rows())
        .filter(|&row| has_data(row) && vis.antenna1[row] != vis.antenna2[row])
        .flat_map(|row| [vis.antenna1[row], vis.antenna2[row]])
        .collect();
    if antennas_with_data.len() <= MIN_NUM_ANTENNAS {
        return Err(CalibrateError::TooFewAntennas {
            num_antennas: antennas_with_data.len(),
        });
    }

    let mut gain_table = GainTable::unity(vis, term.timeslice, term.per_channel)?;
    let (num_slots, _, num_chans) = gain_table.gains.dim();

    // Sort every measurement into its solution cell.
    let mut cells: Vec<Vec<Vec<Measurement>>> = vec![vec![vec![]; num_chans]; num_slots];
    for row in 0..vis.num_rows() {
        let (antenna1, antenna2) = (vis.antenna1[row], vis.antenna2[row]);
        if antenna1 == antenna2 {
            continue;
        }
        let slot = gain_table.slot_of(vis.time[row]);
        let chan = gain_table.chan_of(vis.frequency[row]);
        for &pol in parallel_hands {
            let weight = vis.weight[(row, pol)];
            if weight <= 0.0 {
                continue;
            }
            cells[slot][chan].push(Measurement {
                antenna1,
                antenna2,
                data: vis.vis[(row, pol)],
                model: model.map(|m| m.vis[(row, pol)]).unwrap_or(c64::new(1.0, 0.0)),
                weight,
            });
        }
    }

    gain_table
        .gains
        .outer_iter_mut()
        .into_par_iter()
        .zip(cells.into_par_iter())
        .enumerate()
        .for_each(|(slot, (mut slot_gains, slot_cells))| {
            for (chan, measurements) in slot_cells.into_iter().enumerate() {
                if measurements.is_empty() {
                    trace!("Slot {slot} channel {chan} has no data; leaving unity gains");
                    continue;
                }
                let mut gains = slot_gains.slice_mut(s![.., chan]);
                let result = calibrate(&measurements, gains.view_mut(), controls, term.phase_only);
                if result.converged {
                    trace!(
                        "Slot {slot} channel {chan}: converged in {} iterations ({:e})",
                        result.num_iterations,
                        result.max_precision
                    );
                    // Antennas without data have no solution.
                    gains
                        .iter_mut()
                        .filter(|g| !g.is_finite())
                        .for_each(|g| *g = c64::new(1.0, 0.0));
                } else {
                    warn!(
                        "Slot {slot} channel {chan}: gains did not converge after {} iterations ({} antennas failed); using unity gains",
                        result.num_iterations, result.num_failed
                    );
                    gains.fill(c64::new(1.0, 0.0));
                }
            }
        });

    Ok(gain_table)
}

/// Apply a gain table to visibilities. With `inverse`, the gains are divided
/// out (i.e. the visibilities are corrected), otherwise they are multiplied
/// in (i.e. the visibilities are corrupted). Values whose correction cannot
/// be computed are flagged by zeroing them and their weights.
pub fn apply_gaintable(vis: &Visibility, gain_table: &GainTable, inverse: bool) -> Visibility {
    let mut applied = vis.clone();
    let num_antennas = gain_table.num_antennas();
    let mut num_flagged = 0;
    for (row, (mut values, mut weights)) in applied
        .vis
        .outer_iter_mut()
        .zip(applied.weight.outer_iter_mut())
        .enumerate()
    {
        let (antenna1, antenna2) = (vis.antenna1[row], vis.antenna2[row]);
        let factor = if antenna1 < num_antennas && antenna2 < num_antennas {
            let slot = gain_table.slot_of(vis.time[row]);
            let chan = gain_table.chan_of(vis.frequency[row]);
            let g1 = gain_table.gains[(slot, antenna1, chan)];
            let g2 = gain_table.gains[(slot, antenna2, chan)];
            g1 * g2.conj()
        } else {
            c64::new(f64::NAN, f64::NAN)
        };
        if !factor.is_finite() || factor.norm_sqr() == 0.0 {
            values.fill(c64::default());
            weights.fill(0.0);
            num_flagged += 1;
            continue;
        }
        if inverse {
            values.iter_mut().for_each(|v| *v /= factor);
        } else {
            values.iter_mut().for_each(|v| *v *= factor);
        }
    }
    if num_flagged > 0 {
        debug!("Flagged {num_flagged} rows without usable gains");
    }
    applied
}

/// Solve every term of the calibration context that is due at this major
/// cycle. Each term is solved against the visibilities corrected by the
/// terms before it.
pub fn solve_calibrate_function(
    vis: &Visibility,
    model: Option<&Visibility>,
    calibration_context: &str,
    controls: &CalibrationControls,
    iteration: usize,
) -> Result<GainTables, CalibrateError> {
    let terms = parse_calibration_context(calibration_context)?;
    let mut corrected = vis.clone();
    let mut tables = Vec::with_capacity(terms.len());
    for term in terms {
        let term_controls = controls.term(term);
        if iteration < term_controls.first_selfcal {
            debug!(
                "Not solving calibration term {term} until major cycle {}",
                term_controls.first_selfcal
            );
            continue;
        }
        debug!("Solving calibration term {term}");
        let gain_table = solve_gaintable(&corrected, model, term_controls, controls)?;
        corrected = apply_gaintable(&corrected, &gain_table, true);
        tables.push((term, gain_table));
    }
    Ok(tables)
}

/// Correct visibilities by every gain table, in order.
pub fn apply_calibration_function(vis: &Visibility, tables: &GainTables) -> Visibility {
    tables
        .iter()
        .fold(vis.clone(), |corrected, (_, gain_table)| {
            apply_gaintable(&corrected, gain_table, true)
        })
}

/// Solve for the calibration terms and correct the visibilities with them.
pub fn calibrate_function(
    vis: &Visibility,
    model: Option<&Visibility>,
    calibration_context: &str,
    controls: &CalibrationControls,
    iteration: usize,
) -> Result<(Visibility, GainTables), CalibrateError> {
    let tables = solve_calibrate_function(vis, model, calibration_context, controls, iteration)?;
    let corrected = apply_calibration_function(vis, &tables);
    Ok((corrected, tables))
}
