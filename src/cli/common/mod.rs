// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Common arguments for command-line interfaces. Both `ical` and
//! `continuum-imaging` describe a simulated observation, how to image it and
//! how to deconvolve it, so those arguments are shared between them.

mod printers;

pub(super) use printers::InfoPrinter;

use std::{borrow::Cow, str::FromStr};

use clap::Parser;
use console::style;
use hifitime::Duration;
use itertools::Itertools;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};
use thiserror::Error;
use vec1::Vec1;

use super::HyperimageError;
use crate::{
    c64,
    calibrate::{apply_gaintable, GainTable, SolutionInterval},
    constants::{
        DEFAULT_CLEAN_FRACTIONAL_THRESHOLD, DEFAULT_CLEAN_GAIN, DEFAULT_CLEAN_NITER,
        DEFAULT_CLEAN_THRESHOLD, DEFAULT_NMAJOR,
    },
    context::{ImagingContext, IMAGING_CONTEXTS},
    coord::RADec,
    deconvolve::{GaussianRestore, HogbomClean},
    image::{create_empty_image_like, create_image_from_visibility, Image},
    imaging::{predict, Execution, ImagingParams},
    partition::{PartitionError, Taper, VisSlices},
    pipeline::{PipelineOutputs, PipelineParams},
    simulate::{add_point_sources, create_visibility, simulate_gains, SimulationParams},
    vis::Visibility,
};

const DEFAULT_NUM_ANTENNAS: usize = 8;
const DEFAULT_ARRAY_RADIUS_M: f64 = 300.0;
const DEFAULT_NUM_TIMESTEPS: usize = 4;
const DEFAULT_TIME_RES_SECONDS: f64 = 120.0;
const DEFAULT_FREQ_MHZ: f64 = 150.0;
const DEFAULT_RA_DEG: f64 = 0.0;
const DEFAULT_DEC_DEG: f64 = -45.0;
const DEFAULT_NPIXEL: usize = 64;
const DEFAULT_CELL_SIZE_RAD: f64 = 0.002;

/// The imaging context used to make the "true" visibilities; it has exact w
/// terms.
const SIMULATION_CONTEXT: &str = "wprojection";

lazy_static::lazy_static! {
    pub(super) static ref ARG_FILE_TYPES_COMMA_SEPARATED: String = ArgFileTypes::iter().join(", ");

    pub(super) static ref ARG_FILE_HELP: String =
        format!("All arguments may be specified in a file. Any CLI arguments override arguments set in the file. Supported formats: {}", *ARG_FILE_TYPES_COMMA_SEPARATED);

    static ref NUM_ANTENNAS_HELP: String =
        format!("The number of antennas in the simulated array. Default: {DEFAULT_NUM_ANTENNAS}");

    static ref ARRAY_RADIUS_HELP: String =
        format!("The radius of the simulated array [metres]. Default: {DEFAULT_ARRAY_RADIUS_M}");

    static ref NUM_TIMESTEPS_HELP: String =
        format!("The number of timesteps in the observation. Default: {DEFAULT_NUM_TIMESTEPS}");

    static ref TIME_RES_HELP: String =
        format!("The time resolution [seconds]. Default: {DEFAULT_TIME_RES_SECONDS}");

    static ref FREQS_HELP: String =
        format!("The channel frequencies of the observation [MHz]. Default: {DEFAULT_FREQ_MHZ}");

    static ref PHASE_CENTRE_HELP: String =
        format!("The phase centre right ascension and declination [degrees]. Default: ({DEFAULT_RA_DEG}°, {DEFAULT_DEC_DEG}°)");

    static ref NPIXEL_HELP: String =
        format!("The number of pixels along each image axis. Default: {DEFAULT_NPIXEL}");

    static ref CELL_SIZE_HELP: String =
        format!("The size of an image pixel [radians]. Default: {DEFAULT_CELL_SIZE_RAD}");

    static ref CONTEXT_HELP: String =
        format!("The imaging context. Supported contexts: {}. Default: 2d", *IMAGING_CONTEXTS);

    static ref TAPER_HELP: String =
        format!("The taper applied across facet overlaps. Supported tapers: {}. Default: {}", Taper::iter().join(", "), Taper::default());

    static ref NMAJOR_HELP: String =
        format!("The number of major cycles after the first deconvolution. Default: {DEFAULT_NMAJOR}");

    static ref CLEAN_GAIN_HELP: String =
        format!("The fraction of the peak removed in each CLEAN iteration. Default: {DEFAULT_CLEAN_GAIN}");

    static ref CLEAN_THRESHOLD_HELP: String =
        format!("CLEAN stops once the peak residual is below this [Jy]. Default: {DEFAULT_CLEAN_THRESHOLD}");

    static ref CLEAN_FRACTIONAL_THRESHOLD_HELP: String =
        format!("CLEAN stops once the peak residual is below this fraction of its starting value. Default: {DEFAULT_CLEAN_FRACTIONAL_THRESHOLD}");

    static ref CLEAN_NITER_HELP: String =
        format!("The maximum number of CLEAN components per image plane and cycle. Default: {DEFAULT_CLEAN_NITER}");
}

#[derive(Debug, Display, EnumIter, EnumString)]
pub(super) enum ArgFileTypes {
    #[strum(serialize = "toml")]
    Toml,
    #[strum(serialize = "json")]
    Json,
}

macro_rules! unpack_arg_file {
    ($arg_file:expr) => ({
        use std::{fs::File, io::Read, str::FromStr};

        use crate::cli::common::{ArgFileTypes, ARG_FILE_TYPES_COMMA_SEPARATED};

        debug!("Attempting to parse argument file {}", $arg_file.display());

        let mut contents = String::new();
        let arg_file_type = $arg_file
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .and_then(|e| ArgFileTypes::from_str(&e).ok());

        match arg_file_type {
            Some(ArgFileTypes::Toml) => {
                debug!("Parsing toml file...");
                let mut fh = File::open(&$arg_file)?;
                fh.read_to_string(&mut contents)?;
                match toml::from_str(&contents) {
                    Ok(p) => p,
                    Err(err) => {
                        return Err(HyperimageError::ArgFile(format!(
                            "Couldn't decode toml structure from {:?}:\n{err}",
                            $arg_file
                        )))
                    }
                }
            }
            Some(ArgFileTypes::Json) => {
                debug!("Parsing json file...");
                let mut fh = File::open(&$arg_file)?;
                fh.read_to_string(&mut contents)?;
                match serde_json::from_str(&contents) {
                    Ok(p) => p,
                    Err(err) => {
                        return Err(HyperimageError::ArgFile(format!(
                            "Couldn't decode json structure from {:?}:\n{err}",
                            $arg_file
                        )))
                    }
                }
            }

            _ => {
                return Err(HyperimageError::ArgFile(format!(
                    "Argument file '{:?}' doesn't have a recognised file extension! Valid extensions are: {}", $arg_file, *ARG_FILE_TYPES_COMMA_SEPARATED)
                ))
            }
        }
    });
}

#[derive(Parser, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(super) struct ObservationArgs {
    #[clap(long, help = NUM_ANTENNAS_HELP.as_str(), help_heading = "OBSERVATION")]
    pub(super) num_antennas: Option<usize>,

    #[clap(long, help = ARRAY_RADIUS_HELP.as_str(), help_heading = "OBSERVATION")]
    pub(super) array_radius: Option<f64>,

    #[clap(long, help = NUM_TIMESTEPS_HELP.as_str(), help_heading = "OBSERVATION")]
    pub(super) num_timesteps: Option<usize>,

    #[clap(long, help = TIME_RES_HELP.as_str(), help_heading = "OBSERVATION")]
    pub(super) time_res: Option<f64>,

    #[clap(long, multiple_values(true), help = FREQS_HELP.as_str(), help_heading = "OBSERVATION")]
    pub(super) freqs: Option<Vec<f64>>,

    #[clap(
        long, help = PHASE_CENTRE_HELP.as_str(), help_heading = "OBSERVATION",
        number_of_values = 2,
        allow_hyphen_values = true,
        value_names = &["RA_DEG", "DEC_DEG"]
    )]
    pub(super) phase_centre: Option<Vec<f64>>,

    #[clap(long, help = NPIXEL_HELP.as_str(), help_heading = "OBSERVATION")]
    pub(super) npixel: Option<usize>,

    #[clap(long, help = CELL_SIZE_HELP.as_str(), help_heading = "OBSERVATION")]
    pub(super) cell_size: Option<f64>,

    /// Point sources on the sky, each given as "X,Y,FLUX" with pixel
    /// coordinates and a flux density [Jy]. Default: one 1 Jy source on the
    /// central pixel.
    #[clap(long, multiple_values(true), help_heading = "OBSERVATION")]
    pub(super) sources: Option<Vec<String>>,

    /// The largest fractional error of the simulated antenna gain amplitudes.
    /// Default: 0
    #[clap(long, help_heading = "OBSERVATION")]
    pub(super) amplitude_error: Option<f64>,

    /// The largest error of the simulated antenna gain phases [degrees].
    /// Default: 0
    #[clap(long, help_heading = "OBSERVATION")]
    pub(super) phase_error: Option<f64>,
}

impl ObservationArgs {
    pub(super) fn merge(self, other: Self) -> Self {
        Self {
            num_antennas: self.num_antennas.or(other.num_antennas),
            array_radius: self.array_radius.or(other.array_radius),
            num_timesteps: self.num_timesteps.or(other.num_timesteps),
            time_res: self.time_res.or(other.time_res),
            freqs: self.freqs.or(other.freqs),
            phase_centre: self.phase_centre.or(other.phase_centre),
            npixel: self.npixel.or(other.npixel),
            cell_size: self.cell_size.or(other.cell_size),
            sources: self.sources.or(other.sources),
            amplitude_error: self.amplitude_error.or(other.amplitude_error),
            phase_error: self.phase_error.or(other.phase_error),
        }
    }

    pub(super) fn parse(self) -> Result<Observation, PipelineArgsError> {
        let ObservationArgs {
            num_antennas,
            array_radius,
            num_timesteps,
            time_res,
            freqs,
            phase_centre,
            npixel,
            cell_size,
            sources,
            amplitude_error,
            phase_error,
        } = self;

        let num_antennas = num_antennas.unwrap_or(DEFAULT_NUM_ANTENNAS);
        if num_antennas < 2 {
            return Err(PipelineArgsError::TooFewAntennas(num_antennas));
        }
        let array_radius = array_radius.unwrap_or(DEFAULT_ARRAY_RADIUS_M);
        if array_radius <= 0.0 {
            return Err(PipelineArgsError::NonPositiveArrayRadius(array_radius));
        }
        let num_times = num_timesteps.unwrap_or(DEFAULT_NUM_TIMESTEPS);
        if num_times == 0 {
            return Err(PipelineArgsError::ZeroTimesteps);
        }
        let time_res = time_res.unwrap_or(DEFAULT_TIME_RES_SECONDS);
        if time_res <= 0.0 {
            return Err(PipelineArgsError::NonPositiveTimeRes(time_res));
        }

        let freqs_mhz = Vec1::try_from_vec(freqs.unwrap_or_else(|| vec![DEFAULT_FREQ_MHZ]))
            .map_err(|_| PipelineArgsError::NoFrequencies)?;
        if let Some(&f) = freqs_mhz.iter().find(|&&f| f <= 0.0) {
            return Err(PipelineArgsError::NonPositiveFrequency(f));
        }
        let frequencies: Vec<f64> = freqs_mhz.iter().map(|f| f * 1e6).collect();
        // Channels are assumed to be contiguous.
        let channel_bandwidth = frequencies
            .iter()
            .tuple_windows()
            .map(|(a, b)| (b - a).abs())
            .fold(f64::INFINITY, f64::min);
        let channel_bandwidth = if channel_bandwidth.is_finite() && channel_bandwidth > 0.0 {
            channel_bandwidth
        } else {
            SimulationParams::default().channel_bandwidth
        };

        let (ra, dec) = match phase_centre.as_deref() {
            None => (DEFAULT_RA_DEG, DEFAULT_DEC_DEG),
            Some(&[ra, dec]) => (ra, dec),
            Some(other) => return Err(PipelineArgsError::PhaseCentreValues(other.len())),
        };
        if !(0.0..=360.0).contains(&ra) {
            return Err(PipelineArgsError::RaInvalid);
        }
        if !(-90.0..=90.0).contains(&dec) {
            return Err(PipelineArgsError::DecInvalid);
        }

        let npixel = npixel.unwrap_or(DEFAULT_NPIXEL);
        if npixel == 0 {
            return Err(PipelineArgsError::ZeroPixels);
        }
        let cell_size = cell_size.unwrap_or(DEFAULT_CELL_SIZE_RAD);
        if cell_size <= 0.0 {
            return Err(PipelineArgsError::NonPositiveCellSize(cell_size));
        }

        let sources = match sources {
            None => vec![(npixel / 2, npixel / 2, 1.0)],
            Some(sources) => sources
                .iter()
                .map(|s| parse_source(s, npixel))
                .collect::<Result<Vec<_>, _>>()?,
        };

        let amplitude_error = amplitude_error.unwrap_or(0.0);
        let phase_error = phase_error.unwrap_or(0.0);
        if amplitude_error < 0.0 || amplitude_error >= 1.0 {
            return Err(PipelineArgsError::AmplitudeError(amplitude_error));
        }

        Ok(Observation {
            simulation: SimulationParams {
                num_antennas,
                array_radius,
                phase_centre: RADec::from_degrees(ra, dec),
                integration_time: Duration::from_seconds(time_res),
                num_times,
                frequencies,
                channel_bandwidth,
                ..Default::default()
            },
            npixel,
            cell_size,
            sources,
            gains: simulate_gains(num_antennas, amplitude_error, phase_error.to_radians()),
        })
    }
}

/// Parse "X,Y,FLUX" into pixel coordinates and a flux density.
fn parse_source(s: &str, npixel: usize) -> Result<(usize, usize, f64), PipelineArgsError> {
    let bad = || PipelineArgsError::ParseSource(s.to_string());
    let (x, y, flux) = s
        .split(',')
        .map(str::trim)
        .collect_tuple::<(&str, &str, &str)>()
        .ok_or_else(bad)?;
    let x: usize = x.parse().map_err(|_| bad())?;
    let y: usize = y.parse().map_err(|_| bad())?;
    let flux: f64 = flux.parse().map_err(|_| bad())?;
    if x >= npixel || y >= npixel {
        return Err(PipelineArgsError::SourceOutsideImage { x, y, npixel });
    }
    Ok((x, y, flux))
}

/// A simulated observation.
#[derive(Debug, Clone)]
pub(super) struct Observation {
    pub(super) simulation: SimulationParams,
    pub(super) npixel: usize,
    pub(super) cell_size: f64,
    /// `(x, y, flux)` of each point source.
    pub(super) sources: Vec<(usize, usize, f64)>,
    /// The gain of each antenna.
    pub(super) gains: Vec<c64>,
}

impl Observation {
    pub(super) fn display(&self) {
        let sim = &self.simulation;
        let mut printer = InfoPrinter::new("Simulated observation".into());
        printer.push_block(vec![
            format!(
                "{} antennas within {} m",
                sim.num_antennas, sim.array_radius
            )
            .into(),
            format!(
                "{} timesteps every {}",
                sim.num_times, sim.integration_time
            )
            .into(),
        ]);
        printer.push_line(
            format!(
                "Frequencies [MHz]: {}",
                sim.frequencies.iter().map(|f| f / 1e6).join(", ")
            )
            .into(),
        );
        printer.push_block(vec![
            style("                   RA        Dec")
                .bold()
                .to_string()
                .into(),
            format!(
                "Phase centre: {:>9.4}° {:>9.4}°",
                sim.phase_centre.ra.to_degrees(),
                sim.phase_centre.dec.to_degrees()
            )
            .into(),
        ]);
        printer.push_line(
            format!(
                "Image: {0}x{0} pixels of {1:e} rad",
                self.npixel, self.cell_size
            )
            .into(),
        );
        let mut block: Vec<Cow<'static, str>> = vec![format!(
            "{} point sources, {} Jy in total",
            self.sources.len(),
            self.sources.iter().map(|s| s.2).sum::<f64>()
        )
        .into()];
        if self.has_gain_errors() {
            let max_amp = self
                .gains
                .iter()
                .map(|g| (g.norm() - 1.0).abs())
                .fold(0.0, f64::max);
            let max_phase = self
                .gains
                .iter()
                .map(|g| g.arg().abs().to_degrees())
                .fold(0.0, f64::max);
            block.push(
                format!(
                    "Gain errors up to {:.1}% in amplitude and {max_phase:.2}° in phase",
                    max_amp * 100.0
                )
                .into(),
            );
        }
        printer.push_block(block);
        printer.display();
    }

    fn has_gain_errors(&self) -> bool {
        self.gains.iter().any(|g| *g != c64::new(1.0, 0.0))
    }

    /// Observed visibilities of the sky, corrupted by the antenna gains, and
    /// an empty model image to go with them.
    pub(super) fn simulate(&self) -> Result<(Visibility, Image), HyperimageError> {
        info!("Simulating visibilities");
        let vis = create_visibility(&self.simulation)?;
        let mut sky = create_image_from_visibility(&vis, self.npixel, self.cell_size, false);
        add_point_sources(&mut sky, &self.sources);
        let observed = predict(&vis, &sky, SIMULATION_CONTEXT, &ImagingParams::default())?;
        let observed = if self.has_gain_errors() {
            let mut gain_table = GainTable::unity(&observed, SolutionInterval::All, false)?;
            for (antenna, &gain) in self.gains.iter().enumerate() {
                gain_table.gains[(0, antenna, 0)] = gain;
            }
            apply_gaintable(&observed, &gain_table, false)
        } else {
            observed
        };
        debug!("Simulated {} visibility rows", observed.num_rows());
        Ok((observed, create_empty_image_like(&sky)))
    }
}

#[derive(Parser, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(super) struct ImagingArgs {
    #[clap(long, help = CONTEXT_HELP.as_str(), help_heading = "IMAGING")]
    pub(super) context: Option<String>,

    /// The number of visibility partitions, or "auto" for one partition per
    /// timestep. Default: 1
    #[clap(long, help_heading = "IMAGING")]
    pub(super) vis_slices: Option<String>,

    /// The width of w-stacking bins [wavelengths]. If given, this overrides
    /// --vis-slices for w-stacking contexts.
    #[clap(long, help_heading = "IMAGING")]
    pub(super) wstep: Option<f64>,

    /// The number of facets along each image axis. Only used by faceted
    /// contexts. Default: 1
    #[clap(long, help_heading = "IMAGING")]
    pub(super) facets: Option<usize>,

    /// The number of pixels each facet extends into its neighbours. Default:
    /// 0
    #[clap(long, help_heading = "IMAGING")]
    pub(super) overlap: Option<usize>,

    #[clap(long, help = TAPER_HELP.as_str(), help_heading = "IMAGING")]
    pub(super) taper: Option<String>,

    /// Evaluate visibility partitions one after another rather than in
    /// parallel.
    #[clap(long, help_heading = "IMAGING")]
    #[serde(default)]
    pub(super) serial: bool,

    #[clap(long, help = NMAJOR_HELP.as_str(), help_heading = "IMAGING")]
    pub(super) nmajor: Option<usize>,
}

impl ImagingArgs {
    pub(super) fn merge(self, other: Self) -> Self {
        Self {
            context: self.context.or(other.context),
            vis_slices: self.vis_slices.or(other.vis_slices),
            wstep: self.wstep.or(other.wstep),
            facets: self.facets.or(other.facets),
            overlap: self.overlap.or(other.overlap),
            taper: self.taper.or(other.taper),
            serial: self.serial || other.serial,
            nmajor: self.nmajor.or(other.nmajor),
        }
    }

    /// Fill the imaging parts of `params`.
    pub(super) fn parse(self, params: &mut PipelineParams) -> Result<(), PipelineArgsError> {
        let ImagingArgs {
            context,
            vis_slices,
            wstep,
            facets,
            overlap,
            taper,
            serial,
            nmajor,
        } = self;

        if let Some(context) = context {
            ImagingContext::from_str(&context)
                .map_err(|_| PipelineArgsError::UnknownContext(context.clone()))?;
            params.context = context;
        }
        let imaging = &mut params.imaging;
        if let Some(vis_slices) = vis_slices {
            imaging.vis_slices = VisSlices::from_str(&vis_slices)?;
        }
        if let Some(wstep) = wstep {
            if wstep <= 0.0 {
                return Err(PartitionError::NonPositiveWStep(wstep).into());
            }
            imaging.wstep = Some(wstep);
        }
        if let Some(facets) = facets {
            imaging.facets = facets;
        }
        if let Some(overlap) = overlap {
            imaging.overlap = overlap;
        }
        if let Some(taper) = taper {
            imaging.taper = Taper::from_str(&taper.to_lowercase())
                .map_err(|_| PipelineArgsError::UnknownTaper(taper))?;
        }
        if serial {
            imaging.execution = Execution::Serial;
        }
        if let Some(nmajor) = nmajor {
            if nmajor == 0 {
                return Err(PipelineArgsError::ZeroNmajor);
            }
            params.nmajor = nmajor;
        }
        Ok(())
    }
}

#[derive(Parser, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(super) struct DeconvolutionArgs {
    #[clap(long, help = CLEAN_GAIN_HELP.as_str(), help_heading = "DECONVOLUTION")]
    pub(super) clean_gain: Option<f64>,

    #[clap(long, help = CLEAN_THRESHOLD_HELP.as_str(), help_heading = "DECONVOLUTION")]
    pub(super) threshold: Option<f64>,

    #[clap(long, help = CLEAN_FRACTIONAL_THRESHOLD_HELP.as_str(), help_heading = "DECONVOLUTION")]
    pub(super) fractional_threshold: Option<f64>,

    #[clap(long, help = CLEAN_NITER_HELP.as_str(), help_heading = "DECONVOLUTION")]
    pub(super) niter: Option<usize>,

    /// The full widths at half maximum of the restoring beam [pixels]. The
    /// default is to fit the main lobe of the point-spread function.
    #[clap(
        long,
        help_heading = "DECONVOLUTION",
        number_of_values = 2,
        value_names = &["FWHM_Y", "FWHM_X"]
    )]
    pub(super) restore_fwhm: Option<Vec<f64>>,
}

impl DeconvolutionArgs {
    pub(super) fn merge(self, other: Self) -> Self {
        Self {
            clean_gain: self.clean_gain.or(other.clean_gain),
            threshold: self.threshold.or(other.threshold),
            fractional_threshold: self.fractional_threshold.or(other.fractional_threshold),
            niter: self.niter.or(other.niter),
            restore_fwhm: self.restore_fwhm.or(other.restore_fwhm),
        }
    }

    /// Fill the CLEAN parameters of `params` and return the restorer.
    pub(super) fn parse(
        self,
        params: &mut PipelineParams,
    ) -> Result<GaussianRestore, PipelineArgsError> {
        let DeconvolutionArgs {
            clean_gain,
            threshold,
            fractional_threshold,
            niter,
            restore_fwhm,
        } = self;

        let defaults = HogbomClean::default();
        params.clean = HogbomClean {
            gain: clean_gain.unwrap_or(defaults.gain),
            threshold: threshold.unwrap_or(defaults.threshold),
            fractional_threshold: fractional_threshold.unwrap_or(defaults.fractional_threshold),
            niter: niter.unwrap_or(defaults.niter),
        };
        if params.clean.gain <= 0.0 || params.clean.gain > 1.0 {
            return Err(PipelineArgsError::CleanGain(params.clean.gain));
        }

        let fwhm = match restore_fwhm.as_deref() {
            None => None,
            Some(&[y, x]) if y > 0.0 && x > 0.0 => Some((y, x)),
            Some(other) => return Err(PipelineArgsError::RestoreFwhm(other.to_vec())),
        };
        Ok(GaussianRestore { fwhm })
    }
}

/// Log the peak and rms of every pipeline product.
pub(super) fn display_outputs(outputs: &PipelineOutputs) {
    let mut printer = InfoPrinter::new("Results".into());
    for (i, ((model, (residual, _)), restored)) in outputs
        .models
        .iter()
        .zip(outputs.residuals.iter())
        .zip(outputs.restored.iter())
        .enumerate()
    {
        let mut block: Vec<Cow<'static, str>> = vec![style(format!("Visibility set {i}"))
            .bold()
            .to_string()
            .into()];
        let total_flux: f64 = model.data.iter().sum();
        block.push(
            format!(
                "Model:    {} components, {total_flux:.4} Jy in total",
                model.data.iter().filter(|&&v| v != 0.0).count()
            )
            .into(),
        );
        for (name, image) in [("Residual", residual), ("Restored", restored)] {
            let line = match image.peak() {
                Some((peak, (chan, pol, y, x))) => format!(
                    "{name}: peak {peak:.4e} at (chan {chan}, pol {pol}, y {y}, x {x}), rms {:.4e}",
                    image.rms()
                ),
                None => format!("{name}: empty"),
            };
            block.push(line.into());
        }
        if let Some(tables) = outputs.gain_tables.get(i) {
            block.push(
                format!(
                    "Gain terms: {}",
                    tables.iter().map(|(term, _)| term.to_string()).join(", ")
                )
                .into(),
            );
        }
        printer.push_block(block);
    }
    printer.display();
}

#[derive(Error, Debug)]
pub(super) enum PipelineArgsError {
    #[error("At least 2 antennas are needed to make baselines, but {0} were asked for")]
    TooFewAntennas(usize),

    #[error("The array radius must be positive, but got {0} m")]
    NonPositiveArrayRadius(f64),

    #[error("At least one timestep is needed")]
    ZeroTimesteps,

    #[error("The time resolution must be positive, but got {0} s")]
    NonPositiveTimeRes(f64),

    #[error("At least one frequency is needed")]
    NoFrequencies,

    #[error("Frequencies must be positive, but got {0} MHz")]
    NonPositiveFrequency(f64),

    #[error("The phase centre needs exactly 2 values (RA and Dec), but got {0}")]
    PhaseCentreValues(usize),

    #[error("Right Ascension was not within 0 to 360!")]
    RaInvalid,

    #[error("Declination was not within -90 to 90!")]
    DecInvalid,

    #[error("The image must have at least one pixel")]
    ZeroPixels,

    #[error("The cell size must be positive, but got {0} rad")]
    NonPositiveCellSize(f64),

    #[error("Couldn't parse '{0}' as a point source; expected \"X,Y,FLUX\"")]
    ParseSource(String),

    #[error("Source at pixel ({x}, {y}) is outside a {npixel}x{npixel} image")]
    SourceOutsideImage { x: usize, y: usize, npixel: usize },

    #[error("The amplitude error must be within 0 (inclusive) and 1 (exclusive), but got {0}")]
    AmplitudeError(f64),

    #[error("Unknown imaging context '{0}'. Supported contexts: {ctxs}", ctxs = *IMAGING_CONTEXTS)]
    UnknownContext(String),

    #[error("Unknown taper '{0}'")]
    UnknownTaper(String),

    #[error("At least one major cycle is needed")]
    ZeroNmajor,

    #[error("The CLEAN gain must be within 0 (exclusive) and 1 (inclusive), but got {0}")]
    CleanGain(f64),

    #[error("The restoring beam needs two positive widths, but got {0:?}")]
    RestoreFwhm(Vec<f64>),

    #[error(transparent)]
    VisSlices(#[from] PartitionError),
}
