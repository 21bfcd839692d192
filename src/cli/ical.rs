// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Iteratively image, deconvolve and self-calibrate a simulated observation.

use std::{borrow::Cow, path::PathBuf};

use clap::Parser;
use itertools::Itertools;
use log::{debug, info, trace};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::common::{
    display_outputs, DeconvolutionArgs, ImagingArgs, InfoPrinter, Observation, ObservationArgs,
    ARG_FILE_HELP,
};
use crate::{
    calibrate::{parse_calibration_context, SolutionInterval, CALIBRATION_TERMS},
    constants::{DEFAULT_MAX_ITERATIONS, DEFAULT_MIN_THRESHOLD, DEFAULT_STOP_THRESHOLD},
    deconvolve::GaussianRestore,
    pipeline::{ical, PipelineParams},
    HyperimageError,
};

lazy_static::lazy_static! {
    static ref CALIBRATION_CONTEXT_HELP: String =
        format!("The calibration terms to solve, in order. Supported terms: {}. Default: TG", *CALIBRATION_TERMS);

    static ref MAX_ITERATIONS_HELP: String =
        format!("The maximum number of times to iterate during calibration. Default: {DEFAULT_MAX_ITERATIONS}");

    static ref STOP_THRESHOLD_HELP: String =
        format!("The threshold at which we stop iterating during calibration. Default: {DEFAULT_STOP_THRESHOLD:e}");

    static ref MIN_THRESHOLD_HELP: String =
        format!("The minimum threshold to satisfy convergence during calibration. Even when this threshold is exceeded, iteration will continue until max iterations or the stop threshold is reached. Default: {DEFAULT_MIN_THRESHOLD:e}");
}

#[derive(Parser, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(super) struct CalibrationArgs {
    #[clap(long, help = CALIBRATION_CONTEXT_HELP.as_str(), help_heading = "CALIBRATION")]
    pub(super) calibration_context: Option<String>,

    /// Solve calibration for each visibility set separately, rather than one
    /// calibration shared by all of them.
    #[clap(long, help_heading = "CALIBRATION")]
    #[serde(default)]
    pub(super) local_solution: bool,

    #[clap(long, help = MAX_ITERATIONS_HELP.as_str(), help_heading = "CALIBRATION")]
    pub(super) max_iterations: Option<u32>,

    #[clap(long, help = STOP_THRESHOLD_HELP.as_str(), help_heading = "CALIBRATION")]
    pub(super) stop_threshold: Option<f64>,

    #[clap(long, help = MIN_THRESHOLD_HELP.as_str(), help_heading = "CALIBRATION")]
    pub(super) min_threshold: Option<f64>,

    /// The first major cycle in which the T term is solved. Default: 0
    #[clap(long, help_heading = "CALIBRATION")]
    pub(super) t_first_selfcal: Option<usize>,

    /// The first major cycle in which the G term is solved. Default: 0
    #[clap(long, help_heading = "CALIBRATION")]
    pub(super) g_first_selfcal: Option<usize>,

    /// The first major cycle in which the B term is solved. Default: 0
    #[clap(long, help_heading = "CALIBRATION")]
    pub(super) b_first_selfcal: Option<usize>,

    /// The solution interval of the G term: "auto" (every timestep), "all"
    /// (one solution) or a number of seconds. Default: 60
    #[clap(long, help_heading = "CALIBRATION")]
    pub(super) g_timeslice: Option<String>,
}

impl CalibrationArgs {
    fn merge(self, other: Self) -> Self {
        Self {
            calibration_context: self.calibration_context.or(other.calibration_context),
            local_solution: self.local_solution || other.local_solution,
            max_iterations: self.max_iterations.or(other.max_iterations),
            stop_threshold: self.stop_threshold.or(other.stop_threshold),
            min_threshold: self.min_threshold.or(other.min_threshold),
            t_first_selfcal: self.t_first_selfcal.or(other.t_first_selfcal),
            g_first_selfcal: self.g_first_selfcal.or(other.g_first_selfcal),
            b_first_selfcal: self.b_first_selfcal.or(other.b_first_selfcal),
            g_timeslice: self.g_timeslice.or(other.g_timeslice),
        }
    }

    /// Fill the calibration parts of `params`.
    fn parse(self, params: &mut PipelineParams) -> Result<(), HyperimageError> {
        let CalibrationArgs {
            calibration_context,
            local_solution,
            max_iterations,
            stop_threshold,
            min_threshold,
            t_first_selfcal,
            g_first_selfcal,
            b_first_selfcal,
            g_timeslice,
        } = self;

        params.do_selfcal = true;
        if let Some(calibration_context) = calibration_context {
            parse_calibration_context(&calibration_context)?;
            params.calibration_context = calibration_context;
        }
        params.global_solution = !local_solution;

        let controls = &mut params.calibration;
        if let Some(max_iterations) = max_iterations {
            if max_iterations == 0 {
                return Err(IcalArgsError::ZeroMaxIterations.into());
            }
            controls.max_iterations = max_iterations;
        }
        if let Some(stop_threshold) = stop_threshold {
            controls.stop_threshold = stop_threshold;
        }
        if let Some(min_threshold) = min_threshold {
            controls.min_threshold = min_threshold;
        }
        if controls.stop_threshold > controls.min_threshold {
            return Err(IcalArgsError::StopAboveMin {
                stop: controls.stop_threshold,
                min: controls.min_threshold,
            }
            .into());
        }
        if let Some(first) = t_first_selfcal {
            controls.t.first_selfcal = first;
        }
        if let Some(first) = g_first_selfcal {
            controls.g.first_selfcal = first;
        }
        if let Some(first) = b_first_selfcal {
            controls.b.first_selfcal = first;
        }
        if let Some(g_timeslice) = g_timeslice {
            controls.g.timeslice = parse_solution_interval(&g_timeslice)?;
        }
        Ok(())
    }
}

/// "auto", "all" or a positive number of seconds.
fn parse_solution_interval(s: &str) -> Result<SolutionInterval, IcalArgsError> {
    match s.trim().to_lowercase().as_str() {
        "auto" => Ok(SolutionInterval::Auto),
        "all" => Ok(SolutionInterval::All),
        other => match other.trim_end_matches('s').parse::<f64>() {
            Ok(secs) if secs > 0.0 => Ok(SolutionInterval::Seconds(secs)),
            _ => Err(IcalArgsError::ParseSolutionInterval(s.to_string())),
        },
    }
}

#[derive(Parser, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(super) struct IcalArgs {
    #[clap(name = "ARGUMENTS_FILE", help = ARG_FILE_HELP.as_str(), parse(from_os_str))]
    pub(super) args_file: Option<PathBuf>,

    #[clap(flatten)]
    #[serde(rename = "observation")]
    #[serde(default)]
    pub(super) observation_args: ObservationArgs,

    #[clap(flatten)]
    #[serde(rename = "imaging")]
    #[serde(default)]
    pub(super) imaging_args: ImagingArgs,

    #[clap(flatten)]
    #[serde(rename = "deconvolution")]
    #[serde(default)]
    pub(super) deconvolution_args: DeconvolutionArgs,

    #[clap(flatten)]
    #[serde(rename = "calibration")]
    #[serde(default)]
    pub(super) calibration_args: CalibrationArgs,
}

impl IcalArgs {
    /// Both command-line and file arguments overlap in terms of what is
    /// available; this function consolidates everything that was specified into
    /// a single struct. Where applicable, it will prefer CLI parameters over
    /// those in the file.
    ///
    /// This function should only ever merge arguments, and not try to make
    /// sense of them.
    pub(super) fn merge(self) -> Result<IcalArgs, HyperimageError> {
        debug!("Merging command-line arguments with the argument file");

        let cli_args = self;

        if let Some(arg_file) = cli_args.args_file {
            // Read in the file arguments. Ensure all of the file args are
            // accounted for by pattern matching.
            let IcalArgs {
                args_file: _,
                observation_args,
                imaging_args,
                deconvolution_args,
                calibration_args,
            } = unpack_arg_file!(arg_file);

            // Merge all the arguments, preferring the CLI args when available.
            Ok(IcalArgs {
                args_file: None,
                observation_args: cli_args.observation_args.merge(observation_args),
                imaging_args: cli_args.imaging_args.merge(imaging_args),
                deconvolution_args: cli_args.deconvolution_args.merge(deconvolution_args),
                calibration_args: cli_args.calibration_args.merge(calibration_args),
            })
        } else {
            Ok(cli_args)
        }
    }

    pub(super) fn parse(
        self,
    ) -> Result<(Observation, PipelineParams, GaussianRestore), HyperimageError> {
        debug!("{:#?}", self);

        let IcalArgs {
            args_file: _,
            observation_args,
            imaging_args,
            deconvolution_args,
            calibration_args,
        } = self;

        let observation = observation_args.parse()?;
        let mut params = PipelineParams::default();
        imaging_args.parse(&mut params)?;
        let restorer = deconvolution_args.parse(&mut params)?;
        calibration_args.parse(&mut params)?;

        if observation.simulation.num_antennas <= crate::constants::MIN_NUM_ANTENNAS {
            return Err(IcalArgsError::TooFewAntennas(observation.simulation.num_antennas).into());
        }

        observation.display();
        let mut printer = InfoPrinter::new("ICAL".into());
        printer.push_line(format!("Imaging context: {}", params.context).into());
        printer.push_line(format!("Major cycles: {}", params.nmajor).into());
        let terms = parse_calibration_context(&params.calibration_context)?;
        let mut block: Vec<Cow<'static, str>> = vec![format!(
            "Calibration context: {} ({})",
            params.calibration_context,
            if params.global_solution {
                "global solution"
            } else {
                "local solutions"
            }
        )
        .into()];
        for term in terms {
            let controls = params.calibration.term(term);
            block.push(
                format!(
                    "{term}: from cycle {}, {}, interval {:?}{}",
                    controls.first_selfcal,
                    if controls.phase_only {
                        "phase only"
                    } else {
                        "amplitude and phase"
                    },
                    controls.timeslice,
                    if controls.per_channel {
                        ", per channel"
                    } else {
                        ""
                    }
                )
                .into(),
            );
        }
        printer.push_block(block);
        printer.push_line(
            format!(
                "Solver: max {} iterations, stop threshold {:e}, min threshold {:e}",
                params.calibration.max_iterations,
                params.calibration.stop_threshold,
                params.calibration.min_threshold
            )
            .into(),
        );
        printer.display();

        Ok((observation, params, restorer))
    }

    pub(super) fn run(self, dry_run: bool) -> Result<(), HyperimageError> {
        debug!("Converting arguments into parameters");
        trace!("{:#?}", self);
        let (observation, params, restorer) = self.parse()?;

        if dry_run {
            info!("Dry run -- exiting now.");
            return Ok(());
        }

        let (vis, model) = observation.simulate()?;
        let outputs = ical(&[vis], &[model], &params, &params.clean, &restorer)?;
        display_outputs(&outputs);
        if let Some(tables) = outputs.gain_tables.first() {
            for (term, table) in tables {
                let amps = table.gains.iter().map(|g| g.norm());
                let (min, max) = amps.minmax().into_option().unwrap_or((1.0, 1.0));
                info!("{term} gain amplitudes lie within {min:.4} and {max:.4}");
            }
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub(super) enum IcalArgsError {
    #[error("Self-calibration needs more than {min} antennas, but only {0} were asked for", min = crate::constants::MIN_NUM_ANTENNAS)]
    TooFewAntennas(usize),

    #[error("The maximum number of calibration iterations must be at least 1")]
    ZeroMaxIterations,

    #[error("The stop threshold ({stop:e}) must not be bigger than the min threshold ({min:e})")]
    StopAboveMin { stop: f64, min: f64 },

    #[error("Couldn't parse '{0}' as a solution interval; expected \"auto\", \"all\" or a number of seconds")]
    ParseSolutionInterval(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_solution_interval() {
        assert_eq!(parse_solution_interval("auto").unwrap(), SolutionInterval::Auto);
        assert_eq!(parse_solution_interval(" ALL ").unwrap(), SolutionInterval::All);
        assert_eq!(
            parse_solution_interval("30").unwrap(),
            SolutionInterval::Seconds(30.0)
        );
        assert_eq!(
            parse_solution_interval("7.5s").unwrap(),
            SolutionInterval::Seconds(7.5)
        );
        assert!(parse_solution_interval("0").is_err());
        assert!(parse_solution_interval("sometimes").is_err());
    }
}
