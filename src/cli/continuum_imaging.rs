// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Image and deconvolve a simulated observation.

use std::path::PathBuf;

use clap::Parser;
use log::{debug, info, trace};
use serde::{Deserialize, Serialize};

use super::common::{
    display_outputs, DeconvolutionArgs, ImagingArgs, InfoPrinter, Observation, ObservationArgs,
    ARG_FILE_HELP,
};
use crate::{
    deconvolve::GaussianRestore,
    pipeline::{continuum_imaging, PipelineParams},
    HyperimageError,
};

#[derive(Parser, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(super) struct ContinuumImagingArgs {
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
}

impl ContinuumImagingArgs {
    /// Both command-line and file arguments overlap in terms of what is
    /// available; this function consolidates everything that was specified into
    /// a single struct. Where applicable, it will prefer CLI parameters over
    /// those in the file.
    ///
    /// This function should only ever merge arguments, and not try to make
    /// sense of them.
    pub(super) fn merge(self) -> Result<ContinuumImagingArgs, HyperimageError> {
        debug!("Merging command-line arguments with the argument file");

        let cli_args = self;

        if let Some(arg_file) = cli_args.args_file {
            // Read in the file arguments. Ensure all of the file args are
            // accounted for by pattern matching.
            let ContinuumImagingArgs {
                args_file: _,
                observation_args,
                imaging_args,
                deconvolution_args,
            } = unpack_arg_file!(arg_file);

            // Merge all the arguments, preferring the CLI args when available.
            Ok(ContinuumImagingArgs {
                args_file: None,
                observation_args: cli_args.observation_args.merge(observation_args),
                imaging_args: cli_args.imaging_args.merge(imaging_args),
                deconvolution_args: cli_args.deconvolution_args.merge(deconvolution_args),
            })
        } else {
            Ok(cli_args)
        }
    }

    pub(super) fn parse(
        self,
    ) -> Result<(Observation, PipelineParams, GaussianRestore), HyperimageError> {
        debug!("{:#?}", self);

        let ContinuumImagingArgs {
            args_file: _,
            observation_args,
            imaging_args,
            deconvolution_args,
        } = self;

        let observation = observation_args.parse()?;
        let mut params = PipelineParams::default();
        imaging_args.parse(&mut params)?;
        let restorer = deconvolution_args.parse(&mut params)?;

        observation.display();
        let mut printer = InfoPrinter::new("Continuum imaging".into());
        printer.push_line(format!("Imaging context: {}", params.context).into());
        printer.push_line(format!("Major cycles: {}", params.nmajor).into());
        printer.push_line(
            format!(
                "CLEAN: gain {}, niter {}, fractional threshold {}",
                params.clean.gain, params.clean.niter, params.clean.fractional_threshold
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
        let outputs = continuum_imaging(&[vis], &[model], &params, &params.clean, &restorer)?;
        display_outputs(&outputs);
        Ok(())
    }
}
