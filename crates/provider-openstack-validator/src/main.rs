//! Validates Gardener manifests carrying OpenStack provider configuration.
//!
//! Every resource in the given files is validated. Referenced objects (CloudProfiles, bindings,
//! secrets) are looked up among the validated resources and the `--context` files.

use std::{path::PathBuf, process::ExitCode};

use clap::{Args, Parser, Subcommand};
use provider_openstack::{
    admission::{self, Resource, StaticLookup, Validator},
    validation::primitives::{self, FieldValidators},
};
use snafu::{ResultExt, Snafu};
use tracing::{info, instrument};

use crate::logging::{LogFormat, initialize_logging};

mod logging;
mod manifest;

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to load manifests to validate"))]
    LoadManifests { source: manifest::Error },

    #[snafu(display("failed to load previous manifests"))]
    LoadOldManifests { source: manifest::Error },

    #[snafu(display("failed to load context manifests"))]
    LoadContext { source: manifest::Error },

    #[snafu(display("failed to set up field validators"))]
    CreateValidators { source: primitives::Error },
}

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    /// Format of the log output on stderr.
    #[arg(long, value_enum, default_value_t, env = "PROVIDER_OPENSTACK_LOG_FORMAT")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate resources as the admission webhook would.
    Validate(ValidateArguments),
}

#[derive(Debug, Args)]
struct ValidateArguments {
    /// Multi-document YAML files holding the resources to validate.
    #[arg(long = "file", short = 'f', required = true)]
    files: Vec<PathBuf>,

    /// Previous state of the validated resources, matched by kind, namespace and name.
    ///
    /// Resources with a previous state are validated as updates.
    #[arg(long = "old")]
    old_files: Vec<PathBuf>,

    /// Resources which are only referenced, like CloudProfiles, bindings and secrets.
    #[arg(long = "context")]
    context_files: Vec<PathBuf>,
}

/// Validates all resources, returning how many of them were rejected.
#[instrument(skip_all)]
fn validate(arguments: &ValidateArguments) -> Result<usize, Error> {
    let resources = manifest::load_all(&arguments.files).context(LoadManifestsSnafu)?;
    let old_resources = manifest::load_all(&arguments.old_files).context(LoadOldManifestsSnafu)?;
    let context = manifest::load_all(&arguments.context_files).context(LoadContextSnafu)?;

    let lookup: StaticLookup = resources.iter().cloned().chain(context).collect();
    let validator = Validator::new(FieldValidators::new().context(CreateValidatorsSnafu)?);

    let mut rejected = 0;
    for resource in &resources {
        let old = previous_state(resource, &old_resources);
        let kind = resource.kind();
        let object = resource.object_name();

        match validator.validate(resource, old, &lookup) {
            Ok(()) => println!("{kind} {object}: valid"),
            Err(admission::Error::Invalid { errors, .. }) => {
                rejected += 1;
                println!("{kind} {object}: invalid");
                for error in errors {
                    println!("  {error}");
                }
            }
            Err(error) => {
                rejected += 1;
                println!("{kind} {object}: {}", snafu::Report::from_error(error));
            }
        }
    }

    info!(count = resources.len(), rejected, "validated resources");
    Ok(rejected)
}

fn previous_state<'a>(resource: &Resource, old_resources: &'a [Resource]) -> Option<&'a Resource> {
    old_resources.iter().find(|old| {
        old.kind() == resource.kind() && old.object_name() == resource.object_name()
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    initialize_logging(cli.log_format);

    match cli.command {
        Command::Validate(arguments) => match validate(&arguments) {
            Ok(0) => ExitCode::SUCCESS,
            Ok(_) => ExitCode::FAILURE,
            Err(error) => {
                eprintln!("{}", snafu::Report::from_error(error));
                ExitCode::from(2)
            }
        },
    }
}
