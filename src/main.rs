//! Binary entry point for the `dme-aseries` CLI.

use std::io::{self, Write};
use std::process;
use std::sync::Arc;

use clap::Parser;
use thiserror::Error;

use dme_aseries::config::ConfigError;
use dme_aseries::{
    CreateVolumeParams, DmeClient, DmeConfig, DmeError, Protocol, Volume, VolumeEngine,
    VolumeError, logging,
};

mod cli;

use cli::{Cli, CreateCommand};

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("client error: {0}")]
    Client(#[from] DmeError),
    #[error("volume error: {0}")]
    Volume(#[from] VolumeError),
    #[error("failed to write output: {0}")]
    Output(String),
}

#[tokio::main]
async fn main() {
    logging::init();
    let cli = Cli::parse();
    let exit_code = match dispatch(cli).await {
        Ok(()) => 0,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

async fn dispatch(cli: Cli) -> Result<(), CliError> {
    let config = DmeConfig::load_without_cli_args()?;
    config.validate()?;
    let engine = VolumeEngine::new(Arc::new(DmeClient::from_config(&config)?));
    engine.connect().await?;

    let outcome = run(&engine, cli).await;
    if let Err(err) = engine.client().logout().await {
        tracing::warn!(error = %err, "logout failed");
    }
    outcome
}

async fn run(engine: &VolumeEngine, cli: Cli) -> Result<(), CliError> {
    match cli {
        Cli::Create(command) => {
            let volume = engine.create(create_params(command)?).await?;
            write_volume(io::stdout(), &volume)
        }
        Cli::Delete(target) => {
            engine.delete(&target.name).await?;
            writeln!(io::stdout(), "deleted {}", target.name)
                .map_err(|err| CliError::Output(err.to_string()))
        }
        Cli::Expand(command) => {
            engine.expand(&command.name, command.size).await?;
            writeln!(io::stdout(), "expanded {} to {} bytes", command.name, command.size)
                .map_err(|err| CliError::Output(err.to_string()))
        }
        Cli::Query(target) => {
            let volume = engine.query(&target.name).await?;
            write_volume(io::stdout(), &volume)
        }
    }
}

fn create_params(command: CreateCommand) -> Result<CreateVolumeParams, CliError> {
    let protocol: Protocol = command.protocol.parse()?;
    let mut params = CreateVolumeParams::new(command.name, command.size, command.pool, protocol);
    params.authorized_clients = command.clients;
    params.authorized_users = command.users;
    params.all_squash = !command.no_all_squash;
    params.root_squash = !command.no_root_squash;
    params.description = command.description;
    params.allocation_type = command.allocation_type;
    Ok(params)
}

fn write_volume(mut target: impl Write, volume: &Volume) -> Result<(), CliError> {
    writeln!(
        target,
        "name={} id={} size={}",
        volume.name, volume.id, volume.size
    )
    .map_err(|err| CliError::Output(err.to_string()))
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}
