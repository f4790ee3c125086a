use std::env;
use std::io;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};

use drun::cli;
use drun::config::{Config, CONFIG_ENV};
use drun::docker::DockerRunner;
use drun::error::Error;
use drun::host::SystemHost;
use drun::launcher::Launcher;
use drun::logging;

fn run() -> Result<()> {
    let request = cli::parse(env::args_os())?;
    logging::setup(request.verbose).context("initializing logger")?;

    let host = SystemHost::default();
    let config = Config::resolve(&request, &host, env::var_os(CONFIG_ENV).map(PathBuf::from))
        .context("loading configuration")?;

    let runner = DockerRunner::default();
    Launcher::new(&host, &runner, config)
        .launch(&request, &mut io::stdout())
        .context("launching container")
}

/// Usage errors exit 2 as Go's flag package does. Everything else, a missing image and a failed
/// child included, exits 1.
fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<Error>() {
        Some(Error::ClapError(e)) => e.exit_code(),
        _ => 1,
    }
}

fn report(err: &anyhow::Error) {
    match err.downcast_ref::<Error>() {
        Some(Error::ClapError(e)) => {
            let _ = e.print();
        }
        Some(Error::MissingImage) => eprintln!("{}", cli::usage()),
        _ => eprintln!("drun: {:#}", err),
    }
}

fn main() {
    if let Err(err) = run() {
        report(&err);
        process::exit(exit_code(&err));
    }
}
