use std::ffi::OsString;
use std::process::Command;

use super::error::{Error, Result};

/// Runs an external program to completion.
pub trait Runner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<()>;
}

/// Spawns the program with this process's stdin, stdout and stderr and waits for it.
#[derive(Default)]
pub struct DockerRunner {}

impl Runner for DockerRunner {
    fn run(&self, program: &str, args: &[OsString]) -> Result<()> {
        let line: Vec<_> = args.iter().map(|a| a.to_string_lossy()).collect();
        log::debug!("{} {}", program, line.join(" "));

        let status = Command::new(program)
            .args(args)
            .status()
            .map_err(|source| Error::FailedToLaunch {
                program: program.to_string(),
                source,
            })?;

        if !status.success() {
            return Err(Error::ChildFailed {
                program: program.to_string(),
                status,
            });
        }
        Ok(())
    }
}
