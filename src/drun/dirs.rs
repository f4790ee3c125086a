use std::path::PathBuf;

use directories_next::ProjectDirs;

use super::error::{Error, Result};

pub fn get_config_dir() -> Result<PathBuf> {
    match ProjectDirs::from("", "", "drun") {
        Some(proj_dirs) => Ok(proj_dirs.config_dir().to_path_buf()),
        None => Err(Error::MissingDirectory),
    }
}
