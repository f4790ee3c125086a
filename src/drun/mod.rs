pub mod aspects;
pub mod cli;
pub mod config;
pub mod dirs;
pub mod docker;
pub mod error;
pub mod host;
pub mod launcher;
pub mod logging;
pub mod volumes;
