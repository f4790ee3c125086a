pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("must specify an image")]
    MissingImage,

    #[error("generic io error: {0}")]
    IOError(#[from] std::io::Error),

    #[error("could not determine working directory: {0}")]
    MissingWorkdir(std::io::Error),

    #[error("could not identify user `{0}`")]
    MissingUser(String),

    #[error("could not make `{0}` absolute")]
    CouldNotAbsolutize(String),

    #[error("invalid mount string `{0:?}`")]
    InvalidMount(String),

    #[error("invalid timezone `{0}`")]
    InvalidTimezone(String),

    #[error("could not identify directory")]
    MissingDirectory,

    #[error("log initialization error: {0}")]
    SetLoggerError(#[from] log::SetLoggerError),

    #[error("parsing arguments: {0}")]
    ClapError(#[from] clap::Error),

    #[error("failed to load config from `{path}`: {source}")]
    FailedToLoadConfig {
        path: String,
        source: serde_yaml::Error,
    },

    #[error("`{field}` may only be set in the global config, not in `{path}`")]
    GlobalOnlySetting { path: String, field: &'static str },

    #[error("failed to start `{program}`: {source}")]
    FailedToLaunch {
        program: String,
        source: std::io::Error,
    },

    #[error("`{program}` exited unsuccessfully: {status}")]
    ChildFailed {
        program: String,
        status: std::process::ExitStatus,
    },
}
