use log::LevelFilter;

use super::error::Result;

pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

pub fn setup(verbosity: u8) -> Result<()> {
    let level = level_for(verbosity);

    let mut logger_builder = &mut pretty_env_logger::formatted_builder();

    logger_builder = logger_builder.filter_level(level);
    if level == LevelFilter::Info {
        logger_builder = logger_builder.default_format();
        logger_builder = logger_builder.format_module_path(false);
        logger_builder = logger_builder.format_level(false);
        logger_builder = logger_builder.format_timestamp(None);
    }
    if let Ok(filters) = std::env::var("RUST_LOG") {
        logger_builder = logger_builder.parse_filters(&filters);
    }

    logger_builder.try_init()?;
    Ok(())
}
