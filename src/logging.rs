use log::LevelFilter;
use std::io;

/// Initializes the fern logger: everything from other crates muted,
/// everything from this one at debug, mirrored to stderr and to a log file
/// on disk.
pub fn init(log_file: &str) -> Result<(), fern::InitError> {
    let mut logger = fern::Dispatch::new()
        .level(LevelFilter::Off)
        .level_for("gadgetinst", LevelFilter::Debug)
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}] {}: {}",
                record.level(),
                {
                    let target = record.target();
                    target.find(':').map_or(target, |pos| &target[..pos])
                },
                message
            ))
        })
        .chain(io::stderr());

    match fern::log_file(log_file) {
        Ok(log) => logger = logger.chain(log),
        Err(why) => eprintln!("failed to create log file at {}: {}", log_file, why),
    }

    logger.apply()
}
