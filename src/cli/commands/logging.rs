use clap::{Arg, Command, builder::ValueParser};

pub const ARG_VERBOSITY: &str = "verbosity";

/// Accept either a level name or a bare count (0-5), so both
/// `ALIRO_LOG_LEVEL=debug` and `ALIRO_LOG_LEVEL=3` work.
#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(|level: &str| -> std::result::Result<u8, String> {
        match level.to_ascii_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            numeric => numeric
                .parse::<u8>()
                .ok()
                .filter(|parsed| *parsed <= 5)
                .ok_or_else(|| format!("unknown log level: {numeric}")),
        }
    })
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Log verbosity, repeat for more detail (-v warn, -vv info, -vvv debug)")
            .env("ALIRO_LOG_LEVEL")
            .global(true)
            .action(clap::ArgAction::Count)
            .value_parser(validator_log_level()),
    )
}
