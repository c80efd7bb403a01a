use anyhow::{Context, Result};
use clap::{Arg, Command};

pub fn with_args(command: Command) -> Command {
    let command = with_challenge_args(command);
    let command = with_session_args(command);
    with_limits_args(command)
}

fn with_challenge_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("secret-key")
                .long("secret-key")
                .help("Key used to hash one-time codes and session tokens")
                .env("ALIRO_SECRET_KEY")
                .required(true),
        )
        .arg(
            Arg::new("code-ttl-seconds")
                .long("code-ttl-seconds")
                .help("One-time code TTL in seconds")
                .env("ALIRO_CODE_TTL_SECONDS")
                .default_value("600")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("max-attempts")
                .long("max-attempts")
                .help("Failed verification attempts allowed per challenge")
                .env("ALIRO_MAX_ATTEMPTS")
                .default_value("5")
                .value_parser(clap::value_parser!(i32)),
        )
        .arg(
            Arg::new("sweeper-interval-seconds")
                .long("sweeper-interval-seconds")
                .help("Interval between expired-challenge sweeps")
                .env("ALIRO_SWEEPER_INTERVAL_SECONDS")
                .default_value("300")
                .value_parser(clap::value_parser!(u64)),
        )
}

fn with_session_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("frontend-base-url")
                .long("frontend-base-url")
                .help("Frontend base URL, used for CORS and cookie security")
                .env("ALIRO_FRONTEND_BASE_URL")
                .default_value("https://aliro.dev"),
        )
        .arg(
            Arg::new("cookie-name")
                .long("cookie-name")
                .help("Name of the session cookie")
                .env("ALIRO_COOKIE_NAME")
                .default_value("aliro_session"),
        )
        .arg(
            Arg::new("session-ttl-seconds")
                .long("session-ttl-seconds")
                .help("Session TTL in seconds")
                .env("ALIRO_SESSION_TTL_SECONDS")
                .default_value("2592000")
                .value_parser(clap::value_parser!(i64)),
        )
}

fn with_limits_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("rate-limit-permit")
                .long("rate-limit-permit")
                .help("Requests allowed per client per action per window")
                .env("ALIRO_RATE_LIMIT_PERMIT")
                .default_value("10")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("rate-limit-window-seconds")
                .long("rate-limit-window-seconds")
                .help("Fixed rate-limit window in seconds")
                .env("ALIRO_RATE_LIMIT_WINDOW_SECONDS")
                .default_value("60")
                .value_parser(clap::value_parser!(u64)),
        )
}

pub struct Options {
    pub secret_key: String,
    pub frontend_base_url: String,
    pub cookie_name: String,
    pub code_ttl_seconds: i64,
    pub session_ttl_seconds: i64,
    pub max_attempts: i32,
    pub rate_limit_permit: u32,
    pub rate_limit_window_seconds: u64,
    pub sweeper_interval_seconds: u64,
}

impl Options {
    /// Extract auth options from parsed matches.
    ///
    /// # Errors
    /// Returns an error if a required argument is missing.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        let secret_key = matches
            .get_one::<String>("secret-key")
            .cloned()
            .context("missing required argument: --secret-key")?;

        let frontend_base_url = matches
            .get_one::<String>("frontend-base-url")
            .cloned()
            .context("missing required argument: --frontend-base-url")?;

        let cookie_name = matches
            .get_one::<String>("cookie-name")
            .cloned()
            .context("missing required argument: --cookie-name")?;

        let code_ttl_seconds = matches
            .get_one::<i64>("code-ttl-seconds")
            .copied()
            .unwrap_or(600);

        let session_ttl_seconds = matches
            .get_one::<i64>("session-ttl-seconds")
            .copied()
            .unwrap_or(2_592_000);

        let max_attempts = matches.get_one::<i32>("max-attempts").copied().unwrap_or(5);

        let rate_limit_permit = matches
            .get_one::<u32>("rate-limit-permit")
            .copied()
            .unwrap_or(10);

        let rate_limit_window_seconds = matches
            .get_one::<u64>("rate-limit-window-seconds")
            .copied()
            .unwrap_or(60);

        let sweeper_interval_seconds = matches
            .get_one::<u64>("sweeper-interval-seconds")
            .copied()
            .unwrap_or(300);

        Ok(Self {
            secret_key,
            frontend_base_url,
            cookie_name,
            code_ttl_seconds,
            session_ttl_seconds,
            max_attempts,
            rate_limit_permit,
            rate_limit_window_seconds,
            sweeper_interval_seconds,
        })
    }
}
