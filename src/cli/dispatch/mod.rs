//! Command-line argument dispatch.
//!
//! Maps validated CLI arguments to the appropriate action, such as starting
//! the API server with its full configuration.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::auth;
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let auth_opts = auth::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        secret_key: auth_opts.secret_key,
        frontend_base_url: auth_opts.frontend_base_url,
        cookie_name: auth_opts.cookie_name,
        code_ttl_seconds: auth_opts.code_ttl_seconds,
        session_ttl_seconds: auth_opts.session_ttl_seconds,
        max_attempts: auth_opts.max_attempts,
        rate_limit_permit: auth_opts.rate_limit_permit,
        rate_limit_window_seconds: auth_opts.rate_limit_window_seconds,
        sweeper_interval_seconds: auth_opts.sweeper_interval_seconds,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_args_from_matches() {
        temp_env::with_vars(
            [
                ("ALIRO_DSN", None::<&str>),
                ("ALIRO_SECRET_KEY", None::<&str>),
            ],
            || {
                let command = crate::cli::commands::new();
                let matches = command.get_matches_from(vec![
                    "aliro",
                    "--dsn",
                    "postgres://user@localhost:5432/aliro",
                    "--secret-key",
                    "super-secret",
                    "--port",
                    "9090",
                    "--max-attempts",
                    "3",
                ]);
                let result = handler(&matches);
                assert!(result.is_ok());
                if let Ok(Action::Server(args)) = result {
                    assert_eq!(args.port, 9090);
                    assert_eq!(args.dsn, "postgres://user@localhost:5432/aliro");
                    assert_eq!(args.secret_key, "super-secret");
                    assert_eq!(args.max_attempts, 3);
                    assert_eq!(args.cookie_name, "aliro_session");
                }
            },
        );
    }
}
