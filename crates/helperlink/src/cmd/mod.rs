use std::time::Duration;

use clap::{Args, Subcommand};
use helperlink_frame::{DEFAULT_MAX_TEXT_LEN, FramedBuffer};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod helper;
pub mod run;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Launch a login helper and play the server side of its session.
    Run(RunArgs),
    /// Act as a reference login helper on stdin/stdout.
    Helper(HelperArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Run(args) => run::run(args, format),
        Command::Helper(args) => helper::run(args),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Helper command line, run through `/bin/sh -c`.
    pub command: String,
    /// Capacity of each direction's frame buffer in bytes.
    #[arg(
        long,
        env = "HELPERLINK_BUFFER_CAPACITY",
        default_value_t = FramedBuffer::DEFAULT_CAPACITY
    )]
    pub buffer_capacity: usize,
    /// Longest payload delivered as text before it is replaced by an overflow marker.
    #[arg(long, default_value_t = DEFAULT_MAX_TEXT_LEN)]
    pub max_text_len: usize,
    /// Sleep between idle polls (e.g. 10ms).
    #[arg(long, default_value = "10ms")]
    pub tick: String,
    /// Give up on the session after this long (e.g. 30s).
    #[arg(long, env = "HELPERLINK_TIMEOUT", default_value = "30s")]
    pub timeout: String,
    /// Keep pumping this long after the login verdict to collect trailing frames.
    #[arg(long, default_value = "250ms")]
    pub linger: String,
    /// Userinfo string answered to UINFO.
    #[arg(long, default_value = "\\name\\player")]
    pub userinfo: String,
    /// Server info string answered to SINFO.
    #[arg(long, default_value = "\\hostname\\helperlink")]
    pub serverinfo: String,
    /// Scripted client answer to the next INPUT prompt (repeatable, in order).
    #[arg(long = "input", value_name = "LINE")]
    pub inputs: Vec<String>,
    /// Client chat line sent to the helper after an accepted login (repeatable).
    #[arg(long = "say", value_name = "LINE")]
    pub says: Vec<String>,
}

#[derive(Args, Debug)]
pub struct HelperArgs {
    /// Accepted username.
    #[arg(long, default_value = "mihawk")]
    pub user: String,
    /// Accepted password.
    #[arg(long, default_value = "hunter2")]
    pub password: String,
    /// Greeting printed before the login prompts.
    #[arg(long, default_value = "Hello this is the helperlink reference login helper!")]
    pub motd: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `150ms`, `2s` or a bare number of seconds.
pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("").is_err());
    }
}
