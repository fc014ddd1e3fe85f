use std::{env, path::PathBuf};

use anyhow::{Result, anyhow};

const USAGE: &str = "usage: incentive --activity <code> --contracts <path> [--config <path>] [--notifications <path>]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliOptions {
    pub config_path: PathBuf,
    pub activity_code: String,
    pub contracts_path: PathBuf,
    pub notifications_path: Option<PathBuf>,
}

pub fn cli_options_from_args() -> Result<CliOptions> {
    parse_cli_options(env::args().skip(1))
}

pub fn parse_cli_options<I>(mut args: I) -> Result<CliOptions>
where
    I: Iterator<Item = String>,
{
    let mut config_path = None;
    let mut activity_code = None;
    let mut contracts_path = None;
    let mut notifications_path = None;

    while let Some(arg) = args.next() {
        let mut value_for = |flag: &str| {
            args.next()
                .ok_or_else(|| anyhow!("missing value for {flag}"))
        };
        match arg.as_str() {
            "--config" => config_path = Some(PathBuf::from(value_for("--config")?)),
            "--activity" => activity_code = Some(value_for("--activity")?),
            "--contracts" => contracts_path = Some(PathBuf::from(value_for("--contracts")?)),
            "--notifications" => {
                notifications_path = Some(PathBuf::from(value_for("--notifications")?))
            }
            other => return Err(anyhow!("unknown argument: {other}. {USAGE}")),
        }
    }

    let activity_code = activity_code
        .filter(|code| !code.trim().is_empty())
        .ok_or_else(|| anyhow!("--activity is required. {USAGE}"))?;
    let contracts_path = contracts_path.ok_or_else(|| anyhow!("--contracts is required. {USAGE}"))?;

    Ok(CliOptions {
        config_path: config_path.unwrap_or_else(|| PathBuf::from("./incentive.jsonc")),
        activity_code,
        contracts_path,
        notifications_path,
    })
}
