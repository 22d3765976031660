// Copyright (c) Microsoft. All rights reserved.

#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::too_many_lines)]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

// Subcommands
mod decode;
mod query;

const CONFIG_ENV_VAR: &str = "IOTEXT_CONFIG";

async fn try_main() -> Result<()> {
    logger::try_init()?;

    let options = Options::parse();
    let settings = load_settings(options.config.as_deref())?;

    match options.command {
        Command::Decode(cfg) => decode::run(cfg, &settings).await?,
        Command::Query(cfg) => query::run(cfg, &settings).await?,
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = try_main().await {
        eprintln!("{:?}", err);
        std::process::exit(1);
    }
}

#[derive(Parser)]
#[command(about = "Inspect IoT Hub telemetry and query IoT Hub and DPS resources.")]
struct Options {
    /// Config file. Defaults to $IOTEXT_CONFIG, then /etc/iotext/config.toml.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Decode captured telemetry messages.
    Decode(decode::Options),

    /// Run a paged query against an IoT Hub or a provisioning service.
    Query(query::Options),
}

/// Reads the config file and its patch directory.
///
/// An explicitly named file must exist. The default file is optional.
fn load_settings(config: Option<&Path>) -> Result<iotext_config::Settings> {
    let explicit = config
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from));

    let settings: iotext_config::Settings = if let Some(path) = explicit {
        let directory = path.with_file_name("config.d");
        iotext_config::read_config(&path, &directory)?
    } else {
        iotext_config::read_config_or_default(
            Path::new(iotext_config::DEFAULT_CONFIG_PATH),
            Path::new(iotext_config::DEFAULT_CONFIG_DIRECTORY_PATH),
        )?
    };

    settings.validate().context("invalid config")?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{load_settings, Command, Options};

    #[test]
    fn explicit_config_is_read_with_patches() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("config.toml");
        std::fs::write(&config, "[http]\ntimeout_secs = 10\n").unwrap();
        std::fs::create_dir(dir.path().join("config.d")).unwrap();
        std::fs::write(
            dir.path().join("config.d").join("10-retries.toml"),
            "[http]\nretries = 2\n",
        )
        .unwrap();

        let settings = load_settings(Some(&config)).unwrap();

        assert_eq!(10, settings.http.timeout_secs);
        assert_eq!(2, settings.http.retries);
    }

    #[test]
    fn explicit_config_must_exist() {
        let dir = tempfile::tempdir().unwrap();

        assert!(load_settings(Some(&dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn parse_query_command() {
        let options = Options::try_parse_from([
            "iotextctl",
            "query",
            "enrollment-groups",
            "--top",
            "5",
            "--config",
            "/tmp/iotext.toml",
        ])
        .unwrap();

        assert_eq!(Some(std::path::Path::new("/tmp/iotext.toml")), options.config.as_deref());
        assert!(matches!(options.command, Command::Query(_)));
    }

    #[test]
    fn central_flags_go_together() {
        assert!(Options::try_parse_from([
            "iotextctl",
            "decode",
            "--input",
            "messages.jsonl",
            "--central-app-id",
            "myapp",
        ])
        .is_err());
    }
}
