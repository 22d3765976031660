// Copyright (c) Microsoft. All rights reserved.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use iotext_events::monitor::Monitor;
use iotext_events::template::{CentralTemplateProvider, DeviceTemplateCache};
use iotext_events::{
    CapturedMessage, DecodeOptions, Decoder, InjectedError, PropertySections, SeededInjection,
};

/// Chance of each injected error class per message under `--inject-errors`.
const INJECTION_PROBABILITY: f64 = 0.2;

/// Encoding errors hide the whole payload.
const ENCODING_INJECTION_PROBABILITY: f64 = 0.05;

#[derive(clap::Args)]
pub struct Options {
    /// JSON lines file of captured messages, or '-' for stdin.
    #[arg(long, short = 'i', value_name = "FILE")]
    input: PathBuf,

    /// Property sections to include: sys, app, anno, or all.
    #[arg(long, short = 'p', value_delimiter = ',')]
    properties: Vec<String>,

    /// Content type to assume instead of the message's own.
    #[arg(long)]
    content_type: Option<String>,

    /// Interface name every message must declare.
    #[arg(long)]
    interface: Option<String>,

    /// Only decode messages sent by this device.
    #[arg(long, short = 'd')]
    device_id: Option<String>,

    /// IoT Central application whose device templates validate the payloads.
    #[arg(long, requires = "central_token")]
    central_app_id: Option<String>,

    /// API token of the IoT Central application.
    #[arg(long, requires = "central_app_id")]
    central_token: Option<String>,

    /// Randomly corrupt decoding, seeded with SEED, to exercise issue reporting.
    #[arg(long, value_name = "SEED")]
    inject_errors: Option<u64>,
}

pub async fn run(options: Options, settings: &iotext_config::Settings) -> Result<()> {
    let messages = read_messages(&options.input)?;

    let decode_options = decode_options(&options, &settings.monitor)?;

    let mut decoder = Decoder::new();
    if let Some(seed) = options.inject_errors {
        log::warn!("Injecting decode errors with seed {}", seed);
        let policy = SeededInjection::new(seed, INJECTION_PROBABILITY)
            .with_probability(InjectedError::Encoding, ENCODING_INJECTION_PROBABILITY);
        decoder = decoder.with_error_injection(Box::new(policy));
    }

    let mut monitor = Monitor::new(decoder, decode_options);

    if let Some(device_id) = &options.device_id {
        monitor = monitor.with_device_filter(device_id);
    }

    if let Some(provider) = template_provider(&options, settings)? {
        monitor = monitor.with_templates(Box::new(DeviceTemplateCache::new(provider)));
    }

    let count = monitor
        .run(futures_util::stream::iter(messages), |event| {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{}", line),
                Err(err) => log::error!("Could not serialize decoded event: {}", err),
            }
        })
        .await;

    log::info!("Decoded {} messages", count);

    Ok(())
}

fn read_messages(input: &Path) -> Result<Vec<CapturedMessage>> {
    let contents = if input == Path::new("-") {
        std::io::read_to_string(std::io::stdin()).context("could not read stdin")?
    } else {
        std::fs::read_to_string(input)
            .with_context(|| format!("could not read {}", input.display()))?
    };

    parse_messages(&contents)
}

fn parse_messages(contents: &str) -> Result<Vec<CapturedMessage>> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("line {} is not a captured message", index + 1))
        })
        .collect()
}

/// Command-line values take priority over the `[monitor]` section of the config.
fn decode_options(
    options: &Options,
    settings: &iotext_config::MonitorSettings,
) -> Result<DecodeOptions> {
    let properties = if options.properties.is_empty() {
        &settings.properties
    } else {
        &options.properties
    };

    let properties = PropertySections::from_names(properties).map_err(anyhow::Error::msg)?;

    let interface_name = options
        .interface
        .clone()
        .or_else(|| settings.interface.clone());

    Ok(DecodeOptions {
        pnp_context: interface_name.is_some(),
        interface_name,
        properties,
        content_type: options
            .content_type
            .clone()
            .or_else(|| settings.content_type.clone()),
    })
}

fn template_provider(
    options: &Options,
    settings: &iotext_config::Settings,
) -> Result<Option<CentralTemplateProvider>> {
    let (app_id, api_token, endpoint) = match (&options.central_app_id, &options.central_token) {
        (Some(app_id), Some(api_token)) => (app_id.as_str(), api_token.as_str(), None),
        _ => match &settings.central {
            Some(central) => (
                central.app_id.as_str(),
                central.api_token.as_str(),
                central.endpoint.as_deref(),
            ),
            None => return Ok(None),
        },
    };

    let mut provider = CentralTemplateProvider::new(app_id, api_token)?
        .with_retry(settings.http.retries)
        .with_timeout(settings.http.timeout());

    if let Some(endpoint) = endpoint {
        let endpoint = url::Url::parse(endpoint).context("invalid central.endpoint")?;
        provider = provider.with_endpoint(endpoint);
    }

    Ok(Some(provider))
}
