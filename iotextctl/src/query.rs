// Copyright (c) Microsoft. All rights reserved.

use anyhow::{Context, Result};

use iotext_query::{execute_query, QueryResource, QuerySpecification, RestQueryClient};

#[derive(clap::Args)]
pub struct Options {
    #[arg(value_enum)]
    resource: Resource,

    /// Query text. Defaults to all devices, or all enrollments.
    #[arg(long, short = 'q')]
    query: Option<String>,

    /// Maximum number of records to return.
    #[arg(long)]
    top: Option<i64>,

    /// Overrides the connection string of the config file.
    #[arg(long, value_name = "CONNECTION_STRING")]
    connection_string: Option<String>,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum Resource {
    /// Device twins of the hub.
    Twins,

    /// Individual enrollments of the provisioning service.
    Enrollments,

    /// Enrollment groups of the provisioning service.
    EnrollmentGroups,
}

impl From<Resource> for QueryResource {
    fn from(resource: Resource) -> Self {
        match resource {
            Resource::Twins => QueryResource::Twins,
            Resource::Enrollments => QueryResource::Enrollments,
            Resource::EnrollmentGroups => QueryResource::EnrollmentGroups,
        }
    }
}

pub async fn run(options: Options, settings: &iotext_config::Settings) -> Result<()> {
    let resource: QueryResource = options.resource.into();

    let (section, resource_settings) = match resource {
        QueryResource::Twins => ("hub", &settings.hub),
        QueryResource::Enrollments | QueryResource::EnrollmentGroups => ("dps", &settings.dps),
    };

    let connection_string = options
        .connection_string
        .or_else(|| resource_settings.as_ref().map(|resource| resource.connection_string.clone()))
        .with_context(|| {
            format!(
                "no connection string; pass --connection-string or set [{}] connection_string",
                section
            )
        })?;

    let target: iotext_common::Target = connection_string
        .parse()
        .context("could not parse connection string")?;

    let client = RestQueryClient::new(target, resource)?
        .with_retry(settings.http.retries)
        .with_timeout(settings.http.timeout())
        .with_token_lifetime(std::time::Duration::from_secs(
            settings.monitor.token_duration_secs,
        ));

    let query = QuerySpecification::new(
        options
            .query
            .as_deref()
            .unwrap_or_else(|| resource.default_query()),
    );

    let records = execute_query(&query, &client, options.top).await?;
    log::info!("Query returned {} records", records.len());

    println!("{}", serde_json::to_string_pretty(&records)?);

    Ok(())
}
