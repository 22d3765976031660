// Copyright (c) Microsoft. All rights reserved.

use std::io::{Error, ErrorKind};

use http_common::HttpRequest;

use crate::{QueryPage, QuerySpecification, QueryTransport};

const HUB_API_VERSION: &str = "api-version=2021-04-12";
const DPS_API_VERSION: &str = "api-version=2021-10-01";

#[derive(Debug, serde::Deserialize)]
struct ServiceError {
    #[serde(alias = "Message")]
    message: String,
}

impl std::convert::From<ServiceError> for Error {
    fn from(err: ServiceError) -> Error {
        Error::new(ErrorKind::Other, err.message)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryResource {
    /// Device twins of an IoT Hub.
    Twins,

    /// Individual enrollments of a provisioning service.
    Enrollments,

    /// Enrollment groups of a provisioning service.
    EnrollmentGroups,
}

impl QueryResource {
    fn path_and_query(self) -> String {
        match self {
            QueryResource::Twins => format!("devices/query?{}", HUB_API_VERSION),
            QueryResource::Enrollments => format!("enrollments/query?{}", DPS_API_VERSION),
            QueryResource::EnrollmentGroups => {
                format!("enrollmentGroups/query?{}", DPS_API_VERSION)
            }
        }
    }

    /// Query text used when the caller does not supply one.
    #[must_use]
    pub fn default_query(self) -> &'static str {
        match self {
            QueryResource::Twins => "SELECT * FROM devices",
            QueryResource::Enrollments | QueryResource::EnrollmentGroups => "*",
        }
    }
}

/// Runs queries against the REST API of an IoT Hub or a provisioning service,
/// authenticating with a shared access signature of `target`.
pub struct RestQueryClient<C = http_common::CloudConnector> {
    endpoint: String,
    target: iotext_common::Target,
    resource: QueryResource,
    connector: C,

    token_lifetime: std::time::Duration,
    timeout: std::time::Duration,
    retries: u32,
}

impl RestQueryClient {
    pub fn new(target: iotext_common::Target, resource: QueryResource) -> Result<Self, Error> {
        let endpoint = format!("https://{}", target.entity);

        Ok(RestQueryClient::with_connector(
            &endpoint,
            target,
            resource,
            http_common::cloud_connector()?,
        ))
    }
}

impl<C> RestQueryClient<C>
where
    C: Clone + Send + Sync + hyper::client::connect::Connect + 'static,
{
    pub fn with_connector(
        endpoint: &str,
        target: iotext_common::Target,
        resource: QueryResource,
        connector: C,
    ) -> Self {
        RestQueryClient {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            target,
            resource,
            connector,
            token_lifetime: std::time::Duration::from_secs(3600),
            timeout: std::time::Duration::from_secs(30),
            retries: 0,
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retries: u32) -> Self {
        self.retries = retries;

        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.timeout = timeout;

        self
    }

    #[must_use]
    pub fn with_token_lifetime(mut self, lifetime: std::time::Duration) -> Self {
        self.token_lifetime = lifetime;

        self
    }
}

#[async_trait::async_trait]
impl<C> QueryTransport for RestQueryClient<C>
where
    C: Clone + Send + Sync + hyper::client::connect::Connect + 'static,
{
    async fn query(
        &self,
        query: &QuerySpecification,
        headers: &http::HeaderMap,
    ) -> Result<QueryPage, Error> {
        let uri = format!("{}/{}", self.endpoint, self.resource.path_and_query());

        let token = self
            .target
            .sas_token(self.token_lifetime)
            .map_err(|err| Error::new(ErrorKind::InvalidInput, err))?;

        let mut request = HttpRequest::post(self.connector.clone(), &uri, Some(query))
            .with_retry(self.retries)
            .with_timeout(self.timeout);
        request.add_header(hyper::header::AUTHORIZATION, token.as_str())?;
        request.extend_headers(headers);

        let response = request.json_response().await?;
        let continuation = response
            .header(crate::CONTINUATION_HEADER)
            .map(ToString::to_string);

        let records = response.parse_expect_ok::<Vec<serde_json::Value>, ServiceError>()?;

        Ok(QueryPage {
            records,
            continuation,
        })
    }
}
