// Copyright (c) Microsoft. All rights reserved.

use std::io::{Error, ErrorKind};

use http_common::HttpRequest;

#[derive(Debug, serde::Deserialize)]
struct CentralError {
    error: CentralErrorDetail,
}

#[derive(Debug, serde::Deserialize)]
struct CentralErrorDetail {
    message: String,
}

impl std::convert::From<CentralError> for Error {
    fn from(err: CentralError) -> Error {
        Error::new(ErrorKind::Other, err.error.message)
    }
}

#[derive(Debug, serde::Deserialize)]
struct Device {
    #[serde(rename = "instanceOf")]
    instance_of: String,
}

/// Fetches device templates from an IoT Central application.
pub struct CentralTemplateProvider<C = http_common::CloudConnector> {
    endpoint: url::Url,
    api_token: String,
    connector: C,

    timeout: std::time::Duration,
    retries: u32,
}

impl CentralTemplateProvider {
    pub fn new(app_id: &str, api_token: &str) -> Result<Self, Error> {
        let endpoint = url::Url::parse(&format!("https://{}.azureiotcentral.com", app_id))
            .map_err(|err| Error::new(ErrorKind::InvalidInput, err))?;

        Ok(CentralTemplateProvider::with_connector(
            endpoint,
            api_token,
            http_common::cloud_connector()?,
        ))
    }
}

impl<C> CentralTemplateProvider<C>
where
    C: Clone + Send + Sync + hyper::client::connect::Connect + 'static,
{
    pub fn with_connector(endpoint: url::Url, api_token: &str, connector: C) -> Self {
        CentralTemplateProvider {
            endpoint,
            api_token: api_token.to_string(),
            connector,
            timeout: std::time::Duration::from_secs(30),
            retries: 0,
        }
    }

    /// Overrides the application URL, e.g. for a sovereign cloud.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: url::Url) -> Self {
        self.endpoint = endpoint;

        self
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

    async fn get_json<TResponse>(&self, segments: &[&str]) -> Result<TResponse, Error>
    where
        TResponse: serde::de::DeserializeOwned,
    {
        let mut uri = self.endpoint.clone();
        uri.path_segments_mut()
            .map_err(|()| {
                Error::new(ErrorKind::InvalidInput, "Central endpoint cannot be a base URL")
            })?
            .clear()
            .extend(segments);

        let mut request: HttpRequest<(), _> = HttpRequest::get(self.connector.clone(), uri.as_str())
            .with_retry(self.retries)
            .with_timeout(self.timeout);
        request.add_header(hyper::header::AUTHORIZATION, &self.api_token)?;

        let response = request.json_response().await?;
        response.parse_expect_ok::<TResponse, CentralError>()
    }
}

#[async_trait::async_trait]
impl<C> super::TemplateProvider for CentralTemplateProvider<C>
where
    C: Clone + Send + Sync + hyper::client::connect::Connect + 'static,
{
    async fn get_template_id(&self, device_id: &str) -> Result<String, Error> {
        let device: Device = self
            .get_json(&["api", "preview", "devices", device_id])
            .await?;

        Ok(device.instance_of)
    }

    async fn get_template(&self, template_id: &str) -> Result<serde_json::Value, Error> {
        self.get_json(&["api", "preview", "deviceTemplates", template_id])
            .await
    }
}
