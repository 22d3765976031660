// Copyright (c) Microsoft. All rights reserved.

use std::io::{Error, ErrorKind};

const JSON_MEDIA_TYPE: &str = "application/json";

/// Pause before a failed request is sent again.
const RETRY_DELAY: std::time::Duration = std::time::Duration::from_secs(3);

/// A JSON request to a cloud endpoint, sent with a per-attempt timeout and a fixed number
/// of retries.
pub struct HttpRequest<TBody, TConnector> {
    connector: TConnector,
    method: hyper::Method,
    uri: String,
    headers: http::HeaderMap,
    body: Option<TBody>,

    timeout: std::time::Duration,
    retries: u32,
}

impl<TBody, TConnector> HttpRequest<TBody, TConnector>
where
    TBody: serde::Serialize,
    TConnector: Clone + Send + Sync + hyper::client::connect::Connect + 'static,
{
    fn new(connector: TConnector, method: hyper::Method, uri: &str, body: Option<TBody>) -> Self {
        HttpRequest {
            connector,
            method,
            uri: uri.to_string(),
            headers: http::HeaderMap::new(),
            body,
            timeout: std::time::Duration::from_secs(30),
            retries: 0,
        }
    }

    #[must_use]
    pub fn get(connector: TConnector, uri: &str) -> Self {
        HttpRequest::new(connector, hyper::Method::GET, uri, None)
    }

    #[must_use]
    pub fn post(connector: TConnector, uri: &str, body: Option<TBody>) -> Self {
        HttpRequest::new(connector, hyper::Method::POST, uri, body)
    }

    /// Number of additional attempts after a failed one. Error statuses are not failures.
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

    pub fn add_header(
        &mut self,
        name: hyper::header::HeaderName,
        value: &str,
    ) -> Result<(), Error> {
        let value = value
            .parse()
            .map_err(|err| Error::new(ErrorKind::InvalidInput, err))?;
        self.headers.insert(name, value);

        Ok(())
    }

    /// Copies every header of `headers` onto this request, replacing existing values of the
    /// same name.
    pub fn extend_headers(&mut self, headers: &http::HeaderMap) {
        for (name, value) in headers {
            self.headers.insert(name.clone(), value.clone());
        }
    }

    /// Sends the request and checks that the service answered with a JSON document.
    pub async fn json_response(self) -> Result<HttpResponse, Error> {
        let response = self.send().await?;

        let media_type = match response.headers.get(hyper::header::CONTENT_TYPE) {
            Some(value) => value
                .to_str()
                .map_err(|err| Error::new(ErrorKind::InvalidData, err))?,
            None => "",
        };

        if !media_type.contains(JSON_MEDIA_TYPE) {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!(
                    "expected a JSON response, got Content-Type {:?} (HTTP status {})",
                    media_type, response.status
                ),
            ));
        }

        Ok(response)
    }

    fn encode_body(&self) -> hyper::Body {
        match &self.body {
            Some(body) => serde_json::to_vec(body)
                .expect("cannot fail to serialize request")
                .into(),
            None => hyper::Body::empty(),
        }
    }

    fn build(&self) -> Result<hyper::Request<hyper::Body>, Error> {
        let mut builder = hyper::Request::builder()
            .method(self.method.clone())
            .uri(&self.uri);

        if self.body.is_some() {
            builder = builder.header(hyper::header::CONTENT_TYPE, JSON_MEDIA_TYPE);
        }

        if let Some(headers) = builder.headers_mut() {
            headers.extend(self.headers.clone());
        }

        builder
            .body(self.encode_body())
            .map_err(|err| Error::new(ErrorKind::InvalidInput, err))
    }

    async fn send(self) -> Result<HttpResponse, Error> {
        let client: hyper::Client<TConnector, hyper::Body> =
            hyper::Client::builder().build(self.connector.clone());

        let attempts = self.retries + 1;
        let mut attempt = 1;

        loop {
            let request = self.build()?;
            log::debug!("{} {}", self.method, self.uri);

            let err = match tokio::time::timeout(self.timeout, receive(&client, request)).await {
                Ok(Ok(response)) => {
                    log::debug!("{} {} -> {}", self.method, self.uri, response.status);
                    return Ok(response);
                }
                Ok(Err(err)) => err,
                Err(elapsed) => Error::new(ErrorKind::TimedOut, elapsed),
            };

            log::warn!(
                "{} {} failed (attempt {} of {}): {}",
                self.method,
                self.uri,
                attempt,
                attempts,
                err
            );

            if attempt >= attempts {
                return Err(err);
            }

            tokio::time::sleep(RETRY_DELAY).await;
            attempt += 1;
        }
    }
}

/// One round-trip. The body is collected here so that the caller's timeout covers it.
async fn receive<TConnector>(
    client: &hyper::Client<TConnector, hyper::Body>,
    request: hyper::Request<hyper::Body>,
) -> Result<HttpResponse, Error>
where
    TConnector: Clone + Send + Sync + hyper::client::connect::Connect + 'static,
{
    let response = client.request(request).await.map_err(|err| {
        let kind = if err.is_connect() {
            ErrorKind::NotConnected
        } else {
            ErrorKind::Other
        };
        Error::new(kind, err)
    })?;

    let (parts, body) = response.into_parts();
    let body = hyper::body::to_bytes(body)
        .await
        .map_err(|err| Error::new(ErrorKind::Other, err))?;

    Ok(HttpResponse {
        status: parts.status,
        headers: parts.headers,
        body,
    })
}

#[derive(Debug)]
pub struct HttpResponse {
    status: hyper::StatusCode,
    headers: http::HeaderMap,
    body: hyper::body::Bytes,
}

impl HttpResponse {
    #[must_use]
    pub fn status(&self) -> hyper::StatusCode {
        self.status
    }

    /// Value of a response header. Headers that are not valid visible ASCII are treated as absent.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn parse_expect_ok<TResponse, TError>(self) -> Result<TResponse, Error>
    where
        TResponse: serde::de::DeserializeOwned,
        TError: serde::de::DeserializeOwned + Into<Error>,
    {
        self.parse::<TResponse, TError>(&[hyper::StatusCode::OK])
    }

    /// Deserializes the body as `TResponse` for an expected status and as `TError` for an
    /// error status.
    pub fn parse<TResponse, TError>(
        self,
        expected: &[hyper::StatusCode],
    ) -> Result<TResponse, Error>
    where
        TResponse: serde::de::DeserializeOwned,
        TError: serde::de::DeserializeOwned + Into<Error>,
    {
        let invalid_data = |err: serde_json::Error| Error::new(ErrorKind::InvalidData, err);

        if expected.contains(&self.status) {
            serde_json::from_slice(&self.body).map_err(invalid_data)
        } else if self.status.is_client_error() || self.status.is_server_error() {
            let error: TError = serde_json::from_slice(&self.body).map_err(invalid_data)?;
            Err(error.into())
        } else {
            Err(Error::new(
                ErrorKind::Other,
                format!("expected one of {:?}, got HTTP status {}", expected, self.status),
            ))
        }
    }
}
