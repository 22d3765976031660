// Copyright (c) Microsoft. All rights reserved.

#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate
)]

//! A scripted HTTP server for tests of the cloud clients.
//!
//! Every request is recorded and answered by a caller-supplied handler.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: hyper::Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
}

impl RecordedRequest {
    async fn from_http(req: hyper::Request<hyper::Body>) -> Self {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let query = req.uri().query().map(ToString::to_string);

        let mut headers = HashMap::with_capacity(req.headers().len());
        for (key, value) in req.headers() {
            let value = value.to_str().expect("bad header value").to_string();
            headers.insert(key.to_string(), value);
        }

        let body = hyper::body::to_bytes(req.into_body())
            .await
            .expect("unable to get body")
            .to_vec();

        let body = if body.is_empty() {
            None
        } else {
            Some(String::from_utf8(body).expect("unable to parse body"))
        };

        RecordedRequest {
            method,
            path,
            query,
            headers,
            body,
        }
    }

    /// Header lookup; names are lowercase as hyper reports them.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn json_body(&self) -> Option<serde_json::Value> {
        self.body
            .as_deref()
            .map(|body| serde_json::from_str(body).expect("request body is not JSON"))
    }
}

#[derive(Clone, Debug)]
pub struct MockResponse {
    status: hyper::StatusCode,
    headers: Vec<(String, String)>,
    body: String,
}

impl MockResponse {
    pub fn json(status: u16, body: &impl serde::Serialize) -> Self {
        MockResponse {
            status: hyper::StatusCode::from_u16(status).expect("invalid status"),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: serde_json::to_string(body).expect("cannot fail to serialize response"),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));

        self
    }

    fn to_http(&self) -> hyper::Response<hyper::Body> {
        let mut response = hyper::Response::builder().status(self.status);

        for (name, value) in &self.headers {
            response = response.header(name.as_str(), value.as_str());
        }

        response
            .body(hyper::Body::from(self.body.clone()))
            .expect("cannot fail to build response")
    }
}

type Handler = dyn Fn(&RecordedRequest) -> MockResponse + Send + Sync;

/// A server bound to an ephemeral localhost port. It stops when the test runtime shuts down.
pub struct MockServer {
    address: std::net::SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockServer {
    pub async fn start<F>(handler: F) -> Self
    where
        F: Fn(&RecordedRequest) -> MockResponse + Send + Sync + 'static,
    {
        let handler: Arc<Handler> = Arc::new(handler);
        let requests = Arc::new(Mutex::new(Vec::new()));

        let service_requests = requests.clone();
        let make_service = hyper::service::make_service_fn(move |_| {
            let handler = handler.clone();
            let requests = service_requests.clone();

            async move {
                Ok::<_, std::convert::Infallible>(hyper::service::service_fn(
                    move |req: hyper::Request<hyper::Body>| {
                        let handler = handler.clone();
                        let requests = requests.clone();

                        async move {
                            let request = RecordedRequest::from_http(req).await;
                            let response = handler(&request);
                            requests.lock().expect("poisoned").push(request);

                            Ok::<_, std::convert::Infallible>(response.to_http())
                        }
                    },
                ))
            }
        });

        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("cannot bind mock server");
        let address = listener.local_addr().expect("no local address");
        let server = hyper::Server::from_tcp(listener)
            .expect("cannot start mock server")
            .serve(make_service);

        tokio::spawn(async move {
            let _ = server.await;
        });

        MockServer { address, requests }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.address)
    }

    /// Requests received so far, in arrival order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().expect("poisoned").clone()
    }
}
