// Copyright (c) Microsoft. All rights reserved.

#[derive(Debug)]
pub enum Error {
    /// The endpoint cannot be monitored. Not retried.
    EndpointDiscovery(String),
    Client(std::io::Error),
    Timeout(&'static str),
    InvalidTarget(iotext_common::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::EndpointDiscovery(message) => f.write_str(message),
            Error::Client(err) => write!(f, "AMQP transport error: {}", err),
            Error::Timeout(operation) => write!(f, "timed out waiting for {}", operation),
            Error::InvalidTarget(_) => {
                f.write_str("could not authenticate with the target's shared access key")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::EndpointDiscovery(_) | Error::Timeout(_) => None,
            Error::Client(err) => Some(err),
            Error::InvalidTarget(err) => Some(err),
        }
    }
}

impl From<iotext_common::Error> for Error {
    fn from(err: iotext_common::Error) -> Self {
        Error::InvalidTarget(err)
    }
}
