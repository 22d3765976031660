// Copyright (c) Microsoft. All rights reserved.

#[derive(Debug)]
pub enum Error {
    ConnectionString(&'static str),
    InvalidKey(Box<dyn std::error::Error + Send + Sync>),
    Sign(openssl::error::ErrorStack),
    TokenLifetime(chrono::OutOfRangeError),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::ConnectionString(reason) => write!(f, "malformed connection string: {}", reason),
            Error::InvalidKey(_) => f.write_str("shared access key is not valid base64"),
            Error::Sign(_) => f.write_str("could not sign shared access token"),
            Error::TokenLifetime(_) => f.write_str("token lifetime is out of range"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::ConnectionString(_) => None,
            Error::InvalidKey(err) => Some(&**err),
            Error::Sign(err) => Some(err),
            Error::TokenLifetime(err) => Some(err),
        }
    }
}

impl From<openssl::error::ErrorStack> for Error {
    fn from(err: openssl::error::ErrorStack) -> Self {
        Error::Sign(err)
    }
}
