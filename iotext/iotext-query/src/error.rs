// Copyright (c) Microsoft. All rights reserved.

#[derive(Debug)]
pub enum Error {
    InvalidArgument(&'static str, String),

    /// The service returned an empty page together with a continuation token.
    EmptyPage,

    Client(std::io::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidArgument(name, reason) => {
                write!(f, "invalid value for {}: {}", name, reason)
            }
            Error::EmptyPage => {
                f.write_str("query returned an empty page with a continuation token")
            }
            Error::Client(err) => write!(f, "query failed: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InvalidArgument(_, _) | Error::EmptyPage => None,
            Error::Client(err) => Some(err),
        }
    }
}
