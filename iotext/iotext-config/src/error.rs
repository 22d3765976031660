// Copyright (c) Microsoft. All rights reserved.

#[derive(Debug)]
pub enum Error {
    ReadConfig(
        Option<std::path::PathBuf>,
        Box<dyn std::error::Error + Send + Sync>,
    ),
    InvalidValue {
        key: &'static str,
        reason: String,
    },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::ReadConfig(Some(path), _) => {
                write!(f, "could not read config from {}", path.display())
            }
            Error::ReadConfig(None, _) => f.write_str("could not read config"),
            Error::InvalidValue { key, reason } => {
                write!(f, "config key {:?} has an invalid value: {}", key, reason)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::ReadConfig(_, err) => Some(&**err),
            Error::InvalidValue { .. } => None,
        }
    }
}
