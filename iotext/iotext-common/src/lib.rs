// Copyright (c) Microsoft. All rights reserved.

#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

mod error;
pub use error::Error;

mod sas;
pub use sas::SasToken;

mod target;
pub use target::Target;

/// Percent-encode set applied to SAS token resource URIs.
pub const ENCODE_SET: &percent_encoding::AsciiSet = &http_common::PATH_SEGMENT_ENCODE_SET.add(b'=');
