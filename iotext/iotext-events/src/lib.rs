// Copyright (c) Microsoft. All rights reserved.

#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::too_many_lines
)]

mod decoder;
pub use decoder::{DecodeOptions, Decoder, PropertySections};

mod event;
pub use event::{DecodedEvent, EventProperties, Payload};

mod inject;
pub use inject::{ErrorInjectionPolicy, InjectedError, NeverInject, SeededInjection};

mod issues;
pub use issues::DecodeIssues;

mod message;
pub use message::{CapturedMessage, Properties, PropertyError, PropertyValue, RawMessage};

pub mod monitor;

pub mod template;

/// Annotation carrying the id of the device that sent the message.
pub const DEVICE_ID_ANNOTATION: &str = "iothub-connection-device-id";

/// Annotation carrying the id of the module that sent the message, if any.
pub const MODULE_ID_ANNOTATION: &str = "iothub-connection-module-id";

/// Annotation carrying the PnP interface the telemetry belongs to.
pub const INTERFACE_NAME_ANNOTATION: &str = "iothub-interface-name";

pub const CONTENT_ENCODING_PROPERTY: &str = "content-encoding";
pub const CONTENT_TYPE_PROPERTY: &str = "content-type";

pub const SUPPORTED_ENCODING: &str = "utf-8";
pub const SUPPORTED_CONTENT_TYPE: &str = "application/json";
