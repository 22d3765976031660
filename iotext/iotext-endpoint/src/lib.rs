// Copyright (c) Microsoft. All rights reserved.

#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

//! Discovers the event hub-compatible endpoint behind an IoT Hub.
//!
//! The hub answers the first receive handshake on its built-in events address with a
//! link redirect. The redirect names the real hostname and path, which are then queried
//! for partition metadata.

mod error;
pub use error::Error;

mod resolver;
pub use resolver::{Credential, EndpointResolver, EndpointTarget};

mod transport;
pub use transport::{
    AmqpTransport, HandshakeOutcome, HandshakeRequest, ManagementRequest, PartitionMetadata,
};

/// Path of the built-in telemetry endpoint of a hub.
pub const EVENTS_PATH: &str = "messages/events";

pub const MANAGEMENT_OPERATION_READ: &str = "READ";
pub const EVENTHUB_ENTITY_TYPE: &str = "com.microsoft:eventhub";
