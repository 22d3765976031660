// Copyright (c) Microsoft. All rights reserved.

use std::collections::BTreeMap;

/// The decoded form of one message, ready for display.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct DecodedEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub interface: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<EventProperties>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Payload>,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct EventProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<BTreeMap<String, serde_json::Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub application: Option<BTreeMap<String, serde_json::Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, serde_json::Value>>,
}

impl EventProperties {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.system.is_none() && self.application.is_none() && self.annotations.is_none()
    }
}

/// The message body.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    Json(serde_json::Value),

    /// The body could not be read as UTF-8 JSON. Serialized as an empty string.
    Invalid,
}

impl Payload {
    #[must_use]
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Payload::Json(value) => Some(value),
            Payload::Invalid => None,
        }
    }
}

impl serde::Serialize for Payload {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Payload::Json(value) => value.serialize(serializer),
            Payload::Invalid => serializer.serialize_str(""),
        }
    }
}
