// Copyright (c) Microsoft. All rights reserved.

use std::collections::BTreeMap;

/// The value of a system, annotation or application property of a message.
///
/// The serde form is untagged so that captured messages read naturally as JSON.
/// Binary values are written as `{"$binary": "<base64>"}`.
#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Binary {
        #[serde(rename = "$binary")]
        data: http_common::ByteString,
    },
}

impl PropertyValue {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(value) => Some(value),
            PropertyValue::Binary { data } => std::str::from_utf8(&data.0).ok(),
            _ => None,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_string())
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Integer(value)
    }
}

impl From<Vec<u8>> for PropertyValue {
    fn from(value: Vec<u8>) -> Self {
        PropertyValue::Binary {
            data: http_common::ByteString(value),
        }
    }
}

pub type Properties = BTreeMap<String, PropertyValue>;

#[derive(Debug)]
pub struct PropertyError(pub String);

impl std::fmt::Display for PropertyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for PropertyError {}

/// One message received from an event stream.
///
/// Implemented by adapters over the transport client's message type.
pub trait RawMessage {
    /// Transport-level properties such as `content-type` and `content-encoding`.
    fn system_properties(&self) -> Result<Properties, PropertyError>;

    /// Message annotations, e.g. the origin device id.
    fn annotations(&self) -> &Properties;

    /// Free-form properties set by the sender.
    fn application_properties(&self) -> &Properties;

    /// The body, as the sequence of data sections the transport received.
    fn body(&self) -> Box<dyn Iterator<Item = &[u8]> + '_>;
}

/// A message captured to a file, one JSON document per line.
#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct CapturedMessage {
    #[serde(default)]
    pub system: Properties,

    #[serde(default)]
    pub annotations: Properties,

    #[serde(default)]
    pub application: Properties,

    #[serde(default)]
    pub body: Vec<http_common::ByteString>,
}

impl CapturedMessage {
    /// A UTF-8 JSON message from `device_id` with the given body text.
    #[must_use]
    pub fn json(device_id: &str, body: &str) -> Self {
        CapturedMessage::default()
            .with_system(crate::CONTENT_ENCODING_PROPERTY, "utf-8")
            .with_system(crate::CONTENT_TYPE_PROPERTY, crate::SUPPORTED_CONTENT_TYPE)
            .with_annotation(crate::DEVICE_ID_ANNOTATION, device_id)
            .with_body(body.as_bytes())
    }

    #[must_use]
    pub fn with_system(mut self, name: &str, value: impl Into<PropertyValue>) -> Self {
        self.system.insert(name.to_string(), value.into());
        self
    }

    #[must_use]
    pub fn without_system(mut self, name: &str) -> Self {
        self.system.remove(name);
        self
    }

    #[must_use]
    pub fn with_annotation(mut self, name: &str, value: impl Into<PropertyValue>) -> Self {
        self.annotations.insert(name.to_string(), value.into());
        self
    }

    #[must_use]
    pub fn with_application(mut self, name: &str, value: impl Into<PropertyValue>) -> Self {
        self.application.insert(name.to_string(), value.into());
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: &[u8]) -> Self {
        self.body = vec![http_common::ByteString(body.to_vec())];
        self
    }
}

impl RawMessage for CapturedMessage {
    fn system_properties(&self) -> Result<Properties, PropertyError> {
        Ok(self.system.clone())
    }

    fn annotations(&self) -> &Properties {
        &self.annotations
    }

    fn application_properties(&self) -> &Properties {
        &self.application
    }

    fn body(&self) -> Box<dyn Iterator<Item = &[u8]> + '_> {
        Box::new(self.body.iter().map(|chunk| &chunk.0[..]))
    }
}
