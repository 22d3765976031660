// Copyright (c) Microsoft. All rights reserved.

use std::collections::BTreeMap;

use crate::{
    DecodeIssues, DecodedEvent, ErrorInjectionPolicy, EventProperties, InjectedError, NeverInject,
    Payload, Properties, PropertyValue, RawMessage,
};

/// Which property sections of a message are copied into the decoded event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PropertySections {
    pub system: bool,
    pub application: bool,
    pub annotations: bool,
}

impl PropertySections {
    #[must_use]
    pub fn all() -> Self {
        PropertySections {
            system: true,
            application: true,
            annotations: true,
        }
    }

    /// Parses a list of section names, such as the values of a `--properties` argument.
    pub fn from_names<I, S>(names: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut sections = PropertySections::default();

        for name in names {
            match name.as_ref().trim().to_ascii_lowercase().as_str() {
                "sys" | "system" => sections.system = true,
                "app" | "application" => sections.application = true,
                "anno" | "annotations" => sections.annotations = true,
                "all" => sections = PropertySections::all(),
                other => {
                    return Err(format!(
                        "unknown property section {:?}; expected one of sys, app, anno, all",
                        other
                    ))
                }
            }
        }

        Ok(sections)
    }
}

#[derive(Clone, Debug, Default)]
pub struct DecodeOptions {
    /// Whether the message is expected to carry a PnP interface name.
    pub pnp_context: bool,

    /// The interface name the message must declare when `pnp_context` is set.
    pub interface_name: Option<String>,

    pub properties: PropertySections,

    /// Takes priority over the message's own `content-type`.
    pub content_type: Option<String>,
}

/// Decodes messages one at a time, keeping the issues of the last decode until they are flushed.
///
/// Decoding never fails. Everything that goes wrong while decoding is recorded in
/// [`Decoder::issues`] and the returned event holds whatever could be recovered.
pub struct Decoder {
    issues: DecodeIssues,
    injection: Box<dyn ErrorInjectionPolicy + Send>,
}

impl Default for Decoder {
    fn default() -> Self {
        Decoder::new()
    }
}

impl Decoder {
    #[must_use]
    pub fn new() -> Self {
        Decoder {
            issues: DecodeIssues::default(),
            injection: Box::new(NeverInject),
        }
    }

    #[must_use]
    pub fn with_error_injection(mut self, policy: Box<dyn ErrorInjectionPolicy + Send>) -> Self {
        self.injection = policy;

        self
    }

    #[must_use]
    pub fn issues(&self) -> &DecodeIssues {
        &self.issues
    }

    /// Logs the issues of the last decode and clears them.
    pub fn flush_issues(&mut self) {
        self.issues.flush();
    }

    pub fn decode(&mut self, message: &dyn RawMessage, options: &DecodeOptions) -> DecodedEvent {
        self.issues.clear();

        let system_properties = match message.system_properties() {
            Ok(system_properties) => system_properties,
            Err(err) => {
                self.issues
                    .error(format!("Failed to parse system properties: {}", err));
                Properties::new()
            }
        };

        let origin = self.parse_origin(message);

        let mut event = DecodedEvent {
            origin,
            ..Default::default()
        };

        if !self.check_encoding(&system_properties) {
            return event;
        }

        event.module = message
            .annotations()
            .get(crate::MODULE_ID_ANNOTATION)
            .and_then(PropertyValue::as_text)
            .map(ToString::to_string);

        self.check_content_type(&system_properties, options);

        if options.pnp_context {
            event.interface = self.parse_interface_name(message, options, event.origin.as_deref());
        }

        let mut properties = EventProperties::default();

        if options.properties.annotations {
            properties.annotations =
                Some(self.convert_properties("annotation", message.annotations()));
        }

        if options.properties.system && !system_properties.is_empty() {
            properties.system =
                Some(self.convert_properties("system property", &system_properties));
        }

        if options.properties.application {
            properties.application = Some(self.convert_properties(
                "application property",
                message.application_properties(),
            ));
        }

        if !properties.is_empty() {
            event.properties = Some(properties);
        }

        event.payload = Some(self.parse_payload(message, event.origin.as_deref()));

        event
    }

    /// Decodes `message`, then checks the payload's telemetry names against the origin device's
    /// template.
    pub async fn decode_and_validate(
        &mut self,
        message: &dyn RawMessage,
        options: &DecodeOptions,
        templates: &mut dyn crate::template::TemplateLookup,
    ) -> DecodedEvent {
        let event = self.decode(message, options);
        self.validate_payload(&event, templates).await;
        event
    }

    async fn validate_payload(
        &mut self,
        event: &DecodedEvent,
        templates: &mut dyn crate::template::TemplateLookup,
    ) {
        let (device_id, payload) = match (&event.origin, &event.payload) {
            (Some(device_id), Some(Payload::Json(serde_json::Value::Object(payload)))) => {
                (device_id, payload)
            }
            _ => return,
        };

        let template = match templates.get_device_template(device_id).await {
            Ok(template) => template,
            Err(err) => {
                self.issues.error(format!(
                    "Unable to get device template for device '{}': {}",
                    device_id, err
                ));
                return;
            }
        };

        let allowed = template.telemetry_names();

        for name in payload.keys() {
            if !allowed.contains(name) {
                self.issues.error(format!(
                    "Telemetry item '{}' is not present in the device template of device '{}'. Allowed telemetry: [{}]",
                    name,
                    device_id,
                    allowed.iter().map(String::as_str).collect::<Vec<_>>().join(", "),
                ));
            }
        }
    }

    fn parse_origin(&mut self, message: &dyn RawMessage) -> Option<String> {
        match message.annotations().get(crate::DEVICE_ID_ANNOTATION) {
            Some(value) => {
                if let Some(device_id) = value.as_text() {
                    Some(device_id.to_string())
                } else {
                    self.issues.error(format!(
                        "Device id annotation '{}' is not text",
                        crate::DEVICE_ID_ANNOTATION
                    ));
                    None
                }
            }
            None => {
                self.issues.error(format!(
                    "Device id not found in message annotation '{}'",
                    crate::DEVICE_ID_ANNOTATION
                ));
                None
            }
        }
    }

    /// Returns false if the payload must not be parsed.
    fn check_encoding(&mut self, system_properties: &Properties) -> bool {
        let encoding = system_properties
            .get(crate::CONTENT_ENCODING_PROPERTY)
            .and_then(PropertyValue::as_text);

        match encoding {
            None => {
                self.issues.error(format!(
                    "No encoding found. Expected payload with encoding: {}",
                    crate::SUPPORTED_ENCODING
                ));
                false
            }

            Some(encoding) if !encoding.eq_ignore_ascii_case(crate::SUPPORTED_ENCODING) => {
                self.issues.error(format!(
                    "Unsupported encoding detected: '{}'. The currently supported encodings are: {}",
                    encoding,
                    crate::SUPPORTED_ENCODING
                ));
                false
            }

            Some(_) if self.injection.should_inject(InjectedError::Encoding) => {
                self.issues
                    .error("Unsupported encoding detected (simulated)".to_string());
                false
            }

            Some(_) => true,
        }
    }

    fn check_content_type(&mut self, system_properties: &Properties, options: &DecodeOptions) {
        let message_content_type = system_properties
            .get(crate::CONTENT_TYPE_PROPERTY)
            .and_then(PropertyValue::as_text);

        if let (Some(hint), Some(actual)) = (&options.content_type, message_content_type) {
            if !hint.eq_ignore_ascii_case(actual) {
                self.issues.info(format!(
                    "Treating message as '{}' instead of its declared content type '{}'",
                    hint, actual
                ));
            }
        }

        let content_type = options.content_type.as_deref().or(message_content_type);

        match content_type {
            Some(content_type)
                if content_type
                    .to_ascii_lowercase()
                    .contains(crate::SUPPORTED_CONTENT_TYPE) => {}

            Some(content_type) => self.issues.warn(format!(
                "Content type '{}' is not supported, expected '{}'. \
                 Custom headers and non-JSON content may be dropped.",
                content_type,
                crate::SUPPORTED_CONTENT_TYPE
            )),

            None => self.issues.warn(format!(
                "Content type not found in message, expected '{}'. \
                 Custom headers and non-JSON content may be dropped.",
                crate::SUPPORTED_CONTENT_TYPE
            )),
        }
    }

    fn parse_interface_name(
        &mut self,
        message: &dyn RawMessage,
        options: &DecodeOptions,
        device_id: Option<&str>,
    ) -> Option<String> {
        let device_id = device_id.unwrap_or("<unknown>");

        let interface_name = message
            .annotations()
            .get(crate::INTERFACE_NAME_ANNOTATION)
            .and_then(PropertyValue::as_text);

        let interface_name = if let Some(interface_name) = interface_name {
            interface_name
        } else {
            self.issues.error(format!(
                "Interface name not found in message annotation '{}' of device '{}'",
                crate::INTERFACE_NAME_ANNOTATION,
                device_id
            ));
            return None;
        };

        if let Some(expected) = &options.interface_name {
            if interface_name != expected {
                self.issues.error(format!(
                    "Interface name mismatch for device '{}'. Expected: '{}', actual: '{}'",
                    device_id, expected, interface_name
                ));
            } else if self.injection.should_inject(InjectedError::InterfaceName) {
                self.issues.error(format!(
                    "Interface name mismatch for device '{}' (simulated)",
                    device_id
                ));
            }
        }

        Some(interface_name.to_string())
    }

    fn convert_properties(
        &mut self,
        kind: &str,
        properties: &Properties,
    ) -> BTreeMap<String, serde_json::Value> {
        properties
            .iter()
            .map(|(name, value)| {
                let value = match value {
                    PropertyValue::Bool(value) => serde_json::Value::Bool(*value),
                    PropertyValue::Integer(value) => serde_json::Value::from(*value),
                    PropertyValue::Float(value) => serde_json::Value::from(*value),
                    PropertyValue::Text(value) => serde_json::Value::String(value.clone()),
                    PropertyValue::Binary { data } => match std::str::from_utf8(&data.0) {
                        Ok(text) => serde_json::Value::String(text.to_string()),
                        Err(_) => {
                            self.issues.warn(format!(
                                "Unable to decode {} '{}' as UTF-8; showing it as base64",
                                kind, name
                            ));
                            serde_json::to_value(data).unwrap_or(serde_json::Value::Null)
                        }
                    },
                };

                (name.clone(), value)
            })
            .collect()
    }

    fn parse_payload(&mut self, message: &dyn RawMessage, device_id: Option<&str>) -> Payload {
        let device_id = device_id.unwrap_or("<unknown>");

        let chunk = if let Some(chunk) = message.body().next() {
            chunk
        } else {
            self.issues
                .error(format!("Message from device '{}' has no body", device_id));
            return Payload::Invalid;
        };

        let text = match std::str::from_utf8(chunk) {
            Ok(text) => text,
            Err(err) => {
                self.issues.error(format!(
                    "Unable to decode payload of device '{}' as UTF-8: {}",
                    device_id, err
                ));
                return Payload::Invalid;
            }
        };

        if self.injection.should_inject(InjectedError::Payload) {
            self.issues.error(format!(
                "Invalid JSON format in payload of device '{}' (simulated)",
                device_id
            ));
            return Payload::Invalid;
        }

        match serde_json::from_str(&strip_line_breaks(text)) {
            Ok(payload) => Payload::Json(payload),
            Err(err) => {
                self.issues.error(format!(
                    "Invalid JSON format in payload of device '{}': {}",
                    device_id, err
                ));
                Payload::Invalid
            }
        }
    }
}

/// Removes carriage returns and line feeds, both raw and as the escape sequences `\r` and `\n`.
///
/// Escaped line breaks inside JSON string values are removed too, so a value of `"a\nb"` reads
/// back as `"ab"`.
///
/// The scan does not track escapes, so an escaped backslash followed by `n` or `r` loses its
/// second half as well: `"C:\\new"` becomes `"C:\ew"`, which is no longer valid JSON.
fn strip_line_breaks(text: &str) -> String {
    let mut stripped = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\r' | '\n' => (),
            '\\' if matches!(chars.peek(), Some('r' | 'n')) => {
                chars.next();
            }
            c => stripped.push(c),
        }
    }

    stripped
}
