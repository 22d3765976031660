// Copyright (c) Microsoft. All rights reserved.

//! Device templates: the telemetry a device of a given model may send.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::{Error, ErrorKind};
use std::sync::Arc;

mod central;
pub use central::CentralTemplateProvider;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Template {
    pub id: String,

    /// Telemetry names, keyed by the interface or component that declares them.
    /// Telemetry declared directly on the model is keyed by the empty string.
    pub telemetry: BTreeMap<String, BTreeSet<String>>,
}

impl Template {
    /// Reads the telemetry declarations of a device template document.
    ///
    /// Both the `capabilityModel.implements[].schema.contents[]` layout and the flat
    /// `capabilityModel.contents[]` layout are understood.
    pub fn from_json(id: &str, document: &serde_json::Value) -> Result<Self, Error> {
        let capability_model = document.get("capabilityModel").ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidData,
                format!("device template '{}' has no capabilityModel", id),
            )
        })?;

        let mut telemetry = BTreeMap::new();

        if let Some(contents) = capability_model
            .get("contents")
            .and_then(serde_json::Value::as_array)
        {
            let names = telemetry_names(contents);
            if !names.is_empty() {
                telemetry.insert(String::new(), names);
            }

            for component in contents.iter().filter(|entry| has_type(entry, "Component")) {
                if let (Some(name), Some(contents)) = (
                    component.get("name").and_then(serde_json::Value::as_str),
                    component
                        .pointer("/schema/contents")
                        .and_then(serde_json::Value::as_array),
                ) {
                    telemetry.insert(name.to_string(), telemetry_names(contents));
                }
            }
        }

        if let Some(interfaces) = capability_model
            .get("implements")
            .and_then(serde_json::Value::as_array)
        {
            for interface in interfaces {
                let name = interface
                    .get("name")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or_default();
                let contents = interface
                    .pointer("/schema/contents")
                    .and_then(serde_json::Value::as_array);

                if let Some(contents) = contents {
                    telemetry
                        .entry(name.to_string())
                        .or_insert_with(BTreeSet::new)
                        .extend(telemetry_names(contents));
                }
            }
        }

        Ok(Template {
            id: id.to_string(),
            telemetry,
        })
    }

    /// Every telemetry name the template declares, across all interfaces.
    #[must_use]
    pub fn telemetry_names(&self) -> BTreeSet<String> {
        self.telemetry.values().flatten().cloned().collect()
    }
}

fn has_type(entry: &serde_json::Value, expected: &str) -> bool {
    match entry.get("@type") {
        Some(serde_json::Value::String(value)) => value == expected,
        Some(serde_json::Value::Array(values)) => values
            .iter()
            .any(|value| value.as_str() == Some(expected)),
        _ => false,
    }
}

fn telemetry_names(contents: &[serde_json::Value]) -> BTreeSet<String> {
    contents
        .iter()
        .filter(|entry| has_type(entry, "Telemetry"))
        .filter_map(|entry| entry.get("name").and_then(serde_json::Value::as_str))
        .map(ToString::to_string)
        .collect()
}

/// Remote source of device templates.
#[async_trait::async_trait]
pub trait TemplateProvider: Send + Sync {
    /// The id of the template the device is an instance of.
    async fn get_template_id(&self, device_id: &str) -> Result<String, Error>;

    async fn get_template(&self, template_id: &str) -> Result<serde_json::Value, Error>;
}

/// What the decoder needs to validate telemetry.
#[async_trait::async_trait]
pub trait TemplateLookup: Send {
    async fn get_device_template(&mut self, device_id: &str) -> Result<Arc<Template>, Error>;
}

/// Memoizes a [`TemplateProvider`] by device id and by template id.
///
/// Entries are never evicted, which is fine for one monitoring session.
pub struct DeviceTemplateCache<P> {
    provider: P,
    devices: HashMap<String, String>,
    templates: HashMap<String, Arc<Template>>,
}

impl<P> DeviceTemplateCache<P>
where
    P: TemplateProvider,
{
    pub fn new(provider: P) -> Self {
        DeviceTemplateCache {
            provider,
            devices: HashMap::new(),
            templates: HashMap::new(),
        }
    }

    pub async fn get_template_by_id(&mut self, template_id: &str) -> Result<Arc<Template>, Error> {
        if let Some(template) = self.templates.get(template_id) {
            return Ok(template.clone());
        }

        let document = self.provider.get_template(template_id).await?;
        let template = Arc::new(Template::from_json(template_id, &document)?);
        log::debug!("Cached device template '{}'", template_id);

        self.templates
            .insert(template_id.to_string(), template.clone());

        Ok(template)
    }
}

#[async_trait::async_trait]
impl<P> TemplateLookup for DeviceTemplateCache<P>
where
    P: TemplateProvider,
{
    async fn get_device_template(&mut self, device_id: &str) -> Result<Arc<Template>, Error> {
        let template_id = if let Some(template_id) = self.devices.get(device_id) {
            template_id.clone()
        } else {
            let template_id = self.provider.get_template_id(device_id).await?;
            self.devices
                .insert(device_id.to_string(), template_id.clone());
            template_id
        };

        self.get_template_by_id(&template_id).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::{DeviceTemplateCache, Template, TemplateLookup, TemplateProvider};
    use crate::{CapturedMessage, DecodeOptions, Decoder};

    fn sensor_template() -> serde_json::Value {
        serde_json::json!({
            "id": "urn:sensor:1",
            "capabilityModel": {
                "implements": [{
                    "name": "environmentalSensor",
                    "schema": {
                        "contents": [
                            { "@type": "Telemetry", "name": "temp" },
                            { "@type": ["Telemetry", "SemanticType/Humidity"], "name": "humidity" },
                            { "@type": "Property", "name": "state" }
                        ]
                    }
                }]
            }
        })
    }

    #[derive(Default)]
    struct Provider {
        device_calls: AtomicUsize,
        template_calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl TemplateProvider for Provider {
        async fn get_template_id(&self, device_id: &str) -> Result<String, std::io::Error> {
            self.device_calls.fetch_add(1, Ordering::SeqCst);

            match device_id {
                "missing" => Err(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "device not found",
                )),
                "broken" => Ok("urn:broken:1".to_string()),
                _ => Ok("urn:sensor:1".to_string()),
            }
        }

        async fn get_template(
            &self,
            template_id: &str,
        ) -> Result<serde_json::Value, std::io::Error> {
            self.template_calls.fetch_add(1, Ordering::SeqCst);

            if template_id == "urn:broken:1" {
                Ok(serde_json::json!({ "id": template_id }))
            } else {
                Ok(sensor_template())
            }
        }
    }

    #[test]
    fn parse_implements_layout() {
        let template = Template::from_json("urn:sensor:1", &sensor_template()).unwrap();

        assert_eq!(
            vec!["humidity", "temp"],
            template.telemetry_names().into_iter().collect::<Vec<_>>()
        );
        assert!(template.telemetry.contains_key("environmentalSensor"));
    }

    #[test]
    fn parse_contents_layout() {
        let document = serde_json::json!({
            "capabilityModel": {
                "contents": [
                    { "@type": "Telemetry", "name": "battery" },
                    { "@type": "Command", "name": "reboot" },
                    {
                        "@type": "Component",
                        "name": "thermostat",
                        "schema": { "contents": [{ "@type": "Telemetry", "name": "setpoint" }] }
                    }
                ]
            }
        });

        let template = Template::from_json("dtmi:x;1", &document).unwrap();
        assert_eq!(
            vec!["battery", "setpoint"],
            template.telemetry_names().into_iter().collect::<Vec<_>>()
        );
        assert!(template.telemetry["thermostat"].contains("setpoint"));
    }

    #[test]
    fn parse_requires_capability_model() {
        let err = Template::from_json("t", &serde_json::json!({})).unwrap_err();
        assert_eq!(std::io::ErrorKind::InvalidData, err.kind());
    }

    #[tokio::test]
    async fn cache_memoizes_devices_and_templates() {
        let mut cache = DeviceTemplateCache::new(Provider::default());

        let first = cache.get_device_template("dev1").await.unwrap();
        let again = cache.get_device_template("dev1").await.unwrap();
        let other = cache.get_device_template("dev2").await.unwrap();

        assert!(std::sync::Arc::ptr_eq(&first, &again));
        assert!(std::sync::Arc::ptr_eq(&first, &other));
        assert_eq!(2, cache.provider.device_calls.load(Ordering::SeqCst));
        assert_eq!(1, cache.provider.template_calls.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn unknown_telemetry_is_reported() {
        let mut cache = DeviceTemplateCache::new(Provider::default());
        let mut decoder = Decoder::new();

        let message = CapturedMessage::json("dev1", r#"{"temp": 1, "bogus": 2}"#);
        let event = decoder
            .decode_and_validate(&message, &DecodeOptions::default(), &mut cache)
            .await;

        assert!(event.payload.is_some());
        let errors = &decoder.issues().errors;
        assert_eq!(1, errors.len(), "{:?}", errors);
        assert!(errors[0].contains("'bogus'"));
        assert!(errors[0].contains("'dev1'"));
        assert!(errors[0].contains("humidity, temp"));
        assert!(!errors[0].contains("'temp'"));
    }

    #[tokio::test]
    async fn template_failures_skip_validation() {
        let mut cache = DeviceTemplateCache::new(Provider::default());
        let mut decoder = Decoder::new();

        for device_id in ["missing", "broken"] {
            let message = CapturedMessage::json(device_id, r#"{"bogus": 1, "other": 2}"#);
            let _ = decoder
                .decode_and_validate(&message, &DecodeOptions::default(), &mut cache)
                .await;

            let errors = &decoder.issues().errors;
            assert_eq!(1, errors.len(), "{:?}", errors);
            assert!(errors[0].contains("Unable to get device template"));
        }
    }

    #[tokio::test]
    async fn non_object_payloads_are_not_validated() {
        let mut cache = DeviceTemplateCache::new(Provider::default());
        let mut decoder = Decoder::new();

        let message = CapturedMessage::json("dev1", "[1, 2, 3]");
        let _ = decoder
            .decode_and_validate(&message, &DecodeOptions::default(), &mut cache)
            .await;

        assert!(decoder.issues().errors.is_empty());
        assert_eq!(0, cache.provider.device_calls.load(Ordering::SeqCst));
    }
}
