// Copyright (c) Microsoft. All rights reserved.

//! Drives the decoder over a stream of captured or received messages.

use futures_util::StreamExt;

use crate::template::TemplateLookup;
use crate::{DecodeOptions, DecodedEvent, Decoder, PropertyValue, RawMessage};

pub struct Monitor {
    decoder: Decoder,
    options: DecodeOptions,
    device_filter: Option<String>,
    templates: Option<Box<dyn TemplateLookup>>,
}

impl Monitor {
    pub fn new(decoder: Decoder, options: DecodeOptions) -> Self {
        Monitor {
            decoder,
            options,
            device_filter: None,
            templates: None,
        }
    }

    /// Only messages sent by `device_id` are decoded.
    #[must_use]
    pub fn with_device_filter(mut self, device_id: &str) -> Self {
        self.device_filter = Some(device_id.to_string());

        self
    }

    /// Validates every payload against the template of its origin device.
    #[must_use]
    pub fn with_templates(mut self, templates: Box<dyn TemplateLookup>) -> Self {
        self.templates = Some(templates);

        self
    }

    fn is_filtered(&self, message: &dyn RawMessage) -> bool {
        let filter = match &self.device_filter {
            Some(filter) => filter,
            None => return false,
        };

        let origin = message
            .annotations()
            .get(crate::DEVICE_ID_ANNOTATION)
            .and_then(PropertyValue::as_text);

        origin != Some(filter.as_str())
    }

    /// Decodes every message of `messages` and passes each event to `sink`.
    ///
    /// Returns the number of events produced.
    pub async fn run<S, M, F>(&mut self, messages: S, mut sink: F) -> usize
    where
        S: futures_util::Stream<Item = M>,
        M: RawMessage,
        F: FnMut(DecodedEvent),
    {
        futures_util::pin_mut!(messages);

        let mut count = 0;

        while let Some(message) = messages.next().await {
            if self.is_filtered(&message) {
                continue;
            }

            let event = match &mut self.templates {
                Some(templates) => {
                    self.decoder
                        .decode_and_validate(&message, &self.options, templates.as_mut())
                        .await
                }
                None => self.decoder.decode(&message, &self.options),
            };

            self.decoder.flush_issues();

            sink(event);
            count += 1;
        }

        count
    }
}

#[cfg(test)]
mod tests {
    use super::Monitor;
    use crate::{CapturedMessage, DecodeOptions, Decoder, Payload};

    fn messages() -> Vec<CapturedMessage> {
        vec![
            CapturedMessage::json("dev1", r#"{"temp":1}"#),
            CapturedMessage::json("dev2", r#"{"temp":2}"#),
            CapturedMessage::json("dev1", "not json"),
        ]
    }

    #[tokio::test]
    async fn decodes_every_message() {
        let mut monitor = Monitor::new(Decoder::new(), DecodeOptions::default());

        let mut events = vec![];
        let count = monitor
            .run(futures_util::stream::iter(messages()), |event| events.push(event))
            .await;

        assert_eq!(3, count);
        assert_eq!(
            vec![Some("dev1"), Some("dev2"), Some("dev1")],
            events.iter().map(|event| event.origin.as_deref()).collect::<Vec<_>>(),
        );
        assert_eq!(Some(&Payload::Invalid), events[2].payload.as_ref());
    }

    #[tokio::test]
    async fn skips_other_devices() {
        let mut monitor =
            Monitor::new(Decoder::new(), DecodeOptions::default()).with_device_filter("dev2");

        let mut events = vec![];
        let count = monitor
            .run(futures_util::stream::iter(messages()), |event| events.push(event))
            .await;

        assert_eq!(1, count);
        assert_eq!(Some("dev2"), events[0].origin.as_deref());
        assert_eq!(
            Some(&serde_json::json!({ "temp": 2 })),
            events[0].payload.as_ref().and_then(Payload::as_json),
        );
    }

    /// Every device shares one template that only declares `temp`.
    struct SingleTemplate {
        lookups: std::sync::Arc<std::sync::atomic::AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl crate::template::TemplateLookup for SingleTemplate {
        async fn get_device_template(
            &mut self,
            _device_id: &str,
        ) -> Result<std::sync::Arc<crate::template::Template>, std::io::Error> {
            self.lookups
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);

            let document = serde_json::json!({
                "capabilityModel": {
                    "contents": [{ "@type": "Telemetry", "name": "temp" }]
                }
            });

            Ok(std::sync::Arc::new(crate::template::Template::from_json(
                "urn:sensor:1",
                &document,
            )?))
        }
    }

    #[tokio::test]
    async fn validates_against_templates() {
        let lookups = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let mut monitor = Monitor::new(Decoder::new(), DecodeOptions::default())
            .with_templates(Box::new(SingleTemplate {
                lookups: lookups.clone(),
            }));

        let messages = vec![
            CapturedMessage::json("dev1", r#"{"temp":1,"bogus":2}"#),
            CapturedMessage::json("dev2", r#"{"temp":2}"#),
            CapturedMessage::json("dev1", "not json"),
        ];

        let mut events = vec![];
        let count = monitor
            .run(futures_util::stream::iter(messages), |event| events.push(event))
            .await;

        assert_eq!(3, count);
        assert_eq!(
            Some(&serde_json::json!({ "temp": 1, "bogus": 2 })),
            events[0].payload.as_ref().and_then(Payload::as_json),
        );

        // The unparsable payload is not validated.
        assert_eq!(2, lookups.load(std::sync::atomic::Ordering::SeqCst));

        // Issues are flushed after every message.
        assert!(monitor.decoder.issues().is_empty());
    }
}
