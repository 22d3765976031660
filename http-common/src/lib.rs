// Copyright (c) Microsoft. All rights reserved.

#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(
	clippy::missing_errors_doc,
	clippy::module_name_repetitions,
	clippy::similar_names,
	clippy::type_complexity,
)]

mod request;
pub use request::{ HttpRequest, HttpResponse };

/// Ref <https://url.spec.whatwg.org/#path-percent-encode-set>
pub const PATH_SEGMENT_ENCODE_SET: &percent_encoding::AsciiSet =
	&percent_encoding::CONTROLS
	.add(b' ').add(b'"').add(b'<').add(b'>').add(b'`') // fragment percent-encode set
	.add(b'#').add(b'?').add(b'{').add(b'}'); // path percent-encode set

/// Connector used for every call to a cloud REST endpoint.
pub type CloudConnector = hyper_openssl::HttpsConnector<hyper::client::HttpConnector>;

pub fn cloud_connector() -> std::io::Result<CloudConnector> {
	let mut http_connector = hyper::client::HttpConnector::new();
	http_connector.enforce_http(false);

	let tls_connector = hyper_openssl::HttpsConnector::with_connector(
		http_connector,
		openssl_connector_builder()?,
	).map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err))?;

	Ok(tls_connector)
}

fn openssl_connector_builder() -> std::io::Result<openssl::ssl::SslConnectorBuilder> {
	openssl::ssl::SslConnector::builder(openssl::ssl::SslMethod::tls())
		.map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err))
}

/// Binary data that travels as a base64 string in JSON documents, such as the body of a captured message.
#[derive(Clone, Debug, Default, Eq, Ord, PartialEq, PartialOrd)]
pub struct ByteString(pub Vec<u8>);

impl<'de> serde::Deserialize<'de> for ByteString {
	fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error> where D: serde::Deserializer<'de> {
		struct Visitor;

		impl<'de> serde::de::Visitor<'de> for Visitor {
			type Value = ByteString;

			fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
				write!(formatter, "a base64-encoded string")
			}

			fn visit_str<E>(self, v: &str) -> Result<Self::Value, E> where E: serde::de::Error {
				use base64::Engine;

				let bytes = base64::engine::general_purpose::STANDARD.decode(v).map_err(serde::de::Error::custom)?;
				Ok(ByteString(bytes))
			}
		}

		deserializer.deserialize_str(Visitor)
	}
}

impl serde::Serialize for ByteString {
	fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> where S: serde::Serializer {
		use base64::Engine;

		base64::engine::general_purpose::STANDARD.encode(&self.0).serialize(serializer)
	}
}

#[cfg(test)]
mod tests {
	#[test]
	fn byte_string_is_base64_in_json() {
		let value = super::ByteString(b"{\"temp\":1}".to_vec());
		let serialized = serde_json::to_string(&value).unwrap();
		assert_eq!(r#""eyJ0ZW1wIjoxfQ==""#, serialized);

		let deserialized: super::ByteString = serde_json::from_str(&serialized).unwrap();
		assert_eq!(value, deserialized);
	}

	#[test]
	fn byte_string_rejects_non_base64() {
		let result: Result<super::ByteString, _> = serde_json::from_str(r#""not base64!""#);
		assert!(result.is_err());
	}

	#[test]
	fn path_segment_encode_set_escapes_query_chars() {
		let encoded = percent_encoding::utf8_percent_encode("dev ice?#1", super::PATH_SEGMENT_ENCODE_SET).to_string();
		assert_eq!("dev%20ice%3F%231", encoded);
	}
}
