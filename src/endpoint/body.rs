//! Body variants and multipart boundary framing.

// crates.io
use rand::{Rng, distr::Alphanumeric};
use serde_json::{Map, Value};
// self
use crate::{_prelude::*, error::BuildError};

/// Closed set of body shapes a descriptor may carry.
///
/// Query-shaped variants rewrite the request URL and never emit a body; the
/// remaining variants produce body bytes that an optional [`Boundary`] wraps.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum BodyVariant {
	/// No body and no query rewrite.
	#[default]
	None,
	/// Appended to the URL verbatim; the caller pre-encodes the string.
	RawQueryString(String),
	/// Percent-escaped query items built from the map; order is not significant.
	QueryParams(BTreeMap<String, Value>),
	/// JSON object body.
	JsonBodyParams(Map<String, Value>),
	/// `key=value` pairs joined with `&`; entries with a null value are dropped.
	UrlEncoded(BTreeMap<String, Value>),
	/// Pre-serialized JSON value sent as the body.
	JsonModel(Value),
	/// Body bytes sent verbatim.
	RawBytes(Vec<u8>),
}
impl BodyVariant {
	/// Serializes any model into a [`BodyVariant::JsonModel`].
	pub fn json_model<T>(model: &T) -> Result<Self, BuildError>
	where
		T: Serialize,
	{
		let value = serde_json::to_value(model)
			.map_err(|source| BuildError::BodySerialization { source })?;

		Ok(Self::JsonModel(value))
	}

	/// Serializes a model into a [`BodyVariant::UrlEncoded`] map.
	///
	/// Optional fields that serialize to `null` keep the drop-on-encode semantics,
	/// so `None` fields never appear as empty pairs.
	pub fn url_encoded_model<T>(model: &T) -> Result<Self, BuildError>
	where
		T: Serialize,
	{
		let value = serde_json::to_value(model)
			.map_err(|source| BuildError::BodySerialization { source })?;
		let Value::Object(object) = value else {
			return Err(BuildError::NonObjectModel);
		};

		Ok(Self::UrlEncoded(object.into_iter().collect()))
	}
}

/// Multipart boundary wrapping a computed body payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Boundary {
	/// Boundary name placed on the `--name` separator lines.
	pub name: String,
	/// Value of the part's `Content-Disposition` header.
	pub content_disposition: String,
	/// Value of the part's `Content-Type` header.
	pub content_type: String,
}
impl Boundary {
	const RANDOM_SUFFIX_LEN: usize = 16;

	/// Creates a boundary with an explicit name.
	pub fn new(
		name: impl Into<String>,
		content_disposition: impl Into<String>,
		content_type: impl Into<String>,
	) -> Self {
		Self {
			name: name.into(),
			content_disposition: content_disposition.into(),
			content_type: content_type.into(),
		}
	}

	/// Creates a boundary with a random collision-resistant name.
	pub fn random(
		content_disposition: impl Into<String>,
		content_type: impl Into<String>,
	) -> Self {
		let suffix: String = rand::rng()
			.sample_iter(&Alphanumeric)
			.take(Self::RANDOM_SUFFIX_LEN)
			.map(char::from)
			.collect();

		Self::new(format!("rest-courier-{suffix}"), content_disposition, content_type)
	}

	/// Frames the payload between `--name` separator lines.
	pub fn wrap(&self, payload: &[u8]) -> Vec<u8> {
		let header = format!(
			"--{}\r\nContent-Disposition: {}\r\nContent-Type: {}\r\n\r\n",
			self.name, self.content_disposition, self.content_type,
		);
		let trailer = format!("\r\n--{}--\r\n", self.name);
		let mut framed = Vec::with_capacity(header.len() + payload.len() + trailer.len());

		framed.extend_from_slice(header.as_bytes());
		framed.extend_from_slice(payload);
		framed.extend_from_slice(trailer.as_bytes());

		framed
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[derive(Serialize)]
	struct Person {
		name: String,
		lastname: String,
		age: Option<u32>,
	}

	#[test]
	fn url_encoded_model_keeps_null_markers_for_encoding() {
		let variant = BodyVariant::url_encoded_model(&Person {
			name: "Test".into(),
			lastname: "Tester".into(),
			age: None,
		})
		.expect("Model should serialize into a map.");
		let BodyVariant::UrlEncoded(map) = variant else {
			panic!("Expected a UrlEncoded variant.");
		};

		assert_eq!(map.get("age"), Some(&Value::Null));
		assert_eq!(map.get("name"), Some(&Value::String("Test".into())));
	}

	#[test]
	fn url_encoded_model_rejects_non_objects() {
		let err = BodyVariant::url_encoded_model(&vec![1, 2, 3])
			.expect_err("Arrays must not become url-encoded bodies.");

		assert!(matches!(err, BuildError::NonObjectModel));
	}

	#[test]
	fn boundary_framing_matches_wire_shape() {
		let boundary = Boundary::new("part", "form-data; name=\"file\"", "application/json");
		let framed = boundary.wrap(b"{\"a\":1}");

		assert_eq!(
			String::from_utf8(framed).expect("Framed payload should stay UTF-8."),
			"--part\r\nContent-Disposition: form-data; name=\"file\"\r\nContent-Type: application/json\r\n\r\n{\"a\":1}\r\n--part--\r\n",
		);
	}

	#[test]
	fn random_boundaries_do_not_collide() {
		let a = Boundary::random("form-data", "application/octet-stream");
		let b = Boundary::random("form-data", "application/octet-stream");

		assert_ne!(a.name, b.name);
	}
}
