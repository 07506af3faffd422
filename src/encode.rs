//! Request encoder turning a descriptor plus an optional credential into a wire request.

// crates.io
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	endpoint::{BodyVariant, Endpoint},
	error::BuildError,
	http::WireRequest,
};

/// Fixed library `User-Agent` appended after every caller header.
pub const USER_AGENT: &str = concat!("rest-courier/", env!("CARGO_PKG_VERSION"));

const AUTHORIZATION: &str = "Authorization";
const CONTENT_TYPE: &str = "Content-Type";
const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Encodes the endpoint into a [`WireRequest`].
///
/// The resolved credential, if any, becomes an `Authorization: Bearer` header when
/// the endpoint requires auth; with no stored credential the header carries an
/// empty bearer value and the request is still sent.
pub fn encode(
	endpoint: &dyn Endpoint,
	token: Option<&AccessToken>,
) -> Result<WireRequest, BuildError> {
	let mut url = join_url(endpoint.base_url(), endpoint.path())?;
	let mut headers: Vec<(String, String)> = endpoint.headers().into_iter().collect();
	let mut body = None;

	match endpoint.body() {
		BodyVariant::None => {},
		BodyVariant::RawQueryString(query) => url.set_query(Some(&query)),
		BodyVariant::QueryParams(params) => {
			url.query_pairs_mut()
				.extend_pairs(params.iter().map(|(key, value)| (key, value_text(value))));
		},
		BodyVariant::JsonBodyParams(params) => {
			body = Some(
				serde_json::to_vec(&Value::Object(params))
					.map_err(|source| BuildError::BodySerialization { source })?,
			);
		},
		BodyVariant::UrlEncoded(params) => {
			body = Some(url_encoded_pairs(&params).into_bytes());
		},
		BodyVariant::JsonModel(value) => {
			body = Some(
				serde_json::to_vec(&value)
					.map_err(|source| BuildError::BodySerialization { source })?,
			);
		},
		BodyVariant::RawBytes(bytes) => body = Some(bytes),
	}

	if let Some(payload) = body.as_ref() {
		if !has_header(&headers, CONTENT_TYPE) {
			headers.push((CONTENT_TYPE.into(), DEFAULT_CONTENT_TYPE.into()));
		}
		if let Some(boundary) = endpoint.boundary() {
			body = Some(boundary.wrap(payload));
		}
	}
	if endpoint.requires_auth() {
		let bearer = token.map(|t| t.access_token.expose()).unwrap_or_default();

		headers.push((AUTHORIZATION.into(), format!("Bearer {bearer}")));
	}

	headers.push(("User-Agent".into(), USER_AGENT.into()));

	Ok(WireRequest { method: endpoint.method(), url, headers, body })
}

fn join_url(base: &str, path: &str) -> Result<Url, BuildError> {
	let base = base.trim_end_matches('/');
	let path = path.trim_start_matches('/');
	let joined = if path.is_empty() { base.to_owned() } else { format!("{base}/{path}") };

	Url::parse(&joined).map_err(|source| BuildError::InvalidUrl { source })
}

/// Renders a JSON value the way it appears in query or form pairs: strings keep
/// their raw text, everything else uses its JSON rendering.
fn value_text(value: &Value) -> String {
	match value {
		Value::String(text) => text.clone(),
		other => other.to_string(),
	}
}

fn url_encoded_pairs(params: &BTreeMap<String, Value>) -> String {
	let mut buf = String::new();

	for (key, value) in params {
		// Null entries are dropped outright, never emitted as `key=`.
		if value.is_null() {
			continue;
		}
		if !buf.is_empty() {
			buf.push('&');
		}

		buf.push_str(key);
		buf.push('=');
		buf.push_str(&value_text(value));
	}

	buf
}

fn has_header(headers: &[(String, String)], name: &str) -> bool {
	headers.iter().any(|(key, _)| key.eq_ignore_ascii_case(name))
}
