//! Single request/response execution with classification, retries, and auth recovery.

// self
use crate::{
	_prelude::*,
	courier::Courier,
	encode,
	endpoint::{Endpoint, RefreshOperation},
	error::ResponseDetails,
	http::{Transport, WireResponse},
	obs::{self, PhaseKind, RequestOutcome, RequestSpan},
};

/// Per-call overrides for status classification and the retry budget.
///
/// `None` sets fall back to [`CourierConfig`](crate::courier::CourierConfig).
#[derive(Clone, Debug, Default)]
pub struct ExecuteOptions {
	/// Statuses classified as success for this call.
	pub expected_statuses: Option<HashSet<u16>>,
	/// Statuses classified as authentication failures for this call.
	pub auth_statuses: Option<HashSet<u16>>,
	/// Whole-pipeline retry budget applied to retryable failures. The single
	/// credential-refresh retry is separate and never counts against this budget.
	pub retries: u32,
}
impl ExecuteOptions {
	/// Overrides the success status set for this call.
	pub fn with_expected_statuses(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
		self.expected_statuses = Some(statuses.into_iter().collect());

		self
	}

	/// Overrides the auth status set for this call.
	pub fn with_auth_statuses(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
		self.auth_statuses = Some(statuses.into_iter().collect());

		self
	}

	/// Sets the whole-pipeline retry budget.
	pub fn with_retries(mut self, retries: u32) -> Self {
		self.retries = retries;

		self
	}
}

/// Response shape assigned to a raw status before error construction.
pub(crate) enum Classification {
	/// Status is in the auth set; eligible for one credential refresh.
	Auth(ResponseDetails),
	/// Status is outside both sets.
	Unexpected(ResponseDetails),
	/// Status is in the expected set.
	Success(WireResponse),
}

impl<T> Courier<T>
where
	T: ?Sized + Transport,
{
	/// Executes the endpoint and decodes the response body into `R`.
	pub async fn execute<R>(&self, endpoint: &dyn Endpoint) -> Result<R>
	where
		R: DeserializeOwned,
	{
		self.execute_with(endpoint, ExecuteOptions::default()).await
	}

	/// Executes the endpoint with per-call overrides and decodes the body into `R`.
	///
	/// A decode failure re-enters the retry budget like any other retryable error;
	/// it never triggers a credential refresh.
	pub async fn execute_with<R>(&self, endpoint: &dyn Endpoint, options: ExecuteOptions) -> Result<R>
	where
		R: DeserializeOwned,
	{
		let span = RequestSpan::new(PhaseKind::Execute, &endpoint.identity());

		span.instrument(self.execute_inner(endpoint, &options, |details| decode_body(details.body)))
			.await
	}

	/// Executes the endpoint and returns the raw response without body decoding.
	///
	/// An empty body on an expected status is returned as-is.
	pub async fn execute_raw(&self, endpoint: &dyn Endpoint) -> Result<ResponseDetails> {
		self.execute_raw_with(endpoint, ExecuteOptions::default()).await
	}

	/// Raw execution with per-call overrides.
	pub async fn execute_raw_with(
		&self,
		endpoint: &dyn Endpoint,
		options: ExecuteOptions,
	) -> Result<ResponseDetails> {
		let span = RequestSpan::new(PhaseKind::Execute, &endpoint.identity());

		span.instrument(self.execute_inner(endpoint, &options, Ok)).await
	}

	async fn execute_inner<R>(
		&self,
		endpoint: &dyn Endpoint,
		options: &ExecuteOptions,
		finish: impl Fn(ResponseDetails) -> Result<R>,
	) -> Result<R> {
		obs::record_request_outcome(PhaseKind::Execute, RequestOutcome::Attempt);

		let mut remaining = options.retries;
		let result = loop {
			let outcome = match self.attempt(endpoint, options).await {
				Ok(details) => finish(details),
				Err(e) => Err(e),
			};

			match outcome {
				Err(e) if e.is_retryable() && remaining > 0 => remaining -= 1,
				other => break other,
			}
		};

		obs::record_request_outcome(
			PhaseKind::Execute,
			if result.is_ok() { RequestOutcome::Success } else { RequestOutcome::Failure },
		);

		result
	}

	/// One full pipeline pass: send, classify, and recover from at most one auth
	/// failure via the endpoint's refresh hook.
	pub(crate) async fn attempt(
		&self,
		endpoint: &dyn Endpoint,
		options: &ExecuteOptions,
	) -> Result<ResponseDetails> {
		let identity = endpoint.identity();
		let label = self.storing_label(endpoint, &identity);
		let observed_epoch = self.current_epoch(&identity).await;
		let response = self.send_once(endpoint, &label).await?;

		match self.classify(response, options) {
			Classification::Success(response) => Ok(response.into_details()),
			Classification::Unexpected(details) => Err(Error::UnexpectedResponse { details }),
			Classification::Auth(details) => {
				let Some(operation) = endpoint.refresh_operation() else {
					return Err(Error::AuthenticationFailed { details });
				};

				self.refresh_credentials(operation, &identity, &label, observed_epoch).await?;

				let retried = self.send_once(endpoint, &label).await?;

				match self.classify(retried, options) {
					Classification::Success(response) => Ok(response.into_details()),
					Classification::Unexpected(details) =>
						Err(Error::UnexpectedResponse { details }),
					// The rotated credential was rejected too; recovery stops here.
					Classification::Auth(details) => Err(Error::AuthenticationFailed { details }),
				}
			},
		}
	}

	/// Runs the endpoint's refresh hook under the identity's single-flight slot.
	///
	/// `observed_epoch` is the slot epoch the caller saw before its failed request.
	/// Finding a newer epoch under the lock means a concurrent caller already
	/// rotated the credential, so this call reuses it without refreshing again.
	pub(crate) async fn refresh_credentials(
		&self,
		operation: &dyn RefreshOperation,
		identity: &str,
		label: &str,
		observed_epoch: u64,
	) -> Result<()> {
		let span = RequestSpan::new(PhaseKind::Refresh, identity);
		let slot = self.refresh_slot(identity);
		let fut = async {
			obs::record_request_outcome(PhaseKind::Refresh, RequestOutcome::Attempt);

			let mut guard = slot.lock().await;

			if guard.epoch != observed_epoch {
				obs::record_request_outcome(PhaseKind::Refresh, RequestOutcome::Success);

				return Ok(());
			}

			let token = match operation.refresh().await {
				Ok(token) => token,
				Err(source) => {
					obs::record_request_outcome(PhaseKind::Refresh, RequestOutcome::Failure);

					return Err(Error::RefreshFailed { source });
				},
			};

			if let Err(e) = self.store.store(&token, label).await {
				obs::record_request_outcome(PhaseKind::Refresh, RequestOutcome::Failure);

				return Err(e.into());
			}

			guard.epoch += 1;

			obs::record_request_outcome(PhaseKind::Refresh, RequestOutcome::Success);

			Ok(())
		};

		span.instrument(fut).await
	}

	/// Encodes and sends the endpoint once, resolving the credential when required.
	pub(crate) async fn send_once(
		&self,
		endpoint: &dyn Endpoint,
		label: &str,
	) -> Result<WireResponse> {
		let token =
			if endpoint.requires_auth() { self.store.fetch(label).await? } else { None };
		let request = encode::encode(endpoint, token.as_ref())?;

		Ok(self.transport.send(request).await?)
	}

	pub(crate) fn classify(
		&self,
		response: WireResponse,
		options: &ExecuteOptions,
	) -> Classification {
		let auth = options.auth_statuses.as_ref().unwrap_or(&self.config.auth_statuses);
		let expected =
			options.expected_statuses.as_ref().unwrap_or(&self.config.expected_statuses);

		if auth.contains(&response.status) {
			Classification::Auth(response.into_details())
		} else if !expected.contains(&response.status) {
			Classification::Unexpected(response.into_details())
		} else {
			Classification::Success(response)
		}
	}

	pub(crate) fn storing_label(&self, endpoint: &dyn Endpoint, identity: &str) -> String {
		endpoint
			.token_strategy()
			.unwrap_or(&self.config.default_token_strategy)
			.storing_label(identity)
			.to_owned()
	}

	pub(crate) async fn current_epoch(&self, identity: &str) -> u64 {
		self.refresh_slot(identity).lock().await.epoch
	}
}

/// Decodes a response body into `R`, treating a zero-length body as its own error.
pub(crate) fn decode_body<R>(body: Vec<u8>) -> Result<R>
where
	R: DeserializeOwned,
{
	if body.is_empty() {
		return Err(Error::EmptyResponse);
	}

	let outcome = {
		let mut deserializer = serde_json::Deserializer::from_slice(&body);

		serde_path_to_error::deserialize(&mut deserializer)
	};

	outcome.map_err(|source| Error::MapResponseFailed { raw: body, source })
}

#[cfg(test)]
mod tests {
	// std
	use std::collections::VecDeque;
	// self
	use super::*;
	use crate::{
		courier::CourierConfig,
		endpoint::{EndpointDescriptor, Method},
		http::{TransportFuture, UploadEventStream, WireRequest},
		store::MemoryStore,
	};

	struct ScriptedTransport(Mutex<VecDeque<WireResponse>>);
	impl ScriptedTransport {
		fn new(responses: impl IntoIterator<Item = WireResponse>) -> Self {
			Self(Mutex::new(responses.into_iter().collect()))
		}
	}
	impl Transport for ScriptedTransport {
		fn send(&self, _: WireRequest) -> TransportFuture<'_, WireResponse> {
			let response =
				self.0.lock().pop_front().expect("Scripted transport ran out of responses.");

			Box::pin(async move { Ok(response) })
		}

		fn upload(&self, request: WireRequest) -> TransportFuture<'_, UploadEventStream> {
			Box::pin(async move {
				let response = self.send(request).await?;
				let stream: UploadEventStream = Box::pin(futures_util::stream::iter([Ok(
					crate::http::TransportUploadEvent::Done(response),
				)]));

				Ok(stream)
			})
		}
	}

	fn courier_over(
		responses: impl IntoIterator<Item = WireResponse>,
	) -> Courier<ScriptedTransport> {
		Courier::with_transport(
			Arc::new(MemoryStore::default()),
			ScriptedTransport::new(responses),
			CourierConfig::default(),
		)
	}

	fn status(status: u16) -> WireResponse {
		WireResponse { status, ..Default::default() }
	}

	#[tokio::test]
	async fn unexpected_status_carries_full_response_details() {
		let courier = courier_over([WireResponse {
			status: 500,
			headers: [("x-request-id".to_owned(), "42".to_owned())].into(),
			body: b"oops".to_vec(),
		}]);
		let endpoint = EndpointDescriptor::new("https://api.example.com", "boom", Method::Get);
		let err = courier
			.execute_raw(&endpoint)
			.await
			.expect_err("A 500 response should classify as unexpected.");

		match err {
			Error::UnexpectedResponse { details } => {
				assert_eq!(details.status, 500);
				assert_eq!(details.headers.get("x-request-id").map(String::as_str), Some("42"));
				assert_eq!(details.body, b"oops");
			},
			other => panic!("Expected UnexpectedResponse, got {other:?}."),
		}
	}

	#[tokio::test]
	async fn auth_status_without_refresh_hook_fails_terminally() {
		let courier = courier_over([status(401)]);
		let endpoint =
			EndpointDescriptor::new("https://api.example.com", "me", Method::Get).with_auth();
		let err = courier
			.execute_raw(&endpoint)
			.await
			.expect_err("A 401 without a refresh hook should fail.");

		assert!(matches!(err, Error::AuthenticationFailed { .. }));
	}

	#[tokio::test]
	async fn retry_budget_recovers_from_transient_unexpected_statuses() {
		let courier = courier_over([status(500), status(502), status(200)]);
		let endpoint = EndpointDescriptor::new("https://api.example.com", "flaky", Method::Get);
		let details = courier
			.execute_raw_with(&endpoint, ExecuteOptions::default().with_retries(2))
			.await
			.expect("Two retries should reach the eventual 200.");

		assert_eq!(details.status, 200);
	}

	#[tokio::test]
	async fn retry_budget_exhaustion_surfaces_the_last_error() {
		let courier = courier_over([status(500), status(503)]);
		let endpoint = EndpointDescriptor::new("https://api.example.com", "down", Method::Get);
		let err = courier
			.execute_raw_with(&endpoint, ExecuteOptions::default().with_retries(1))
			.await
			.expect_err("Budget of one should stop after the second failure.");

		match err {
			Error::UnexpectedResponse { details } => assert_eq!(details.status, 503),
			other => panic!("Expected UnexpectedResponse, got {other:?}."),
		}
	}

	#[tokio::test]
	async fn per_call_status_sets_override_the_defaults() {
		let courier = courier_over([status(404)]);
		let endpoint = EndpointDescriptor::new("https://api.example.com", "maybe", Method::Get);
		let details = courier
			.execute_raw_with(
				&endpoint,
				ExecuteOptions::default().with_expected_statuses([200, 404]),
			)
			.await
			.expect("404 should be accepted when the call expects it.");

		assert_eq!(details.status, 404);
	}

	#[tokio::test]
	async fn typed_execution_decodes_json_bodies() {
		#[derive(Debug, Deserialize, PartialEq)]
		struct Todo {
			id: u32,
			title: String,
		}

		let courier = courier_over([WireResponse {
			status: 200,
			headers: BTreeMap::new(),
			body: br#"{"id":1,"title":"water the plants"}"#.to_vec(),
		}]);
		let endpoint = EndpointDescriptor::new("https://api.example.com", "todos/1", Method::Get);
		let todo: Todo = courier.execute(&endpoint).await.expect("Decoding should succeed.");

		assert_eq!(todo, Todo { id: 1, title: "water the plants".into() });
	}

	#[tokio::test]
	async fn empty_expected_body_is_its_own_error_for_typed_calls() {
		let courier = courier_over([status(200)]);
		let endpoint = EndpointDescriptor::new("https://api.example.com", "todos/1", Method::Get);
		let err = courier
			.execute::<serde_json::Value>(&endpoint)
			.await
			.expect_err("An empty body cannot decode into a value.");

		assert!(matches!(err, Error::EmptyResponse));
	}

	#[test]
	fn decode_failures_keep_the_raw_body_and_the_json_path() {
		#[derive(Debug, Deserialize)]
		#[allow(dead_code)]
		struct Narrow {
			id: u32,
		}

		let err = decode_body::<Narrow>(br#"{"id":"not a number"}"#.to_vec())
			.expect_err("A mistyped field should fail decoding.");

		match err {
			Error::MapResponseFailed { raw, source } => {
				assert_eq!(raw, br#"{"id":"not a number"}"#);
				assert_eq!(source.path().to_string(), "id");
			},
			other => panic!("Expected MapResponseFailed, got {other:?}."),
		}
	}
}
