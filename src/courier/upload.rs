//! Progress-reporting uploads classified with the same rules as plain executions.

// std
use std::io;
// crates.io
use futures_util::stream;
// self
use crate::{
	_prelude::*,
	courier::{
		Courier,
		execute::{Classification, ExecuteOptions, decode_body},
	},
	encode,
	endpoint::Endpoint,
	error::{ConnectivityKind, NetworkError},
	http::{Transport, TransportUploadEvent, UploadEventStream},
	obs::{self, PhaseKind, RequestOutcome},
};

/// Items yielded by [`Courier::upload`].
#[derive(Clone, Debug, PartialEq)]
pub enum UploadResponse<R> {
	/// Fractional progress in `0.0..=1.0`, non-decreasing across a single transfer.
	/// A retried transfer restarts its progress sequence.
	Progress(f64),
	/// Decoded terminal response; the stream ends after this item.
	Response(R),
}

struct UploadState<'a, T>
where
	T: ?Sized + Transport,
{
	courier: &'a Courier<T>,
	endpoint: &'a dyn Endpoint,
	options: ExecuteOptions,
	identity: String,
	label: String,
	inner: Option<UploadEventStream>,
	observed_epoch: u64,
	refreshed: bool,
	remaining_retries: u32,
	finished: bool,
}

impl<T> Courier<T>
where
	T: ?Sized + Transport,
{
	/// Uploads the endpoint's body, yielding progress and one terminal item.
	pub fn upload<'a, R>(
		&'a self,
		endpoint: &'a dyn Endpoint,
	) -> impl Stream<Item = Result<UploadResponse<R>>> + Send + 'a
	where
		R: DeserializeOwned,
	{
		self.upload_with(endpoint, ExecuteOptions::default())
	}

	/// Upload with per-call overrides.
	///
	/// The stream ends after its first terminal item: either `Response` on success
	/// or an error. Network failures and unexpected statuses restart the transfer
	/// while the retry budget lasts; an auth failure triggers at most one
	/// credential refresh followed by a single restarted transfer. Decode failures
	/// never restart a completed transfer.
	pub fn upload_with<'a, R>(
		&'a self,
		endpoint: &'a dyn Endpoint,
		options: ExecuteOptions,
	) -> impl Stream<Item = Result<UploadResponse<R>>> + Send + 'a
	where
		R: DeserializeOwned,
	{
		let identity = endpoint.identity();
		let label = self.storing_label(endpoint, &identity);
		let remaining_retries = options.retries;
		let state = UploadState {
			courier: self,
			endpoint,
			options,
			identity,
			label,
			inner: None,
			observed_epoch: 0,
			refreshed: false,
			remaining_retries,
			finished: false,
		};

		obs::record_request_outcome(PhaseKind::Upload, RequestOutcome::Attempt);

		stream::unfold(state, |mut s| async move {
			if s.finished {
				return None;
			}

			loop {
				if s.inner.is_none() {
					s.observed_epoch = s.courier.current_epoch(&s.identity).await;

					match s.courier.start_upload(s.endpoint, &s.label).await {
						Ok(stream) => s.inner = Some(stream),
						Err(e) => {
							if e.is_retryable() && s.remaining_retries > 0 {
								s.remaining_retries -= 1;

								continue;
							}

							return Some(terminal(s, Err(e)));
						},
					}
				}

				let Some(inner) = s.inner.as_mut() else {
					continue;
				};

				match inner.next().await {
					Some(Ok(TransportUploadEvent::Progress(fraction))) =>
						return Some((
							Ok(UploadResponse::Progress(fraction.clamp(0., 1.))),
							s,
						)),
					Some(Ok(TransportUploadEvent::Done(response))) => {
						s.inner = None;

						match s.courier.classify(response, &s.options) {
							Classification::Success(response) => {
								// A body that fails to decode never restarts a
								// transfer the server already accepted.
								let item =
									decode_body(response.body).map(UploadResponse::Response);

								return Some(terminal(s, item));
							},
							Classification::Unexpected(details) => {
								if s.remaining_retries > 0 {
									s.remaining_retries -= 1;

									continue;
								}

								return Some(terminal(
									s,
									Err(Error::UnexpectedResponse { details }),
								));
							},
							Classification::Auth(details) => match s.endpoint.refresh_operation()
							{
								Some(operation) if !s.refreshed => {
									s.refreshed = true;

									if let Err(e) = s
										.courier
										.refresh_credentials(
											operation,
											&s.identity,
											&s.label,
											s.observed_epoch,
										)
										.await
									{
										return Some(terminal(s, Err(e)));
									}
								},
								_ =>
									return Some(terminal(
										s,
										Err(Error::AuthenticationFailed { details }),
									)),
							},
						}
					},
					Some(Err(network)) => {
						s.inner = None;

						if s.remaining_retries > 0 {
							s.remaining_retries -= 1;

							continue;
						}

						return Some(terminal(s, Err(network.into())));
					},
					None => {
						s.inner = None;

						let eof = NetworkError::new(
							ConnectivityKind::Other,
							io::Error::new(
								io::ErrorKind::UnexpectedEof,
								"upload stream ended without a terminal response",
							),
						);

						if s.remaining_retries > 0 {
							s.remaining_retries -= 1;

							continue;
						}

						return Some(terminal(s, Err(eof.into())));
					},
				}
			}
		})
	}

	/// Encodes and starts the upload once, resolving the credential when required.
	pub(crate) async fn start_upload(
		&self,
		endpoint: &dyn Endpoint,
		label: &str,
	) -> Result<UploadEventStream> {
		let token =
			if endpoint.requires_auth() { self.store.fetch(label).await? } else { None };
		let request = encode::encode(endpoint, token.as_ref())?;

		Ok(self.transport.upload(request).await?)
	}
}

fn terminal<R, T>(
	mut state: UploadState<'_, T>,
	item: Result<UploadResponse<R>>,
) -> (Result<UploadResponse<R>>, UploadState<'_, T>)
where
	T: ?Sized + Transport,
{
	state.finished = true;

	obs::record_request_outcome(
		PhaseKind::Upload,
		if item.is_ok() { RequestOutcome::Success } else { RequestOutcome::Failure },
	);

	(item, state)
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
		http::{TransportFuture, WireRequest, WireResponse},
		store::MemoryStore,
	};

	type Script = Vec<Result<TransportUploadEvent, ConnectivityKind>>;

	struct UploadTransport(Mutex<VecDeque<Script>>);
	impl UploadTransport {
		fn new(scripts: impl IntoIterator<Item = Script>) -> Self {
			Self(Mutex::new(scripts.into_iter().collect()))
		}
	}
	impl Transport for UploadTransport {
		fn send(&self, _: WireRequest) -> TransportFuture<'_, WireResponse> {
			Box::pin(async { Ok(WireResponse::default()) })
		}

		fn upload(&self, _: WireRequest) -> TransportFuture<'_, UploadEventStream> {
			let script =
				self.0.lock().pop_front().expect("Upload transport ran out of scripts.");

			Box::pin(async move {
				let events = script.into_iter().map(|event| {
					event.map_err(|kind| {
						NetworkError::new(kind, std::io::Error::other("scripted failure"))
					})
				});
				let stream: UploadEventStream = Box::pin(stream::iter(events));

				Ok(stream)
			})
		}
	}

	fn courier_over(scripts: impl IntoIterator<Item = Script>) -> Courier<UploadTransport> {
		Courier::with_transport(
			Arc::new(MemoryStore::default()),
			UploadTransport::new(scripts),
			CourierConfig::default(),
		)
	}

	fn done(status: u16, body: &str) -> Result<TransportUploadEvent, ConnectivityKind> {
		Ok(TransportUploadEvent::Done(WireResponse {
			status,
			headers: BTreeMap::new(),
			body: body.as_bytes().to_vec(),
		}))
	}

	#[tokio::test]
	async fn progress_is_forwarded_then_the_response_decodes() {
		let courier = courier_over([vec![
			Ok(TransportUploadEvent::Progress(0.25)),
			Ok(TransportUploadEvent::Progress(0.75)),
			done(200, r#"{"ok":true}"#),
		]]);
		let endpoint = EndpointDescriptor::new("https://api.example.com", "files", Method::Post);
		let items: Vec<_> =
			courier.upload::<serde_json::Value>(&endpoint).collect::<Vec<_>>().await;

		assert_eq!(items.len(), 3);
		assert!(matches!(items[0], Ok(UploadResponse::Progress(f)) if f == 0.25));
		assert!(matches!(items[1], Ok(UploadResponse::Progress(f)) if f == 0.75));
		assert!(matches!(items[2], Ok(UploadResponse::Response(_))));
	}

	#[tokio::test]
	async fn out_of_range_progress_is_clamped() {
		let courier = courier_over([vec![
			Ok(TransportUploadEvent::Progress(1.5)),
			done(200, r#"{"ok":true}"#),
		]]);
		let endpoint = EndpointDescriptor::new("https://api.example.com", "files", Method::Post);
		let items: Vec<_> =
			courier.upload::<serde_json::Value>(&endpoint).collect::<Vec<_>>().await;

		assert!(matches!(items[0], Ok(UploadResponse::Progress(f)) if f == 1.));
	}

	#[tokio::test]
	async fn unexpected_status_restarts_the_transfer_within_budget() {
		let courier = courier_over([
			vec![Ok(TransportUploadEvent::Progress(0.5)), done(503, "")],
			vec![done(201, r#"{"id":7}"#)],
		]);
		let endpoint = EndpointDescriptor::new("https://api.example.com", "files", Method::Post);
		let items: Vec<_> = courier
			.upload_with::<serde_json::Value>(
				&endpoint,
				ExecuteOptions::default().with_retries(1),
			)
			.collect::<Vec<_>>()
			.await;

		assert!(matches!(items.last(), Some(Ok(UploadResponse::Response(_)))));
	}

	#[tokio::test]
	async fn network_failure_without_budget_is_terminal() {
		let courier = courier_over([vec![
			Ok(TransportUploadEvent::Progress(0.1)),
			Err(ConnectivityKind::NoConnectivity),
		]]);
		let endpoint = EndpointDescriptor::new("https://api.example.com", "files", Method::Post);
		let items: Vec<_> =
			courier.upload::<serde_json::Value>(&endpoint).collect::<Vec<_>>().await;

		assert_eq!(items.len(), 2);
		assert!(matches!(items[1], Err(Error::Network(_))));
	}

	#[tokio::test]
	async fn decode_failure_never_restarts_an_accepted_transfer() {
		let courier = courier_over([vec![done(200, "not json")]]);
		let endpoint = EndpointDescriptor::new("https://api.example.com", "files", Method::Post);
		let items: Vec<_> = courier
			.upload_with::<serde_json::Value>(
				&endpoint,
				ExecuteOptions::default().with_retries(3),
			)
			.collect::<Vec<_>>()
			.await;

		assert_eq!(items.len(), 1);
		assert!(matches!(items[0], Err(Error::MapResponseFailed { .. })));
	}

	#[tokio::test]
	async fn stream_ending_without_terminal_event_is_a_network_error() {
		let courier = courier_over([vec![Ok(TransportUploadEvent::Progress(0.4))]]);
		let endpoint = EndpointDescriptor::new("https://api.example.com", "files", Method::Post);
		let items: Vec<_> =
			courier.upload::<serde_json::Value>(&endpoint).collect::<Vec<_>>().await;

		assert_eq!(items.len(), 2);
		assert!(matches!(items[1], Err(Error::Network(_))));
	}
}
