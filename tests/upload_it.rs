#![cfg(feature = "reqwest")]

// std
use std::sync::atomic::{AtomicUsize, Ordering};
// crates.io
use httpmock::prelude::*;
// self
use rest_courier::{
	_preludet::*,
	auth::AccessToken,
	courier::UploadResponse,
	endpoint::{Boundary, BodyVariant, EndpointDescriptor, Method, RefreshFn, RefreshOperation},
	error::Error,
	store::TokenStore,
};

#[tokio::test]
async fn upload_yields_one_decoded_terminal_response() {
	let server = MockServer::start_async().await;
	let (courier, _) = build_reqwest_test_courier();
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/files");
			then.status(201)
				.header("content-type", "application/json")
				.body("{\"id\":\"upload-1\"}");
		})
		.await;
	let endpoint = EndpointDescriptor::new(server.base_url(), "files", Method::Post)
		.with_body(BodyVariant::RawBytes(b"file contents".to_vec()));
	let items: Vec<_> = courier.upload::<serde_json::Value>(&endpoint).collect::<Vec<_>>().await;

	mock.assert_async().await;

	assert_eq!(items.len(), 1);

	match &items[0] {
		Ok(UploadResponse::Response(value)) => assert_eq!(value["id"], "upload-1"),
		other => panic!("Expected a decoded terminal response, got {other:?}."),
	}
}

#[tokio::test]
async fn multipart_boundary_frames_the_uploaded_payload() {
	let server = MockServer::start_async().await;
	let (courier, _) = build_reqwest_test_courier();
	let boundary = Boundary::new("upload-test", "form-data; name=\"file\"", "text/plain");
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/files").body_includes("--upload-test\r\n");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"id\":\"upload-2\"}");
		})
		.await;
	let endpoint = EndpointDescriptor::new(server.base_url(), "files", Method::Post)
		.with_body(BodyVariant::RawBytes(b"payload".to_vec()))
		.with_boundary(boundary);
	let items: Vec<_> = courier.upload::<serde_json::Value>(&endpoint).collect::<Vec<_>>().await;

	mock.assert_async().await;

	assert!(matches!(items.last(), Some(Ok(UploadResponse::Response(_)))));
}

#[tokio::test]
async fn upload_auth_failure_refreshes_once_then_restarts() {
	let server = MockServer::start_async().await;
	let (courier, store) = build_reqwest_test_courier();
	let counter = Arc::new(AtomicUsize::new(0));
	let refresh: Arc<dyn RefreshOperation> = Arc::new(RefreshFn::new({
		let counter = counter.clone();

		move || {
			let counter = counter.clone();

			async move {
				counter.fetch_add(1, Ordering::SeqCst);

				Ok::<_, BoxError>(AccessToken::new("fresh-upload-token"))
			}
		}
	}));
	let ok = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/files")
				.header("authorization", "Bearer fresh-upload-token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"id\":\"upload-3\"}");
		})
		.await;
	let _unauthorized = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/files")
				.header("authorization", "Bearer stale-upload-token");
			then.status(401);
		})
		.await;

	store
		.store(&AccessToken::new("stale-upload-token"), "rest-courier.global")
		.await
		.expect("Failed to seed stale credential into the store.");

	let endpoint = EndpointDescriptor::new(server.base_url(), "files", Method::Post)
		.with_body(BodyVariant::RawBytes(b"file contents".to_vec()))
		.with_auth()
		.with_refresh_operation(refresh);
	let items: Vec<_> = courier.upload::<serde_json::Value>(&endpoint).collect::<Vec<_>>().await;

	ok.assert_async().await;

	assert_eq!(counter.load(Ordering::SeqCst), 1);
	assert!(matches!(items.last(), Some(Ok(UploadResponse::Response(_)))));
}

#[tokio::test]
async fn upload_unexpected_status_without_budget_is_terminal() {
	let server = MockServer::start_async().await;
	let (courier, _) = build_reqwest_test_courier();
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/files");
			then.status(507).body("insufficient storage");
		})
		.await;
	let endpoint = EndpointDescriptor::new(server.base_url(), "files", Method::Post)
		.with_body(BodyVariant::RawBytes(b"file contents".to_vec()));
	let items: Vec<_> = courier.upload::<serde_json::Value>(&endpoint).collect::<Vec<_>>().await;

	mock.assert_async().await;

	assert_eq!(items.len(), 1);

	match &items[0] {
		Err(Error::UnexpectedResponse { details }) => assert_eq!(details.status, 507),
		other => panic!("Expected UnexpectedResponse, got {other:?}."),
	}
}
