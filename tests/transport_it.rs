// std
use std::{net::TcpListener, time::Duration};
// crates.io
use httpmock::prelude::*;
// self
use annex_remote_globus::{
	error::{Error, NetworkError},
	http::{HttpClient, RequestOptions},
	url::Url,
};

fn client_for(base: &str) -> HttpClient {
	HttpClient::builder(Url::parse(base).expect("Base URL should parse."))
		.build()
		.expect("HTTP client should build.")
}

#[tokio::test]
async fn slow_responses_surface_as_network_timeouts() {
	let server = MockServer::start_async().await;
	let slow = server
		.mock_async(|when, then| {
			when.method(GET).path("/slow");
			then.status(200).delay(Duration::from_millis(1_500)).body("{}");
		})
		.await;
	let err = client_for(&server.base_url())
		.get("/slow", RequestOptions::new().timeout(Duration::from_millis(100)))
		.await
		.expect_err("A response slower than the timeout must fail.");

	match err {
		Error::Network(e @ NetworkError::Timeout { .. }) => {
			assert!(e.is_timeout());
			assert!(!e.is_retry_safe());
			assert!(e.url().ends_with("/slow"));
		},
		other => panic!("Unexpected error: {other:?}"),
	}

	slow.assert_calls_async(1).await;
}

#[tokio::test]
async fn refused_connections_surface_as_network_connection_errors() {
	let port = {
		let listener = TcpListener::bind("127.0.0.1:0").expect("Ephemeral port should bind.");

		listener.local_addr().expect("Listener should have an address.").port()
	};
	let err = client_for(&format!("http://127.0.0.1:{port}/"))
		.get("/task", RequestOptions::new().timeout(Duration::from_secs(5)))
		.await
		.expect_err("Nothing listens on a released port.");

	assert!(matches!(err, Error::Network(NetworkError::Connection { .. })), "{err:?}");
}

#[tokio::test]
async fn redirects_are_returned_instead_of_followed() {
	let server = MockServer::start_async().await;
	let moved = server
		.mock_async(|when, then| {
			when.method(GET).path("/old");
			then.status(302).header("location", "/new");
		})
		.await;
	let target = server
		.mock_async(|when, then| {
			when.method(GET).path("/new");
			then.status(200).header("content-type", "application/json").body("{}");
		})
		.await;
	let response = client_for(&server.base_url())
		.get("/old", RequestOptions::new())
		.await
		.expect("A redirect is a non-error status.");

	assert_eq!(response.status, 302);

	moved.assert_calls_async(1).await;
	target.assert_calls_async(0).await;
}
