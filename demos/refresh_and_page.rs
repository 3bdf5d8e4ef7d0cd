//! Renews a transfer token from a refresh token and walks a paged task listing, against a local
//! mock of the auth and transfer services.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use annex_remote_globus::{
	auth::ClientId,
	authorizer::{RefreshTokenAuthorizer, RefreshTokenSource},
	config::ClientConfig,
	http::QueryParams,
	services::{AuthClient, TransferClient},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/v2/oauth2/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"resource_server\":\"transfer.api.globus.org\",\"access_token\":\"demo-access\",\"expires_in\":3600,\"refresh_token\":\"demo-refresh-2\",\"token_type\":\"Bearer\",\"other_tokens\":[]}",
			);
		})
		.await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/v0.10/task_list").header("authorization", "Bearer demo-access");
			then.status(200).header("content-type", "application/json").body(
				"{\"DATA\":[{\"task_id\":\"t-1\",\"status\":\"SUCCEEDED\"},{\"task_id\":\"t-2\",\"status\":\"ACTIVE\"}],\"total\":2}",
			);
		})
		.await;

	let auth_url = server.url("/");
	let transfer_url = server.url("/v0.10/");
	let config = ClientConfig::from_lookup(|key| match key {
		"GLOBUS_SDK_SERVICE_URL_AUTH" => Some(auth_url.clone()),
		"GLOBUS_SDK_SERVICE_URL_TRANSFER" => Some(transfer_url.clone()),
		_ => None,
	})?;
	let auth = AuthClient::native(&config, ClientId::new("0e7a3c15-2f64-4b9d-8c1e-5a7f3d9b2c60")?)?;
	let authorizer = RefreshTokenAuthorizer::builder(RefreshTokenSource::new(auth))
		.refresh_token("demo-refresh-1")
		.on_refresh(|response| {
			if let Ok(tokens) = response.single() {
				println!("Renewed token for {}.", tokens.resource_server);
			}
		})
		.build()
		.await?;
	let transfer = TransferClient::new(&config, Arc::new(authorizer))?;
	let mut tasks = transfer.task_list(None, QueryParams::new()).await?;

	while let Some(task) = tasks.next().await? {
		println!("Task {} is {}.", task["task_id"], task["status"]);
	}

	token_mock.assert_async().await;

	Ok(())
}
