//! File transfer service operations.

pub mod data;

pub use data::*;

// self
use crate::{
	_prelude::*,
	auth::{EndpointId, TaskId},
	authorizer::{Authorizer, AuthorizerKind},
	config::{ClientConfig, Service},
	error::MalformedResponseError,
	http::{HttpClient, HttpClientBuilder, QueryParams, RequestOptions, Response, qjoin_path},
	paging::{PagedCursor, PagingStyle},
};

const ALLOWED_AUTHORIZERS: &[AuthorizerKind] =
	&[AuthorizerKind::Bearer, AuthorizerKind::RefreshToken, AuthorizerKind::ClientCredentials];

/// Client for the file transfer service.
#[derive(Clone, Debug)]
pub struct TransferClient {
	http: HttpClient,
}
impl TransferClient {
	/// Default budget of [`endpoint_search`](Self::endpoint_search).
	pub const ENDPOINT_SEARCH_DEFAULT_RESULTS: usize = 25;
	/// Default budget of [`task_list`](Self::task_list).
	pub const TASK_LIST_DEFAULT_RESULTS: usize = 10;

	/// Client using the configured transfer service.
	pub fn new(config: &ClientConfig, authorizer: Arc<dyn Authorizer>) -> Result<Self> {
		Self::with_builder(HttpClient::builder_for(config, Service::Transfer)?, authorizer)
	}

	/// Client on top of a prepared HTTP client builder.
	pub fn with_builder(builder: HttpClientBuilder, authorizer: Arc<dyn Authorizer>) -> Result<Self> {
		let http = builder
			.authorizer(authorizer)
			.allowed_authorizers("TransferClient", ALLOWED_AUTHORIZERS)
			.build()?;

		Ok(Self { http })
	}

	/// Underlying HTTP client.
	pub fn http(&self) -> &HttpClient {
		&self.http
	}

	/// Searches endpoints; at most 100 per call and 1000 overall.
	///
	/// `None` uses [`ENDPOINT_SEARCH_DEFAULT_RESULTS`](Self::ENDPOINT_SEARCH_DEFAULT_RESULTS).
	pub async fn endpoint_search(
		&self,
		filter_fulltext: Option<&str>,
		filter_scope: Option<&str>,
		num_results: Option<usize>,
	) -> Result<PagedCursor<'_, HttpClient>> {
		let params = QueryParams::new()
			.with_opt("filter_fulltext", filter_fulltext)
			.with_opt("filter_scope", filter_scope);

		PagedCursor::builder(&self.http, "endpoint_search", PagingStyle::HasNext)
			.params(params)
			.num_results(Some(num_results.unwrap_or(Self::ENDPOINT_SEARCH_DEFAULT_RESULTS)))
			.max_results_per_call(100)
			.max_total_results(Some(1000))
			.start()
			.await
	}

	/// Endpoint document.
	pub async fn get_endpoint(&self, endpoint_id: &EndpointId) -> Result<Response> {
		self.http.get(&qjoin_path(["endpoint", endpoint_id.as_ref()]), RequestOptions::new()).await
	}

	/// Directory listing on an endpoint (`path`, `show_hidden`, ... in `params`).
	pub async fn operation_ls(
		&self,
		endpoint_id: &EndpointId,
		params: QueryParams,
	) -> Result<Response> {
		tracing::info!(%endpoint_id, path = ?params.get("path"), "Listing endpoint directory.");

		self.http
			.get(
				&qjoin_path(["operation/endpoint", endpoint_id.as_ref(), "ls"]),
				RequestOptions::new().params(params),
			)
			.await
	}

	/// Fresh submission id for an idempotent transfer submission.
	pub async fn get_submission_id(&self) -> Result<String> {
		let response = self.http.get("submission_id", RequestOptions::new()).await?;

		response.get("value").and_then(Value::as_str).map(str::to_owned).ok_or_else(|| {
			MalformedResponseError::new("submission_id", "missing value").into()
		})
	}

	/// Submits a transfer, obtaining a submission id first when the document has none.
	pub async fn submit_transfer(&self, document: &TransferDocument) -> Result<Response> {
		let document = match document.submission_id() {
			Some(_) => document.clone(),
			None => document.clone().with_submission_id(self.get_submission_id().await?),
		};

		tracing::info!(
			source = %document.source_endpoint(),
			destination = %document.destination_endpoint(),
			items = document.items().len(),
			"Submitting transfer."
		);

		self.http.post("transfer", document.to_json()?, RequestOptions::new()).await
	}

	/// Task document.
	pub async fn get_task(&self, task_id: &TaskId) -> Result<Response> {
		self.http.get(&qjoin_path(["task", task_id.as_ref()]), RequestOptions::new()).await
	}

	/// Tasks of the authenticated user.
	///
	/// `None` uses [`TASK_LIST_DEFAULT_RESULTS`](Self::TASK_LIST_DEFAULT_RESULTS).
	pub async fn task_list(
		&self,
		num_results: Option<usize>,
		params: QueryParams,
	) -> Result<PagedCursor<'_, HttpClient>> {
		PagedCursor::builder(&self.http, "task_list", PagingStyle::Total)
			.params(params)
			.num_results(Some(num_results.unwrap_or(Self::TASK_LIST_DEFAULT_RESULTS)))
			.start()
			.await
	}

	/// Files a task transferred successfully.
	pub async fn task_successful_transfers(
		&self,
		task_id: &TaskId,
		num_results: Option<usize>,
	) -> Result<PagedCursor<'_, HttpClient>> {
		PagedCursor::builder(
			&self.http,
			qjoin_path(["task", task_id.as_ref(), "successful_transfers"]),
			PagingStyle::Marker,
		)
		.num_results(num_results)
		.start()
		.await
	}

	/// Tasks visible to an endpoint manager.
	pub async fn endpoint_manager_task_list(
		&self,
		num_results: Option<usize>,
		params: QueryParams,
	) -> Result<PagedCursor<'_, HttpClient>> {
		PagedCursor::builder(&self.http, "endpoint_manager/task_list", PagingStyle::LastKey)
			.params(params)
			.num_results(num_results)
			.start()
			.await
	}
}
