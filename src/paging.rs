//! Lazy, single-pass cursors over paginated list endpoints.
//!
//! Records live in each page's `DATA` array. Four continuation styles are supported:
//!
//! | Style     | Request parameter | Continue while                  |
//! |-----------|-------------------|---------------------------------|
//! | `HasNext` | `offset`          | `has_next_page` is true         |
//! | `Total`   | `offset`          | next offset `<` `total`         |
//! | `LastKey` | `last_key`        | `has_next_page` is true         |
//! | `Marker`  | `marker`          | `next_marker` is truthy         |
//!
//! Every request carries `limit`, never larger than the per-call cap or the remaining budget.

// std
use std::collections::VecDeque;
// self
use crate::{
	_prelude::*,
	error::MalformedResponseError,
	http::{HttpClient, QueryParams, RequestOptions},
};

/// Boxed future returned by [`PageSource::fetch_page`].
pub type PageFuture<'a> = Pin<Box<dyn Future<Output = Result<Value>> + 'a + Send>>;

/// Anything that can GET one page of a list endpoint.
pub trait PageSource
where
	Self: Send + Sync,
{
	/// Fetches the page at `path` with `params` and returns its JSON document.
	fn fetch_page<'a>(&'a self, path: &'a str, params: QueryParams) -> PageFuture<'a>;
}
impl PageSource for HttpClient {
	fn fetch_page<'a>(&'a self, path: &'a str, params: QueryParams) -> PageFuture<'a> {
		Box::pin(async move {
			self.get(path, RequestOptions::new().params(params)).await?.into_json(path)
		})
	}
}

/// Continuation protocol of a list endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PagingStyle {
	/// Offset paging; the page says whether another page exists.
	HasNext,
	/// Offset paging; the page reports the total record count.
	Total,
	/// Opaque `last_key` echoed back; the page says whether another page exists.
	LastKey,
	/// Opaque `next_marker` echoed back as `marker`; absent or empty marker ends the listing.
	Marker,
}
impl PagingStyle {
	const fn uses_offset(self) -> bool {
		matches!(self, PagingStyle::HasNext | PagingStyle::Total)
	}
}

/// Builder for [`PagedCursor`].
pub struct PagedCursorBuilder<'s, S>
where
	S: ?Sized,
{
	source: &'s S,
	path: String,
	params: QueryParams,
	style: PagingStyle,
	num_results: Option<usize>,
	max_results_per_call: usize,
	max_total_results: Option<usize>,
	offset: usize,
}
impl<'s, S> PagedCursorBuilder<'s, S>
where
	S: ?Sized + PageSource,
{
	/// Fixed query parameters sent with every page request.
	pub fn params(mut self, params: QueryParams) -> Self {
		self.params = params;

		self
	}

	/// Result budget; `None` iterates until the listing ends.
	pub fn num_results(mut self, num_results: Option<usize>) -> Self {
		self.num_results = num_results;

		self
	}

	/// Largest `limit` sent on one request.
	pub fn max_results_per_call(mut self, max: usize) -> Self {
		self.max_results_per_call = max.max(1);

		self
	}

	/// Service-side cap on the whole listing; the budget is clamped to it.
	pub fn max_total_results(mut self, max: Option<usize>) -> Self {
		self.max_total_results = max;

		self
	}

	/// Starting offset for offset styles.
	pub fn offset(mut self, offset: usize) -> Self {
		self.offset = offset;

		self
	}

	/// Builds the cursor and fetches the first page.
	pub async fn start(self) -> Result<PagedCursor<'s, S>> {
		let num_results = match (self.num_results, self.max_total_results) {
			(Some(n), Some(cap)) => Some(n.min(cap)),
			(None, cap) => cap,
			(n, None) => n,
		};
		let mut cursor = PagedCursor {
			source: self.source,
			path: self.path,
			params: self.params,
			style: self.style,
			num_results,
			max_results_per_call: self.max_results_per_call,
			offset: self.offset,
			next_marker: None,
			buffer: VecDeque::new(),
			fetched: 0,
			pages_fetched: 0,
			has_next_page: num_results != Some(0),
			limit_less_than_available_results: false,
		};

		if cursor.has_next_page {
			cursor.fetch_page().await?;
		}

		Ok(cursor)
	}
}

/// Single-pass sequence of records spanning many pages.
pub struct PagedCursor<'s, S>
where
	S: ?Sized,
{
	source: &'s S,
	path: String,
	params: QueryParams,
	style: PagingStyle,
	num_results: Option<usize>,
	max_results_per_call: usize,
	offset: usize,
	next_marker: Option<String>,
	buffer: VecDeque<Value>,
	fetched: usize,
	pages_fetched: usize,
	has_next_page: bool,
	limit_less_than_available_results: bool,
}
impl<'s, S> PagedCursor<'s, S>
where
	S: ?Sized + PageSource,
{
	/// Per-call cap used when none is given.
	pub const DEFAULT_MAX_RESULTS_PER_CALL: usize = 1000;

	/// Starts a builder for the listing at `path`.
	pub fn builder(
		source: &'s S,
		path: impl Into<String>,
		style: PagingStyle,
	) -> PagedCursorBuilder<'s, S> {
		PagedCursorBuilder {
			source,
			path: path.into(),
			params: QueryParams::new(),
			style,
			num_results: None,
			max_results_per_call: Self::DEFAULT_MAX_RESULTS_PER_CALL,
			max_total_results: None,
			offset: 0,
		}
	}

	/// Next record, fetching another page when the buffered one is exhausted.
	///
	/// Returns `Ok(None)` once the listing ends or the budget is spent; no page is requested
	/// after the budget is reached.
	pub async fn next(&mut self) -> Result<Option<Value>> {
		loop {
			if self.budget_spent() {
				return Ok(None);
			}
			if let Some(record) = self.buffer.pop_front() {
				self.fetched += 1;

				if self.budget_spent() {
					self.limit_less_than_available_results =
						!self.buffer.is_empty() || self.has_next_page;
				}

				return Ok(Some(record));
			}
			if !self.has_next_page {
				return Ok(None);
			}

			self.fetch_page().await?;
		}
	}

	/// Drains the cursor.
	pub async fn collect_all(mut self) -> Result<Vec<Value>> {
		let mut records = Vec::new();

		while let Some(record) = self.next().await? {
			records.push(record);
		}

		Ok(records)
	}

	/// True when the budget stopped iteration while the service still had records.
	pub fn limit_less_than_available_results(&self) -> bool {
		self.limit_less_than_available_results
	}

	/// Records yielded so far.
	pub fn num_results_fetched(&self) -> usize {
		self.fetched
	}

	/// Pages requested so far.
	pub fn pages_fetched(&self) -> usize {
		self.pages_fetched
	}

	fn budget_spent(&self) -> bool {
		self.num_results.is_some_and(|n| self.fetched >= n)
	}

	async fn fetch_page(&mut self) -> Result<()> {
		let remaining =
			self.num_results.map(|n| n.saturating_sub(self.fetched + self.buffer.len()));
		let limit = remaining.map_or(self.max_results_per_call, |r| r.min(self.max_results_per_call));
		let mut params = self.params.clone();

		params.set("limit", Some(limit.to_string()));

		match self.style {
			PagingStyle::HasNext | PagingStyle::Total =>
				params.set("offset", Some(self.offset.to_string())),
			PagingStyle::LastKey => params.set("last_key", self.next_marker.clone()),
			PagingStyle::Marker => params.set("marker", self.next_marker.clone()),
		}

		tracing::debug!(path = %self.path, style = ?self.style, limit, "Fetching page.");

		let page = self.source.fetch_page(&self.path, params).await?;

		self.pages_fetched += 1;

		let records = page
			.get("DATA")
			.and_then(Value::as_array)
			.ok_or_else(|| self.malformed("missing DATA array"))?;
		let empty = records.is_empty();

		self.buffer.extend(records.iter().cloned());

		if self.style.uses_offset() {
			self.offset += limit;
		}

		self.has_next_page = match self.style {
			PagingStyle::HasNext => self.bool_field(&page, "has_next_page")?,
			PagingStyle::Total => {
				let total = page
					.get("total")
					.and_then(Value::as_u64)
					.ok_or_else(|| self.malformed("missing total"))?;

				(self.offset as u64) < total
			},
			PagingStyle::LastKey => {
				self.next_marker = marker_value(page.get("last_key"));

				self.bool_field(&page, "has_next_page")?
			},
			PagingStyle::Marker => {
				self.next_marker = marker_value(page.get("next_marker"));

				self.next_marker.is_some()
			},
		};

		if empty && self.has_next_page {
			tracing::warn!(path = %self.path, "Page was empty but claimed more data; stopping.");

			self.has_next_page = false;
		}
		if self.style == PagingStyle::LastKey && self.has_next_page && self.next_marker.is_none() {
			tracing::warn!(
				path = %self.path,
				"Page claimed more data without a last_key; stopping."
			);

			self.has_next_page = false;
		}

		Ok(())
	}

	fn bool_field(&self, page: &Value, field: &str) -> Result<bool> {
		page.get(field)
			.and_then(Value::as_bool)
			.ok_or_else(|| self.malformed(&format!("missing {field}")).into())
	}

	fn malformed(&self, reason: &str) -> MalformedResponseError {
		MalformedResponseError::new(self.path.clone(), reason)
	}
}
impl<S> Debug for PagedCursor<'_, S>
where
	S: ?Sized,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PagedCursor")
			.field("path", &self.path)
			.field("style", &self.style)
			.field("num_results", &self.num_results)
			.field("fetched", &self.fetched)
			.field("has_next_page", &self.has_next_page)
			.finish_non_exhaustive()
	}
}

/// Truthy marker values as strings; null, false, empty strings, and zero end the listing.
fn marker_value(value: Option<&Value>) -> Option<String> {
	match value? {
		Value::String(s) if !s.is_empty() => Some(s.clone()),
		Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
		Value::Bool(true) => Some("true".into()),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	/// In-memory listing of `total` records that answers in any paging style.
	struct FakeListing {
		style: PagingStyle,
		total: usize,
		requests: Mutex<Vec<QueryParams>>,
	}
	impl FakeListing {
		fn new(style: PagingStyle, total: usize) -> Self {
			Self { style, total, requests: Mutex::default() }
		}

		fn requests(&self) -> Vec<QueryParams> {
			self.requests.lock().clone()
		}
	}
	impl PageSource for FakeListing {
		fn fetch_page<'a>(&'a self, _: &'a str, params: QueryParams) -> PageFuture<'a> {
			Box::pin(async move {
				let number = |key: &str| {
					params.get(key).map(|v| v.parse::<usize>().expect("Numeric param."))
				};
				let limit = number("limit").expect("Every request must carry a limit.");
				let start = match self.style {
					PagingStyle::HasNext | PagingStyle::Total => number("offset").unwrap_or(0),
					PagingStyle::LastKey => number("last_key").unwrap_or(0),
					PagingStyle::Marker => number("marker").unwrap_or(0),
				};
				let end = (start + limit).min(self.total);
				let data: Vec<Value> = (start..end).map(|i| serde_json::json!({"id": i})).collect();
				let more = end < self.total;

				self.requests.lock().push(params);

				Ok(match self.style {
					PagingStyle::HasNext =>
						serde_json::json!({"DATA": data, "has_next_page": more}),
					PagingStyle::Total => serde_json::json!({"DATA": data, "total": self.total}),
					PagingStyle::LastKey => serde_json::json!({
						"DATA": data,
						"has_next_page": more,
						"last_key": if more { Value::from(end.to_string()) } else { Value::Null },
					}),
					PagingStyle::Marker => serde_json::json!({
						"DATA": data,
						"next_marker": if more { Value::from(end) } else { Value::Null },
					}),
				})
			})
		}
	}

	fn ids(records: &[Value]) -> Vec<u64> {
		records.iter().filter_map(|r| r["id"].as_u64()).collect()
	}

	#[tokio::test]
	async fn budget_bounds_records_and_calls_in_every_style() {
		for style in
			[PagingStyle::HasNext, PagingStyle::Total, PagingStyle::LastKey, PagingStyle::Marker]
		{
			let listing = FakeListing::new(style, 10);
			let mut cursor = PagedCursor::builder(&listing, "list", style)
				.num_results(Some(5))
				.max_results_per_call(2)
				.start()
				.await
				.expect("First page should load.");
			let mut records = Vec::new();

			while let Some(record) = cursor.next().await.expect("Pages should load.") {
				records.push(record);
			}

			assert_eq!(ids(&records), vec![0, 1, 2, 3, 4], "{style:?}");
			assert_eq!(cursor.pages_fetched(), 3, "{style:?}");
			assert!(cursor.limit_less_than_available_results(), "{style:?}");

			let limits: Vec<_> =
				listing.requests().iter().map(|p| p.get("limit").map(str::to_owned)).collect();

			assert_eq!(limits, [Some("2"), Some("2"), Some("1")].map(|l| l.map(str::to_owned)));
		}
	}

	#[tokio::test]
	async fn unbounded_cursors_follow_continuations_to_the_end() {
		for style in
			[PagingStyle::HasNext, PagingStyle::Total, PagingStyle::LastKey, PagingStyle::Marker]
		{
			let listing = FakeListing::new(style, 5);
			let records = PagedCursor::builder(&listing, "list", style)
				.max_results_per_call(2)
				.start()
				.await
				.expect("First page should load.")
				.collect_all()
				.await
				.expect("Listing should drain.");

			assert_eq!(ids(&records), vec![0, 1, 2, 3, 4], "{style:?}");
			assert_eq!(listing.requests().len(), 3, "{style:?}");
		}
	}

	#[tokio::test]
	async fn continuation_parameters_are_echoed() {
		let listing = FakeListing::new(PagingStyle::Marker, 3);
		let cursor = PagedCursor::builder(&listing, "list", PagingStyle::Marker)
			.params(QueryParams::new().with("filter", "x"))
			.max_results_per_call(2)
			.start()
			.await
			.expect("First page should load.");

		cursor.collect_all().await.expect("Listing should drain.");

		let requests = listing.requests();

		assert_eq!(requests[0].get("marker"), None);
		assert_eq!(requests[1].get("marker"), Some("2"));
		assert_eq!(requests[1].get("filter"), Some("x"));

		let listing = FakeListing::new(PagingStyle::Total, 7);
		let cursor = PagedCursor::builder(&listing, "list", PagingStyle::Total)
			.max_results_per_call(3)
			.offset(3)
			.start()
			.await
			.expect("First page should load.");

		assert_eq!(ids(&cursor.collect_all().await.expect("Listing should drain.")), vec![3, 4, 5, 6]);
		assert_eq!(
			listing.requests().iter().map(|p| p.get("offset").map(str::to_owned)).collect::<Vec<_>>(),
			vec![Some("3".to_owned()), Some("6".to_owned())]
		);
	}

	#[tokio::test]
	async fn exact_budget_and_total_cap() {
		let listing = FakeListing::new(PagingStyle::HasNext, 4);
		let mut cursor = PagedCursor::builder(&listing, "list", PagingStyle::HasNext)
			.num_results(Some(4))
			.start()
			.await
			.expect("First page should load.");

		while cursor.next().await.expect("Pages should load.").is_some() {}

		assert_eq!(cursor.num_results_fetched(), 4);
		assert!(!cursor.limit_less_than_available_results());

		let listing = FakeListing::new(PagingStyle::HasNext, 50);
		let cursor = PagedCursor::builder(&listing, "list", PagingStyle::HasNext)
			.num_results(Some(30))
			.max_total_results(Some(10))
			.max_results_per_call(100)
			.start()
			.await
			.expect("First page should load.");

		assert_eq!(cursor.collect_all().await.expect("Listing should drain.").len(), 10);
		assert_eq!(listing.requests()[0].get("limit"), Some("10"));
	}

	#[tokio::test]
	async fn construction_fails_on_malformed_first_page() {
		struct Broken;
		impl PageSource for Broken {
			fn fetch_page<'a>(&'a self, _: &'a str, _: QueryParams) -> PageFuture<'a> {
				Box::pin(async { Ok(serde_json::json!({"items": []})) })
			}
		}

		let err = PagedCursor::builder(&Broken, "endpoint_search", PagingStyle::HasNext)
			.start()
			.await
			.expect_err("Missing DATA must fail construction.");

		assert!(matches!(err, Error::MalformedResponse(_)));
	}

	#[tokio::test]
	async fn last_key_pages_without_a_key_end_the_listing() {
		struct Keyless(Mutex<usize>);
		impl PageSource for Keyless {
			fn fetch_page<'a>(&'a self, _: &'a str, _: QueryParams) -> PageFuture<'a> {
				Box::pin(async move {
					*self.0.lock() += 1;

					Ok(serde_json::json!({
						"DATA": [{"id": 0}, {"id": 1}],
						"has_next_page": true,
						"last_key": null,
					}))
				})
			}
		}

		let source = Keyless(Mutex::new(0));
		let records = PagedCursor::builder(&source, "task_list", PagingStyle::LastKey)
			.num_results(None)
			.start()
			.await
			.expect("Cursor should start.")
			.collect_all()
			.await
			.expect("Cursor should drain.");

		assert_eq!(ids(&records), [0, 1]);
		assert_eq!(*source.0.lock(), 1, "A page without a key must not be re-requested.");
	}

	#[test]
	fn marker_truthiness() {
		assert_eq!(marker_value(Some(&Value::from("abc"))), Some("abc".into()));
		assert_eq!(marker_value(Some(&Value::from(12))), Some("12".into()));
		assert_eq!(marker_value(Some(&Value::from(""))), None);
		assert_eq!(marker_value(Some(&Value::from(0))), None);
		assert_eq!(marker_value(Some(&Value::Null)), None);
		assert_eq!(marker_value(None), None);
	}
}
