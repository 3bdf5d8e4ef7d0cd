//! [`SpecialRemote`] that keeps content behind an authenticated HTTP API.

// std
use std::{fs, path::Path};
// crates.io
use reqwest::{
	Method,
	header::{CONTENT_TYPE, HeaderValue},
};
// self
use crate::{
	_prelude::*,
	http::{HttpClient, RequestOptions, TextBody, qjoin_path},
	remote::{AnnexHost, ContentKey, RemoteError, RemoteFuture, SpecialRemote},
};

const PREFIX_CONFIG: &str = "prefix";

/// Maps annex keys onto `PUT`/`GET`/`DELETE` calls under a configured `prefix=`.
///
/// Requests go through [`HttpClient`], so the client's authorizer and its single 401 retry apply
/// to every call.
pub struct HttpRemote {
	http: HttpClient,
	host: Arc<dyn AnnexHost>,
	prefix: RwLock<Option<String>>,
}
impl HttpRemote {
	/// Remote storing content through `http`.
	pub fn new(http: HttpClient, host: Arc<dyn AnnexHost>) -> Self {
		Self { http, host, prefix: RwLock::new(None) }
	}

	/// Path prefix, once known.
	pub fn prefix(&self) -> Option<String> {
		self.prefix.read().clone()
	}

	fn configured_prefix(&self) -> Result<String, RemoteError> {
		self.host
			.getconfig(PREFIX_CONFIG)
			.map(|p| p.trim_matches('/').to_owned())
			.filter(|p| !p.is_empty())
			.ok_or(RemoteError::MissingConfig { name: PREFIX_CONFIG })
	}

	fn location(&self, relative: &str) -> Result<String, RemoteError> {
		let prefix = match self.prefix() {
			Some(prefix) => prefix,
			None => self.configured_prefix()?,
		};

		Ok(qjoin_path([prefix.as_str(), relative.trim_start_matches('/')]))
	}

	fn key_location(&self, key: &str) -> Result<String, RemoteError> {
		self.location(&ContentKey::resolve(self.host.as_ref(), key).relative_path())
	}

	async fn store(&self, file: &Path, location: &str) -> Result<(), RemoteError> {
		let content = fs::read(file).map_err(|e| RemoteError::io("read", file, e))?;
		let options = RequestOptions::new()
			.header(CONTENT_TYPE, HeaderValue::from_static("application/octet-stream"))
			.text(TextBody::Bytes(content));

		self.http.put(location, options).await?;
		tracing::debug!(location, "Uploaded annex content.");

		Ok(())
	}

	async fn retrieve(&self, location: &str, file: &Path) -> Result<(), RemoteError> {
		let response = self.http.get(location, RequestOptions::new()).await?;

		fs::write(file, &response.raw).map_err(|e| RemoteError::io("write", file, e))
	}

	async fn checkpresent_at(&self, location: &str) -> Result<bool, RemoteError> {
		match self.http.request(Method::HEAD, location, RequestOptions::new()).await {
			Ok(_) => Ok(true),
			Err(e) if e.is_status(404) => Ok(false),
			Err(e) => Err(e.into()),
		}
	}

	async fn remove_at(&self, location: &str) -> Result<(), RemoteError> {
		match self.http.delete(location, RequestOptions::new()).await {
			Err(e) if !e.is_status(404) => Err(e.into()),
			_ => Ok(()),
		}
	}
}
impl Debug for HttpRemote {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		f.debug_struct("HttpRemote")
			.field("base_url", &self.http.base_url().as_str())
			.field("prefix", &self.prefix())
			.finish()
	}
}
impl SpecialRemote for HttpRemote {
	fn initremote(&self) -> RemoteFuture<'_, ()> {
		Box::pin(async move {
			let prefix = self.configured_prefix()?;

			tracing::info!(base_url = %self.http.base_url(), %prefix, "Initialized HTTP remote.");

			*self.prefix.write() = Some(prefix);

			Ok(())
		})
	}

	fn prepare(&self) -> RemoteFuture<'_, ()> {
		Box::pin(async move {
			*self.prefix.write() = Some(self.configured_prefix()?);

			Ok(())
		})
	}

	fn transfer_store<'a>(&'a self, key: &'a str, file: &'a Path) -> RemoteFuture<'a, ()> {
		Box::pin(async move { self.store(file, &self.key_location(key)?).await })
	}

	fn transfer_retrieve<'a>(&'a self, key: &'a str, file: &'a Path) -> RemoteFuture<'a, ()> {
		Box::pin(async move { self.retrieve(&self.key_location(key)?, file).await })
	}

	fn checkpresent<'a>(&'a self, key: &'a str) -> RemoteFuture<'a, bool> {
		Box::pin(async move { self.checkpresent_at(&self.key_location(key)?).await })
	}

	fn remove<'a>(&'a self, key: &'a str) -> RemoteFuture<'a, ()> {
		Box::pin(async move { self.remove_at(&self.key_location(key)?).await })
	}

	fn transferexport_store<'a>(
		&'a self,
		_: &'a str,
		local_file: &'a Path,
		remote_file: &'a str,
	) -> RemoteFuture<'a, ()> {
		Box::pin(async move { self.store(local_file, &self.location(remote_file)?).await })
	}

	fn transferexport_retrieve<'a>(
		&'a self,
		_: &'a str,
		local_file: &'a Path,
		remote_file: &'a str,
	) -> RemoteFuture<'a, ()> {
		Box::pin(async move { self.retrieve(&self.location(remote_file)?, local_file).await })
	}

	fn checkpresentexport<'a>(&'a self, _: &'a str, remote_file: &'a str) -> RemoteFuture<'a, bool> {
		Box::pin(async move { self.checkpresent_at(&self.location(remote_file)?).await })
	}

	fn removeexport<'a>(&'a self, _: &'a str, remote_file: &'a str) -> RemoteFuture<'a, ()> {
		Box::pin(async move { self.remove_at(&self.location(remote_file)?).await })
	}

	fn removeexportdirectory<'a>(&'a self, remote_directory: &'a str) -> RemoteFuture<'a, ()> {
		Box::pin(async move { self.remove_at(&self.location(remote_directory)?).await })
	}

	fn renameexport<'a>(
		&'a self,
		_: &'a str,
		filename: &'a str,
		new_filename: &'a str,
	) -> RemoteFuture<'a, ()> {
		Box::pin(async move {
			let from = self.location(filename)?;
			let to = self.location(new_filename)?;
			let content = self.http.get(&from, RequestOptions::new()).await?.raw;
			let options = RequestOptions::new()
				.header(CONTENT_TYPE, HeaderValue::from_static("application/octet-stream"))
				.text(TextBody::Bytes(content));

			self.http.put(&to, options).await?;
			self.http.delete(&from, RequestOptions::new()).await?;

			Ok(())
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::_preludet::*;

	fn remote(transport: Arc<ScriptedTransport>) -> HttpRemote {
		HttpRemote::new(scripted_client(transport), RecordingHost::new([("prefix", "/annex/")]))
	}

	#[tokio::test]
	async fn keys_map_to_prefixed_hash_paths() {
		let transport = ScriptedTransport::new([
			ScriptedReply::Http(200, "text/plain", String::new()),
			ScriptedReply::json(404, serde_json::json!({"code": "NotFound", "message": "gone"})),
			ScriptedReply::json(404, serde_json::json!({"code": "NotFound", "message": "gone"})),
		]);
		let remote = remote(transport.clone());

		remote.prepare().await.expect("prepare should read the prefix.");

		assert!(remote.checkpresent("KEY 1").await.expect("HEAD 200 means present."));
		assert!(!remote.checkpresent("KEY 1").await.expect("HEAD 404 means absent."));

		remote.remove("KEY 1").await.expect("Deleting a missing key is not an error.");

		let requests = transport.requests();

		assert_eq!(requests[0].method, Method::HEAD);
		assert_eq!(requests[0].url.as_str(), "https://api.test/v0.10/annex/f87/4d5/KEY%201");
		assert_eq!(requests[2].method, Method::DELETE);
	}

	#[tokio::test]
	async fn service_failures_become_remote_errors() {
		let transport = ScriptedTransport::new([
			ScriptedReply::json(500, serde_json::json!({"code": "Boom", "message": "broken"})),
			ScriptedReply::Fail(|| crate::error::NetworkError::Connection {
				url: "https://api.test/".into(),
				source: "refused".into(),
			}),
		]);
		let remote = remote(transport);

		assert!(matches!(
			remote.checkpresent("KEY").await,
			Err(RemoteError::Service(ref e)) if e.is_status(500)
		));
		assert!(matches!(remote.remove("KEY").await, Err(RemoteError::Unavailable { .. })));
	}

	#[tokio::test]
	async fn missing_prefix_is_reported() {
		let remote = HttpRemote::new(
			scripted_client(ScriptedTransport::new([])),
			RecordingHost::new([]),
		);

		assert!(matches!(
			remote.initremote().await,
			Err(RemoteError::MissingConfig { name: "prefix" })
		));
	}
}
