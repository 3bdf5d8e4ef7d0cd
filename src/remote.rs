//! git-annex special remote boundary.
//!
//! The line protocol lives in the host; this module owns what happens once the host has decoded a
//! command. Every failure surfaces as a [`RemoteError`], including errors raised by the HTTP
//! layer underneath.

pub mod directory;
pub mod http;

pub use directory::DirectoryRemote;
pub use http::HttpRemote;

// std
use std::path::Path;
// self
use crate::_prelude::*;

/// Future returned by [`SpecialRemote`] operations.
pub type RemoteFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, RemoteError>> + 'a + Send>>;

/// Services the git-annex host offers to a remote.
pub trait AnnexHost
where
	Self: Send + Sync,
{
	/// Value of a remote setting (`directory=...` and friends).
	fn getconfig(&self, name: &str) -> Option<String>;

	/// Hash directory for `key`, ending with a slash.
	fn dirhash(&self, key: &str) -> String;

	/// Message shown to the user.
	fn info(&self, message: &str);
}

/// Annex key together with the hash directory the host assigned to it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentKey {
	name: String,
	dirhash: String,
}
impl ContentKey {
	/// Asks `host` where `key` lives.
	pub fn resolve(host: &dyn AnnexHost, key: &str) -> Self {
		Self { name: key.to_owned(), dirhash: host.dirhash(key) }
	}

	/// Key name.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Location relative to the remote root: `<dirhash><key>`.
	pub fn relative_path(&self) -> String {
		format!("{}{}", self.dirhash, self.name)
	}
}

/// Operations git-annex drives on a special remote, export variants included.
pub trait SpecialRemote
where
	Self: Send + Sync,
{
	/// Initializes the remote; safe to call repeatedly.
	fn initremote(&self) -> RemoteFuture<'_, ()>;

	/// Readies the remote for the other operations.
	fn prepare(&self) -> RemoteFuture<'_, ()>;

	/// Stores the content of `file` under `key`.
	fn transfer_store<'a>(&'a self, key: &'a str, file: &'a Path) -> RemoteFuture<'a, ()>;

	/// Retrieves the content of `key` into `file`.
	fn transfer_retrieve<'a>(&'a self, key: &'a str, file: &'a Path) -> RemoteFuture<'a, ()>;

	/// Reports whether `key` is present.
	fn checkpresent<'a>(&'a self, key: &'a str) -> RemoteFuture<'a, bool>;

	/// Removes `key`; a missing key is not an error.
	fn remove<'a>(&'a self, key: &'a str) -> RemoteFuture<'a, ()>;

	/// Exports `local_file` to `remote_file`.
	fn transferexport_store<'a>(
		&'a self,
		key: &'a str,
		local_file: &'a Path,
		remote_file: &'a str,
	) -> RemoteFuture<'a, ()>;

	/// Retrieves the exported `remote_file` into `local_file`.
	fn transferexport_retrieve<'a>(
		&'a self,
		key: &'a str,
		local_file: &'a Path,
		remote_file: &'a str,
	) -> RemoteFuture<'a, ()>;

	/// Reports whether `remote_file` is present.
	fn checkpresentexport<'a>(&'a self, key: &'a str, remote_file: &'a str)
	-> RemoteFuture<'a, bool>;

	/// Removes the exported `remote_file`.
	fn removeexport<'a>(&'a self, key: &'a str, remote_file: &'a str) -> RemoteFuture<'a, ()>;

	/// Removes an exported directory; a missing directory is not an error.
	fn removeexportdirectory<'a>(&'a self, remote_directory: &'a str) -> RemoteFuture<'a, ()>;

	/// Renames an exported file.
	fn renameexport<'a>(
		&'a self,
		key: &'a str,
		filename: &'a str,
		new_filename: &'a str,
	) -> RemoteFuture<'a, ()>;
}

/// Failure reported back to the git-annex host.
#[derive(Debug, ThisError)]
pub enum RemoteError {
	/// A required remote setting is missing.
	#[error("You need to set {name}=.")]
	MissingConfig {
		/// Setting name.
		name: &'static str,
	},
	/// The remote cannot be reached right now.
	#[error("This remote is not currently available: {reason}.")]
	Unavailable {
		/// Human-readable cause.
		reason: String,
	},
	/// Local or remote filesystem failure.
	#[error("{message}.")]
	Io {
		/// Human-readable error payload.
		message: String,
	},
	/// The transfer service rejected the request.
	#[error("Service request failed: {0}")]
	Service(#[source] Error),
}
impl RemoteError {
	pub(crate) fn io(action: &str, path: &Path, e: std::io::Error) -> Self {
		Self::Io { message: format!("Failed to {action} {}: {e}", path.display()) }
	}
}
impl From<Error> for RemoteError {
	fn from(e: Error) -> Self {
		match e {
			Error::Network(e) => Self::Unavailable { reason: e.to_string() },
			e => Self::Service(e),
		}
	}
}
