//! [`SpecialRemote`] over a directory reachable from the local filesystem.

// std
use std::{
	fs,
	io::ErrorKind,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	remote::{AnnexHost, ContentKey, RemoteError, RemoteFuture, SpecialRemote},
};

const DIRECTORY_CONFIG: &str = "directory";

/// Stores annex content as plain files under a configured `directory=`.
pub struct DirectoryRemote {
	host: Arc<dyn AnnexHost>,
	directory: RwLock<Option<PathBuf>>,
}
impl DirectoryRemote {
	/// Remote driven by `host`; the directory is read during `initremote`/`prepare`.
	pub fn new(host: Arc<dyn AnnexHost>) -> Self {
		Self { host, directory: RwLock::new(None) }
	}

	/// Root directory, once known.
	pub fn directory(&self) -> Option<PathBuf> {
		self.directory.read().clone()
	}

	fn configured_directory(&self) -> Result<PathBuf, RemoteError> {
		self.host
			.getconfig(DIRECTORY_CONFIG)
			.filter(|d| !d.is_empty())
			.map(PathBuf::from)
			.ok_or(RemoteError::MissingConfig { name: DIRECTORY_CONFIG })
	}

	fn root(&self) -> Result<PathBuf, RemoteError> {
		match self.directory() {
			Some(directory) => Ok(directory),
			None => self.configured_directory(),
		}
	}

	fn key_location(&self, key: &str) -> Result<PathBuf, RemoteError> {
		Ok(self.root()?.join(ContentKey::resolve(self.host.as_ref(), key).relative_path()))
	}

	fn export_location(&self, remote_file: &str) -> Result<PathBuf, RemoteError> {
		Ok(self.root()?.join(remote_file.trim_start_matches('/')))
	}

	fn ensure_available(&self) -> Result<PathBuf, RemoteError> {
		let root = self.root()?;

		if !root.exists() {
			return Err(RemoteError::Unavailable { reason: format!("{} is missing", root.display()) });
		}

		Ok(root)
	}

	fn mkdir(directory: &Path) -> Result<(), RemoteError> {
		fs::create_dir_all(directory).map_err(|e| RemoteError::io("write to", directory, e))
	}

	fn store(&self, key: &str, file: &Path, location: &Path) -> Result<(), RemoteError> {
		let temp = self.root()?.join("tmp").join(key);

		if let Some(parent) = location.parent() {
			Self::mkdir(parent)?;
		}
		if let Some(parent) = temp.parent() {
			Self::mkdir(parent)?;
		}

		fs::copy(file, &temp).map_err(|e| RemoteError::io("copy into", &temp, e))?;
		fs::rename(&temp, location).map_err(|e| RemoteError::io("move into", location, e))?;

		tracing::debug!(key, location = %location.display(), "Stored annex content.");

		if temp.parent().is_some_and(|parent| fs::remove_dir(parent).is_err()) {
			self.host.info("Could not remove tempdir (not empty)");
		}

		Ok(())
	}

	fn retrieve(location: &Path, file: &Path) -> Result<(), RemoteError> {
		fs::copy(location, file).map_err(|e| RemoteError::io("read", location, e))?;

		Ok(())
	}

	fn checkpresent_at(&self, location: &Path) -> Result<bool, RemoteError> {
		self.ensure_available()?;

		Ok(location.is_file())
	}

	fn remove_at(&self, location: &Path) -> Result<(), RemoteError> {
		self.ensure_available()?;

		match fs::remove_file(location) {
			Err(e) if e.kind() != ErrorKind::NotFound => Err(RemoteError::io("remove", location, e)),
			_ => Ok(()),
		}
	}
}
impl Debug for DirectoryRemote {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		f.debug_struct("DirectoryRemote").field("directory", &self.directory()).finish()
	}
}
impl SpecialRemote for DirectoryRemote {
	fn initremote(&self) -> RemoteFuture<'_, ()> {
		Box::pin(async move {
			let directory = self.configured_directory()?;

			Self::mkdir(&directory)?;
			tracing::info!(directory = %directory.display(), "Initialized directory remote.");

			*self.directory.write() = Some(directory);

			Ok(())
		})
	}

	fn prepare(&self) -> RemoteFuture<'_, ()> {
		Box::pin(async move {
			let directory = self.configured_directory()?;

			if !directory.exists() {
				return Err(RemoteError::Unavailable {
					reason: format!("{} not found", directory.display()),
				});
			}

			*self.directory.write() = Some(directory);

			Ok(())
		})
	}

	fn transfer_store<'a>(&'a self, key: &'a str, file: &'a Path) -> RemoteFuture<'a, ()> {
		Box::pin(async move { self.store(key, file, &self.key_location(key)?) })
	}

	fn transfer_retrieve<'a>(&'a self, key: &'a str, file: &'a Path) -> RemoteFuture<'a, ()> {
		Box::pin(async move { Self::retrieve(&self.key_location(key)?, file) })
	}

	fn checkpresent<'a>(&'a self, key: &'a str) -> RemoteFuture<'a, bool> {
		Box::pin(async move { self.checkpresent_at(&self.key_location(key)?) })
	}

	fn remove<'a>(&'a self, key: &'a str) -> RemoteFuture<'a, ()> {
		Box::pin(async move { self.remove_at(&self.key_location(key)?) })
	}

	fn transferexport_store<'a>(
		&'a self,
		key: &'a str,
		local_file: &'a Path,
		remote_file: &'a str,
	) -> RemoteFuture<'a, ()> {
		Box::pin(async move { self.store(key, local_file, &self.export_location(remote_file)?) })
	}

	fn transferexport_retrieve<'a>(
		&'a self,
		_: &'a str,
		local_file: &'a Path,
		remote_file: &'a str,
	) -> RemoteFuture<'a, ()> {
		Box::pin(async move { Self::retrieve(&self.export_location(remote_file)?, local_file) })
	}

	fn checkpresentexport<'a>(&'a self, _: &'a str, remote_file: &'a str) -> RemoteFuture<'a, bool> {
		Box::pin(async move { self.checkpresent_at(&self.export_location(remote_file)?) })
	}

	fn removeexport<'a>(&'a self, _: &'a str, remote_file: &'a str) -> RemoteFuture<'a, ()> {
		Box::pin(async move { self.remove_at(&self.export_location(remote_file)?) })
	}

	fn removeexportdirectory<'a>(&'a self, remote_directory: &'a str) -> RemoteFuture<'a, ()> {
		Box::pin(async move {
			let location = self.export_location(remote_directory)?;

			match fs::remove_dir(&location) {
				Err(e) if e.kind() != ErrorKind::NotFound =>
					Err(RemoteError::io("remove directory", &location, e)),
				_ => Ok(()),
			}
		})
	}

	fn renameexport<'a>(
		&'a self,
		_: &'a str,
		filename: &'a str,
		new_filename: &'a str,
	) -> RemoteFuture<'a, ()> {
		Box::pin(async move {
			let from = self.export_location(filename)?;
			let to = self.export_location(new_filename)?;

			fs::rename(&from, &to).map_err(|e| RemoteError::io("rename", &from, e))
		})
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use tempfile::TempDir;
	// self
	use super::*;
	use crate::_preludet::*;

	fn remote_in(root: &Path) -> (Arc<RecordingHost>, DirectoryRemote) {
		let host = RecordingHost::new([("directory", root.to_str().expect("Temp path is UTF-8."))]);

		(host.clone(), DirectoryRemote::new(host))
	}

	#[tokio::test]
	async fn keys_round_trip_through_hash_directories() {
		let workspace = TempDir::new().expect("Temp dir should be created.");
		let root = workspace.path().join("remote");
		let source = workspace.path().join("source.txt");
		let target = workspace.path().join("target.txt");
		let (host, remote) = remote_in(&root);

		fs::write(&source, b"annexed").expect("Source file should be written.");
		remote.initremote().await.expect("initremote should create the directory.");
		remote.transfer_store("KEY-1", &source).await.expect("Store should succeed.");

		assert!(root.join("f87/4d5/KEY-1").is_file());
		assert!(!root.join("tmp").exists());
		assert!(host.messages().is_empty());
		assert!(remote.checkpresent("KEY-1").await.expect("checkpresent should succeed."));

		remote.transfer_retrieve("KEY-1", &target).await.expect("Retrieve should succeed.");

		assert_eq!(fs::read(&target).expect("Target should be readable."), b"annexed");

		remote.remove("KEY-1").await.expect("Remove should succeed.");
		remote.remove("KEY-1").await.expect("Removing a missing key is not an error.");

		assert!(!remote.checkpresent("KEY-1").await.expect("checkpresent should succeed."));
	}

	#[tokio::test]
	async fn configuration_and_availability_are_enforced() {
		let workspace = TempDir::new().expect("Temp dir should be created.");
		let root = workspace.path().join("missing");
		let unconfigured = DirectoryRemote::new(RecordingHost::new([]));
		let (_, remote) = remote_in(&root);

		assert!(matches!(
			unconfigured.initremote().await,
			Err(RemoteError::MissingConfig { name: "directory" })
		));
		assert!(matches!(remote.prepare().await, Err(RemoteError::Unavailable { .. })));
		assert!(matches!(remote.checkpresent("KEY").await, Err(RemoteError::Unavailable { .. })));
		assert!(matches!(remote.remove("KEY").await, Err(RemoteError::Unavailable { .. })));
	}

	#[tokio::test]
	async fn exports_live_at_their_remote_paths() {
		let workspace = TempDir::new().expect("Temp dir should be created.");
		let root = workspace.path().join("export");
		let source = workspace.path().join("report.csv");
		let (_, remote) = remote_in(&root);

		fs::write(&source, b"a,b").expect("Source file should be written.");
		remote.initremote().await.expect("initremote should create the directory.");
		remote.prepare().await.expect("prepare should find the directory.");
		remote
			.transferexport_store("KEY", &source, "reports/2026.csv")
			.await
			.expect("Export should succeed.");
		remote
			.renameexport("KEY", "reports/2026.csv", "reports/final.csv")
			.await
			.expect("Rename should succeed.");

		assert!(
			remote.checkpresentexport("KEY", "reports/final.csv").await.expect("Check should work.")
		);
		assert!(
			!remote.checkpresentexport("KEY", "reports/2026.csv").await.expect("Check should work.")
		);

		remote.removeexport("KEY", "reports/final.csv").await.expect("Remove should succeed.");
		remote.removeexportdirectory("reports").await.expect("Empty directory should be removed.");
		remote.removeexportdirectory("reports").await.expect("Missing directory is not an error.");

		assert!(!root.join("reports").exists());
	}
}
