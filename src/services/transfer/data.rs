//! Transfer submission documents.

// self
use crate::{_prelude::*, auth::EndpointId, error::UsageError};

/// How the service decides that a destination file is already in sync.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SyncLevel {
	/// Skip files that exist at the destination.
	Exists,
	/// Skip files whose size matches.
	Size,
	/// Skip files whose modification time is not older.
	Mtime,
	/// Skip files whose checksum matches.
	Checksum,
}
impl SyncLevel {
	/// Wire value.
	pub const fn as_u8(self) -> u8 {
		match self {
			SyncLevel::Exists => 0,
			SyncLevel::Size => 1,
			SyncLevel::Mtime => 2,
			SyncLevel::Checksum => 3,
		}
	}
}
impl FromStr for SyncLevel {
	type Err = UsageError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"exists" | "0" => Ok(SyncLevel::Exists),
			"size" | "1" => Ok(SyncLevel::Size),
			"mtime" | "2" => Ok(SyncLevel::Mtime),
			"checksum" | "3" => Ok(SyncLevel::Checksum),
			_ => Err(UsageError::InvalidRequest { reason: format!("unknown sync level {s:?}") }),
		}
	}
}

/// One file or directory to transfer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TransferItem {
	#[serde(rename = "DATA_TYPE")]
	data_type: &'static str,
	/// Path on the source endpoint.
	pub source_path: String,
	/// Path on the destination endpoint.
	pub destination_path: String,
	/// Whether `source_path` is a directory to copy recursively.
	pub recursive: bool,
}

/// Immutable transfer submission produced by [`TransferData`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TransferDocument {
	#[serde(rename = "DATA_TYPE")]
	data_type: &'static str,
	#[serde(skip_serializing_if = "Option::is_none")]
	submission_id: Option<String>,
	source_endpoint: EndpointId,
	destination_endpoint: EndpointId,
	#[serde(skip_serializing_if = "Option::is_none")]
	label: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	sync_level: Option<u8>,
	verify_checksum: bool,
	preserve_timestamp: bool,
	encrypt_data: bool,
	#[serde(skip_serializing_if = "Option::is_none", with = "time::serde::rfc3339::option")]
	deadline: Option<OffsetDateTime>,
	#[serde(rename = "DATA")]
	items: Vec<TransferItem>,
}
impl TransferDocument {
	/// Submission id, once assigned.
	pub fn submission_id(&self) -> Option<&str> {
		self.submission_id.as_deref()
	}

	/// Source endpoint.
	pub fn source_endpoint(&self) -> &EndpointId {
		&self.source_endpoint
	}

	/// Destination endpoint.
	pub fn destination_endpoint(&self) -> &EndpointId {
		&self.destination_endpoint
	}

	/// Items to transfer.
	pub fn items(&self) -> &[TransferItem] {
		&self.items
	}

	/// Copy of the document carrying `submission_id`.
	pub fn with_submission_id(mut self, submission_id: impl Into<String>) -> Self {
		self.submission_id = Some(submission_id.into());

		self
	}

	/// JSON body sent to the service.
	pub fn to_json(&self) -> Result<Value> {
		serde_json::to_value(self).map_err(|e| {
			UsageError::InvalidRequest { reason: format!("transfer document is not serializable: {e}") }
				.into()
		})
	}
}

/// Builder for [`TransferDocument`].
#[derive(Clone, Debug)]
pub struct TransferData {
	document: TransferDocument,
}
impl TransferData {
	/// Starts a transfer between two endpoints.
	pub fn new(source_endpoint: EndpointId, destination_endpoint: EndpointId) -> Self {
		Self {
			document: TransferDocument {
				data_type: "transfer",
				submission_id: None,
				source_endpoint,
				destination_endpoint,
				label: None,
				sync_level: None,
				verify_checksum: false,
				preserve_timestamp: false,
				encrypt_data: false,
				deadline: None,
				items: Vec::new(),
			},
		}
	}

	/// Human-readable task label.
	pub fn label(mut self, label: impl Into<String>) -> Self {
		self.document.label = Some(label.into());

		self
	}

	/// Submission id obtained from the service beforehand.
	pub fn submission_id(mut self, submission_id: impl Into<String>) -> Self {
		self.document.submission_id = Some(submission_id.into());

		self
	}

	/// Skip files that are already in sync at the destination.
	pub fn sync_level(mut self, level: SyncLevel) -> Self {
		self.document.sync_level = Some(level.as_u8());

		self
	}

	/// Verify checksums after each file is transferred.
	pub fn verify_checksum(mut self, verify: bool) -> Self {
		self.document.verify_checksum = verify;

		self
	}

	/// Preserve modification times.
	pub fn preserve_timestamp(mut self, preserve: bool) -> Self {
		self.document.preserve_timestamp = preserve;

		self
	}

	/// Encrypt the data channel.
	pub fn encrypt_data(mut self, encrypt: bool) -> Self {
		self.document.encrypt_data = encrypt;

		self
	}

	/// Instant after which the service abandons the task.
	pub fn deadline(mut self, deadline: OffsetDateTime) -> Self {
		self.document.deadline = Some(deadline);

		self
	}

	/// Adds a file or directory.
	pub fn add_item(
		mut self,
		source_path: impl Into<String>,
		destination_path: impl Into<String>,
		recursive: bool,
	) -> Self {
		self.document.items.push(TransferItem {
			data_type: "transfer_item",
			source_path: source_path.into(),
			destination_path: destination_path.into(),
			recursive,
		});

		self
	}

	/// Finishes the document; at least one item is required.
	pub fn build(self) -> Result<TransferDocument, UsageError> {
		if self.document.items.is_empty() {
			return Err(UsageError::EmptyTransfer);
		}

		Ok(self.document)
	}
}
