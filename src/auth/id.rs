//! Service identifiers.
//!
//! Clients and tasks are addressed by UUID. Endpoints accept a UUID or a legacy `owner#name`
//! display name, which older deployments still resolve. UUIDs are stored in their lowercase
//! hyphenated form so equal ids compare equal however they were written.

// std
use std::ops::Deref;
// crates.io
use uuid::Uuid;
// self
use crate::_prelude::*;

/// Identifier that failed to parse.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum IdentifierError {
	/// A client or task id that is not a UUID.
	#[error("{kind} id {value:?} is not a UUID.")]
	NotUuid {
		/// Kind of identifier.
		kind: &'static str,
		/// Rejected input.
		value: String,
	},
	/// An endpoint id that is neither a UUID nor an `owner#name` legacy name.
	#[error("Endpoint id {value:?} is neither a UUID nor an owner#name legacy name.")]
	NotEndpoint {
		/// Rejected input.
		value: String,
	},
}

/// Registered OAuth client.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClientId(String);
impl ClientId {
	/// Parses a client UUID.
	pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
		canonical_uuid("Client", value.as_ref()).map(Self)
	}
}

/// Transfer task.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskId(String);
impl TaskId {
	/// Parses a task UUID.
	pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
		canonical_uuid("Task", value.as_ref()).map(Self)
	}
}

/// Transfer endpoint, by UUID or legacy `owner#name`.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EndpointId(String);
impl EndpointId {
	/// Parses an endpoint UUID or legacy name.
	pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
		let value = value.as_ref();

		if let Ok(uuid) = Uuid::parse_str(value) {
			return Ok(Self(uuid.hyphenated().to_string()));
		}

		match value.split_once('#') {
			Some((owner, name))
				if !owner.is_empty()
					&& !name.is_empty()
					&& !name.contains('#')
					&& !value.chars().any(|c| c.is_whitespace() || c == '/') =>
				Ok(Self(value.to_owned())),
			_ => Err(IdentifierError::NotEndpoint { value: value.to_owned() }),
		}
	}

	/// Owner and name of a legacy endpoint name; `None` for UUIDs.
	pub fn legacy_name(&self) -> Option<(&str, &str)> {
		self.0.split_once('#')
	}
}

fn canonical_uuid(kind: &'static str, value: &str) -> Result<String, IdentifierError> {
	Uuid::parse_str(value)
		.map(|uuid| uuid.hyphenated().to_string())
		.map_err(|_| IdentifierError::NotUuid { kind, value: value.to_owned() })
}

// String views shared by every id.
macro_rules! impl_str_views {
	($($name:ident),+) => {$(
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &str {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, "{}({})", stringify!($name), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				Self::new(value)
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
	)+};
}
impl_str_views!(ClientId, EndpointId, TaskId);

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn uuids_are_canonicalized() {
		let task = TaskId::new("{DDB59AEF-6D04-11E5-BA46-22000B92C6EC}")
			.expect("Braced uppercase UUID should parse.");
		let endpoint = EndpointId::new("ddb59aef6d0411e5ba4622000b92c6ec")
			.expect("Simple UUID should parse.");

		assert_eq!(&*task, "ddb59aef-6d04-11e5-ba46-22000b92c6ec");
		assert_eq!(&*endpoint, "ddb59aef-6d04-11e5-ba46-22000b92c6ec");
		assert_eq!(endpoint.legacy_name(), None);
		assert_eq!(format!("{task:?}"), "TaskId(ddb59aef-6d04-11e5-ba46-22000b92c6ec)");
	}

	#[test]
	fn legacy_endpoint_names_are_accepted_only_for_endpoints() {
		let endpoint = EndpointId::new("go#ep1").expect("Legacy name should parse.");

		assert_eq!(endpoint.legacy_name(), Some(("go", "ep1")));
		assert!(matches!(
			ClientId::new("go#ep1"),
			Err(IdentifierError::NotUuid { kind: "Client", .. })
		));

		for bad in ["", "ep1", "#ep1", "go#", "go#ep#1", "go#my ep", "go#a/b"] {
			assert!(
				matches!(EndpointId::new(bad), Err(IdentifierError::NotEndpoint { .. })),
				"{bad:?} should be rejected."
			);
		}
	}

	#[test]
	fn deserialization_validates() {
		let task: TaskId = serde_json::from_str("\"DDB59AEF-6D04-11E5-BA46-22000B92C6EC\"")
			.expect("UUID task id should deserialize.");

		assert_eq!(
			serde_json::to_string(&task).expect("Task id should serialize."),
			"\"ddb59aef-6d04-11e5-ba46-22000b92c6ec\""
		);
		assert!(serde_json::from_str::<TaskId>("\"task-1\"").is_err());
		assert!(serde_json::from_str::<EndpointId>("\" ep\"").is_err());
	}
}
