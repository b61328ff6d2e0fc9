//! Error types for the session core.

use sdl_protocol::{CorrelationId, ResultCode};
use thiserror::Error;

use crate::manager::ManagerKind;
use crate::state::LifecycleState;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Every failure the session core reports.
///
/// Variants own their data so one error can be handed to many completions
/// when the correlation registry is flushed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
	/// Connection lost or never established.
	#[error("transport error: {0}")]
	Transport(String),

	/// Peer rejected the registration handshake, or it timed out.
	#[error("registration failed: {message}")]
	Registration { result_code: Option<ResultCode>, message: String },

	/// A required subordinate manager failed to start.
	#[error("{manager} manager failed to start: {message}")]
	ManagerSetup { manager: ManagerKind, message: String },

	/// Every correlation id is in flight.
	#[error("no correlation id available: {0} requests pending")]
	Saturation(usize),

	/// The API was called in a way the current session does not allow.
	#[error("usage error: {0}")]
	Usage(String),

	/// The request was dropped by a teardown flush.
	#[error("request cancelled: {0}")]
	Cancelled(String),

	/// The peer answered the request with a failure result code.
	#[error("{function} rejected by peer ({result_code}): {info}")]
	Rejected {
		function: String,
		result_code: ResultCode,
		info: String,
	},

	/// Inbound or outbound message could not be encoded/decoded.
	#[error("protocol error: {0}")]
	Protocol(String),

	/// The state machine was asked to perform a transition outside its table.
	#[error("invalid lifecycle transition from {from} to {to}")]
	InvalidTransition { from: LifecycleState, to: LifecycleState },

	/// A correlation id was registered twice.
	#[error("correlation id {0} is already pending")]
	Conflict(CorrelationId),

	#[error("configuration error: {0}")]
	Config(String),
}

impl Error {
	pub fn is_transport(&self) -> bool {
		matches!(self, Error::Transport(_))
	}

	pub fn is_registration(&self) -> bool {
		matches!(self, Error::Registration { .. })
	}

	pub fn is_manager_setup(&self) -> bool {
		matches!(self, Error::ManagerSetup { .. })
	}

	pub fn is_cancelled(&self) -> bool {
		matches!(self, Error::Cancelled(_))
	}

	pub fn is_usage(&self) -> bool {
		matches!(self, Error::Usage(_))
	}

	pub(crate) fn registration_rejected(result_code: ResultCode, info: Option<&str>) -> Self {
		Error::Registration {
			result_code: Some(result_code),
			message: info.map_or_else(|| format!("peer answered {result_code}"), |info| format!("peer answered {result_code}: {info}")),
		}
	}
}

impl From<serde_json::Error> for Error {
	fn from(err: serde_json::Error) -> Self {
		Error::Protocol(err.to_string())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn registration_rejection_mentions_code_and_info() {
		let err = Error::registration_rejected(ResultCode::DuplicateName, Some("name in use"));
		assert!(err.is_registration());
		assert_eq!(err.to_string(), "registration failed: peer answered DUPLICATE_NAME: name in use");
	}

	#[test]
	fn manager_setup_names_the_manager() {
		let err = Error::ManagerSetup {
			manager: ManagerKind::File,
			message: "disk full".to_string(),
		};
		assert_eq!(err.to_string(), "file manager failed to start: disk full");
	}

	#[test]
	fn json_errors_become_protocol_errors() {
		let err: Error = serde_json::from_str::<u8>("nope").unwrap_err().into();
		assert!(matches!(err, Error::Protocol(_)));
	}
}
