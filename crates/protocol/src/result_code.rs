use serde::{Deserialize, Serialize};

/// Result code carried by every response.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultCode {
	#[default]
	Success,
	Warnings,
	ResumeFailed,
	WrongLanguage,
	UnsupportedResource,
	InvalidData,
	InvalidId,
	Rejected,
	Disallowed,
	Aborted,
	TimedOut,
	OutOfMemory,
	TooManyPendingRequests,
	DuplicateName,
	UnsupportedVersion,
	ApplicationNotRegistered,
	ApplicationRegisteredAlready,
	GenericError,
	/// Any code this crate does not know about.
	#[serde(other)]
	Unknown,
}

impl ResultCode {
	/// Codes the peer sends alongside `success: true`.
	pub fn is_success_kind(self) -> bool {
		matches!(
			self,
			ResultCode::Success | ResultCode::Warnings | ResultCode::ResumeFailed | ResultCode::WrongLanguage | ResultCode::UnsupportedResource
		)
	}
}

impl std::fmt::Display for ResultCode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match serde_json::to_value(self) {
			Ok(serde_json::Value::String(code)) => f.write_str(&code),
			_ => write!(f, "{self:?}"),
		}
	}
}
