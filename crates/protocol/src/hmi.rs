//! HMI state payloads.

use serde::{Deserialize, Serialize};

/// Visibility/focus of the application on the peer's UI.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HmiLevel {
	Full,
	Limited,
	Background,
	None,
}

impl HmiLevel {
	/// `true` for levels in which the app is shown or audible.
	pub fn is_foreground(self) -> bool {
		matches!(self, HmiLevel::Full | HmiLevel::Limited)
	}
}

impl std::fmt::Display for HmiLevel {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			HmiLevel::Full => write!(f, "FULL"),
			HmiLevel::Limited => write!(f, "LIMITED"),
			HmiLevel::Background => write!(f, "BACKGROUND"),
			HmiLevel::None => write!(f, "NONE"),
		}
	}
}

/// Params of `OnHMIStatus`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnHmiStatus {
	pub hmi_level: HmiLevel,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub audio_streaming_state: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub system_context: Option<String>,
}

/// Params of `OnHashChange`: the peer's resumption token for this app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnHashChange {
	#[serde(rename = "hashID")]
	pub hash_id: String,
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn hmi_status_parses_wire_level() {
		let status: OnHmiStatus = serde_json::from_value(json!({ "hmiLevel": "BACKGROUND", "systemContext": "MAIN" })).unwrap();
		assert_eq!(status.hmi_level, HmiLevel::Background);
		assert_eq!(status.system_context.as_deref(), Some("MAIN"));
		assert!(!status.hmi_level.is_foreground());
	}

	#[test]
	fn hash_change_uses_upper_case_id_key() {
		let change: OnHashChange = serde_json::from_value(json!({ "hashID": "abc123" })).unwrap();
		assert_eq!(change.hash_id, "abc123");
	}
}
