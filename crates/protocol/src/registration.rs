//! Registration handshake payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::message::RpcResponse;
use crate::result_code::ResultCode;

/// Protocol message version advertised during registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MsgVersion {
	pub major_version: u8,
	pub minor_version: u8,
	#[serde(default)]
	pub patch_version: u8,
}

impl MsgVersion {
	/// Version this crate speaks.
	pub const CURRENT: MsgVersion = MsgVersion {
		major_version: 4,
		minor_version: 5,
		patch_version: 0,
	};
}

impl std::fmt::Display for MsgVersion {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}.{}.{}", self.major_version, self.minor_version, self.patch_version)
	}
}

/// Language tag in the peer's spelling, e.g. `EN-US`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Language(pub String);

impl Language {
	pub fn new(tag: impl Into<String>) -> Self {
		Self(tag.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl Default for Language {
	fn default() -> Self {
		Self::new("EN-US")
	}
}

impl std::fmt::Display for Language {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.0)
	}
}

/// Category of application, which decides the HMI features it may use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppHmiType {
	#[default]
	Default,
	Communication,
	Media,
	Messaging,
	Navigation,
	Information,
	Social,
	BackgroundProcess,
	Testing,
	System,
	Projection,
}

impl AppHmiType {
	/// Types that stream audio or video to the peer.
	pub fn streams_media(self) -> bool {
		matches!(self, AppHmiType::Media | AppHmiType::Navigation | AppHmiType::Projection)
	}
}

/// Params of the `RegisterAppInterface` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterAppInterface {
	pub sync_msg_version: MsgVersion,
	pub app_name: String,
	#[serde(rename = "appID")]
	pub app_id: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub ngn_media_screen_app_name: Option<String>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub tts_name: Vec<String>,
	#[serde(default, skip_serializing_if = "Vec::is_empty", rename = "vrSynonyms")]
	pub vr_synonyms: Vec<String>,
	pub is_media_application: bool,
	pub language_desired: Language,
	pub hmi_display_language_desired: Language,
	#[serde(default, skip_serializing_if = "Vec::is_empty", rename = "appHMIType")]
	pub app_hmi_type: Vec<AppHmiType>,
	/// Resumption token from the previous session's last `OnHashChange`.
	#[serde(default, skip_serializing_if = "Option::is_none", rename = "hashID")]
	pub hash_id: Option<String>,
}

/// Vehicle identification returned on registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleType {
	#[serde(default)]
	pub make: Option<String>,
	#[serde(default)]
	pub model: Option<String>,
	#[serde(default)]
	pub model_year: Option<String>,
	#[serde(default)]
	pub trim: Option<String>,
}

/// Outcome of a successful registration handshake.
///
/// Capability blocks are kept as raw JSON; only the session core's own
/// bookkeeping fields are typed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResult {
	/// Result code of the registration response (e.g. `RESUME_FAILED`).
	#[serde(skip)]
	pub result_code: ResultCode,
	#[serde(default)]
	pub sync_msg_version: Option<MsgVersion>,
	#[serde(default)]
	pub language: Option<Language>,
	#[serde(default)]
	pub hmi_display_language: Option<Language>,
	#[serde(default)]
	pub supported_languages: Vec<Language>,
	#[serde(default)]
	pub display_capabilities: Option<JsonValue>,
	#[serde(default)]
	pub button_capabilities: Option<JsonValue>,
	#[serde(default)]
	pub hmi_capabilities: Option<JsonValue>,
	#[serde(default)]
	pub vehicle_type: Option<VehicleType>,
	#[serde(default)]
	pub sdl_version: Option<String>,
	#[serde(default)]
	pub system_software_version: Option<String>,
}

impl RegistrationResult {
	/// Reads the registration result out of a `RegisterAppInterface` response.
	pub fn from_response(response: &RpcResponse) -> Result<Self, serde_json::Error> {
		let mut result: RegistrationResult = response.payload()?;
		result.result_code = response.result_code;
		Ok(result)
	}

	/// `true` when the peer could not resume the previous session's state.
	pub fn resume_failed(&self) -> bool {
		self.result_code == ResultCode::ResumeFailed
	}
}
