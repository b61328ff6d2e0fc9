//! Session configuration.
//!
//! A [`Configuration`] is built once, either in code or from JSON, and handed
//! to [`LifecycleManager::new`](crate::LifecycleManager::new). It never
//! changes afterwards.
//!
//! ```json
//! {
//!   "lifecycle": {
//!     "appName": "Radio",
//!     "appId": "584421907",
//!     "appType": "MEDIA",
//!     "registrationTimeoutMs": 10000,
//!     "unregisterTimeoutMs": null
//!   },
//!   "lockScreen": { "enabled": true },
//!   "streaming": { "videoEnabled": false }
//! }
//! ```
//!
//! Timeouts set to `null` are disabled.

use std::path::Path;
use std::time::Duration;

use sdl_protocol::{AppHmiType, Language, MsgVersion, RegisterAppInterface};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const DEFAULT_REGISTRATION_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_UNREGISTER_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_MANAGER_SETUP_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_TERMINATE_TIMEOUT_MS: u64 = 2_000;

/// Complete, immutable session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
	pub lifecycle: LifecycleConfiguration,
	#[serde(default)]
	pub lock_screen: LockScreenConfiguration,
	/// Streaming settings; only media and navigation apps get a streaming manager.
	#[serde(default)]
	pub streaming: Option<StreamingConfiguration>,
}

/// Application identity and lifecycle timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleConfiguration {
	pub app_name: String,
	pub app_id: String,
	#[serde(default)]
	pub short_app_name: Option<String>,
	#[serde(default)]
	pub app_type: AppHmiType,
	#[serde(default)]
	pub additional_app_types: Vec<AppHmiType>,
	#[serde(default)]
	pub language: Language,
	#[serde(default)]
	pub hmi_display_language: Language,
	#[serde(default)]
	pub tts_name: Vec<String>,
	#[serde(default)]
	pub voice_recognition_synonyms: Vec<String>,
	#[serde(default = "default_registration_timeout_ms")]
	pub registration_timeout_ms: Option<u64>,
	#[serde(default = "default_unregister_timeout_ms")]
	pub unregister_timeout_ms: Option<u64>,
	#[serde(default = "default_manager_setup_timeout_ms")]
	pub manager_setup_timeout_ms: Option<u64>,
	#[serde(default = "default_terminate_timeout_ms")]
	pub terminate_timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockScreenConfiguration {
	#[serde(default = "default_true")]
	pub enabled: bool,
	#[serde(default)]
	pub show_in_optional_state: bool,
}

impl Default for LockScreenConfiguration {
	fn default() -> Self {
		Self {
			enabled: true,
			show_in_optional_state: false,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamingConfiguration {
	#[serde(default = "default_true")]
	pub audio_enabled: bool,
	#[serde(default = "default_true")]
	pub video_enabled: bool,
}

impl Default for StreamingConfiguration {
	fn default() -> Self {
		Self {
			audio_enabled: true,
			video_enabled: true,
		}
	}
}

fn default_true() -> bool {
	true
}

fn default_registration_timeout_ms() -> Option<u64> {
	Some(DEFAULT_REGISTRATION_TIMEOUT_MS)
}

fn default_unregister_timeout_ms() -> Option<u64> {
	Some(DEFAULT_UNREGISTER_TIMEOUT_MS)
}

fn default_manager_setup_timeout_ms() -> Option<u64> {
	Some(DEFAULT_MANAGER_SETUP_TIMEOUT_MS)
}

fn default_terminate_timeout_ms() -> u64 {
	DEFAULT_TERMINATE_TIMEOUT_MS
}

impl LifecycleConfiguration {
	pub fn new(app_name: impl Into<String>, app_id: impl Into<String>) -> Self {
		Self {
			app_name: app_name.into(),
			app_id: app_id.into(),
			short_app_name: None,
			app_type: AppHmiType::Default,
			additional_app_types: Vec::new(),
			language: Language::default(),
			hmi_display_language: Language::default(),
			tts_name: Vec::new(),
			voice_recognition_synonyms: Vec::new(),
			registration_timeout_ms: default_registration_timeout_ms(),
			unregister_timeout_ms: default_unregister_timeout_ms(),
			manager_setup_timeout_ms: default_manager_setup_timeout_ms(),
			terminate_timeout_ms: DEFAULT_TERMINATE_TIMEOUT_MS,
		}
	}

	fn app_types(&self) -> impl Iterator<Item = AppHmiType> + '_ {
		std::iter::once(self.app_type).chain(self.additional_app_types.iter().copied())
	}
}

impl Configuration {
	/// Creates a configuration with default lock-screen settings and no streaming.
	pub fn new(app_name: impl Into<String>, app_id: impl Into<String>) -> Self {
		Self {
			lifecycle: LifecycleConfiguration::new(app_name, app_id),
			lock_screen: LockScreenConfiguration::default(),
			streaming: None,
		}
	}

	/// Parses and validates a JSON configuration.
	pub fn from_json_str(json: &str) -> Result<Self> {
		let config: Configuration = serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
		config.validate()?;
		Ok(config)
	}

	/// Reads, parses and validates a JSON configuration file.
	pub fn from_file(path: &Path) -> Result<Self> {
		let json = std::fs::read_to_string(path).map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
		Self::from_json_str(&json)
	}

	pub fn validate(&self) -> Result<()> {
		if self.lifecycle.app_name.trim().is_empty() {
			return Err(Error::Config("appName must not be empty".to_string()));
		}
		if self.lifecycle.app_id.trim().is_empty() {
			return Err(Error::Config("appId must not be empty".to_string()));
		}
		if self.lifecycle.terminate_timeout_ms == 0 {
			return Err(Error::Config("terminateTimeoutMs must be greater than zero".to_string()));
		}
		Ok(())
	}

	pub fn with_app_type(mut self, app_type: AppHmiType) -> Self {
		self.lifecycle.app_type = app_type;
		self
	}

	pub fn with_short_app_name(mut self, name: Option<&str>) -> Self {
		self.lifecycle.short_app_name = name.map(str::to_string);
		self
	}

	pub fn with_language(mut self, language: Language) -> Self {
		self.lifecycle.hmi_display_language = language.clone();
		self.lifecycle.language = language;
		self
	}

	pub fn with_registration_timeout(mut self, timeout: Option<Duration>) -> Self {
		self.lifecycle.registration_timeout_ms = timeout.map(duration_ms);
		self
	}

	pub fn with_unregister_timeout(mut self, timeout: Option<Duration>) -> Self {
		self.lifecycle.unregister_timeout_ms = timeout.map(duration_ms);
		self
	}

	pub fn with_manager_setup_timeout(mut self, timeout: Option<Duration>) -> Self {
		self.lifecycle.manager_setup_timeout_ms = timeout.map(duration_ms);
		self
	}

	pub fn with_terminate_timeout(mut self, timeout: Duration) -> Self {
		self.lifecycle.terminate_timeout_ms = duration_ms(timeout).max(1);
		self
	}

	pub fn with_lock_screen(mut self, lock_screen: LockScreenConfiguration) -> Self {
		self.lock_screen = lock_screen;
		self
	}

	pub fn with_streaming(mut self, streaming: Option<StreamingConfiguration>) -> Self {
		self.streaming = streaming;
		self
	}

	pub fn registration_timeout(&self) -> Option<Duration> {
		self.lifecycle.registration_timeout_ms.map(Duration::from_millis)
	}

	pub fn unregister_timeout(&self) -> Option<Duration> {
		self.lifecycle.unregister_timeout_ms.map(Duration::from_millis)
	}

	pub fn manager_setup_timeout(&self) -> Option<Duration> {
		self.lifecycle.manager_setup_timeout_ms.map(Duration::from_millis)
	}

	pub fn terminate_timeout(&self) -> Duration {
		Duration::from_millis(self.lifecycle.terminate_timeout_ms)
	}

	pub fn is_media_application(&self) -> bool {
		self.lifecycle.app_types().any(|t| t == AppHmiType::Media)
	}

	/// `true` when the app type calls for a streaming manager.
	pub fn streams_media(&self) -> bool {
		self.lifecycle.app_types().any(AppHmiType::streams_media)
	}

	/// Builds the `RegisterAppInterface` params, resuming with `hash_id` when present.
	pub(crate) fn registration_params(&self, hash_id: Option<String>) -> RegisterAppInterface {
		let lifecycle = &self.lifecycle;
		RegisterAppInterface {
			sync_msg_version: MsgVersion::CURRENT,
			app_name: lifecycle.app_name.clone(),
			app_id: lifecycle.app_id.clone(),
			ngn_media_screen_app_name: lifecycle.short_app_name.clone(),
			tts_name: lifecycle.tts_name.clone(),
			vr_synonyms: lifecycle.voice_recognition_synonyms.clone(),
			is_media_application: self.is_media_application(),
			language_desired: lifecycle.language.clone(),
			hmi_display_language_desired: lifecycle.hmi_display_language.clone(),
			app_hmi_type: lifecycle.app_types().collect(),
			hash_id,
		}
	}
}

fn duration_ms(duration: Duration) -> u64 {
	u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn json_defaults_fill_timeouts() {
		let config = Configuration::from_json_str(r#"{ "lifecycle": { "appName": "Radio", "appId": "42" } }"#).unwrap();
		assert_eq!(config.registration_timeout(), Some(Duration::from_secs(10)));
		assert_eq!(config.unregister_timeout(), Some(Duration::from_secs(5)));
		assert_eq!(config.terminate_timeout(), Duration::from_secs(2));
		assert!(config.lock_screen.enabled);
		assert!(config.streaming.is_none());
	}

	#[test]
	fn null_timeout_disables_it() {
		let config = Configuration::from_json_str(r#"{ "lifecycle": { "appName": "Radio", "appId": "42", "registrationTimeoutMs": null } }"#).unwrap();
		assert_eq!(config.registration_timeout(), None);
	}

	#[test]
	fn empty_app_id_is_rejected() {
		let err = Configuration::from_json_str(r#"{ "lifecycle": { "appName": "Radio", "appId": " " } }"#).unwrap_err();
		assert!(matches!(err, Error::Config(msg) if msg.contains("appId")));
	}

	#[test]
	fn media_app_type_drives_registration_flags() {
		let config = Configuration::new("Radio", "42").with_app_type(AppHmiType::Media);
		assert!(config.is_media_application());
		assert!(config.streams_media());

		let params = config.registration_params(Some("hash".to_string()));
		assert!(params.is_media_application);
		assert_eq!(params.app_hmi_type, vec![AppHmiType::Media]);
		assert_eq!(params.hash_id.as_deref(), Some("hash"));
	}

	#[test]
	fn builder_timeouts_round_to_millis() {
		let config = Configuration::new("Radio", "42")
			.with_registration_timeout(None)
			.with_unregister_timeout(Some(Duration::from_millis(250)));
		assert_eq!(config.registration_timeout(), None);
		assert_eq!(config.unregister_timeout(), Some(Duration::from_millis(250)));
	}
}
