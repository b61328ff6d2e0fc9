use parking_lot::Mutex;
use sdl_protocol::HmiLevel;
use tracing::{debug, info};

use super::{ManagerContext, ManagerError, ManagerFuture, ManagerKind, ManagerState, StateCell, SubordinateManager};
use crate::config::StreamingConfiguration;

/// Audio/video streaming session state for media and navigation apps.
///
/// Streaming may only run while the app is in the foreground; the host asks
/// [`can_stream`](Self::can_stream) before opening a stream.
pub struct StreamingMediaManager {
	configuration: StreamingConfiguration,
	state: StateCell,
	context: Mutex<Option<ManagerContext>>,
}

impl StreamingMediaManager {
	pub fn new(configuration: StreamingConfiguration) -> Self {
		Self {
			configuration,
			state: StateCell::default(),
			context: Mutex::new(None),
		}
	}

	pub fn state(&self) -> ManagerState {
		self.state.get()
	}

	pub fn configuration(&self) -> &StreamingConfiguration {
		&self.configuration
	}

	/// Whether a stream may be opened right now.
	pub fn can_stream(&self) -> bool {
		if self.state.get() != ManagerState::Ready {
			return false;
		}
		self.context
			.lock()
			.as_ref()
			.and_then(|context| context.notifications.hmi_level())
			.is_some_and(HmiLevel::is_foreground)
	}
}

impl SubordinateManager for StreamingMediaManager {
	fn kind(&self) -> ManagerKind {
		ManagerKind::Streaming
	}

	fn is_required(&self) -> bool {
		false
	}

	fn start(&self, context: ManagerContext) -> ManagerFuture<'_> {
		Box::pin(async move {
			self.state.begin_start(ManagerKind::Streaming)?;
			if !self.configuration.audio_enabled && !self.configuration.video_enabled {
				self.state.set(ManagerState::Error);
				return Err(ManagerError::Failed("neither audio nor video streaming is enabled".to_string()));
			}
			*self.context.lock() = Some(context);
			self.state.set(ManagerState::Ready);
			info!(
				target = "sdl.managers",
				audio = self.configuration.audio_enabled,
				video = self.configuration.video_enabled,
				"streaming manager ready"
			);
			Ok(())
		})
	}

	fn stop(&self) -> ManagerFuture<'_> {
		Box::pin(async move {
			self.context.lock().take();
			self.state.set(ManagerState::Stopped);
			debug!(target = "sdl.managers", "streaming manager stopped");
			Ok(())
		})
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use sdl_protocol::{RpcNotification, function};
	use serde_json::json;

	use super::*;
	use crate::config::Configuration;
	use crate::notification::NotificationRouter;

	#[tokio::test]
	async fn streams_only_in_foreground() {
		let router = Arc::new(NotificationRouter::new());
		let manager = StreamingMediaManager::new(StreamingConfiguration::default());
		manager
			.start(ManagerContext {
				configuration: Arc::new(Configuration::new("Maps", "8")),
				notifications: Arc::clone(&router),
			})
			.await
			.unwrap();
		assert!(!manager.can_stream());

		router.publish(&RpcNotification::new(function::ON_HMI_STATUS, json!({ "hmiLevel": "LIMITED" })));
		assert!(manager.can_stream());

		manager.stop().await.unwrap();
		assert!(!manager.can_stream());
	}

	#[tokio::test]
	async fn fails_when_nothing_to_stream() {
		let manager = StreamingMediaManager::new(StreamingConfiguration {
			audio_enabled: false,
			video_enabled: false,
		});
		let err = manager
			.start(ManagerContext {
				configuration: Arc::new(Configuration::new("Maps", "8")),
				notifications: Arc::new(NotificationRouter::new()),
			})
			.await
			.unwrap_err();
		assert!(matches!(err, ManagerError::Failed(_)));
		assert_eq!(manager.state(), ManagerState::Error);
	}
}
