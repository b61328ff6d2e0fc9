use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use sdl_protocol::{HmiLevel, OnHmiStatus};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{ManagerContext, ManagerError, ManagerFuture, ManagerKind, ManagerState, StateCell, SubordinateManager};
use crate::config::LockScreenConfiguration;
use crate::notification::{NotificationKind, NotificationRouter, SubscriptionId};

/// Whether the host should cover its UI while the vehicle is moving.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LockScreenStatus {
	#[default]
	Off,
	Optional,
	Required,
}

#[derive(Debug, Default)]
struct Inputs {
	hmi_level: Option<HmiLevel>,
	driver_distracted: bool,
}

impl Inputs {
	fn status(&self) -> LockScreenStatus {
		match self.hmi_level {
			Some(level) if level.is_foreground() => {
				if self.driver_distracted {
					LockScreenStatus::Required
				} else {
					LockScreenStatus::Optional
				}
			}
			_ => LockScreenStatus::Off,
		}
	}
}

#[derive(Debug, Deserialize)]
struct OnDriverDistraction {
	state: String,
}

/// Derives the lock screen status from HMI level and driver distraction.
pub struct LockScreenManager {
	configuration: LockScreenConfiguration,
	state: StateCell,
	inputs: Arc<RwLock<Inputs>>,
	subscriptions: Mutex<Option<(Arc<NotificationRouter>, Vec<SubscriptionId>)>>,
}

impl LockScreenManager {
	pub fn new(configuration: LockScreenConfiguration) -> Self {
		Self {
			configuration,
			state: StateCell::default(),
			inputs: Arc::default(),
			subscriptions: Mutex::new(None),
		}
	}

	pub fn state(&self) -> ManagerState {
		self.state.get()
	}

	pub fn status(&self) -> LockScreenStatus {
		if !self.configuration.enabled {
			return LockScreenStatus::Off;
		}
		self.inputs.read().status()
	}

	/// Whether the lock screen should currently be on screen.
	pub fn should_display(&self) -> bool {
		match self.status() {
			LockScreenStatus::Required => true,
			LockScreenStatus::Optional => self.configuration.show_in_optional_state,
			LockScreenStatus::Off => false,
		}
	}
}

impl SubordinateManager for LockScreenManager {
	fn kind(&self) -> ManagerKind {
		ManagerKind::LockScreen
	}

	fn dependencies(&self) -> &[ManagerKind] {
		&[ManagerKind::File]
	}

	fn is_required(&self) -> bool {
		false
	}

	fn start(&self, context: ManagerContext) -> ManagerFuture<'_> {
		Box::pin(async move {
			self.state.begin_start(ManagerKind::LockScreen)?;
			self.inputs.write().hmi_level = context.notifications.hmi_level();

			let inputs = Arc::clone(&self.inputs);
			let hmi = context.notifications.subscribe(NotificationKind::HmiStatus, move |notification| {
				if let Ok(status) = notification.payload::<OnHmiStatus>() {
					inputs.write().hmi_level = Some(status.hmi_level);
				}
			});

			let inputs = Arc::clone(&self.inputs);
			let distraction = context.notifications.subscribe(NotificationKind::DriverDistraction, move |notification| {
				match notification.payload::<OnDriverDistraction>() {
					Ok(dd) => {
						let distracted = dd.state == "DD_ON";
						inputs.write().driver_distracted = distracted;
						debug!(target = "sdl.managers", distracted, "driver distraction changed");
					}
					Err(err) => warn!(target = "sdl.managers", error = %err, "malformed OnDriverDistraction ignored"),
				}
			});

			*self.subscriptions.lock() = Some((context.notifications, vec![hmi, distraction]));
			self.state.set(ManagerState::Ready);
			Ok::<(), ManagerError>(())
		})
	}

	fn stop(&self) -> ManagerFuture<'_> {
		Box::pin(async move {
			if let Some((router, ids)) = self.subscriptions.lock().take() {
				for id in ids {
					router.unsubscribe(id);
				}
			}
			*self.inputs.write() = Inputs::default();
			self.state.set(ManagerState::Stopped);
			Ok(())
		})
	}
}

#[cfg(test)]
mod tests {
	use sdl_protocol::{RpcNotification, function};
	use serde_json::json;

	use super::*;
	use crate::config::Configuration;

	async fn started(configuration: LockScreenConfiguration) -> (LockScreenManager, Arc<NotificationRouter>) {
		let router = Arc::new(NotificationRouter::new());
		let manager = LockScreenManager::new(configuration);
		manager
			.start(ManagerContext {
				configuration: Arc::new(Configuration::new("Weather", "7")),
				notifications: Arc::clone(&router),
			})
			.await
			.unwrap();
		(manager, router)
	}

	fn distraction(state: &str) -> RpcNotification {
		RpcNotification::new(function::ON_DRIVER_DISTRACTION, json!({ "state": state }))
	}

	#[tokio::test]
	async fn required_only_in_foreground_while_distracted() {
		let (manager, router) = started(LockScreenConfiguration::default()).await;
		assert_eq!(manager.status(), LockScreenStatus::Off);

		router.publish(&distraction("DD_ON"));
		assert_eq!(manager.status(), LockScreenStatus::Off);

		router.publish(&RpcNotification::new(function::ON_HMI_STATUS, json!({ "hmiLevel": "FULL" })));
		assert_eq!(manager.status(), LockScreenStatus::Required);
		assert!(manager.should_display());

		router.publish(&distraction("DD_OFF"));
		assert_eq!(manager.status(), LockScreenStatus::Optional);
		assert!(!manager.should_display());
	}

	#[tokio::test]
	async fn disabled_lock_screen_stays_off() {
		let (manager, router) = started(LockScreenConfiguration {
			enabled: false,
			show_in_optional_state: true,
		})
		.await;
		router.publish(&RpcNotification::new(function::ON_HMI_STATUS, json!({ "hmiLevel": "FULL" })));
		router.publish(&distraction("DD_ON"));
		assert_eq!(manager.status(), LockScreenStatus::Off);
	}

	#[tokio::test]
	async fn stop_releases_subscriptions() {
		let (manager, router) = started(LockScreenConfiguration::default()).await;
		manager.stop().await.unwrap();
		assert_eq!(router.subscriber_count(&NotificationKind::HmiStatus), 0);
		assert_eq!(router.subscriber_count(&NotificationKind::DriverDistraction), 0);
		assert_eq!(manager.state(), ManagerState::Stopped);
	}
}
