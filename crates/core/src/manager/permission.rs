use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use sdl_protocol::HmiLevel;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{ManagerContext, ManagerError, ManagerFuture, ManagerKind, ManagerState, StateCell, SubordinateManager};
use crate::notification::{NotificationKind, NotificationRouter, SubscriptionId};

/// Per-RPC HMI-level permissions as last reported by `OnPermissionsChange`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HmiPermissions {
	#[serde(default)]
	pub allowed: Vec<HmiLevel>,
	#[serde(default)]
	pub user_disallowed: Vec<HmiLevel>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PermissionItem {
	rpc_name: String,
	#[serde(default)]
	hmi_permissions: HmiPermissions,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OnPermissionsChange {
	#[serde(default)]
	permission_item: Vec<PermissionItem>,
}

type PermissionTable = Arc<RwLock<HashMap<String, HmiPermissions>>>;

/// Keeps the peer's RPC permission table current.
#[derive(Default)]
pub struct PermissionManager {
	state: StateCell,
	permissions: PermissionTable,
	subscription: Mutex<Option<(Arc<NotificationRouter>, SubscriptionId)>>,
}

impl PermissionManager {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn state(&self) -> ManagerState {
		self.state.get()
	}

	/// Permissions for `rpc_name`, if the peer has reported any.
	pub fn permissions(&self, rpc_name: &str) -> Option<HmiPermissions> {
		self.permissions.read().get(rpc_name).cloned()
	}

	/// Whether `rpc_name` may be sent at `level`.
	pub fn is_rpc_allowed(&self, rpc_name: &str, level: HmiLevel) -> bool {
		self.permissions
			.read()
			.get(rpc_name)
			.is_some_and(|p| p.allowed.contains(&level) && !p.user_disallowed.contains(&level))
	}
}

impl SubordinateManager for PermissionManager {
	fn kind(&self) -> ManagerKind {
		ManagerKind::Permission
	}

	fn start(&self, context: ManagerContext) -> ManagerFuture<'_> {
		Box::pin(async move {
			self.state.begin_start(ManagerKind::Permission)?;

			let table = Arc::clone(&self.permissions);
			let id = context.notifications.subscribe(NotificationKind::PermissionsChange, move |notification| {
				let change: OnPermissionsChange = match notification.payload() {
					Ok(change) => change,
					Err(err) => {
						warn!(target = "sdl.managers", error = %err, "malformed OnPermissionsChange ignored");
						return;
					}
				};
				let mut table = table.write();
				for item in change.permission_item {
					table.insert(item.rpc_name, item.hmi_permissions);
				}
				debug!(target = "sdl.managers", rpcs = table.len(), "permissions updated");
			});
			*self.subscription.lock() = Some((context.notifications, id));

			self.state.set(ManagerState::Ready);
			Ok::<(), ManagerError>(())
		})
	}

	fn stop(&self) -> ManagerFuture<'_> {
		Box::pin(async move {
			if let Some((router, id)) = self.subscription.lock().take() {
				router.unsubscribe(id);
			}
			self.permissions.write().clear();
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

	fn context(router: &Arc<NotificationRouter>) -> ManagerContext {
		ManagerContext {
			configuration: Arc::new(Configuration::new("Weather", "7")),
			notifications: Arc::clone(router),
		}
	}

	#[tokio::test]
	async fn tracks_permission_changes_until_stopped() {
		let router = Arc::new(NotificationRouter::new());
		let manager = PermissionManager::new();
		manager.start(context(&router)).await.unwrap();
		assert_eq!(manager.state(), ManagerState::Ready);

		router.publish(&RpcNotification::new(
			function::ON_PERMISSIONS_CHANGE,
			json!({
				"permissionItem": [{
					"rpcName": "Show",
					"hmiPermissions": { "allowed": ["FULL", "LIMITED"], "userDisallowed": ["LIMITED"] }
				}]
			}),
		));

		assert!(manager.is_rpc_allowed("Show", HmiLevel::Full));
		assert!(!manager.is_rpc_allowed("Show", HmiLevel::Limited));
		assert!(!manager.is_rpc_allowed("Alert", HmiLevel::Full));

		manager.stop().await.unwrap();
		assert_eq!(router.subscriber_count(&NotificationKind::PermissionsChange), 0);
		assert!(manager.permissions("Show").is_none());
	}
}
