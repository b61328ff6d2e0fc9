//! Fan-out of unsolicited peer notifications.
//!
//! Subscribers register per [`NotificationKind`] and are called in subscription
//! order. Every [`publish`](NotificationRouter::publish) works on a snapshot of
//! the subscriber list, so subscribing or unsubscribing from inside a handler
//! only affects later deliveries.
//!
//! `OnHMIStatus` notifications additionally update the shared HMI level cell
//! the lifecycle manager exposes to the host.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use sdl_protocol::{HmiLevel, OnHmiStatus, RpcNotification, function};
use tracing::{trace, warn};

/// Notification discriminator used as subscription key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum NotificationKind {
	HmiStatus,
	HashChange,
	PermissionsChange,
	DriverDistraction,
	LanguageChange,
	AppInterfaceUnregistered,
	/// Any other function name.
	Other(String),
}

impl NotificationKind {
	pub fn from_function(name: &str) -> Self {
		match name {
			function::ON_HMI_STATUS => NotificationKind::HmiStatus,
			function::ON_HASH_CHANGE => NotificationKind::HashChange,
			function::ON_PERMISSIONS_CHANGE => NotificationKind::PermissionsChange,
			function::ON_DRIVER_DISTRACTION => NotificationKind::DriverDistraction,
			function::ON_LANGUAGE_CHANGE => NotificationKind::LanguageChange,
			function::ON_APP_INTERFACE_UNREGISTERED => NotificationKind::AppInterfaceUnregistered,
			other => NotificationKind::Other(other.to_string()),
		}
	}
}

/// Handle returned by [`NotificationRouter::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Subscriber callback.
pub type NotificationHandler = Arc<dyn Fn(&RpcNotification) + Send + Sync + 'static>;

struct Subscription {
	id: SubscriptionId,
	kind: NotificationKind,
	handler: NotificationHandler,
}

/// HMI level change observed while publishing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HmiLevelChange {
	pub old: Option<HmiLevel>,
	pub new: HmiLevel,
}

/// Subscription table plus the shared HMI level.
pub struct NotificationRouter {
	next_id: AtomicU64,
	subscriptions: Mutex<Vec<Subscription>>,
	hmi_level: RwLock<Option<HmiLevel>>,
}

impl NotificationRouter {
	pub fn new() -> Self {
		Self {
			next_id: AtomicU64::new(0),
			subscriptions: Mutex::new(Vec::new()),
			hmi_level: RwLock::new(None),
		}
	}

	/// Registers `handler` for notifications of `kind`.
	pub fn subscribe<F>(&self, kind: NotificationKind, handler: F) -> SubscriptionId
	where
		F: Fn(&RpcNotification) + Send + Sync + 'static,
	{
		let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
		self.subscriptions.lock().push(Subscription {
			id,
			kind,
			handler: Arc::new(handler),
		});
		id
	}

	/// Removes a subscription. Returns `false` if it was already gone.
	pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
		let mut subscriptions = self.subscriptions.lock();
		let before = subscriptions.len();
		subscriptions.retain(|s| s.id != id);
		subscriptions.len() != before
	}

	pub fn subscriber_count(&self, kind: &NotificationKind) -> usize {
		self.subscriptions.lock().iter().filter(|s| &s.kind == kind).count()
	}

	/// Latest HMI level reported by the peer.
	pub fn hmi_level(&self) -> Option<HmiLevel> {
		*self.hmi_level.read()
	}

	/// Forgets the HMI level; used on disconnect.
	pub fn clear_hmi_level(&self) {
		*self.hmi_level.write() = None;
	}

	/// Delivers `notification` to every current subscriber of its kind.
	///
	/// Returns the HMI level change, if this was an `OnHMIStatus` that moved
	/// the level.
	pub fn publish(&self, notification: &RpcNotification) -> Option<HmiLevelChange> {
		let kind = NotificationKind::from_function(&notification.function);
		let change = if kind == NotificationKind::HmiStatus {
			self.apply_hmi_status(notification)
		} else {
			None
		};

		let handlers: Vec<NotificationHandler> = self
			.subscriptions
			.lock()
			.iter()
			.filter(|s| s.kind == kind)
			.map(|s| Arc::clone(&s.handler))
			.collect();

		trace!(
			target = "sdl.notifications",
			function = %notification.function,
			subscribers = handlers.len(),
			"publishing notification"
		);

		for handler in handlers {
			handler(notification);
		}
		change
	}

	fn apply_hmi_status(&self, notification: &RpcNotification) -> Option<HmiLevelChange> {
		let status: OnHmiStatus = match notification.payload() {
			Ok(status) => status,
			Err(err) => {
				warn!(target = "sdl.notifications", error = %err, "malformed OnHMIStatus ignored");
				return None;
			}
		};

		let mut level = self.hmi_level.write();
		let old = level.replace(status.hmi_level);
		if old == Some(status.hmi_level) {
			return None;
		}
		Some(HmiLevelChange { old, new: status.hmi_level })
	}
}

impl Default for NotificationRouter {
	fn default() -> Self {
		Self::new()
	}
}
