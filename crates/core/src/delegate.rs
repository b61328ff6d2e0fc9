//! Host-facing lifecycle notifications.

use sdl_protocol::HmiLevel;

/// Receives lifecycle events from a [`LifecycleManager`](crate::LifecycleManager).
///
/// The manager only holds a weak reference and upgrades it for each dispatch;
/// dropping the delegate silently stops delivery. Methods run on the
/// lifecycle task and must not block.
pub trait ManagerDelegate: Send + Sync {
	/// The session reached `Ready`; fired after the ready callback.
	fn manager_did_become_ready(&self) {}

	/// The session returned to `Disconnected` after having left it.
	fn manager_did_disconnect(&self);

	/// The app's HMI level changed. Changes seen before `Ready` are coalesced
	/// and delivered once, right before the session becomes ready.
	fn hmi_level_did_change(&self, old: Option<HmiLevel>, new: HmiLevel);
}
