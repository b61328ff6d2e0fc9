//! Lifecycle states and the transition table.

use serde::Serialize;

/// Where the session currently is in its bring-up / teardown sequence.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LifecycleState {
	#[default]
	Disconnected,
	TransportConnected,
	Registered,
	SettingUpManagers,
	PostManagerProcessing,
	Unregistering,
	Ready,
}

impl LifecycleState {
	pub const ALL: [LifecycleState; 7] = [
		LifecycleState::Disconnected,
		LifecycleState::TransportConnected,
		LifecycleState::Registered,
		LifecycleState::SettingUpManagers,
		LifecycleState::PostManagerProcessing,
		LifecycleState::Unregistering,
		LifecycleState::Ready,
	];

	/// Returns `true` if `next` is reachable from `self` in one step.
	pub fn can_transition_to(self, next: LifecycleState) -> bool {
		use LifecycleState as S;
		match self {
			S::Disconnected => next == S::TransportConnected,
			S::TransportConnected => matches!(next, S::Registered | S::Disconnected | S::Unregistering),
			S::Registered => matches!(next, S::SettingUpManagers | S::Unregistering),
			S::SettingUpManagers => matches!(next, S::PostManagerProcessing | S::Unregistering),
			S::PostManagerProcessing => matches!(next, S::Ready | S::Unregistering),
			S::Ready => next == S::Unregistering,
			S::Unregistering => next == S::Disconnected,
		}
	}

	/// States in which the peer has accepted the registration.
	pub fn is_registered(self) -> bool {
		matches!(
			self,
			LifecycleState::Registered | LifecycleState::SettingUpManagers | LifecycleState::PostManagerProcessing | LifecycleState::Ready
		)
	}

	pub fn as_str(self) -> &'static str {
		match self {
			LifecycleState::Disconnected => "TransportDisconnected",
			LifecycleState::TransportConnected => "TransportConnected",
			LifecycleState::Registered => "Registered",
			LifecycleState::SettingUpManagers => "SettingUpManagers",
			LifecycleState::PostManagerProcessing => "PostManagerProcessing",
			LifecycleState::Unregistering => "Unregistering",
			LifecycleState::Ready => "Ready",
		}
	}
}

impl std::fmt::Display for LifecycleState {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}
