//! Subordinate capability managers.
//!
//! The lifecycle core does not know what a manager does internally. It only
//! needs the start/stop contract below, the manager's kind, and which other
//! kinds must be running first. The built-in implementations in this module
//! cover the session-facing part of each manager (state tracking and the
//! notifications they react to); hosts can replace any of them through
//! [`LifecycleManagerBuilder::manager`](crate::LifecycleManagerBuilder::manager).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use downcast_rs::{DowncastSync, impl_downcast};
use parking_lot::Mutex;
use thiserror::Error;

use crate::config::Configuration;
use crate::notification::NotificationRouter;

mod file;
mod lock_screen;
mod permission;
mod streaming;

pub use file::FileManager;
pub use lock_screen::{LockScreenManager, LockScreenStatus};
pub use permission::{HmiPermissions, PermissionManager};
pub use streaming::StreamingMediaManager;

/// Which capability a manager provides.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ManagerKind {
	File,
	Permission,
	Streaming,
	LockScreen,
}

impl std::fmt::Display for ManagerKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			ManagerKind::File => write!(f, "file"),
			ManagerKind::Permission => write!(f, "permission"),
			ManagerKind::Streaming => write!(f, "streaming"),
			ManagerKind::LockScreen => write!(f, "lock screen"),
		}
	}
}

/// Failure reported by a manager's start or stop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManagerError {
	#[error("{0}")]
	Failed(String),
	#[error("dependency {0} manager is not available")]
	DependencyUnavailable(ManagerKind),
	#[error("timed out after {0:?}")]
	TimedOut(Duration),
}

/// Coarse state every built-in manager reports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ManagerState {
	#[default]
	Stopped,
	Starting,
	Ready,
	Error,
}

/// What a manager gets to see while starting.
#[derive(Clone)]
pub struct ManagerContext {
	pub configuration: Arc<Configuration>,
	pub notifications: Arc<NotificationRouter>,
}

pub type ManagerFuture<'a> = Pin<Box<dyn Future<Output = Result<(), ManagerError>> + Send + 'a>>;

/// Start/stop contract of a subordinate manager.
///
/// Implementations use interior mutability; the lifecycle core calls `start`
/// and `stop` through shared handles from its own tasks.
pub trait SubordinateManager: DowncastSync {
	fn kind(&self) -> ManagerKind;

	/// Kinds that must have started successfully before this one starts.
	fn dependencies(&self) -> &[ManagerKind] {
		&[]
	}

	/// Whether a start failure aborts the whole session bring-up.
	fn is_required(&self) -> bool {
		true
	}

	fn start(&self, context: ManagerContext) -> ManagerFuture<'_>;

	fn stop(&self) -> ManagerFuture<'_>;
}

impl_downcast!(sync SubordinateManager);

/// Shared handle to a manager.
pub type ManagerHandle = Arc<dyn SubordinateManager>;

/// Builds the default manager set for `configuration`.
///
/// The streaming manager is only included for app types that stream media.
pub fn default_managers(configuration: &Configuration) -> Vec<ManagerHandle> {
	let mut managers: Vec<ManagerHandle> = vec![
		Arc::new(FileManager::new()),
		Arc::new(PermissionManager::new()),
		Arc::new(LockScreenManager::new(configuration.lock_screen.clone())),
	];
	if configuration.streams_media() {
		let streaming = configuration.streaming.clone().unwrap_or_default();
		managers.push(Arc::new(StreamingMediaManager::new(streaming)));
	}
	managers
}

/// State cell shared by the built-in managers.
#[derive(Debug, Default)]
pub(crate) struct StateCell(Mutex<ManagerState>);

impl StateCell {
	pub(crate) fn get(&self) -> ManagerState {
		*self.0.lock()
	}

	pub(crate) fn set(&self, state: ManagerState) {
		*self.0.lock() = state;
	}

	/// Moves to `Starting`; fails if the manager is already running.
	pub(crate) fn begin_start(&self, kind: ManagerKind) -> Result<(), ManagerError> {
		let mut state = self.0.lock();
		if matches!(*state, ManagerState::Starting | ManagerState::Ready) {
			return Err(ManagerError::Failed(format!("{kind} manager is already started")));
		}
		*state = ManagerState::Starting;
		Ok(())
	}
}
