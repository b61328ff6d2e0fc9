//! Session lifecycle facade.
//!
//! [`LifecycleManager`] is the entry point a host app talks to. Every call is
//! turned into a command for the lifecycle task (see `machine`), so the
//! facade never blocks and never touches session state directly.
//!
//! # Bring-up
//!
//! ```text
//! Disconnected ─connect─▶ TransportConnected ─RegisterAppInterface ok─▶ Registered
//!     ▲                        │ failure / timeout / link lost              │
//!     │◀───────────────────────┘                                            ▼
//!     │                                                           SettingUpManagers
//!     │                                                                     │ managers up
//!     │                                                                     ▼
//!     └──── Unregistering ◀── stop / link lost / setup failure ── PostManagerProcessing ─▶ Ready
//! ```
//!
//! The ready handler passed to [`start`](LifecycleManager::start) fires
//! exactly once per cycle. A cycle ends whenever the session is back in
//! `Disconnected`; the host then calls `start` again to retry.

mod machine;

use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use sdl_protocol::{CorrelationId, HmiLevel, RegistrationResult, RpcNotification, RpcRequest, RpcResponse};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, warn};

use self::machine::{Command, LifecycleMachine, MachineParts, SharedStatus};
use crate::config::Configuration;
use crate::correlation::Completion;
use crate::delegate::ManagerDelegate;
use crate::error::{Error, Result};
use crate::manager::{
	FileManager, LockScreenManager, ManagerHandle, ManagerKind, PermissionManager, StreamingMediaManager, SubordinateManager, default_managers,
};
use crate::notification::{NotificationKind, NotificationRouter, SubscriptionId};
use crate::state::LifecycleState;
use crate::transport::TransportParts;

/// One-shot handler receiving the outcome of a start cycle.
pub type ReadyHandler = Box<dyn FnOnce(Result<()>) + Send + 'static>;

/// Builder for [`LifecycleManager`].
pub struct LifecycleManagerBuilder {
	configuration: Configuration,
	delegate: Option<Weak<dyn ManagerDelegate>>,
	managers: Vec<ManagerHandle>,
}

impl LifecycleManagerBuilder {
	/// Sets the delegate. Only a weak reference is kept.
	pub fn delegate<D: ManagerDelegate + 'static>(mut self, delegate: &Arc<D>) -> Self {
		let delegate: Weak<dyn ManagerDelegate> = Arc::downgrade(delegate) as Weak<dyn ManagerDelegate>;
		self.delegate = Some(delegate);
		self
	}

	/// Replaces the built-in manager of the same kind, or adds one.
	pub fn manager(mut self, manager: ManagerHandle) -> Self {
		let kind = manager.kind();
		match self.managers.iter_mut().find(|m| m.kind() == kind) {
			Some(slot) => *slot = manager,
			None => self.managers.push(manager),
		}
		self
	}

	/// Drops the manager of `kind` from the set.
	pub fn without_manager(mut self, kind: ManagerKind) -> Self {
		self.managers.retain(|m| m.kind() != kind);
		self
	}

	/// Validates the configuration and spawns the lifecycle task.
	///
	/// Must be called from within a tokio runtime.
	pub fn build(self, transport: TransportParts) -> Result<LifecycleManager> {
		self.configuration.validate()?;
		let runtime = tokio::runtime::Handle::try_current().map_err(|_| Error::Usage("LifecycleManager must be built inside a tokio runtime".to_string()))?;

		let configuration = Arc::new(self.configuration);
		let status = Arc::new(RwLock::new(SharedStatus::default()));
		let router = Arc::new(NotificationRouter::new());
		let managers = Arc::new(self.managers);
		let (state_tx, state_rx) = watch::channel(LifecycleState::Disconnected);
		let (commands_tx, commands) = mpsc::unbounded_channel();

		debug!(
			target = "sdl.lifecycle",
			app = %configuration.lifecycle.app_name,
			managers = ?managers.iter().map(|m| m.kind()).collect::<Vec<_>>(),
			"building lifecycle manager"
		);

		let machine = LifecycleMachine::new(MachineParts {
			configuration: Arc::clone(&configuration),
			status: Arc::clone(&status),
			state_tx,
			router: Arc::clone(&router),
			managers: Arc::clone(&managers),
			delegate: self.delegate,
			transport: transport.sender,
			events: transport.events,
			commands,
		});
		runtime.spawn(machine.run());

		Ok(LifecycleManager {
			configuration,
			commands: commands_tx,
			status,
			state: state_rx,
			router,
			managers,
		})
	}
}

/// Host-facing handle to one session.
///
/// Independent instances do not share any state, so several sessions can
/// coexist in one process. Dropping the handle shuts its session down.
pub struct LifecycleManager {
	configuration: Arc<Configuration>,
	commands: mpsc::UnboundedSender<Command>,
	status: Arc<RwLock<SharedStatus>>,
	state: watch::Receiver<LifecycleState>,
	router: Arc<NotificationRouter>,
	managers: Arc<Vec<ManagerHandle>>,
}

impl LifecycleManager {
	/// Starts building a manager with the default manager set for `configuration`.
	pub fn builder(configuration: Configuration) -> LifecycleManagerBuilder {
		let managers = default_managers(&configuration);
		LifecycleManagerBuilder {
			configuration,
			delegate: None,
			managers,
		}
	}

	/// Creates a manager with default managers and no delegate.
	pub fn new(configuration: Configuration, transport: TransportParts) -> Result<Self> {
		Self::builder(configuration).build(transport)
	}

	/// Starts a cycle; `ready` receives its outcome exactly once.
	///
	/// A handshake failure is reported once the session is back in
	/// `Disconnected`, so the handler may call `start` again.
	///
	/// Fails with a usage error if a cycle is already running, in which case
	/// `ready` is dropped without being called.
	pub fn start<F>(&self, ready: F) -> Result<()>
	where
		F: FnOnce(Result<()>) + Send + 'static,
	{
		{
			let mut status = self.status.write();
			if status.cycle_active {
				return Err(Error::Usage("lifecycle manager is already started".to_string()));
			}
			status.cycle_active = true;
		}
		if self.commands.send(Command::Start { ready: Box::new(ready) }).is_err() {
			self.status.write().cycle_active = false;
			return Err(lifecycle_gone());
		}
		Ok(())
	}

	/// Starts a cycle and waits for its outcome.
	pub async fn start_and_wait(&self) -> Result<()> {
		let (tx, rx) = oneshot::channel();
		self.start(move |result| {
			let _ = tx.send(result);
		})?;
		rx.await.map_err(|_| lifecycle_gone())?
	}

	/// Requests a graceful unregister. Returns immediately.
	pub fn stop(&self) {
		if self.commands.send(Command::Stop).is_err() {
			debug!(target = "sdl.lifecycle", "stop ignored; lifecycle task is gone");
		}
	}

	/// Best-effort synchronous shutdown for process exit.
	///
	/// Sends the unregister request without waiting for the peer, tears the
	/// managers down and blocks the calling thread for at most the configured
	/// terminate timeout. Call it from a thread that is not driving the
	/// lifecycle task (any thread outside a current-thread runtime).
	pub fn application_will_terminate(&self) {
		let (ack_tx, ack_rx) = std::sync::mpsc::sync_channel(1);
		if self.commands.send(Command::Terminate { ack: ack_tx }).is_err() {
			return;
		}
		let limit = self.configuration.terminate_timeout();
		if ack_rx.recv_timeout(limit).is_err() {
			warn!(target = "sdl.lifecycle", ?limit, "terminate did not finish in time");
		}
	}

	/// Sends `request` without waiting for its response.
	pub fn send_request(&self, request: RpcRequest) -> Result<()> {
		self.submit(request, None)
	}

	/// Sends `request`; `handler` receives the response or an error exactly once.
	///
	/// If this returns an error, `handler` is dropped without being called.
	pub fn send_request_with_handler<F>(&self, request: RpcRequest, handler: F) -> Result<()>
	where
		F: FnOnce(Result<RpcResponse>) + Send + 'static,
	{
		self.submit(request, Some(Box::new(handler)))
	}

	/// Sends `request` and waits for its response.
	///
	/// A response with `success: false` becomes [`Error::Rejected`].
	pub async fn request(&self, request: RpcRequest) -> Result<RpcResponse> {
		let (tx, rx) = oneshot::channel();
		self.send_request_with_handler(request, move |result| {
			let _ = tx.send(result);
		})?;
		rx.await.map_err(|_| lifecycle_gone())?
	}

	fn submit(&self, request: RpcRequest, completion: Option<Completion>) -> Result<()> {
		if !self.status.read().cycle_active {
			return Err(Error::Usage(format!("cannot send {} before start", request.function)));
		}
		self.commands
			.send(Command::Send { request, completion })
			.map_err(|_| lifecycle_gone())
	}

	/// Returns the current lifecycle state.
	pub fn state(&self) -> LifecycleState {
		*self.state.borrow()
	}

	/// Returns a receiver that observes state changes.
	pub fn state_changes(&self) -> watch::Receiver<LifecycleState> {
		self.state.clone()
	}

	/// Returns `true` while a start cycle is running.
	pub fn is_started(&self) -> bool {
		self.status.read().cycle_active
	}

	/// Returns the latest HMI level, if registered.
	pub fn hmi_level(&self) -> Option<HmiLevel> {
		self.router.hmi_level()
	}

	/// Returns the result of the current registration.
	pub fn registration_result(&self) -> Option<Arc<RegistrationResult>> {
		self.status.read().registration.clone()
	}

	/// Returns the most recently allocated correlation id.
	pub fn last_correlation_id(&self) -> Option<CorrelationId> {
		self.status.read().last_correlation_id
	}

	pub fn configuration(&self) -> &Configuration {
		&self.configuration
	}

	/// Subscribes to inbound notifications of `kind`.
	///
	/// Handlers run on the lifecycle task and must not block.
	pub fn subscribe<F>(&self, kind: NotificationKind, handler: F) -> SubscriptionId
	where
		F: Fn(&RpcNotification) + Send + Sync + 'static,
	{
		self.router.subscribe(kind, handler)
	}

	pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
		self.router.unsubscribe(id)
	}

	/// Returns every manager this session owns, in setup order.
	pub fn managers(&self) -> &[ManagerHandle] {
		&self.managers
	}

	pub fn manager(&self, kind: ManagerKind) -> Option<ManagerHandle> {
		self.managers.iter().find(|m| m.kind() == kind).cloned()
	}

	/// Returns the manager of `kind` as its concrete type.
	pub fn manager_as<T: SubordinateManager>(&self, kind: ManagerKind) -> Option<Arc<T>> {
		self.manager(kind)?.downcast_arc::<T>().ok()
	}

	pub fn file_manager(&self) -> Option<Arc<FileManager>> {
		self.manager_as(ManagerKind::File)
	}

	pub fn permission_manager(&self) -> Option<Arc<PermissionManager>> {
		self.manager_as(ManagerKind::Permission)
	}

	pub fn lock_screen_manager(&self) -> Option<Arc<LockScreenManager>> {
		self.manager_as(ManagerKind::LockScreen)
	}

	/// Present only for media and navigation apps.
	pub fn streaming_manager(&self) -> Option<Arc<StreamingMediaManager>> {
		self.manager_as(ManagerKind::Streaming)
	}
}

fn lifecycle_gone() -> Error {
	Error::Cancelled("lifecycle task is no longer running".to_string())
}
