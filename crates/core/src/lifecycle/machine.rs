//! The lifecycle actor.
//!
//! One task owns the state, the correlation registry and the transport
//! sender. Host calls arrive as [`Command`]s, link activity as transport
//! events, and completions of asynchronous work (registration and unregister
//! responses, manager setup) come back as [`Internal`] events tagged with the
//! session generation that started them. Events from an older generation are
//! dropped, so a late response can never move a newer session.

use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use sdl_protocol::{
	CorrelationId, OnHashChange, RegistrationResult, RpcMessage, RpcNotification, RpcRequest, RpcResponse, decode, encode, function,
};
use serde_json::json;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::ReadyHandler;
use crate::config::Configuration;
use crate::correlation::{Completion, CorrelationRegistry};
use crate::delegate::ManagerDelegate;
use crate::error::{Error, Result};
use crate::manager::{ManagerContext, ManagerHandle};
use crate::notification::{HmiLevelChange, NotificationRouter};
use crate::orchestrator::ManagerOrchestrator;
use crate::state::LifecycleState;
use crate::transport::{Transport, TransportEvent};

pub(crate) enum Command {
	Start { ready: ReadyHandler },
	Stop,
	Terminate { ack: std::sync::mpsc::SyncSender<()> },
	Send { request: RpcRequest, completion: Option<Completion> },
}

enum Internal {
	RegistrationResponse { session: u64, result: Result<RpcResponse> },
	UnregisterResponse { session: u64 },
	SetupFinished { session: u64, result: Result<()> },
}

#[derive(Clone, Copy, Debug)]
enum Deadline {
	Registration,
	Unregister,
}

/// Values the facade reads without going through the actor.
#[derive(Debug, Default)]
pub(crate) struct SharedStatus {
	pub(crate) registration: Option<Arc<RegistrationResult>>,
	pub(crate) last_correlation_id: Option<CorrelationId>,
	/// Set by `start`, cleared when the cycle ends back in `Disconnected`.
	pub(crate) cycle_active: bool,
}

pub(crate) struct LifecycleMachine {
	configuration: Arc<Configuration>,
	status: Arc<RwLock<SharedStatus>>,
	state_tx: watch::Sender<LifecycleState>,
	router: Arc<NotificationRouter>,
	managers: Arc<Vec<ManagerHandle>>,
	delegate: Option<Weak<dyn ManagerDelegate>>,
	transport: Box<dyn Transport>,
	events: Option<mpsc::UnboundedReceiver<TransportEvent>>,
	commands: mpsc::UnboundedReceiver<Command>,
	internal_tx: mpsc::UnboundedSender<Internal>,
	internal_rx: mpsc::UnboundedReceiver<Internal>,
	registry: CorrelationRegistry,
	/// Requests sent after `start` but before registration completed.
	queued: Vec<(RpcRequest, Option<Completion>)>,
	ready: Option<ReadyHandler>,
	connected: bool,
	session: u64,
	deadline: Option<(Instant, Deadline)>,
	setup_task: Option<JoinHandle<()>>,
	managers_started: bool,
	teardown_error: Option<Error>,
	last_hash_id: Option<String>,
	deferred_hmi: Option<HmiLevelChange>,
}

pub(crate) struct MachineParts {
	pub(crate) configuration: Arc<Configuration>,
	pub(crate) status: Arc<RwLock<SharedStatus>>,
	pub(crate) state_tx: watch::Sender<LifecycleState>,
	pub(crate) router: Arc<NotificationRouter>,
	pub(crate) managers: Arc<Vec<ManagerHandle>>,
	pub(crate) delegate: Option<Weak<dyn ManagerDelegate>>,
	pub(crate) transport: Box<dyn Transport>,
	pub(crate) events: mpsc::UnboundedReceiver<TransportEvent>,
	pub(crate) commands: mpsc::UnboundedReceiver<Command>,
}

impl LifecycleMachine {
	pub(crate) fn new(parts: MachineParts) -> Self {
		let (internal_tx, internal_rx) = mpsc::unbounded_channel();
		Self {
			configuration: parts.configuration,
			status: parts.status,
			state_tx: parts.state_tx,
			router: parts.router,
			managers: parts.managers,
			delegate: parts.delegate,
			transport: parts.transport,
			events: Some(parts.events),
			commands: parts.commands,
			internal_tx,
			internal_rx,
			registry: CorrelationRegistry::new(),
			queued: Vec::new(),
			ready: None,
			connected: false,
			session: 0,
			deadline: None,
			setup_task: None,
			managers_started: false,
			teardown_error: None,
			last_hash_id: None,
			deferred_hmi: None,
		}
	}

	pub(crate) async fn run(mut self) {
		debug!(target = "sdl.lifecycle", app = %self.configuration.lifecycle.app_name, "lifecycle task started");
		loop {
			let deadline = self.deadline.map(|(at, _)| at);
			let outcome = tokio::select! {
				command = self.commands.recv() => match command {
					Some(command) => self.handle_command(command).await,
					None => break,
				},
				Some(internal) = self.internal_rx.recv() => self.handle_internal(internal).await,
				event = next_event(&mut self.events) => match event {
					Some(event) => self.handle_transport(event).await,
					None => {
						self.events = None;
						self.connected = false;
						self.on_transport_lost("transport closed".to_string()).await
					}
				},
				() = sleep_until(deadline) => self.handle_deadline().await,
			};
			if let Err(err) = outcome {
				error!(target = "sdl.lifecycle", state = %self.state(), error = %err, "lifecycle event failed");
			}
		}

		debug!(target = "sdl.lifecycle", "lifecycle manager dropped; shutting down");
		self.abandon(Error::Cancelled("lifecycle manager dropped".to_string())).await;
	}

	fn state(&self) -> LifecycleState {
		*self.state_tx.borrow()
	}

	fn transition(&mut self, to: LifecycleState) -> Result<()> {
		let from = self.state();
		if !from.can_transition_to(to) {
			error!(target = "sdl.lifecycle", %from, %to, "invalid lifecycle transition refused");
			return Err(Error::InvalidTransition { from, to });
		}
		info!(target = "sdl.lifecycle", %from, %to, "lifecycle transition");
		self.state_tx.send_replace(to);
		Ok(())
	}

	fn delegate(&self) -> Option<Arc<dyn ManagerDelegate>> {
		self.delegate.as_ref()?.upgrade()
	}

	fn fire_ready(&mut self, result: Result<()>) {
		if let Some(ready) = self.ready.take() {
			match &result {
				Ok(()) => info!(target = "sdl.lifecycle", "session ready"),
				Err(err) => warn!(target = "sdl.lifecycle", error = %err, "session failed to become ready"),
			}
			ready(result);
		}
	}

	fn set_cycle_active(&self, active: bool) {
		self.status.write().cycle_active = active;
	}

	async fn handle_command(&mut self, command: Command) -> Result<()> {
		match command {
			Command::Start { ready } => self.on_start(ready).await,
			Command::Stop => self.on_stop().await,
			Command::Terminate { ack } => {
				self.on_terminate().await;
				let _ = ack.send(());
				Ok(())
			}
			Command::Send { request, completion } => {
				self.on_send(request, completion).await;
				Ok(())
			}
		}
	}

	async fn on_start(&mut self, ready: ReadyHandler) -> Result<()> {
		if self.ready.is_some() || self.state() != LifecycleState::Disconnected {
			ready(Err(Error::Usage("lifecycle manager is already started".to_string())));
			return Ok(());
		}
		self.ready = Some(ready);
		self.set_cycle_active(true);
		info!(target = "sdl.lifecycle", connected = self.connected, "lifecycle started");
		if self.connected {
			self.begin_registration().await?;
		}
		Ok(())
	}

	async fn on_stop(&mut self) -> Result<()> {
		match self.state() {
			LifecycleState::Unregistering => {
				debug!(target = "sdl.lifecycle", "stop ignored; already unregistering");
				Ok(())
			}
			LifecycleState::Disconnected => {
				if self.status.read().cycle_active {
					info!(target = "sdl.lifecycle", "stopped before the transport connected");
					let error = Error::Cancelled("stopped before the transport connected".to_string());
					self.fail_queued(&error);
					self.set_cycle_active(false);
					self.fire_ready(Err(error));
				}
				Ok(())
			}
			state => {
				let error = Error::Cancelled("stop requested".to_string());
				// Before registration the handler waits for `Disconnected`.
				if state.is_registered() {
					self.fire_ready(Err(error.clone()));
				}
				self.begin_unregister(error).await
			}
		}
	}

	/// Best-effort shutdown for process exit: the unregister request is sent
	/// but its response is not awaited.
	async fn on_terminate(&mut self) {
		info!(target = "sdl.lifecycle", state = %self.state(), "application terminating");
		self.abandon(Error::Cancelled("application terminated".to_string())).await;
	}

	async fn abandon(&mut self, error: Error) {
		let state = self.state();
		if state == LifecycleState::Disconnected {
			if self.status.read().cycle_active {
				self.fail_queued(&error);
				self.set_cycle_active(false);
				self.fire_ready(Err(error));
			}
			return;
		}

		if state != LifecycleState::Unregistering {
			self.abort_setup().await;
			if self.connected && state != LifecycleState::TransportConnected {
				self.dispatch(RpcRequest::new(function::UNREGISTER_APP_INTERFACE, json!({})), None).await;
			}
			if let Err(err) = self.transition(LifecycleState::Unregistering) {
				debug!(target = "sdl.lifecycle", error = %err, "skipping unregistering state");
			}
		}

		let limit = self.configuration.terminate_timeout();
		if tokio::time::timeout(limit, self.finish_disconnect(error)).await.is_err() {
			warn!(target = "sdl.lifecycle", ?limit, "teardown did not finish in time");
			self.force_disconnected();
		}
	}

	async fn on_send(&mut self, request: RpcRequest, completion: Option<Completion>) {
		let state = self.state();
		match state {
			LifecycleState::Disconnected | LifecycleState::TransportConnected if self.status.read().cycle_active => {
				debug!(target = "sdl.rpc", function = %request.function, "request queued until registration");
				self.queued.push((request, completion));
			}
			LifecycleState::Disconnected | LifecycleState::TransportConnected => {
				if let Some(completion) = completion {
					completion(Err(Error::Usage("lifecycle manager is not started".to_string())));
				}
			}
			LifecycleState::Unregistering => {
				if let Some(completion) = completion {
					completion(Err(Error::Cancelled("session is shutting down".to_string())));
				}
			}
			_ => self.dispatch(request, completion).await,
		}
	}

	/// Allocates an id, registers the completion and writes the request.
	///
	/// The completion is invoked exactly once, here on failure or later by
	/// the registry.
	async fn dispatch(&mut self, request: RpcRequest, completion: Option<Completion>) {
		let id = match self.registry.allocate() {
			Ok(id) => id,
			Err(err) => {
				warn!(target = "sdl.rpc", function = %request.function, error = %err, "request not sent");
				if let Some(completion) = completion {
					completion(Err(err));
				}
				return;
			}
		};
		if self.registry.register(id, completion).is_err() {
			return;
		}
		self.status.write().last_correlation_id = Some(id);

		let function = request.function.clone();
		let raw = match encode(&RpcMessage::Request(request.into_envelope(id))) {
			Ok(raw) => raw,
			Err(err) => {
				self.registry.fail(id, err.into());
				return;
			}
		};

		debug!(target = "sdl.rpc", correlation_id = id, %function, "sending request");
		if let Err(err) = self.transport.send(raw).await {
			warn!(target = "sdl.rpc", correlation_id = id, %function, error = %err, "transport write failed");
			self.registry.fail(id, err);
		}
	}

	async fn begin_registration(&mut self) -> Result<()> {
		self.transition(LifecycleState::TransportConnected)?;
		self.session += 1;

		let params = self.configuration.registration_params(self.last_hash_id.clone());
		if params.hash_id.is_some() {
			info!(target = "sdl.lifecycle", "requesting resumption of the previous session");
		}
		let request = RpcRequest::from_payload(function::REGISTER_APP_INTERFACE, &params)?;

		let session = self.session;
		let internal = self.internal_tx.clone();
		let completion: Completion = Box::new(move |result| {
			let _ = internal.send(Internal::RegistrationResponse { session, result });
		});
		if let Some(timeout) = self.configuration.registration_timeout() {
			self.deadline = Some((Instant::now() + timeout, Deadline::Registration));
		}
		self.dispatch(request, Some(completion)).await;
		Ok(())
	}

	async fn begin_unregister(&mut self, error: Error) -> Result<()> {
		self.abort_setup().await;
		self.transition(LifecycleState::Unregistering)?;
		self.teardown_error = Some(error);

		if !self.connected {
			return self.finish_unregister().await;
		}

		let session = self.session;
		let internal = self.internal_tx.clone();
		let completion: Completion = Box::new(move |_| {
			let _ = internal.send(Internal::UnregisterResponse { session });
		});
		match self.configuration.unregister_timeout() {
			Some(timeout) => self.deadline = Some((Instant::now() + timeout, Deadline::Unregister)),
			None => self.deadline = None,
		}
		self.dispatch(RpcRequest::new(function::UNREGISTER_APP_INTERFACE, json!({})), Some(completion))
			.await;
		Ok(())
	}

	async fn finish_unregister(&mut self) -> Result<()> {
		let error = self
			.teardown_error
			.take()
			.unwrap_or_else(|| Error::Cancelled("session unregistered".to_string()));
		self.finish_disconnect(error).await;
		Ok(())
	}

	/// Tears the session down and returns to `Disconnected`.
	///
	/// A ready callback still pending here fires only after the state is
	/// `Disconnected` and the cycle has ended, so the host can start again
	/// from inside it.
	async fn finish_disconnect(&mut self, error: Error) {
		let previous = self.state();
		self.deadline = None;
		self.abort_setup().await;

		if self.managers_started {
			self.managers_started = false;
			ManagerOrchestrator::tear_down(&self.managers).await;
		}

		self.registry.flush(&error);
		self.fail_queued(&error);
		self.status.write().registration = None;
		self.router.clear_hmi_level();
		self.deferred_hmi = None;
		self.teardown_error = None;
		self.session += 1;

		if previous != LifecycleState::Disconnected {
			if let Err(err) = self.transition(LifecycleState::Disconnected) {
				warn!(target = "sdl.lifecycle", error = %err, "forcing disconnected state");
				self.state_tx.send_replace(LifecycleState::Disconnected);
			}
		}
		self.set_cycle_active(false);
		self.fire_ready(Err(error));

		if previous != LifecycleState::Disconnected {
			if let Some(delegate) = self.delegate() {
				delegate.manager_did_disconnect();
			}
		}
	}

	/// Last resort when teardown overran its budget.
	fn force_disconnected(&mut self) {
		let error = Error::Cancelled("teardown timed out".to_string());
		self.registry.flush(&error);
		self.fail_queued(&error);
		self.status.write().registration = None;
		self.router.clear_hmi_level();
		self.managers_started = false;
		self.session += 1;
		self.state_tx.send_replace(LifecycleState::Disconnected);
		self.set_cycle_active(false);
		self.fire_ready(Err(error));
	}

	fn fail_queued(&mut self, error: &Error) {
		for (_, completion) in self.queued.drain(..) {
			if let Some(completion) = completion {
				completion(Err(error.clone()));
			}
		}
	}

	/// Cancels manager setup and waits until its task has stopped running, so
	/// no `start` can complete after the teardown that follows.
	async fn abort_setup(&mut self) {
		if let Some(task) = self.setup_task.take() {
			debug!(target = "sdl.managers", "aborting manager setup");
			task.abort();
			if let Err(err) = task.await {
				if !err.is_cancelled() {
					warn!(target = "sdl.managers", error = %err, "manager setup task failed");
				}
			}
		}
	}

	async fn handle_internal(&mut self, internal: Internal) -> Result<()> {
		match internal {
			Internal::RegistrationResponse { session, result } => {
				if session != self.session || self.state() != LifecycleState::TransportConnected {
					debug!(target = "sdl.lifecycle", session, "stale registration response dropped");
					return Ok(());
				}
				self.deadline = None;
				match result.and_then(|response| RegistrationResult::from_response(&response).map_err(Error::from)) {
					Ok(registration) => self.on_registered(registration).await,
					Err(Error::Rejected { result_code, info, .. }) => {
						let info = (!info.is_empty()).then_some(info.as_str());
						self.fail_registration(Error::registration_rejected(result_code, info)).await;
						Ok(())
					}
					Err(err) => {
						self.fail_registration(Error::Registration {
							result_code: None,
							message: err.to_string(),
						})
						.await;
						Ok(())
					}
				}
			}
			Internal::UnregisterResponse { session } => {
				if session != self.session || self.state() != LifecycleState::Unregistering {
					return Ok(());
				}
				debug!(target = "sdl.lifecycle", "unregister acknowledged");
				self.finish_unregister().await
			}
			Internal::SetupFinished { session, result } => {
				if session != self.session || self.state() != LifecycleState::SettingUpManagers {
					debug!(target = "sdl.managers", session, "stale setup result dropped");
					return Ok(());
				}
				self.setup_task = None;
				match result {
					Ok(()) => self.on_managers_ready(),
					Err(err) => {
						self.fire_ready(Err(err.clone()));
						self.begin_unregister(err).await
					}
				}
			}
		}
	}

	async fn on_registered(&mut self, registration: RegistrationResult) -> Result<()> {
		if registration.resume_failed() {
			info!(target = "sdl.lifecycle", "peer could not resume the previous session; starting fresh");
		}
		self.transition(LifecycleState::Registered)?;
		info!(
			target = "sdl.lifecycle",
			result_code = %registration.result_code,
			language = registration.language.as_ref().map(|l| l.as_str()),
			"registered with peer"
		);
		self.status.write().registration = Some(Arc::new(registration));

		for (request, completion) in std::mem::take(&mut self.queued) {
			self.dispatch(request, completion).await;
		}

		self.transition(LifecycleState::SettingUpManagers)?;
		self.spawn_setup();
		Ok(())
	}

	async fn fail_registration(&mut self, error: Error) {
		warn!(target = "sdl.lifecycle", error = %error, "registration failed");
		self.finish_disconnect(error).await;
	}

	fn spawn_setup(&mut self) {
		let managers = Arc::clone(&self.managers);
		let context = ManagerContext {
			configuration: Arc::clone(&self.configuration),
			notifications: Arc::clone(&self.router),
		};
		let timeout = self.configuration.manager_setup_timeout();
		let internal = self.internal_tx.clone();
		let session = self.session;

		self.managers_started = true;
		self.setup_task = Some(tokio::spawn(async move {
			let result = ManagerOrchestrator::set_up(&managers, &context, timeout).await.map(|_| ());
			let _ = internal.send(Internal::SetupFinished { session, result });
		}));
	}

	fn on_managers_ready(&mut self) -> Result<()> {
		self.transition(LifecycleState::PostManagerProcessing)?;
		self.post_manager_processing();
		self.transition(LifecycleState::Ready)?;
		self.fire_ready(Ok(()));
		if let Some(delegate) = self.delegate() {
			delegate.manager_did_become_ready();
		}
		Ok(())
	}

	fn post_manager_processing(&mut self) {
		if let Some(change) = self.deferred_hmi.take() {
			if let Some(delegate) = self.delegate() {
				delegate.hmi_level_did_change(change.old, change.new);
			}
		}

		let desired = &self.configuration.lifecycle.language;
		let actual = self.status.read().registration.as_ref().and_then(|r| r.language.clone());
		if let Some(actual) = actual {
			if &actual != desired {
				warn!(
					target = "sdl.lifecycle",
					desired = %desired,
					actual = %actual,
					"head unit language differs from the desired language"
				);
			}
		}
	}

	async fn handle_transport(&mut self, event: TransportEvent) -> Result<()> {
		match event {
			TransportEvent::Connected => {
				info!(target = "sdl.lifecycle", "transport connected");
				self.connected = true;
				// `start` flags the cycle before its command arrives; registration
				// waits until the ready handler is actually armed.
				if self.ready.is_some() && self.state() == LifecycleState::Disconnected {
					self.begin_registration().await?;
				}
				Ok(())
			}
			TransportEvent::Disconnected { reason } => {
				info!(target = "sdl.lifecycle", %reason, "transport disconnected");
				self.connected = false;
				self.on_transport_lost(reason).await
			}
			TransportEvent::Message(raw) => {
				self.handle_inbound(raw).await;
				Ok(())
			}
		}
	}

	async fn on_transport_lost(&mut self, reason: String) -> Result<()> {
		let error = Error::Transport(reason);
		match self.state() {
			LifecycleState::Disconnected => Ok(()),
			LifecycleState::TransportConnected => {
				self.finish_disconnect(error).await;
				Ok(())
			}
			LifecycleState::Unregistering => {
				let error = self.teardown_error.take().unwrap_or(error);
				self.finish_disconnect(error).await;
				Ok(())
			}
			_ => {
				self.fire_ready(Err(error.clone()));
				self.abort_setup().await;
				self.transition(LifecycleState::Unregistering)?;
				self.finish_disconnect(error).await;
				Ok(())
			}
		}
	}

	async fn handle_deadline(&mut self) -> Result<()> {
		let Some((_, kind)) = self.deadline.take() else {
			return Ok(());
		};
		match (kind, self.state()) {
			(Deadline::Registration, LifecycleState::TransportConnected) => {
				let limit = self.configuration.registration_timeout().unwrap_or_default();
				self.fail_registration(Error::Registration {
					result_code: None,
					message: format!("no response within {limit:?}"),
				})
				.await;
				Ok(())
			}
			(Deadline::Unregister, LifecycleState::Unregistering) => {
				warn!(target = "sdl.lifecycle", "unregister timed out; disconnecting anyway");
				self.finish_unregister().await
			}
			(kind, state) => {
				debug!(target = "sdl.lifecycle", ?kind, %state, "deadline no longer relevant");
				Ok(())
			}
		}
	}

	async fn handle_inbound(&mut self, raw: serde_json::Value) {
		let message = match decode(raw) {
			Ok(message) => message,
			Err(err) => {
				warn!(target = "sdl.rpc", error = %err, "undecodable inbound message dropped");
				return;
			}
		};
		match message {
			RpcMessage::Response(response) => {
				self.registry.resolve(response);
			}
			RpcMessage::Notification(notification) => self.on_notification(notification).await,
			RpcMessage::Request(request) => {
				warn!(target = "sdl.rpc", function = %request.function, "unexpected request from peer ignored");
			}
		}
	}

	async fn on_notification(&mut self, notification: RpcNotification) {
		let mut unregistered_by_peer = None;
		match notification.function.as_str() {
			function::ON_HASH_CHANGE => match notification.payload::<OnHashChange>() {
				Ok(change) => {
					debug!(target = "sdl.lifecycle", "resumption hash updated");
					self.last_hash_id = Some(change.hash_id);
				}
				Err(err) => warn!(target = "sdl.notifications", error = %err, "malformed OnHashChange ignored"),
			},
			function::ON_APP_INTERFACE_UNREGISTERED => {
				let reason = notification.params.get("reason").and_then(|r| r.as_str()).unwrap_or("unspecified");
				warn!(target = "sdl.lifecycle", %reason, "peer unregistered the app");
				unregistered_by_peer = Some(reason.to_string());
			}
			_ => {}
		}

		if notification.function == function::ON_HMI_STATUS && !self.state().is_registered() {
			debug!(target = "sdl.notifications", state = %self.state(), "OnHMIStatus before registration ignored");
			return;
		}
		if let Some(change) = self.router.publish(&notification) {
			self.on_hmi_level_change(change);
		}

		// The peer already dropped the registration, so no unregister request is sent.
		if let Some(reason) = unregistered_by_peer {
			if self.state().is_registered() {
				let error = Error::Cancelled(format!("peer unregistered the app: {reason}"));
				self.fire_ready(Err(error.clone()));
				self.abort_setup().await;
				if self.transition(LifecycleState::Unregistering).is_ok() {
					self.finish_disconnect(error).await;
				}
			}
		}
	}

	fn on_hmi_level_change(&mut self, change: HmiLevelChange) {
		debug!(target = "sdl.lifecycle", old = ?change.old, new = %change.new, "hmi level changed");
		if self.state() == LifecycleState::Ready {
			if let Some(delegate) = self.delegate() {
				delegate.hmi_level_did_change(change.old, change.new);
			}
			return;
		}
		let old = self.deferred_hmi.map_or(change.old, |deferred| deferred.old);
		self.deferred_hmi = if old == Some(change.new) {
			None
		} else {
			Some(HmiLevelChange { old, new: change.new })
		};
	}
}

async fn next_event(events: &mut Option<mpsc::UnboundedReceiver<TransportEvent>>) -> Option<TransportEvent> {
	match events {
		Some(events) => events.recv().await,
		None => std::future::pending().await,
	}
}

async fn sleep_until(deadline: Option<Instant>) {
	match deadline {
		Some(at) => tokio::time::sleep_until(at).await,
		None => std::future::pending().await,
	}
}
