//! Ordered bring-up and teardown of subordinate managers.
//!
//! # Setup
//!
//! Managers start in dependency layers: a manager starts once every
//! dependency present in the set has finished starting. Managers within a
//! layer start concurrently. A dependency that is not part of the set is
//! ignored, so hosts can drop a manager without rewriting the others.
//!
//! The first required failure short-circuits the remaining layers; every
//! manager that already started is then stopped again, in reverse start
//! order. Optional managers that fail (or whose dependency failed) are
//! skipped and reported in [`SetupReport::skipped`].
//!
//! # Teardown
//!
//! [`ManagerOrchestrator::tear_down`] stops every manager in reverse order
//! and only collects failures. `stop` must therefore be safe to call on a
//! manager that never started.

use std::collections::HashSet;
use std::time::Duration;

use futures_util::future::join_all;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::manager::{ManagerContext, ManagerError, ManagerHandle, ManagerKind};

/// Outcome of a successful setup.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SetupReport {
	/// Managers that started, in start order.
	pub started: Vec<ManagerKind>,
	/// Optional managers that did not start.
	pub skipped: Vec<(ManagerKind, ManagerError)>,
}

/// Outcome of a teardown.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TeardownReport {
	pub stopped: Vec<ManagerKind>,
	pub failures: Vec<(ManagerKind, ManagerError)>,
}

impl TeardownReport {
	pub fn is_clean(&self) -> bool {
		self.failures.is_empty()
	}
}

/// Stateless driver of manager start/stop sequences.
pub struct ManagerOrchestrator;

impl ManagerOrchestrator {
	/// Starts `managers`, honouring declared dependencies.
	///
	/// `timeout` bounds each individual start. Fails with
	/// [`Error::ManagerSetup`] naming the first required manager that failed.
	pub async fn set_up(managers: &[ManagerHandle], context: &ManagerContext, timeout: Option<Duration>) -> Result<SetupReport> {
		let present: HashSet<ManagerKind> = managers.iter().map(|m| m.kind()).collect();
		let mut report = SetupReport::default();
		let mut failed: HashSet<ManagerKind> = HashSet::new();
		let mut started: Vec<&ManagerHandle> = Vec::new();
		let mut remaining: Vec<&ManagerHandle> = managers.iter().collect();

		while !remaining.is_empty() {
			let (layer, rest): (Vec<&ManagerHandle>, Vec<&ManagerHandle>) = {
				let settled = |kind: &ManagerKind| !present.contains(kind) || failed.contains(kind) || report.started.contains(kind);
				remaining.into_iter().partition(|m| m.dependencies().iter().all(|kind| settled(kind)))
			};
			remaining = rest;

			if layer.is_empty() {
				let cycle: Vec<ManagerKind> = remaining.iter().map(|m| m.kind()).collect();
				warn!(target = "sdl.managers", managers = ?cycle, "dependency cycle between managers");
				let (required, optional): (Vec<&ManagerHandle>, Vec<&ManagerHandle>) = remaining.into_iter().partition(|m| m.is_required());
				for manager in optional {
					report.skipped.push((manager.kind(), ManagerError::Failed("dependency cycle".to_string())));
				}
				if let Some(manager) = required.first() {
					let error = ManagerError::Failed("dependency cycle".to_string());
					return Err(Self::abort(manager.kind(), error, &started).await);
				}
				break;
			}

			debug!(target = "sdl.managers", layer = ?layer.iter().map(|m| m.kind()).collect::<Vec<_>>(), "starting manager layer");
			let outcomes = join_all(layer.iter().map(|manager| Self::start_one(manager, context, &failed, timeout))).await;

			let mut hard_failure = None;
			for (manager, outcome) in layer.into_iter().zip(outcomes) {
				let kind = manager.kind();
				match outcome {
					Ok(()) => {
						debug!(target = "sdl.managers", manager = %kind, "manager started");
						report.started.push(kind);
						started.push(manager);
					}
					Err(error) if manager.is_required() => {
						warn!(target = "sdl.managers", manager = %kind, error = %error, "required manager failed to start");
						failed.insert(kind);
						hard_failure.get_or_insert((kind, error));
					}
					Err(error) => {
						warn!(target = "sdl.managers", manager = %kind, error = %error, "optional manager skipped");
						failed.insert(kind);
						report.skipped.push((kind, error));
					}
				}
			}

			if let Some((kind, error)) = hard_failure {
				return Err(Self::abort(kind, error, &started).await);
			}
		}

		info!(
			target = "sdl.managers",
			started = report.started.len(),
			skipped = report.skipped.len(),
			"managers set up"
		);
		Ok(report)
	}

	/// Stops every manager in reverse order, collecting failures.
	pub async fn tear_down(managers: &[ManagerHandle]) -> TeardownReport {
		let mut report = TeardownReport::default();
		for manager in managers.iter().rev() {
			let kind = manager.kind();
			match manager.stop().await {
				Ok(()) => report.stopped.push(kind),
				Err(error) => {
					warn!(target = "sdl.managers", manager = %kind, error = %error, "manager failed to stop");
					report.failures.push((kind, error));
				}
			}
		}
		debug!(
			target = "sdl.managers",
			stopped = report.stopped.len(),
			failures = report.failures.len(),
			"managers torn down"
		);
		report
	}

	async fn start_one(
		manager: &ManagerHandle,
		context: &ManagerContext,
		failed: &HashSet<ManagerKind>,
		timeout: Option<Duration>,
	) -> Result<(), ManagerError> {
		if let Some(dependency) = manager.dependencies().iter().find(|kind| failed.contains(*kind)) {
			return Err(ManagerError::DependencyUnavailable(*dependency));
		}
		let start = manager.start(context.clone());
		match timeout {
			Some(limit) => tokio::time::timeout(limit, start).await.map_err(|_| ManagerError::TimedOut(limit))?,
			None => start.await,
		}
	}

	/// Stops already-started managers after a required failure.
	async fn abort(kind: ManagerKind, error: ManagerError, started: &[&ManagerHandle]) -> Error {
		for manager in started.iter().rev() {
			if let Err(stop_error) = manager.stop().await {
				warn!(target = "sdl.managers", manager = %manager.kind(), error = %stop_error, "rollback stop failed");
			}
		}
		Error::ManagerSetup {
			manager: kind,
			message: error.to_string(),
		}
	}
}
