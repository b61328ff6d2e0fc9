//! Request/response correlation.
//!
//! The registry hands out 16-bit correlation ids and keeps the completion of
//! every request still waiting for its response:
//!
//! 1. [`allocate`](CorrelationRegistry::allocate) picks the next free id
//! 2. [`register`](CorrelationRegistry::register) records the pending request
//! 3. [`resolve`](CorrelationRegistry::resolve) matches an inbound response and
//!    completes it
//! 4. [`flush`](CorrelationRegistry::flush) cancels whatever is left on teardown
//!
//! Each completion is invoked exactly once: either by `resolve` or by `flush`.
//! The registry is not shared; it lives inside the lifecycle actor, which is the
//! only context that mutates it.

use std::collections::HashMap;

use sdl_protocol::{CorrelationId, RpcResponse};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Size of the correlation id space.
const ID_SPACE: usize = CorrelationId::MAX as usize + 1;

/// Callback receiving the outcome of a request.
pub type Completion = Box<dyn FnOnce(Result<RpcResponse>) + Send + 'static>;

/// Pending-request table keyed by correlation id.
pub struct CorrelationRegistry {
	next_id: CorrelationId,
	last_id: Option<CorrelationId>,
	pending: HashMap<CorrelationId, Option<Completion>>,
}

impl CorrelationRegistry {
	pub fn new() -> Self {
		Self {
			next_id: 0,
			last_id: None,
			pending: HashMap::new(),
		}
	}

	/// Returns the next id in sequence that is not currently pending.
	///
	/// Ids wrap at the 16-bit boundary. Fails with [`Error::Saturation`] only
	/// when every id is in flight.
	pub fn allocate(&mut self) -> Result<CorrelationId> {
		if self.pending.len() >= ID_SPACE {
			return Err(Error::Saturation(self.pending.len()));
		}

		loop {
			let candidate = self.next_id;
			self.next_id = self.next_id.wrapping_add(1);
			if !self.pending.contains_key(&candidate) {
				self.last_id = Some(candidate);
				return Ok(candidate);
			}
		}
	}

	/// Records a pending request.
	///
	/// Registering an id twice is a conflict; the rejected completion is
	/// invoked with [`Error::Conflict`] so it still completes exactly once.
	pub fn register(&mut self, id: CorrelationId, completion: Option<Completion>) -> Result<()> {
		if self.pending.contains_key(&id) {
			if let Some(completion) = completion {
				completion(Err(Error::Conflict(id)));
			}
			return Err(Error::Conflict(id));
		}
		self.pending.insert(id, completion);
		Ok(())
	}

	/// Removes a pending request and completes it with `error`.
	pub fn fail(&mut self, id: CorrelationId, error: Error) -> bool {
		match self.pending.remove(&id) {
			Some(Some(completion)) => {
				completion(Err(error));
				true
			}
			Some(None) => true,
			None => false,
		}
	}

	/// Completes the request matching `response`.
	///
	/// Returns `false` for an orphan response (no pending entry), which is
	/// logged and dropped.
	pub fn resolve(&mut self, response: RpcResponse) -> bool {
		let Some(completion) = self.pending.remove(&response.correlation_id) else {
			warn!(
				target = "sdl.rpc",
				correlation_id = response.correlation_id,
				function = %response.function,
				"orphan response dropped"
			);
			return false;
		};

		debug!(
			target = "sdl.rpc",
			correlation_id = response.correlation_id,
			function = %response.function,
			success = response.success,
			"response correlated"
		);

		if let Some(completion) = completion {
			completion(response_result(response));
		}
		true
	}

	/// Fails every pending request with `error` and empties the registry.
	///
	/// Returns the number of completions invoked.
	pub fn flush(&mut self, error: &Error) -> usize {
		let pending = std::mem::take(&mut self.pending);
		let total = pending.len();
		let mut invoked = 0;
		for (_, completion) in pending {
			if let Some(completion) = completion {
				completion(Err(error.clone()));
				invoked += 1;
			}
		}
		if total > 0 {
			debug!(target = "sdl.rpc", total, invoked, error = %error, "flushed pending requests");
		}
		invoked
	}

	pub fn is_pending(&self, id: CorrelationId) -> bool {
		self.pending.contains_key(&id)
	}

	pub fn len(&self) -> usize {
		self.pending.len()
	}

	pub fn is_empty(&self) -> bool {
		self.pending.is_empty()
	}

	/// Most recently allocated id.
	pub fn last_id(&self) -> Option<CorrelationId> {
		self.last_id
	}
}

impl Default for CorrelationRegistry {
	fn default() -> Self {
		Self::new()
	}
}

/// Turns an unsuccessful response into [`Error::Rejected`].
fn response_result(response: RpcResponse) -> Result<RpcResponse> {
	if response.success {
		return Ok(response);
	}
	Err(Error::Rejected {
		info: response.info.clone().unwrap_or_default(),
		function: response.function,
		result_code: response.result_code,
	})
}

#[cfg(test)]
mod tests {
	use std::collections::HashSet;
	use std::sync::Arc;
	use std::sync::atomic::{AtomicUsize, Ordering};

	use parking_lot::Mutex;
	use sdl_protocol::ResultCode;
	use serde_json::json;

	use super::*;

	fn recording() -> (Completion, Arc<Mutex<Vec<Result<RpcResponse>>>>) {
		let seen: Arc<Mutex<Vec<Result<RpcResponse>>>> = Arc::new(Mutex::new(Vec::new()));
		let sink = Arc::clone(&seen);
		let completion: Completion = Box::new(move |result: Result<RpcResponse>| sink.lock().push(result));
		(completion, seen)
	}

	#[test]
	fn ids_increment_from_zero() {
		let mut registry = CorrelationRegistry::new();
		assert_eq!(registry.allocate().unwrap(), 0);
		assert_eq!(registry.allocate().unwrap(), 1);
		assert_eq!(registry.allocate().unwrap(), 2);
		assert_eq!(registry.last_id(), Some(2));
	}

	#[test]
	fn resolve_completes_matching_request_once() {
		let mut registry = CorrelationRegistry::new();
		let id = registry.allocate().unwrap();
		let (completion, seen) = recording();
		registry.register(id, Some(completion)).unwrap();

		assert!(registry.resolve(RpcResponse::success(id, "Show", json!({ "ok": true }))));
		assert!(!registry.resolve(RpcResponse::success(id, "Show", json!({}))));

		let seen = seen.lock();
		assert_eq!(seen.len(), 1);
		assert_eq!(seen[0].as_ref().unwrap().params["ok"], true);
		assert!(registry.is_empty());
	}

	#[test]
	fn responses_resolve_out_of_order() {
		let mut registry = CorrelationRegistry::new();
		let mut sinks = Vec::new();
		for _ in 0..3 {
			let id = registry.allocate().unwrap();
			let (completion, seen) = recording();
			registry.register(id, Some(completion)).unwrap();
			sinks.push((id, seen));
		}

		for id in [2, 0, 1] {
			registry.resolve(RpcResponse::success(id, "Show", json!({ "id": id })));
		}

		for (id, seen) in sinks {
			let seen = seen.lock();
			assert_eq!(seen.len(), 1);
			assert_eq!(seen[0].as_ref().unwrap().params["id"], id);
		}
	}

	#[test]
	fn failure_response_becomes_rejected_error() {
		let mut registry = CorrelationRegistry::new();
		let id = registry.allocate().unwrap();
		let (completion, seen) = recording();
		registry.register(id, Some(completion)).unwrap();

		registry.resolve(RpcResponse::failure(id, "Show", ResultCode::Disallowed, "not allowed in NONE"));

		match &seen.lock()[0] {
			Err(Error::Rejected { function, result_code, info }) => {
				assert_eq!(function, "Show");
				assert_eq!(*result_code, ResultCode::Disallowed);
				assert_eq!(info, "not allowed in NONE");
			}
			other => panic!("expected rejection, got {other:?}"),
		}
	}

	#[test]
	fn orphan_response_is_dropped() {
		let mut registry = CorrelationRegistry::new();
		assert!(!registry.resolve(RpcResponse::success(999, "Show", json!(null))));
		assert!(registry.is_empty());
	}

	#[test]
	fn fire_and_forget_entries_resolve_silently() {
		let mut registry = CorrelationRegistry::new();
		let id = registry.allocate().unwrap();
		registry.register(id, None).unwrap();
		assert!(registry.resolve(RpcResponse::success(id, "Show", json!(null))));
	}

	#[test]
	fn duplicate_registration_conflicts_and_completes_the_loser() {
		let mut registry = CorrelationRegistry::new();
		let id = registry.allocate().unwrap();
		registry.register(id, None).unwrap();

		let (completion, seen) = recording();
		assert_eq!(registry.register(id, Some(completion)), Err(Error::Conflict(id)));
		assert!(matches!(seen.lock().as_slice(), [Err(Error::Conflict(conflicting))] if *conflicting == id));
		assert!(registry.is_pending(id));
	}

	#[test]
	fn fail_completes_with_given_error() {
		let mut registry = CorrelationRegistry::new();
		let id = registry.allocate().unwrap();
		let (completion, seen) = recording();
		registry.register(id, Some(completion)).unwrap();

		assert!(registry.fail(id, Error::Transport("write failed".to_string())));
		assert!(!registry.fail(id, Error::Transport("again".to_string())));
		assert_eq!(seen.lock().len(), 1);
	}

	#[test]
	fn flush_invokes_each_pending_completion_once() {
		let mut registry = CorrelationRegistry::new();
		let calls = Arc::new(AtomicUsize::new(0));
		for _ in 0..5 {
			let id = registry.allocate().unwrap();
			let calls = Arc::clone(&calls);
			registry
				.register(
					id,
					Some(Box::new(move |result: Result<RpcResponse>| {
						assert!(matches!(result, Err(Error::Transport(_))));
						calls.fetch_add(1, Ordering::SeqCst);
					})),
				)
				.unwrap();
		}

		let invoked = registry.flush(&Error::Transport("link lost".to_string()));

		assert_eq!(invoked, 5);
		assert_eq!(calls.load(Ordering::SeqCst), 5);
		assert!(registry.is_empty());
		assert_eq!(registry.flush(&Error::Transport("again".to_string())), 0);
	}

	#[test]
	fn ids_wrap_and_are_reused_after_resolution() {
		let mut registry = CorrelationRegistry::new();
		for expected in 0..ID_SPACE {
			let id = registry.allocate().unwrap();
			assert_eq!(id as usize, expected);
			registry.register(id, None).unwrap();
			assert!(registry.resolve(RpcResponse::success(id, "Show", json!(null))));
		}
		assert_eq!(registry.allocate().unwrap(), 0);
	}

	#[test]
	fn wraparound_skips_ids_still_pending() {
		let mut registry = CorrelationRegistry::new();
		let long_lived = registry.allocate().unwrap();
		registry.register(long_lived, None).unwrap();

		let mut seen = HashSet::new();
		for _ in 0..ID_SPACE - 1 {
			let id = registry.allocate().unwrap();
			assert_ne!(id, long_lived);
			assert!(seen.insert(id));
			registry.register(id, None).unwrap();
			registry.resolve(RpcResponse::success(id, "Show", json!(null)));
		}

		assert_eq!(registry.allocate().unwrap(), 1, "id 0 is still pending and must be skipped");
	}

	#[test]
	fn saturation_when_every_id_is_pending() {
		let mut registry = CorrelationRegistry::new();
		for _ in 0..ID_SPACE {
			let id = registry.allocate().unwrap();
			registry.register(id, None).unwrap();
		}

		assert_eq!(registry.allocate(), Err(Error::Saturation(ID_SPACE)));

		registry.resolve(RpcResponse::success(300, "Show", json!(null)));
		assert_eq!(registry.allocate().unwrap(), 300);
	}
}
