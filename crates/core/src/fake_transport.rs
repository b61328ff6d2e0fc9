//! In-memory transport for exercising the lifecycle without a head unit.
//!
//! # Example
//!
//! ```ignore
//! let (parts, transport) = FakeTransportBuilder::new().build();
//! let manager = LifecycleManager::new(configuration, parts)?;
//! manager.start(|result| println!("ready: {result:?}"))?;
//!
//! transport.connect();
//! let registration = transport.wait_for_request(function::REGISTER_APP_INTERFACE).await;
//! transport.inject_response(registration.correlation_id, function::REGISTER_APP_INTERFACE, json!({}));
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use sdl_protocol::{CorrelationId, RequestEnvelope, ResultCode, RpcMessage, RpcNotification, RpcResponse, decode, encode};
use serde_json::Value as JsonValue;
use tokio::sync::Notify;
use tracing::warn;

use crate::error::{Error, Result};
use crate::transport::{self, Transport, TransportEvents, TransportParts};

struct SentMessage {
	raw: JsonValue,
	claimed: bool,
}

#[derive(Default)]
struct Outbox {
	messages: Mutex<Vec<SentMessage>>,
	arrived: Notify,
	fail_sends: AtomicBool,
}

/// Builder for a fake transport pair.
pub struct FakeTransportBuilder {
	connected: bool,
}

impl FakeTransportBuilder {
	pub fn new() -> Self {
		Self { connected: false }
	}

	/// Queues a `Connected` event before the manager starts.
	pub fn connected(mut self) -> Self {
		self.connected = true;
		self
	}

	/// Returns the parts for the lifecycle manager and a controller for the test.
	pub fn build(self) -> (TransportParts, FakeTransportController) {
		let outbox = Arc::new(Outbox::default());
		let (parts, events) = transport::channel(FakeTransportSender {
			outbox: Arc::clone(&outbox),
		});
		if self.connected {
			events.connected();
		}
		(parts, FakeTransportController { events, outbox })
	}
}

impl Default for FakeTransportBuilder {
	fn default() -> Self {
		Self::new()
	}
}

/// Drives link events and inspects what the manager sent.
pub struct FakeTransportController {
	events: TransportEvents,
	outbox: Arc<Outbox>,
}

impl FakeTransportController {
	pub fn connect(&self) {
		self.events.connected();
	}

	pub fn disconnect(&self, reason: &str) {
		self.events.disconnected(reason);
	}

	/// Makes every later send fail with a transport error (or succeed again).
	pub fn fail_sends(&self, fail: bool) {
		self.outbox.fail_sends.store(fail, Ordering::SeqCst);
	}

	/// Injects a raw inbound message.
	pub fn inject(&self, message: JsonValue) {
		self.events.message(message);
	}

	pub fn inject_message(&self, message: RpcMessage) {
		match encode(&message) {
			Ok(raw) => self.inject(raw),
			Err(err) => warn!(target = "sdl.rpc", error = %err, "fake transport could not encode message"),
		}
	}

	pub fn inject_response(&self, correlation_id: CorrelationId, function: &str, params: JsonValue) {
		self.inject_message(RpcMessage::Response(RpcResponse::success(correlation_id, function, params)));
	}

	pub fn inject_failure(&self, correlation_id: CorrelationId, function: &str, result_code: ResultCode, info: &str) {
		self.inject_message(RpcMessage::Response(RpcResponse::failure(correlation_id, function, result_code, info)));
	}

	pub fn inject_notification(&self, function: &str, params: JsonValue) {
		self.inject_message(RpcMessage::Notification(RpcNotification::new(function, params)));
	}

	/// Takes every message sent so far, clearing the buffer.
	pub fn take_sent(&self) -> Vec<JsonValue> {
		std::mem::take(&mut *self.outbox.messages.lock()).into_iter().map(|m| m.raw).collect()
	}

	/// Decoded requests sent so far, without clearing the buffer.
	pub fn sent_requests(&self) -> Vec<RequestEnvelope> {
		self.outbox.messages.lock().iter().filter_map(|m| as_request(&m.raw)).collect()
	}

	/// Waits for the next unclaimed request for `function` and claims it.
	pub async fn wait_for_request(&self, function: &str) -> RequestEnvelope {
		loop {
			let arrived = self.outbox.arrived.notified();
			tokio::pin!(arrived);
			arrived.as_mut().enable();

			if let Some(request) = self.claim(function) {
				return request;
			}
			arrived.await;
		}
	}

	fn claim(&self, function: &str) -> Option<RequestEnvelope> {
		let mut messages = self.outbox.messages.lock();
		messages.iter_mut().filter(|m| !m.claimed).find_map(|m| {
			let request = as_request(&m.raw).filter(|r| r.function == function)?;
			m.claimed = true;
			Some(request)
		})
	}
}

fn as_request(raw: &JsonValue) -> Option<RequestEnvelope> {
	match decode(raw.clone()) {
		Ok(RpcMessage::Request(request)) => Some(request),
		_ => None,
	}
}

struct FakeTransportSender {
	outbox: Arc<Outbox>,
}

impl Transport for FakeTransportSender {
	fn send(&mut self, message: JsonValue) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
		let outbox = Arc::clone(&self.outbox);
		Box::pin(async move {
			if outbox.fail_sends.load(Ordering::SeqCst) {
				return Err(Error::Transport("fake transport refused the write".to_string()));
			}
			outbox.messages.lock().push(SentMessage { raw: message, claimed: false });
			outbox.arrived.notify_waiters();
			Ok(())
		})
	}
}

#[cfg(test)]
mod tests {
	use sdl_protocol::RpcRequest;
	use serde_json::json;

	use super::*;
	use crate::transport::TransportEvent;

	#[tokio::test]
	async fn sent_requests_can_be_awaited_by_function() {
		let (mut parts, controller) = FakeTransportBuilder::new().build();

		let show = RpcMessage::Request(RpcRequest::new("Show", json!({ "mainField1": "hi" })).into_envelope(4));
		parts.sender.send(encode(&show).unwrap()).await.unwrap();

		let request = controller.wait_for_request("Show").await;
		assert_eq!(request.correlation_id, 4);
		assert_eq!(request.params["mainField1"], "hi");
		assert!(controller.claim("Show").is_none());
		assert_eq!(controller.take_sent().len(), 1);
	}

	#[tokio::test]
	async fn waiter_wakes_on_later_send() {
		let (mut parts, controller) = FakeTransportBuilder::new().build();
		let waiter = tokio::spawn(async move { controller.wait_for_request("Alert").await });
		tokio::task::yield_now().await;

		let alert = RpcMessage::Request(RpcRequest::new("Alert", json!({})).into_envelope(9));
		parts.sender.send(encode(&alert).unwrap()).await.unwrap();

		assert_eq!(waiter.await.unwrap().correlation_id, 9);
	}

	#[tokio::test]
	async fn link_events_reach_the_receiver() {
		let (mut parts, controller) = FakeTransportBuilder::new().connected().build();
		controller.inject_notification("OnHashChange", json!({ "hashID": "x" }));
		controller.disconnect("cable pulled");

		assert_eq!(parts.events.recv().await, Some(TransportEvent::Connected));
		assert!(matches!(parts.events.recv().await, Some(TransportEvent::Message(_))));
		assert_eq!(
			parts.events.recv().await,
			Some(TransportEvent::Disconnected {
				reason: "cable pulled".to_string()
			})
		);
	}

	#[tokio::test]
	async fn refused_writes_are_not_recorded() {
		let (mut parts, controller) = FakeTransportBuilder::new().build();
		controller.fail_sends(true);
		let err = parts.sender.send(json!({})).await.unwrap_err();
		assert!(err.is_transport());
		assert!(controller.take_sent().is_empty());
	}
}
