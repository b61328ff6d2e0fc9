//! Transport seam.
//!
//! The lifecycle core never touches bytes. A transport implementation hands
//! it a [`TransportParts`]: an outbound [`Transport`] for JSON messages and a
//! stream of [`TransportEvent`]s (connect, disconnect, inbound message). Both
//! halves are created together by [`channel`].

use std::future::Future;
use std::pin::Pin;

use serde_json::Value as JsonValue;
use tokio::sync::mpsc;

use crate::error::Result;

/// Something that happened on the link.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
	Connected,
	Disconnected { reason: String },
	/// One complete, already-framed message.
	Message(JsonValue),
}

/// Outbound half of a transport.
pub trait Transport: Send {
	/// Sends one encoded message.
	///
	/// Fails with [`Error::Transport`](crate::Error::Transport) if the link is
	/// not usable.
	fn send(&mut self, message: JsonValue) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// What a [`LifecycleManager`](crate::LifecycleManager) needs from a transport.
pub struct TransportParts {
	pub sender: Box<dyn Transport>,
	pub events: mpsc::UnboundedReceiver<TransportEvent>,
}

/// Producer side of the event stream, kept by the transport implementation.
#[derive(Clone)]
pub struct TransportEvents {
	tx: mpsc::UnboundedSender<TransportEvent>,
}

impl TransportEvents {
	/// Returns `false` once the lifecycle manager is gone.
	pub fn emit(&self, event: TransportEvent) -> bool {
		self.tx.send(event).is_ok()
	}

	pub fn connected(&self) -> bool {
		self.emit(TransportEvent::Connected)
	}

	pub fn disconnected(&self, reason: impl Into<String>) -> bool {
		self.emit(TransportEvent::Disconnected { reason: reason.into() })
	}

	pub fn message(&self, message: JsonValue) -> bool {
		self.emit(TransportEvent::Message(message))
	}

	pub fn is_closed(&self) -> bool {
		self.tx.is_closed()
	}
}

/// Pairs `sender` with a fresh event stream.
pub fn channel(sender: impl Transport + 'static) -> (TransportParts, TransportEvents) {
	let (tx, events) = mpsc::unbounded_channel();
	let parts = TransportParts {
		sender: Box::new(sender),
		events,
	};
	(parts, TransportEvents { tx })
}
