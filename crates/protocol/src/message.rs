//! RPC envelopes: requests, responses and notifications.
//!
//! Every message on the wire is a JSON object tagged with its `type`:
//!
//! ```json
//! { "type": "request", "correlationId": 7, "function": "Show", "params": { "mainField1": "Hi" } }
//! { "type": "response", "correlationId": 7, "function": "Show", "success": true, "resultCode": "SUCCESS" }
//! { "type": "notification", "function": "OnHMIStatus", "params": { "hmiLevel": "FULL" } }
//! ```
//!
//! Requests and responses carry a correlation id; notifications never do.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::result_code::ResultCode;

/// 16-bit tag linking an outbound request to its inbound response.
pub type CorrelationId = u16;

/// A request as built by the host application, before a correlation id is assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
	/// Function name, e.g. `"Show"` or `"RegisterAppInterface"`.
	pub function: String,
	/// Opaque function parameters.
	#[serde(default)]
	pub params: JsonValue,
}

impl RpcRequest {
	pub fn new(function: impl Into<String>, params: JsonValue) -> Self {
		Self {
			function: function.into(),
			params,
		}
	}

	/// Builds a request whose params are serialized from a typed payload.
	pub fn from_payload<T: Serialize>(function: impl Into<String>, payload: &T) -> Result<Self, serde_json::Error> {
		Ok(Self::new(function, serde_json::to_value(payload)?))
	}

	/// Attaches a correlation id, producing the wire form.
	pub fn into_envelope(self, correlation_id: CorrelationId) -> RequestEnvelope {
		RequestEnvelope {
			correlation_id,
			function: self.function,
			params: self.params,
		}
	}
}

/// Wire form of a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEnvelope {
	pub correlation_id: CorrelationId,
	pub function: String,
	#[serde(default)]
	pub params: JsonValue,
}

/// Response to a previously sent request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcResponse {
	/// Correlation id of the request this answers.
	pub correlation_id: CorrelationId,
	pub function: String,
	pub success: bool,
	pub result_code: ResultCode,
	/// Human-readable detail supplied by the peer.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub info: Option<String>,
	#[serde(default)]
	pub params: JsonValue,
}

impl RpcResponse {
	/// Builds a successful response with `SUCCESS` and the given params.
	pub fn success(correlation_id: CorrelationId, function: impl Into<String>, params: JsonValue) -> Self {
		Self {
			correlation_id,
			function: function.into(),
			success: true,
			result_code: ResultCode::Success,
			info: None,
			params,
		}
	}

	/// Builds an unsuccessful response carrying `result_code` and `info`.
	pub fn failure(correlation_id: CorrelationId, function: impl Into<String>, result_code: ResultCode, info: impl Into<String>) -> Self {
		Self {
			correlation_id,
			function: function.into(),
			success: false,
			result_code,
			info: Some(info.into()),
			params: JsonValue::Null,
		}
	}

	/// Decodes the params into a typed payload.
	pub fn payload<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
		let params = if self.params.is_null() {
			JsonValue::Object(Default::default())
		} else {
			self.params.clone()
		};
		serde_json::from_value(params)
	}
}

/// Unsolicited message from the peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcNotification {
	pub function: String,
	#[serde(default)]
	pub params: JsonValue,
}

impl RpcNotification {
	pub fn new(function: impl Into<String>, params: JsonValue) -> Self {
		Self {
			function: function.into(),
			params,
		}
	}

	/// Decodes the params into a typed payload.
	pub fn payload<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
		serde_json::from_value(self.params.clone())
	}
}

/// Discriminated union of protocol messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RpcMessage {
	Request(RequestEnvelope),
	Response(RpcResponse),
	Notification(RpcNotification),
}

impl RpcMessage {
	/// Function name carried by the message, whatever its kind.
	pub fn function(&self) -> &str {
		match self {
			RpcMessage::Request(request) => &request.function,
			RpcMessage::Response(response) => &response.function,
			RpcMessage::Notification(notification) => &notification.function,
		}
	}

	/// Correlation id for requests and responses.
	pub fn correlation_id(&self) -> Option<CorrelationId> {
		match self {
			RpcMessage::Request(request) => Some(request.correlation_id),
			RpcMessage::Response(response) => Some(response.correlation_id),
			RpcMessage::Notification(_) => None,
		}
	}
}

/// Encodes a message into its raw JSON form.
pub fn encode(message: &RpcMessage) -> Result<JsonValue, serde_json::Error> {
	serde_json::to_value(message)
}

/// Decodes a raw JSON message.
pub fn decode(raw: JsonValue) -> Result<RpcMessage, serde_json::Error> {
	serde_json::from_value(raw)
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn request_envelope_serializes_with_type_tag() {
		let request = RpcRequest::new("Show", json!({ "mainField1": "Hello" })).into_envelope(42);
		let raw = encode(&RpcMessage::Request(request)).unwrap();

		assert_eq!(raw["type"], "request");
		assert_eq!(raw["correlationId"], 42);
		assert_eq!(raw["function"], "Show");
		assert_eq!(raw["params"]["mainField1"], "Hello");
	}

	#[test]
	fn response_deserializes_from_wire() {
		let raw = json!({
			"type": "response",
			"correlationId": 7,
			"function": "Show",
			"success": false,
			"resultCode": "REJECTED",
			"info": "not in FULL"
		});

		match decode(raw).unwrap() {
			RpcMessage::Response(response) => {
				assert_eq!(response.correlation_id, 7);
				assert!(!response.success);
				assert_eq!(response.result_code, ResultCode::Rejected);
				assert_eq!(response.info.as_deref(), Some("not in FULL"));
				assert!(response.params.is_null());
			}
			other => panic!("expected response, got {other:?}"),
		}
	}

	#[test]
	fn notification_has_no_correlation_id() {
		let raw = json!({ "type": "notification", "function": "OnHMIStatus", "params": { "hmiLevel": "FULL" } });
		let message = decode(raw).unwrap();

		assert_eq!(message.function(), "OnHMIStatus");
		assert_eq!(message.correlation_id(), None);
	}

	#[test]
	fn unknown_message_type_is_rejected() {
		let raw = json!({ "type": "ping", "function": "x" });
		assert!(decode(raw).is_err());
	}

	#[test]
	fn correlation_id_outside_u16_is_rejected() {
		let raw = json!({
			"type": "response",
			"correlationId": 70000,
			"function": "Show",
			"success": true,
			"resultCode": "SUCCESS"
		});
		assert!(decode(raw).is_err());
	}

	#[test]
	fn empty_params_decode_into_default_payload() {
		#[derive(Deserialize, Default)]
		struct Empty {
			#[serde(default)]
			value: Option<u32>,
		}

		let response = RpcResponse::success(1, "UnregisterAppInterface", JsonValue::Null);
		let payload: Empty = response.payload().unwrap();
		assert!(payload.value.is_none());
	}
}
