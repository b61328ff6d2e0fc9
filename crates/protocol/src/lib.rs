//! Wire types for the head-unit RPC protocol.
//!
//! This crate contains the serde-serializable types exchanged with the peer
//! device over the transport. They represent the "envelope layer": the shapes
//! of messages as they appear on the wire, plus the handful of typed payloads
//! the session lifecycle itself needs to read or write.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: No behavior beyond serialization/deserialization
//! * Envelope-first: only the fields needed to route a message are typed;
//!   everything else stays an opaque JSON value
//! * Stable: Changes only when the wire protocol changes
//!
//! Session orchestration is built on top of these types in `sdl-core`.

pub mod function;
pub mod hmi;
pub mod message;
pub mod registration;
pub mod result_code;

pub use hmi::*;
pub use message::*;
pub use registration::*;
pub use result_code::*;
