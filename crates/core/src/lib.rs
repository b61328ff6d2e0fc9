//! Session lifecycle core for apps talking to a head unit.
//!
//! Drives one connection from transport-up through the registration
//! handshake and manager bring-up to a ready session, correlates outbound
//! requests with their responses, fans notifications out to subscribers, and
//! tears everything down again on stop, link loss or process exit.
//!
//! ```ignore
//! let (parts, transport) = FakeTransportBuilder::new().build();
//! let manager = LifecycleManager::new(Configuration::new("Radio", "584421907"), parts)?;
//! manager.start(|result| tracing::info!(?result, "session ready"))?;
//! ```

pub mod config;
pub mod correlation;
pub mod delegate;
pub mod error;
pub mod fake_transport;
pub mod lifecycle;
pub mod manager;
pub mod notification;
pub mod orchestrator;
pub mod state;
pub mod transport;

pub use config::{Configuration, LifecycleConfiguration, LockScreenConfiguration, StreamingConfiguration};
pub use correlation::{Completion, CorrelationRegistry};
pub use delegate::ManagerDelegate;
pub use error::{Error, Result};
pub use fake_transport::{FakeTransportBuilder, FakeTransportController};
pub use lifecycle::{LifecycleManager, LifecycleManagerBuilder, ReadyHandler};
pub use manager::{ManagerContext, ManagerError, ManagerHandle, ManagerKind, ManagerState, SubordinateManager};
pub use notification::{HmiLevelChange, NotificationKind, NotificationRouter, SubscriptionId};
pub use orchestrator::{ManagerOrchestrator, SetupReport, TeardownReport};
pub use sdl_protocol as protocol;
pub use state::LifecycleState;
pub use transport::{Transport, TransportEvent, TransportEvents, TransportParts};
