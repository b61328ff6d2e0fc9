use tracing::debug;

use super::{ManagerContext, ManagerError, ManagerFuture, ManagerKind, ManagerState, StateCell, SubordinateManager};

/// Tracks the file manager's session state.
///
/// Uploads are not handled here; the manager only has to be ready before the
/// lock screen (which uploads its artwork) starts.
#[derive(Debug, Default)]
pub struct FileManager {
	state: StateCell,
}

impl FileManager {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn state(&self) -> ManagerState {
		self.state.get()
	}
}

impl SubordinateManager for FileManager {
	fn kind(&self) -> ManagerKind {
		ManagerKind::File
	}

	fn start(&self, _context: ManagerContext) -> ManagerFuture<'_> {
		Box::pin(async move {
			self.state.begin_start(ManagerKind::File)?;
			self.state.set(ManagerState::Ready);
			debug!(target = "sdl.managers", manager = %ManagerKind::File, "ready");
			Ok::<(), ManagerError>(())
		})
	}

	fn stop(&self) -> ManagerFuture<'_> {
		Box::pin(async move {
			self.state.set(ManagerState::Stopped);
			Ok(())
		})
	}
}
