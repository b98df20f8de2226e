//! Shared scene API for Penumbra.
//! Defines the viewer-side scene state, the input controls that mutate it between
//! frames, and the RenderBackend trait the host drives (prepare + render_frame).

mod backend;
mod control;
mod state;

pub use backend::{RenderBackend, RenderBackendWindow};
pub use control::Control;
pub use state::{frustum, CentralModel, DisplayMode, SceneState, FAR_PLANE, GROUND_HEIGHT};
pub use raw_window_handle::{RawDisplayHandle, RawWindowHandle};
