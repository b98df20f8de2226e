//! Trait for render backends. Host uses this to call prepare/render_frame uniformly.

use crate::SceneState;
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};

/// Render backend the host drives once per redraw. The state is read-only here;
/// the host mutates it between frames.
pub trait RenderBackend: Send {
    /// Prepare phase: bring GPU-side scene content in line with the state
    /// (e.g. rebuild the central mesh after the model selection changed).
    fn prepare(&mut self, state: &SceneState) -> Result<(), String>;

    /// Render one frame offscreen. Submits work internally.
    fn render_frame(&mut self, state: &SceneState) -> Result<(), String>;
}

/// Extension for backends that can present to a window. Host passes raw handles (e.g. from winit);
/// the backend owns the surface and performs get_current_texture + present internally.
pub trait RenderBackendWindow: RenderBackend + Send {
    /// Render one frame and present to the window identified by the given raw handles.
    /// The surface is configured from `state.width` / `state.height`.
    fn render_frame_to_window(
        &mut self,
        state: &SceneState,
        raw_window_handle: RawWindowHandle,
        raw_display_handle: RawDisplayHandle,
    ) -> Result<(), String>;
}
