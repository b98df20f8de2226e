//! Penumbra bridge: implements scene_api::RenderBackend using penumbra-renderer.

mod plugin;
mod window_backend;

pub use plugin::PenumbraPlugin;
pub use window_backend::PenumbraWindowBackend;
