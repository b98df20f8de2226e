//! Input controls: the only way the host mutates scene state between frames.

use crate::CentralModel;

/// One discrete user intent, already decoded from raw window events.
/// Deltas are in window pixels; `dy` grows downward.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Control {
    /// Number key 0..=9.
    SelectMode(u8),
    /// Left drag: orbit the camera.
    Orbit { dx: f32, dy: f32 },
    /// Shift + left drag: orbit the light.
    OrbitLight { dx: f32, dy: f32 },
    /// Middle drag: dolly the camera.
    Zoom { dy: f32 },
    /// Shift + middle drag: scale the light distance.
    LightDistance { dy: f32 },
    /// Right drag: pan the camera.
    Pan { dx: f32, dy: f32 },
    /// Wheel notches, positive away from the user. `light` routes it to the light distance.
    Wheel { steps: f32, light: bool },
    ToggleGround,
    ToggleSpheres,
    ToggleCentral,
    SelectModel(CentralModel),
    NextModel,
    /// New viewport size in physical pixels. Zero sizes are ignored.
    Resize { width: u32, height: u32 },
    /// Animation clock tick with total elapsed milliseconds since start.
    Tick { elapsed_ms: u64 },
}
