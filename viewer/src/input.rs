//! Decodes winit mouse and keyboard events into scene controls.
//!
//! Drags report the cursor delta since the previous move; the button held at
//! the time (and shift) picks which control the delta drives.

use scene_api::{CentralModel, Control};
use winit::dpi::PhysicalPosition;
use winit::event::{ElementState, MouseButton, MouseScrollDelta};
use winit::keyboard::KeyCode;

/// Pixel scroll reported per wheel notch on touchpads.
const PIXELS_PER_STEP: f64 = 40.0;

/// What a key press asks the host to do.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Action {
    Apply(Control),
    Quit,
}

#[derive(Debug, Default)]
pub struct InputState {
    shift: bool,
    held: Option<MouseButton>,
    cursor: Option<PhysicalPosition<f64>>,
}

impl InputState {
    pub fn set_shift(&mut self, shift: bool) {
        self.shift = shift;
    }

    pub fn mouse_button(&mut self, button: MouseButton, state: ElementState) {
        match state {
            ElementState::Pressed => self.held = Some(button),
            ElementState::Released if self.held == Some(button) => self.held = None,
            ElementState::Released => {}
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor = None;
    }

    pub fn cursor_moved(&mut self, position: PhysicalPosition<f64>) -> Option<Control> {
        let last = self.cursor.replace(position)?;
        let dx = (position.x - last.x) as f32;
        let dy = (position.y - last.y) as f32;
        if dx == 0.0 && dy == 0.0 {
            return None;
        }
        match (self.held?, self.shift) {
            (MouseButton::Left, false) => Some(Control::Orbit { dx, dy }),
            (MouseButton::Left, true) => Some(Control::OrbitLight { dx, dy }),
            (MouseButton::Middle, false) => Some(Control::Zoom { dy }),
            (MouseButton::Middle, true) => Some(Control::LightDistance { dy }),
            (MouseButton::Right, _) => Some(Control::Pan { dx, dy }),
            _ => None,
        }
    }

    pub fn wheel(&self, delta: MouseScrollDelta) -> Option<Control> {
        let steps = match delta {
            MouseScrollDelta::LineDelta(_, y) => y,
            MouseScrollDelta::PixelDelta(p) => (p.y / PIXELS_PER_STEP) as f32,
        };
        (steps != 0.0).then_some(Control::Wheel { steps, light: self.shift })
    }
}

/// Map a pressed key. `available` lists the central models the renderer can build;
/// `M` cycles through those only.
pub fn key_action(code: KeyCode, current: CentralModel, available: &[CentralModel]) -> Option<Action> {
    let digit = match code {
        KeyCode::Digit0 | KeyCode::Numpad0 => Some(0),
        KeyCode::Digit1 | KeyCode::Numpad1 => Some(1),
        KeyCode::Digit2 | KeyCode::Numpad2 => Some(2),
        KeyCode::Digit3 | KeyCode::Numpad3 => Some(3),
        KeyCode::Digit4 | KeyCode::Numpad4 => Some(4),
        KeyCode::Digit5 | KeyCode::Numpad5 => Some(5),
        KeyCode::Digit6 | KeyCode::Numpad6 => Some(6),
        KeyCode::Digit7 | KeyCode::Numpad7 => Some(7),
        KeyCode::Digit8 | KeyCode::Numpad8 => Some(8),
        KeyCode::Digit9 | KeyCode::Numpad9 => Some(9),
        _ => None,
    };
    if let Some(d) = digit {
        return Some(Action::Apply(Control::SelectMode(d)));
    }
    let control = match code {
        KeyCode::Escape | KeyCode::KeyQ => return Some(Action::Quit),
        KeyCode::KeyG => Control::ToggleGround,
        KeyCode::KeyS => Control::ToggleSpheres,
        KeyCode::KeyC => Control::ToggleCentral,
        KeyCode::KeyM => Control::SelectModel(next_available(current, available)?),
        _ => return None,
    };
    Some(Action::Apply(control))
}

/// The model after `current` in cycle order that is in `available`.
fn next_available(current: CentralModel, available: &[CentralModel]) -> Option<CentralModel> {
    let mut model = current.next();
    for _ in 0..CentralModel::ALL.len() {
        if available.contains(&model) {
            return (model != current).then_some(model);
        }
        model = model.next();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: f64, y: f64) -> PhysicalPosition<f64> {
        PhysicalPosition::new(x, y)
    }

    #[test]
    fn first_move_only_records_the_cursor() {
        let mut input = InputState::default();
        input.mouse_button(MouseButton::Left, ElementState::Pressed);
        assert_eq!(input.cursor_moved(at(10.0, 10.0)), None);
        assert_eq!(input.cursor_moved(at(14.0, 7.0)), Some(Control::Orbit { dx: 4.0, dy: -3.0 }));
    }

    #[test]
    fn button_and_shift_pick_the_control() {
        let mut input = InputState::default();
        input.cursor_moved(at(0.0, 0.0));
        assert_eq!(input.cursor_moved(at(5.0, 5.0)), None);

        input.set_shift(true);
        input.mouse_button(MouseButton::Left, ElementState::Pressed);
        assert_eq!(input.cursor_moved(at(6.0, 5.0)), Some(Control::OrbitLight { dx: 1.0, dy: 0.0 }));
        input.mouse_button(MouseButton::Left, ElementState::Released);

        input.mouse_button(MouseButton::Middle, ElementState::Pressed);
        assert_eq!(input.cursor_moved(at(6.0, 8.0)), Some(Control::LightDistance { dy: 3.0 }));
        input.set_shift(false);
        assert_eq!(input.cursor_moved(at(6.0, 9.0)), Some(Control::Zoom { dy: 1.0 }));
        input.mouse_button(MouseButton::Middle, ElementState::Released);

        input.mouse_button(MouseButton::Right, ElementState::Pressed);
        assert_eq!(input.cursor_moved(at(8.0, 9.0)), Some(Control::Pan { dx: 2.0, dy: 0.0 }));
    }

    #[test]
    fn leaving_the_window_breaks_the_drag() {
        let mut input = InputState::default();
        input.mouse_button(MouseButton::Left, ElementState::Pressed);
        input.cursor_moved(at(0.0, 0.0));
        input.cursor_left();
        assert_eq!(input.cursor_moved(at(300.0, 300.0)), None);
    }

    #[test]
    fn wheel_routes_by_shift() {
        let mut input = InputState::default();
        assert_eq!(
            input.wheel(MouseScrollDelta::LineDelta(0.0, 2.0)),
            Some(Control::Wheel { steps: 2.0, light: false })
        );
        input.set_shift(true);
        assert_eq!(
            input.wheel(MouseScrollDelta::PixelDelta(at(0.0, -80.0))),
            Some(Control::Wheel { steps: -2.0, light: true })
        );
        assert_eq!(input.wheel(MouseScrollDelta::LineDelta(1.0, 0.0)), None);
    }

    #[test]
    fn keys() {
        let all = CentralModel::ALL;
        let t = CentralModel::Teapot;
        assert_eq!(key_action(KeyCode::Digit7, t, &all), Some(Action::Apply(Control::SelectMode(7))));
        assert_eq!(key_action(KeyCode::Numpad0, t, &all), Some(Action::Apply(Control::SelectMode(0))));
        assert_eq!(key_action(KeyCode::KeyG, t, &all), Some(Action::Apply(Control::ToggleGround)));
        assert_eq!(key_action(KeyCode::KeyS, t, &all), Some(Action::Apply(Control::ToggleSpheres)));
        assert_eq!(key_action(KeyCode::Escape, t, &all), Some(Action::Quit));
        assert_eq!(key_action(KeyCode::KeyQ, t, &all), Some(Action::Quit));
        assert_eq!(key_action(KeyCode::KeyZ, t, &all), None);
    }

    #[test]
    fn model_key_skips_unbuildable_models() {
        let built = [CentralModel::Teapot, CentralModel::Sphere];
        assert_eq!(
            key_action(KeyCode::KeyM, CentralModel::Teapot, &built),
            Some(Action::Apply(Control::SelectModel(CentralModel::Sphere)))
        );
        assert_eq!(
            key_action(KeyCode::KeyM, CentralModel::Sphere, &built),
            Some(Action::Apply(Control::SelectModel(CentralModel::Teapot)))
        );
        assert_eq!(key_action(KeyCode::KeyM, CentralModel::Teapot, &[CentralModel::Teapot]), None);
        assert_eq!(
            key_action(KeyCode::KeyM, CentralModel::Teapot, &CentralModel::ALL),
            Some(Action::Apply(Control::SelectModel(CentralModel::Bunny)))
        );
    }
}
