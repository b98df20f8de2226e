//! Interactive Penumbra viewer.
//! Run: cargo run -p viewer --bin scene_viewer [-- path/to/penumbra.toml]

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use penumbra_bridge::PenumbraWindowBackend;
use penumbra_renderer::RendererConfig;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use scene_api::{CentralModel, Control, RenderBackendWindow, SceneState};
use viewer::input::{key_action, Action, InputState};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow};
use winit::keyboard::PhysicalKey;
use winit::window::{Window, WindowId};

const DEFAULT_CONFIG: &str = "penumbra.toml";
const TICK: Duration = Duration::from_millis(100);

struct App {
    config: RendererConfig,
    available: Vec<CentralModel>,
    window: Option<Window>,
    backend: Option<Box<dyn RenderBackendWindow>>,
    state: SceneState,
    input: InputState,
    start: Instant,
    next_tick: Instant,
    /// First fatal error; ends the loop and becomes the process result.
    error: Option<String>,
}

impl App {
    fn new(config: RendererConfig) -> Self {
        let now = Instant::now();
        Self {
            available: config.available_models(),
            config,
            window: None,
            backend: None,
            state: SceneState::default(),
            input: InputState::default(),
            start: now,
            next_tick: now + TICK,
            error: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, e: String) {
        log::error!("{e}");
        self.error.get_or_insert(e);
        event_loop.exit();
    }

    fn apply(&mut self, control: Control) {
        self.state.apply(control);
        if let Some(w) = &self.window {
            w.request_redraw();
        }
    }

    fn redraw(&mut self) -> Result<(), String> {
        let (Some(window), Some(backend)) = (&self.window, &mut self.backend) else {
            return Ok(());
        };
        let raw_window = window.window_handle().map_err(|e| e.to_string())?.as_raw();
        let raw_display = window.display_handle().map_err(|e| e.to_string())?.as_raw();
        backend.prepare(&self.state)?;
        backend.render_frame_to_window(&self.state, raw_window, raw_display)
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let attrs = Window::default_attributes()
            .with_title("Penumbra")
            .with_inner_size(winit::dpi::PhysicalSize::new(self.state.width, self.state.height));
        let window = match event_loop.create_window(attrs) {
            Ok(w) => w,
            Err(e) => return self.fail(event_loop, format!("create window: {e}")),
        };
        match PenumbraWindowBackend::from_window(&window, self.config.clone()) {
            Ok(backend) => self.backend = Some(backend),
            Err(e) => return self.fail(event_loop, format!("renderer setup failed: {e}")),
        }
        let size = window.inner_size();
        self.state.apply(Control::Resize { width: size.width, height: size.height });
        window.request_redraw();
        self.window = Some(window);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => self.apply(Control::Resize { width: size.width, height: size.height }),
            WindowEvent::ModifiersChanged(m) => self.input.set_shift(m.state().shift_key()),
            WindowEvent::MouseInput { state, button, .. } => self.input.mouse_button(button, state),
            WindowEvent::CursorLeft { .. } => self.input.cursor_left(),
            WindowEvent::CursorMoved { position, .. } => {
                if let Some(control) = self.input.cursor_moved(position) {
                    self.apply(control);
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                if let Some(control) = self.input.wheel(delta) {
                    self.apply(control);
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Pressed || event.repeat {
                    return;
                }
                let PhysicalKey::Code(code) = event.physical_key else {
                    return;
                };
                match key_action(code, self.state.central_model, &self.available) {
                    Some(Action::Quit) => event_loop.exit(),
                    Some(Action::Apply(control)) => self.apply(control),
                    None => {}
                }
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.redraw() {
                    self.fail(event_loop, format!("frame failed: {e}"));
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        if now >= self.next_tick {
            let elapsed_ms = now.duration_since(self.start).as_millis() as u64;
            self.apply(Control::Tick { elapsed_ms });
            self.next_tick = now + TICK;
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_tick));
    }
}

/// An explicit path must load; the default file is optional.
fn load_config(arg: Option<PathBuf>) -> Result<RendererConfig, String> {
    let (path, required) = match arg {
        Some(p) => (p, true),
        None => (PathBuf::from(DEFAULT_CONFIG), false),
    };
    if !required && !Path::new(&path).exists() {
        log::info!("no {DEFAULT_CONFIG}; using defaults");
        return Ok(RendererConfig::default());
    }
    let config = RendererConfig::load(&path).map_err(|e| e.to_string())?;
    log::info!("config loaded from {}", path.display());
    Ok(config)
}

fn main() -> Result<(), String> {
    viewer::logging::init();
    let config = load_config(std::env::args_os().nth(1).map(PathBuf::from))?;
    let event_loop = winit::event_loop::EventLoop::new().map_err(|e| e.to_string())?;
    let mut app = App::new(config);
    event_loop.run_app(&mut app).map_err(|e| e.to_string())?;
    match app.error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
