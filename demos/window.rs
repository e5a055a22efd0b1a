//! Opens a window and runs an animated sketch on the GPU backend.
//!
//! Run with:   cargo run --example window
use std::sync::Arc;

use easel::{
    Color, FrameLoop, FrameState, InputSnapshot, RenderMode, Sketch, Surface, SurfaceConfig,
    WgpuBackend,
};
use futures::executor::block_on;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::window::{Window, WindowId};

struct Orbit {
    angle: f32,
}

impl Sketch for Orbit {
    fn setup(&mut self, surface: &mut Surface) -> easel::Result<()> {
        surface.no_stroke();
        Ok(())
    }

    fn draw(&mut self, s: &mut Surface, frame: &FrameState) -> easel::Result<()> {
        self.angle += frame.delta_seconds();
        let (w, h) = (s.width() as f32, s.height() as f32);

        s.background(Color::gray(24))?;
        s.lights();
        s.directional_light(Color::rgb(220, 220, 220), [0.0, 0.5, -1.0]);

        s.push_matrix()?;
        s.translate(w / 2.0, h / 2.0);
        s.rotate_y(self.angle);
        s.rotate_x(self.angle * 0.7);
        s.fill(Color::rgb(0, 128, 255));
        s.cube(h / 4.0)?;
        s.pop_matrix()?;

        s.no_lights();
        let [mx, my] = frame.input.mouse;
        s.fill(if frame.input.mouse_pressed {
            Color::rgb(255, 80, 80)
        } else {
            Color::WHITE
        });
        s.circle(mx, my, 16.0)
    }
}

struct App {
    window: Option<Arc<Window>>,
    surface: Option<Surface>,
    frame_loop: FrameLoop,
    input: InputSnapshot,
    sketch: Orbit,
}

impl App {
    fn create(&mut self, event_loop: &ActiveEventLoop) -> Result<(), String> {
        let attributes = Window::default_attributes()
            .with_title("easel")
            .with_inner_size(PhysicalSize::new(640, 480));
        let window = Arc::new(event_loop.create_window(attributes).map_err(|e| e.to_string())?);
        let size = window.inner_size();
        let backend = block_on(WgpuBackend::new_windowed(
            window.clone(),
            (size.width, size.height),
            4,
            true,
            true,
        ))
        .map_err(|e| e.to_string())?;
        let config = SurfaceConfig::new(size.width, size.height).with_render_mode(RenderMode::P3D);
        self.surface = Some(Surface::from_backend(config, Box::new(backend)));
        self.window = Some(window);
        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.create(event_loop) {
            eprintln!("failed to create the window: {e}");
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let (Some(window), Some(surface)) = (&self.window, &mut self.surface) else {
            return;
        };
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if let Err(e) = surface.resize(size.width, size.height) {
                    eprintln!("{e}");
                }
                window.request_redraw();
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.input.mouse = [position.x as f32, position.y as f32];
            }
            WindowEvent::MouseInput { state, .. } => {
                self.input.mouse_pressed = state == ElementState::Pressed;
            }
            WindowEvent::RedrawRequested => {
                self.frame_loop.set_input(self.input.clone());
                if let Err(e) = self.frame_loop.step(&mut self.sketch, surface) {
                    eprintln!("{e}");
                }
                window.request_redraw();
            }
            _ => {}
        }
    }
}

pub fn main() {
    env_logger::init();
    let event_loop = EventLoop::new().expect("To create the event loop");
    let mut app = App {
        window: None,
        surface: None,
        frame_loop: FrameLoop::default(),
        input: InputSnapshot::default(),
        sketch: Orbit { angle: 0.0 },
    };
    if let Err(e) = event_loop.run_app(&mut app) {
        eprintln!("{e}");
    }
}
