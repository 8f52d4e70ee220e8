use winit::{
    dpi::PhysicalSize,
    event::*,
    event_loop::{ControlFlow, EventLoop},
    window,
};

use crate::{
    config::WindowConfig,
    error::InitError,
    input::{Gesture, GestureRecognizer, ScreenPoint},
};

pub enum WindowEvents {
    Resized { width: u32, height: u32 },
    /// A tap or pan recognized from the left mouse button, in physical pixels
    Gesture(Gesture),
    Draw,
}

pub struct Window {
    event_loop: EventLoop<()>,
    pub window: window::Window,
    tap_slop: f32,
}

impl Window {
    pub fn new(config: &WindowConfig, tap_slop: f32) -> Result<Self, InitError> {
        let event_loop = EventLoop::new();
        let window = window::WindowBuilder::new()
            .with_title(&config.title)
            .with_inner_size(PhysicalSize::new(config.width, config.height))
            .build(&event_loop)?;

        Ok(Self {
            event_loop,
            window,
            tap_slop,
        })
    }

    /// Runs the event loop until the window closes, Escape is pressed, or
    /// `callback` returns `false`.
    pub fn run(self, mut callback: impl 'static + FnMut(WindowEvents) -> bool) -> ! {
        let Self {
            event_loop,
            window,
            tap_slop,
        } = self;
        let mut gestures = GestureRecognizer::new(tap_slop);

        event_loop.run(move |event, _, control_flow| {
            let keep_running = match event {
                Event::WindowEvent {
                    ref event,
                    window_id,
                } if window_id == window.id() => match event {
                    WindowEvent::CloseRequested
                    | WindowEvent::KeyboardInput {
                        input:
                            KeyboardInput {
                                state: ElementState::Pressed,
                                virtual_keycode: Some(VirtualKeyCode::Escape),
                                ..
                            },
                        ..
                    } => false,
                    WindowEvent::Resized(physical_size) => callback(WindowEvents::Resized {
                        width: physical_size.width,
                        height: physical_size.height,
                    }),
                    WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                        // new_inner_size is &&mut so we have to dereference it twice
                        callback(WindowEvents::Resized {
                            width: new_inner_size.width,
                            height: new_inner_size.height,
                        })
                    }
                    WindowEvent::CursorMoved { position, .. } => {
                        let point = ScreenPoint::new(position.x as f32, position.y as f32);
                        match gestures.moved(point) {
                            Some(gesture) => callback(WindowEvents::Gesture(gesture)),
                            None => true,
                        }
                    }
                    WindowEvent::MouseInput {
                        state,
                        button: MouseButton::Left,
                        ..
                    } => {
                        let gesture = match state {
                            ElementState::Pressed => {
                                gestures.press();
                                None
                            }
                            ElementState::Released => gestures.release(),
                        };
                        match gesture {
                            Some(gesture) => callback(WindowEvents::Gesture(gesture)),
                            None => true,
                        }
                    }
                    _ => true,
                },
                Event::RedrawRequested(window_id) if window_id == window.id() => {
                    callback(WindowEvents::Draw)
                }
                Event::RedrawEventsCleared => {
                    // RedrawRequested will only trigger once, unless we manually
                    // request it.
                    window.request_redraw();
                    true
                }
                _ => true,
            };

            if !keep_running {
                *control_flow = ControlFlow::Exit;
            }
        })
    }
}
