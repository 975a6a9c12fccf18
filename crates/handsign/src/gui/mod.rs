//! A minimal GUI for showing video frames.
//!
//! The window event loop has to run on the main thread, so [`run`] moves the application code to
//! a separate thread and turns the main thread into the GUI thread. Images are sent to the GUI
//! thread with [`show_image`], which opens one window per image key.
//!
//! Pressing `q` or `Escape`, or closing any window, exits the process.

mod renderer;

use std::{
    collections::HashMap,
    panic::{catch_unwind, AssertUnwindSafe},
    process,
    sync::{Mutex, PoisonError},
    thread,
};

use once_cell::sync::OnceCell;
use winit::{
    event::{ElementState, Event, KeyboardInput, VirtualKeyCode, WindowEvent},
    event_loop::{ControlFlow, EventLoop, EventLoopBuilder, EventLoopProxy},
    window::WindowId,
};

use crate::{
    image::{Image, Resolution},
    termination::Termination,
};

use self::renderer::{Gpu, Renderer, Window};

struct Gui {
    gpu: Gpu,
    windows: HashMap<String, Renderer>,
    win_id_to_key: HashMap<WindowId, String>,
}

impl Gui {
    fn new(gpu: Gpu) -> Self {
        Self {
            gpu,
            windows: HashMap::new(),
            win_id_to_key: HashMap::new(),
        }
    }

    fn redraw(&mut self, win: WindowId) {
        let Some(key) = self.win_id_to_key.get(&win) else {
            return;
        };
        if let Some(renderer) = self.windows.get_mut(key) {
            renderer.redraw(&self.gpu);
        }
    }

    fn show(
        &mut self,
        target: &winit::event_loop::EventLoopWindowTarget<Msg>,
        key: String,
        res: Resolution,
        data: &[u8],
    ) -> anyhow::Result<()> {
        if !self.windows.contains_key(&key) {
            log::debug!("creating window for image '{key}' at {res}");
            let win = Window::open(target, &key, res)?;
            let renderer = Renderer::new(win, &self.gpu)?;
            self.win_id_to_key.insert(renderer.window().id(), key.clone());
            self.windows.insert(key.clone(), renderer);
        }

        if let Some(renderer) = self.windows.get_mut(&key) {
            renderer.update_texture(&self.gpu, res, data);
            renderer.window().request_redraw();
        }
        Ok(())
    }

    fn run(mut self, event_loop: EventLoop<Msg>) -> ! {
        event_loop.run(move |event, target, flow| {
            *flow = ControlFlow::Wait;
            match event {
                Event::UserEvent(Msg::Image { key, res, data }) => {
                    if let Err(e) = self.show(target, key, res, &data) {
                        log::error!("failed to show image: {e:#}");
                    }
                }
                Event::RedrawRequested(window) => self.redraw(window),
                Event::WindowEvent { event, .. } if is_quit(&event) => {
                    log::debug!("quit requested");
                    *flow = ControlFlow::ExitWithCode(0);
                }
                _ => {}
            }
        })
    }
}

fn is_quit(event: &WindowEvent<'_>) -> bool {
    match event {
        WindowEvent::CloseRequested => true,
        WindowEvent::KeyboardInput {
            input:
                KeyboardInput {
                    state: ElementState::Pressed,
                    virtual_keycode: Some(VirtualKeyCode::Q | VirtualKeyCode::Escape),
                    ..
                },
            ..
        } => true,
        _ => false,
    }
}

enum Msg {
    Image {
        key: String,
        res: Resolution,
        data: Vec<u8>,
    },
}

static PROXY: OnceCell<Mutex<EventLoopProxy<Msg>>> = OnceCell::new();

fn send(msg: Msg) {
    let Some(proxy) = PROXY.get() else {
        log::error!("GUI is not running, dropping message");
        return;
    };
    let proxy = proxy.lock().unwrap_or_else(PoisonError::into_inner);
    if proxy.send_event(msg).is_err() {
        log::debug!("GUI event loop has exited");
    }
}

/// Runs `cb` on a new thread while the main thread runs the GUI event loop.
///
/// The process exits once `cb` returns, with status 0 on success and 1 on failure. If `cb`
/// panics, the process exits with status 101, like the standard library does.
pub(crate) fn run<F, R>(cb: F) -> !
where
    F: FnOnce() -> R + Send + 'static,
    R: Termination + Send,
{
    let event_loop = EventLoopBuilder::with_user_event().build();
    if PROXY.set(Mutex::new(event_loop.create_proxy())).is_err() {
        log::error!("GUI already initialized");
        process::exit(101);
    }

    let gpu = match pollster::block_on(Gpu::open()) {
        Ok(gpu) => gpu,
        Err(e) => {
            log::error!("failed to initialize GPU: {e:#}");
            process::exit(1);
        }
    };

    let spawned = thread::Builder::new()
        .name("app".into())
        .spawn(move || match catch_unwind(AssertUnwindSafe(cb)) {
            Ok(r) if r.is_success() => process::exit(0),
            Ok(r) => {
                // Prints the error, if any.
                r.report();
                process::exit(1);
            }
            // The panic hook has already printed the message.
            Err(_payload) => process::exit(101),
        });
    if let Err(e) = spawned {
        log::error!("failed to spawn application thread: {e}");
        process::exit(1);
    }

    Gui::new(gpu).run(event_loop);
}

/// Displays an image in the window titled `key`, opening the window if necessary.
///
/// Must be called from within the application function passed to `#[handsign::main]`.
pub fn show_image(key: impl Into<String>, image: &Image) {
    // Images are RGBA8 already, which the GPU texture can take directly.
    send(Msg::Image {
        key: key.into(),
        res: image.resolution(),
        data: image.data().to_vec(),
    });
}
