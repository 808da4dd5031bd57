use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

use glam::Vec2;
use instant::Instant;
use winit::application::ApplicationHandler;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowAttributes, WindowId, WindowLevel};

use crate::assets::{AssetLibrary, FrameSequence};
use crate::config::{Config, ASSETS_DIR};
use crate::input::InputRouter;
use crate::menu::PetMenu;
use crate::pet::{Effect, Event, PetCore, TICK_MS};
use crate::render::GpuState;

/// Target simulation tick rate (seconds per tick).
const TICK_RATE: f64 = TICK_MS as f64 / 1000.0;
/// Max accumulated time before we clamp (prevents spiral of death).
const MAX_ACCUMULATOR: f64 = 0.25;

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

/// Top-level application state.
struct App {
    window: Option<Arc<Window>>,
    gpu: Option<GpuState>,
    menu: Option<PetMenu>,

    // Behavior core — built in `resumed` once the screen size is known
    boot_config: Option<Config>,
    core: Option<PetCore>,

    // Animation currently on screen
    assets: AssetLibrary,
    sequence: Rc<FrameSequence>,

    // Event staging between the window and the core
    input: InputRouter,
    events: Vec<Event>,
    effects: Vec<Effect>,

    // Fixed timestep
    last_frame_time: Option<Instant>,
    accumulator: f64,
}

impl App {
    fn new(config: Config) -> Self {
        let assets = AssetLibrary::new();
        let sequence = assets.placeholder();
        Self {
            window: None,
            gpu: None,
            menu: None,
            boot_config: Some(config),
            core: None,
            assets,
            sequence,
            input: InputRouter::new(),
            events: Vec::new(),
            effects: Vec::new(),
            last_frame_time: None,
            accumulator: 0.0,
        }
    }

    /// Run fixed-timestep simulation ticks.
    fn run_fixed_update(&mut self, dt: f64, event_loop: &ActiveEventLoop) {
        self.accumulator += dt;

        if self.accumulator > MAX_ACCUMULATOR {
            self.accumulator = MAX_ACCUMULATOR;
        }

        // Sample the global cursor and pump the menu once per frame (not per
        // tick). Both feed the same staged event queue as the window events.
        #[cfg(windows)]
        {
            let (mouse_x, mouse_y) = crate::platform::win32::get_mouse_pos();
            self.input
                .global_sample(Vec2::new(mouse_x, mouse_y), &mut self.events);
        }

        if let Some(menu) = &mut self.menu {
            if let Some(command) = menu.poll() {
                self.events.push(Event::MenuCommand(command));
            }
        }

        while self.accumulator >= TICK_RATE {
            self.tick(event_loop);
            self.accumulator -= TICK_RATE;
        }
    }

    /// One simulation tick: drain staged events through the core, then apply
    /// whatever effects came out.
    fn tick(&mut self, event_loop: &ActiveEventLoop) {
        let Some(mut core) = self.core.take() else {
            return;
        };
        let mut effects = std::mem::take(&mut self.effects);

        for event in self.events.drain(..) {
            core.handle(event, &mut effects);
        }
        core.handle(Event::Tick, &mut effects);

        for effect in effects.drain(..) {
            self.apply_effect(&mut core, event_loop, effect);
        }

        self.effects = effects;
        self.core = Some(core);
    }

    fn apply_effect(&mut self, core: &mut PetCore, event_loop: &ActiveEventLoop, effect: Effect) {
        match effect {
            Effect::MoveWindow(pos) => {
                if let Some(window) = &self.window {
                    window.set_outer_position(PhysicalPosition::new(
                        pos.x.round() as i32,
                        pos.y.round() as i32,
                    ));
                }
            }
            Effect::PlayAnimation(path) => {
                let sequence = self.assets.load(&path);
                self.show_sequence(core, sequence);
            }
            Effect::Quit => {
                log::info!("Quit selected, exiting");
                event_loop.exit();
            }
        }
    }

    /// Swap the displayed animation: resize the window and the frame texture
    /// to match, then tell the core the new frame count.
    fn show_sequence(&mut self, core: &mut PetCore, sequence: Rc<FrameSequence>) {
        let width = sequence.width;
        let height = sequence.height;

        if let Some(window) = &self.window {
            // The Resized event that follows reconfigures the surface.
            let _ = window.request_inner_size(PhysicalSize::new(width, height));
        }
        if let Some(gpu) = &mut self.gpu {
            gpu.set_frame_size(width, height);
        }

        // AnimationLoaded resets the frame clock and raises nothing further.
        let mut discarded = Vec::new();
        core.handle(
            Event::AnimationLoaded {
                frames: sequence.frames.len(),
                size: Vec2::new(width as f32, height as f32),
            },
            &mut discarded,
        );

        self.sequence = sequence;
    }

    /// Upload the current animation frame and draw it.
    fn render(&mut self) {
        let (Some(gpu), Some(core)) = (&mut self.gpu, &self.core) else {
            return;
        };
        let frames = &self.sequence.frames;
        let frame = &frames[core.pet.frame_cursor % frames.len()];
        gpu.upload_frame(frame);
        gpu.render_frame();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let Some(config) = self.boot_config.take() else {
            return;
        };

        let monitor = event_loop
            .primary_monitor()
            .or_else(|| event_loop.available_monitors().next())
            .expect("no monitor found");
        let screen_size = monitor.size();
        let screen = Vec2::new(screen_size.width as f32, screen_size.height as f32);

        let mut core = PetCore::new(config, screen, fastrand::Rng::new());
        let size = core.pet.size;
        let pos = core.pet.pos;

        // No with_transparent(true) — that sets WS_EX_LAYERED which creates
        // a GDI backing surface that conflicts with DirectComposition.
        // Transparency comes from wgpu's DxgiFromVisual + PreMultiplied alpha.
        // Start hidden so DWM doesn't cache stale frame state before our
        // overlay style changes take effect.
        let attrs = WindowAttributes::default()
            .with_title("DeskPet")
            .with_decorations(false)
            .with_visible(false)
            .with_window_level(WindowLevel::AlwaysOnTop)
            .with_inner_size(PhysicalSize::new(size.x as u32, size.y as u32))
            .with_position(PhysicalPosition::new(
                pos.x.round() as i32,
                pos.y.round() as i32,
            ));

        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .expect("failed to create window"),
        );

        #[cfg(windows)]
        crate::platform::win32::setup_overlay(&window);

        log::info!(
            "Pet window created: {}x{} on {:?}",
            size.x as u32,
            size.y as u32,
            monitor.name().unwrap_or_default()
        );

        // Initialize wgpu + pipeline
        let gpu = GpuState::new(window.clone());
        self.gpu = Some(gpu);
        log::info!("wgpu + sprite pipeline initialized");

        self.menu = Some(PetMenu::new(
            core.catalog.names().map(str::to_owned).collect(),
        ));

        self.window = Some(window.clone());

        // Placeholder first, so a frame texture exists even when the first
        // character has no idle animation mapped.
        let placeholder = self.assets.placeholder();
        self.show_sequence(&mut core, placeholder);

        let mut effects = std::mem::take(&mut self.effects);
        core.boot(&mut effects);
        for effect in effects.drain(..) {
            self.apply_effect(&mut core, event_loop, effect);
        }
        self.effects = effects;
        self.core = Some(core);

        // Continuous loop; Fifo presentation paces the redraws.
        event_loop.set_control_flow(ControlFlow::Poll);

        // Show window now that all styles and GPU resources are ready.
        // This prevents DWM from caching stale frame state (the "white box").
        window.set_visible(true);
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(w) = &self.window {
            w.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting");
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                if let Some(gpu) = &mut self.gpu {
                    gpu.resize(new_size.width, new_size.height);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                if let Some(core) = &self.core {
                    let local = Vec2::new(position.x as f32, position.y as f32);
                    self.input.cursor_moved(local, core.pet.pos, &mut self.events);
                }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if let Some(core) = &self.core {
                    let menu_requested =
                        self.input
                            .mouse_input(button, state, core.pet.pos, &mut self.events);
                    if menu_requested {
                        if let Some(menu) = &mut self.menu {
                            menu.show();
                        }
                    }
                }
            }
            WindowEvent::RedrawRequested => {
                // --- Timing ---
                let now = Instant::now();
                if let Some(last) = self.last_frame_time {
                    let dt = now.duration_since(last).as_secs_f64();
                    self.run_fixed_update(dt, event_loop);
                }
                self.last_frame_time = Some(now);

                // --- Render ---
                self.render();
            }
            _ => {}
        }
    }
}

/// Entry point — load config, create event loop and run.
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load(Path::new(ASSETS_DIR))?;
    let event_loop = EventLoop::new()?;
    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;
    Ok(())
}
