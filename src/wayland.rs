// Wayland integration module
// Presents the display as a full-screen overlay layer surface using smithay-client-toolkit

use crate::display::{DisplayState, EventResponse, FullscreenDisplay};
use crate::input::ModifierState;
use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use smithay_client_toolkit::{
    compositor::{CompositorHandler, CompositorState},
    delegate_compositor, delegate_keyboard, delegate_layer, delegate_output, delegate_registry,
    delegate_seat, delegate_shm,
    output::{OutputHandler, OutputState},
    registry::{ProvidesRegistryState, RegistryState},
    registry_handlers,
    seat::{
        keyboard::{KeyEvent, KeyboardHandler, Keysym, Modifiers},
        Capability, SeatHandler, SeatState,
    },
    shell::{
        wlr_layer::{
            Anchor, KeyboardInteractivity, Layer, LayerShell, LayerShellHandler, LayerSurface,
            LayerSurfaceConfigure,
        },
        WaylandSurface,
    },
    shm::{
        slot::{Buffer, SlotPool},
        Shm, ShmHandler,
    },
};
use wayland_client::{
    globals::registry_queue_init,
    protocol::{wl_keyboard, wl_output, wl_seat, wl_shm, wl_surface},
    Connection, QueueHandle,
};

/// Layer surface namespace reported to the compositor
const NAMESPACE: &str = "lockimage";

/// Logical output size assumed when the compositor reports none
const FALLBACK_SIZE: (u32, u32) = (1920, 1080);

/// Reasons a rendered frame did not reach the screen
#[derive(Debug, thiserror::Error)]
enum PresentError {
    #[error("failed to create slot pool of {len} bytes: {reason}")]
    Pool { len: usize, reason: String },
    #[error("failed to create buffer {width}x{height}: {reason}")]
    Buffer {
        width: u32,
        height: u32,
        reason: String,
    },
    #[error("buffer too small for frame: {have} < {need} bytes")]
    TooSmall { have: usize, need: usize },
    #[error("failed to attach buffer: {0}")]
    Attach(String),
}

/// What to do after the compositor closed the layer surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Recovery {
    /// Put an identical surface back right away
    Recreate,
    /// No output can host a surface; recreate once one appears
    WaitForOutput,
}

/// Tracks compositor-initiated closes so a surface is never recreated without an output
#[derive(Debug, Default)]
struct SurfaceRecovery {
    closes: u64,
    awaiting_output: bool,
}

impl SurfaceRecovery {
    fn on_closed(&mut self, outputs_available: bool) -> Recovery {
        self.closes += 1;
        if outputs_available {
            Recovery::Recreate
        } else {
            self.awaiting_output = true;
            Recovery::WaitForOutput
        }
    }

    /// Returns true if a surface should be created for the new output
    fn on_new_output(&mut self) -> bool {
        std::mem::take(&mut self.awaiting_output)
    }
}

/// Main Wayland application state
struct LockApp {
    registry_state: RegistryState,
    seat_state: SeatState,
    output_state: OutputState,
    shm: Shm,
    layer_shell: LayerShell,
    compositor_state: CompositorState,

    display: FullscreenDisplay,

    layer_surface: Option<LayerSurface>,
    pool: Option<SlotPool>,
    // Attached buffer, kept alive until the next frame replaces it
    buffer: Option<Buffer>,
    // Physical size of the frame that actually reached the screen
    shown_size: Option<(u32, u32)>,
    // Logical surface size from the last configure
    width: u32,
    height: u32,
    scale_factor: i32,
    recovery: SurfaceRecovery,

    keyboard: Option<wl_keyboard::WlKeyboard>,
    modifiers: ModifierState,
}

impl LockApp {
    fn new(
        registry_state: RegistryState,
        seat_state: SeatState,
        output_state: OutputState,
        shm: Shm,
        layer_shell: LayerShell,
        compositor_state: CompositorState,
        display: FullscreenDisplay,
    ) -> Self {
        Self {
            registry_state,
            seat_state,
            output_state,
            shm,
            layer_shell,
            compositor_state,
            display,
            layer_surface: None,
            pool: None,
            buffer: None,
            shown_size: None,
            width: 0,
            height: 0,
            scale_factor: 1,
            recovery: SurfaceRecovery::default(),
            keyboard: None,
            modifiers: ModifierState::default(),
        }
    }

    /// Create the overlay surface covering the whole output
    fn create_layer_surface(&mut self, qh: &QueueHandle<Self>) {
        let surface = self.compositor_state.create_surface(qh);
        let layer_surface = self.layer_shell.create_layer_surface(
            qh,
            surface,
            Layer::Overlay,
            Some(NAMESPACE),
            None,
        );

        // Anchored on every edge with a zero size: the compositor sizes us to the output
        layer_surface.set_anchor(Anchor::TOP | Anchor::BOTTOM | Anchor::LEFT | Anchor::RIGHT);
        layer_surface.set_size(0, 0);
        layer_surface.set_exclusive_zone(-1);
        layer_surface.set_keyboard_interactivity(KeyboardInteractivity::Exclusive);

        // Until the compositor tells us which output we are on, assume the first one's scale
        self.scale_factor = primary_output_scale(&self.output_state);
        layer_surface.wl_surface().set_buffer_scale(self.scale_factor);

        // Commit the surface to trigger configure
        layer_surface.commit();

        info!("Created overlay layer surface (scale {})", self.scale_factor);
        self.layer_surface = Some(layer_surface);
    }

    /// Drop everything tied to the destroyed surface
    fn forget_surface(&mut self) {
        self.buffer = None;
        self.shown_size = None;
        self.pool = None;
        self.layer_surface = None;
    }

    /// Resample for the current logical size and scale, then show the result
    fn refresh(&mut self) {
        if self.layer_surface.is_none() {
            return;
        }
        let (width, height) = buffer_size((self.width, self.height), self.scale_factor);

        let first_frame = self.display.state() == DisplayState::Initializing;
        self.display.resize_image(width, height);

        if let Err(e) = self.present() {
            // The pool may be in a bad state; start over once before giving up on this frame
            warn!("{}, retrying with a fresh pool", e);
            self.pool = None;
            if let Err(e) = self.present() {
                error!(
                    "{}; screen still shows {:?} until the next configure",
                    e, self.shown_size
                );
                return;
            }
        }
        self.shown_size = Some((width, height));

        if first_frame {
            info!(
                "Image displayed at {}x{} (scale {})",
                width, height, self.scale_factor
            );
        }
    }

    /// Copy the current frame into a shm buffer and commit it
    fn present(&mut self) -> Result<(), PresentError> {
        let Some(layer_surface) = self.layer_surface.as_ref() else {
            return Ok(());
        };
        let Some(frame) = self.display.rendered() else {
            return Ok(());
        };

        let width = frame.width();
        let height = frame.height();
        let stride = frame.stride() as i32;
        let bytes = frame.as_bytes();

        if self.pool.is_none() {
            let pool = SlotPool::new(bytes.len(), &self.shm).map_err(|e| PresentError::Pool {
                len: bytes.len(),
                reason: e.to_string(),
            })?;
            self.pool = Some(pool);
        }
        let Some(pool) = self.pool.as_mut() else {
            return Ok(());
        };

        let (buffer, canvas) = pool
            .create_buffer(width as i32, height as i32, stride, wl_shm::Format::Argb8888)
            .map_err(|e| PresentError::Buffer {
                width,
                height,
                reason: e.to_string(),
            })?;

        copy_frame(canvas, bytes)?;

        let surface = layer_surface.wl_surface();
        surface.set_buffer_scale(self.scale_factor);
        buffer
            .attach_to(surface)
            .map_err(|e| PresentError::Attach(format!("{:?}", e)))?;
        surface.damage_buffer(0, 0, width as i32, height as i32);
        surface.commit();

        self.buffer = Some(buffer);
        Ok(())
    }
}

// Implement required traits for smithay-client-toolkit

impl CompositorHandler for LockApp {
    fn scale_factor_changed(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        new_factor: i32,
    ) {
        let new_factor = new_factor.max(1);
        if new_factor == self.scale_factor {
            return;
        }
        info!("Scale factor changed: {} -> {}", self.scale_factor, new_factor);
        self.scale_factor = new_factor;
        self.pool = None;

        // Before the first configure there is no size to render at
        if self.width > 0 && self.height > 0 {
            self.refresh();
        }
    }

    fn transform_changed(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _new_transform: wl_output::Transform,
    ) {
        debug!("Transform changed");
    }

    fn frame(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _time: u32,
    ) {
    }

    fn surface_enter(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _output: &wl_output::WlOutput,
    ) {
    }

    fn surface_leave(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _output: &wl_output::WlOutput,
    ) {
    }
}

impl OutputHandler for LockApp {
    fn output_state(&mut self) -> &mut OutputState {
        &mut self.output_state
    }

    fn new_output(
        &mut self,
        _conn: &Connection,
        qh: &QueueHandle<Self>,
        _output: wl_output::WlOutput,
    ) {
        debug!("New output detected");

        if self.recovery.on_new_output() {
            info!("Output available again, recreating layer surface");
            self.create_layer_surface(qh);
        }
    }

    fn update_output(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _output: wl_output::WlOutput,
    ) {
        debug!("Output updated");
    }

    fn output_destroyed(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _output: wl_output::WlOutput,
    ) {
        debug!("Output destroyed");
    }
}

impl LayerShellHandler for LockApp {
    fn closed(&mut self, _conn: &Connection, qh: &QueueHandle<Self>, _layer: &LayerSurface) {
        if self.display.on_close_request() != EventResponse::Suppressed {
            return;
        }

        // The compositor has already destroyed the surface; put an identical one back
        self.forget_surface();
        let outputs_available = self.output_state.outputs().next().is_some();
        match self.recovery.on_closed(outputs_available) {
            Recovery::Recreate => {
                warn!(
                    "Layer surface closed by compositor (#{}), recreating it",
                    self.recovery.closes
                );
                self.create_layer_surface(qh);
            }
            Recovery::WaitForOutput => {
                warn!(
                    "Layer surface closed by compositor (#{}) with no outputs, waiting for one",
                    self.recovery.closes
                );
            }
        }
    }

    fn configure(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _layer: &LayerSurface,
        configure: LayerSurfaceConfigure,
        _serial: u32,
    ) {
        debug!("Layer surface configured: {:?}", configure);

        let (mut width, mut height) = configure.new_size;
        if width == 0 || height == 0 {
            let (display_width, display_height) = get_display_dimensions(&self.output_state);
            if width == 0 {
                width = display_width;
            }
            if height == 0 {
                height = display_height;
            }
        }

        if (width, height) != (self.width, self.height) {
            info!("Window size: {}x{} (logical)", width, height);
            // Reset pool to force buffer recreation at the new size
            self.pool = None;
        }
        self.width = width;
        self.height = height;

        self.refresh();
    }
}

impl SeatHandler for LockApp {
    fn seat_state(&mut self) -> &mut SeatState {
        &mut self.seat_state
    }

    fn new_seat(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _seat: wl_seat::WlSeat) {
        debug!("New seat");
    }

    fn new_capability(
        &mut self,
        _conn: &Connection,
        qh: &QueueHandle<Self>,
        seat: wl_seat::WlSeat,
        capability: Capability,
    ) {
        debug!("New capability: {:?}", capability);

        if capability == Capability::Keyboard && self.keyboard.is_none() {
            match self.seat_state.get_keyboard(qh, &seat, None) {
                Ok(keyboard) => self.keyboard = Some(keyboard),
                Err(e) => error!("Failed to get keyboard: {}", e),
            }
        }
    }

    fn remove_capability(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _seat: wl_seat::WlSeat,
        capability: Capability,
    ) {
        debug!("Capability removed: {:?}", capability);

        if capability == Capability::Keyboard {
            if let Some(keyboard) = self.keyboard.take() {
                keyboard.release();
            }
        }
    }

    fn remove_seat(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _seat: wl_seat::WlSeat) {
        debug!("Seat removed");
    }
}

impl KeyboardHandler for LockApp {
    fn enter(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _keyboard: &wl_keyboard::WlKeyboard,
        _surface: &wl_surface::WlSurface,
        _serial: u32,
        _raw: &[u32],
        _keysyms: &[Keysym],
    ) {
        debug!("Keyboard entered surface");
    }

    fn leave(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _keyboard: &wl_keyboard::WlKeyboard,
        _surface: &wl_surface::WlSurface,
        _serial: u32,
    ) {
        debug!("Keyboard left surface");
        self.modifiers = ModifierState::default();
    }

    fn press_key(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _keyboard: &wl_keyboard::WlKeyboard,
        _serial: u32,
        event: KeyEvent,
    ) {
        // No key ever closes the window; dismissal shortcuts are consumed here
        if self.display.on_key(event.keysym, self.modifiers) == EventResponse::Ignored {
            debug!("Key pressed: {:?}", event.keysym);
        }
    }

    fn release_key(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _keyboard: &wl_keyboard::WlKeyboard,
        _serial: u32,
        _event: KeyEvent,
    ) {
    }

    fn update_modifiers(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _keyboard: &wl_keyboard::WlKeyboard,
        _serial: u32,
        modifiers: Modifiers,
        _layout: u32,
    ) {
        self.modifiers = modifiers.into();
    }
}

impl ShmHandler for LockApp {
    fn shm_state(&mut self) -> &mut Shm {
        &mut self.shm
    }
}

impl ProvidesRegistryState for LockApp {
    fn registry(&mut self) -> &mut RegistryState {
        &mut self.registry_state
    }

    registry_handlers![OutputState, SeatState];
}

// Delegate macros
delegate_compositor!(LockApp);
delegate_output!(LockApp);
delegate_layer!(LockApp);
delegate_seat!(LockApp);
delegate_keyboard!(LockApp);
delegate_shm!(LockApp);
delegate_registry!(LockApp);

/// Run the display until the Wayland connection fails.
///
/// Nothing inside the application ends the loop.
pub fn run(display: FullscreenDisplay) -> Result<()> {
    info!("Connecting to Wayland display");

    let conn = Connection::connect_to_env().context("Failed to connect to Wayland display")?;

    let (globals, mut event_queue) =
        registry_queue_init(&conn).context("Failed to initialize registry")?;
    let qh = event_queue.handle();

    let compositor_state =
        CompositorState::bind(&globals, &qh).context("Failed to bind compositor")?;
    let layer_shell = LayerShell::bind(&globals, &qh).context("Failed to bind layer shell")?;
    let shm = Shm::bind(&globals, &qh).context("Failed to bind shm")?;

    let mut app = LockApp::new(
        RegistryState::new(&globals),
        SeatState::new(&globals, &qh),
        OutputState::new(&globals, &qh),
        shm,
        layer_shell,
        compositor_state,
        display,
    );

    // Dispatch once to get output info
    event_queue
        .roundtrip(&mut app)
        .context("Initial Wayland roundtrip failed")?;

    let (display_width, display_height) = get_display_dimensions(&app.output_state);
    info!(
        "Display dimensions: {}x{} (logical)",
        display_width, display_height
    );

    app.create_layer_surface(&qh);

    info!("Starting event loop");
    loop {
        event_queue
            .blocking_dispatch(&mut app)
            .context("Wayland event dispatch failed")?;
    }
}

/// Logical size of the first output that reports one
fn get_display_dimensions(output_state: &OutputState) -> (u32, u32) {
    for output in output_state.outputs() {
        if let Some(info) = output_state.info(&output) {
            let mode = info
                .modes
                .iter()
                .find(|m| m.current)
                .or_else(|| info.modes.first())
                .map(|m| m.dimensions);
            if let Some(size) = logical_output_size(info.logical_size, mode, info.scale_factor) {
                return size;
            }
        }
    }
    FALLBACK_SIZE
}

/// Integer scale of the first known output
fn primary_output_scale(output_state: &OutputState) -> i32 {
    output_state
        .outputs()
        .find_map(|output| output_state.info(&output))
        .map(|info| info.scale_factor.max(1))
        .unwrap_or(1)
}

/// Logical output size, preferring what xdg-output reports over mode pixels divided by scale
fn logical_output_size(
    logical: Option<(i32, i32)>,
    mode: Option<(i32, i32)>,
    scale_factor: i32,
) -> Option<(u32, u32)> {
    if let Some((w, h)) = logical.filter(|&(w, h)| w > 0 && h > 0) {
        return Some((w as u32, h as u32));
    }
    let (w, h) = mode.filter(|&(w, h)| w > 0 && h > 0)?;
    let scale = scale_factor.max(1);
    Some(((w / scale).max(1) as u32, (h / scale).max(1) as u32))
}

/// Physical buffer size for a logical surface size
fn buffer_size(logical: (u32, u32), scale_factor: i32) -> (u32, u32) {
    let scale = scale_factor.max(1) as u32;
    (logical.0 * scale, logical.1 * scale)
}

fn copy_frame(canvas: &mut [u8], bytes: &[u8]) -> Result<(), PresentError> {
    if canvas.len() < bytes.len() {
        return Err(PresentError::TooSmall {
            have: canvas.len(),
            need: bytes.len(),
        });
    }
    canvas[..bytes.len()].copy_from_slice(bytes);
    Ok(())
}
