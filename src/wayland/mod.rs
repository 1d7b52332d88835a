//! Wayland backend
//!
//! Implements [`Protocol`] on top of `wayland-client` proxies, translates
//! incoming events into the background's event enums and drives the startup
//! sequence, the event loop and teardown.

pub mod shm;

use std::os::fd::{AsRawFd, RawFd};

use log::{debug, info};
use wayland_client::backend::WaylandError;
use wayland_client::protocol::{
    wl_buffer, wl_compositor, wl_output, wl_region, wl_registry, wl_shm, wl_shm_pool, wl_surface,
};
use wayland_client::{delegate_noop, Connection, Dispatch, EventQueue, Proxy, QueueHandle, WEnum};
use wayland_protocols_wlr::layer_shell::v1::client::{
    zwlr_layer_shell_v1::{self, ZwlrLayerShellV1},
    zwlr_layer_surface_v1::{self, Anchor, ZwlrLayerSurfaceV1},
};

use crate::background::{Background, BackgroundSettings};
use crate::error::BackgroundError;
use crate::event_loop::{self, EventSource, Shutdown, SignalFd};
use crate::protocol::{
    LayerSurfaceEvent, OutputEvent, OutputId, PixelBuffer, Protocol, RegistryEvent, ShmEvent,
};
use shm::{BufferKey, ShmBuffers};

/// Request side of the Wayland connection
pub struct WaylandProtocol {
    registry: wl_registry::WlRegistry,
    qh: QueueHandle<WaylandState>,
    buffers: ShmBuffers,
}

impl WaylandProtocol {
    pub fn new(registry: wl_registry::WlRegistry, qh: QueueHandle<WaylandState>) -> Self {
        Self {
            registry,
            qh,
            buffers: ShmBuffers::new(),
        }
    }

    fn region(&self, compositor: &wl_compositor::WlCompositor) -> wl_region::WlRegion {
        compositor.create_region(&self.qh, ())
    }
}

impl Protocol for WaylandProtocol {
    type Compositor = wl_compositor::WlCompositor;
    type Shm = wl_shm::WlShm;
    type LayerShell = ZwlrLayerShellV1;
    type Output = wl_output::WlOutput;
    type Surface = wl_surface::WlSurface;
    type LayerSurface = ZwlrLayerSurfaceV1;
    type Buffer = wl_buffer::WlBuffer;

    fn bind_compositor(&mut self, name: u32, version: u32) -> Self::Compositor {
        self.registry.bind(name, version, &self.qh, ())
    }

    fn bind_shm(&mut self, name: u32, version: u32) -> Self::Shm {
        self.registry.bind(name, version, &self.qh, ())
    }

    fn bind_layer_shell(&mut self, name: u32, version: u32) -> Self::LayerShell {
        self.registry.bind(name, version, &self.qh, ())
    }

    fn bind_output(&mut self, id: OutputId, version: u32) -> Self::Output {
        self.registry.bind(id.0, version, &self.qh, id)
    }

    fn release_output(&mut self, output: Self::Output) {
        output.release();
    }

    fn create_surface(&mut self, compositor: &Self::Compositor) -> Self::Surface {
        compositor.create_surface(&self.qh, ())
    }

    fn set_empty_input_region(&mut self, compositor: &Self::Compositor, surface: &Self::Surface) {
        let region = self.region(compositor);
        surface.set_input_region(Some(&region));
        region.destroy();
    }

    fn set_full_opaque_region(&mut self, compositor: &Self::Compositor, surface: &Self::Surface) {
        // Regions are clipped to the surface, so this covers all of it
        let region = self.region(compositor);
        region.add(0, 0, i32::MAX, i32::MAX);
        surface.set_opaque_region(Some(&region));
        region.destroy();
    }

    fn get_background_layer_surface(
        &mut self,
        shell: &Self::LayerShell,
        surface: &Self::Surface,
        output: &Self::Output,
        id: OutputId,
        namespace: &str,
    ) -> Self::LayerSurface {
        shell.get_layer_surface(
            surface,
            Some(output),
            zwlr_layer_shell_v1::Layer::Background,
            namespace.to_string(),
            &self.qh,
            id,
        )
    }

    fn set_exclusive_zone(&mut self, layer: &Self::LayerSurface, zone: i32) {
        layer.set_exclusive_zone(zone);
    }

    fn anchor_all_edges(&mut self, layer: &Self::LayerSurface) {
        layer.set_anchor(Anchor::Top | Anchor::Right | Anchor::Bottom | Anchor::Left);
    }

    fn ack_configure(&mut self, layer: &Self::LayerSurface, serial: u32) {
        layer.ack_configure(serial);
    }

    fn commit(&mut self, surface: &Self::Surface) {
        surface.commit();
    }

    fn destroy_layer_surface(&mut self, layer: Self::LayerSurface) {
        layer.destroy();
    }

    fn destroy_surface(&mut self, surface: Self::Surface) {
        surface.destroy();
    }

    fn destroy_layer_shell(&mut self, shell: Self::LayerShell) {
        // The destructor request only exists since version 3
        if shell.version() >= 3 {
            shell.destroy();
        }
    }

    fn get_buffer(
        &mut self,
        shm: &Self::Shm,
        width: u32,
        height: u32,
        owner: OutputId,
    ) -> Option<PixelBuffer<'_, Self::Buffer>> {
        self.buffers.get(shm, &self.qh, width, height, owner)
    }

    fn attach(&mut self, surface: &Self::Surface, buffer: &Self::Buffer) {
        surface.attach(Some(buffer), 0, 0);
    }

    fn damage_buffer(&mut self, surface: &Self::Surface, width: u32, height: u32) {
        surface.damage_buffer(0, 0, width as i32, height as i32);
    }

    fn forget_buffers(&mut self, owner: OutputId) {
        self.buffers.forget(owner);
    }
}

/// Dispatch target for every proxy the client creates
pub struct WaylandState {
    background: Background<WaylandProtocol>,
}

impl Dispatch<wl_registry::WlRegistry, ()> for WaylandState {
    fn event(
        state: &mut Self,
        _registry: &wl_registry::WlRegistry,
        event: wl_registry::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        let event = match event {
            wl_registry::Event::Global {
                name,
                interface,
                version,
            } => RegistryEvent::Global {
                name,
                interface,
                version,
            },
            wl_registry::Event::GlobalRemove { name } => RegistryEvent::GlobalRemove { name },
            _ => return,
        };
        state.background.handle_registry_event(event);
    }
}

impl Dispatch<wl_shm::WlShm, ()> for WaylandState {
    fn event(
        state: &mut Self,
        _shm: &wl_shm::WlShm,
        event: wl_shm::Event,
        _data: &(),
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        if let wl_shm::Event::Format { format } = event {
            let code = match format {
                WEnum::Value(format) => format as u32,
                WEnum::Unknown(code) => code,
            };
            state.background.handle_shm_event(ShmEvent::Format(code));
        }
    }
}

impl Dispatch<wl_output::WlOutput, OutputId> for WaylandState {
    fn event(
        state: &mut Self,
        _output: &wl_output::WlOutput,
        event: wl_output::Event,
        id: &OutputId,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        let event = match event {
            wl_output::Event::Geometry { make, model, .. } => OutputEvent::Geometry {
                make: Some(make),
                model: Some(model),
            },
            wl_output::Event::Mode {
                flags,
                width,
                height,
                ..
            } => OutputEvent::Mode {
                current: matches!(flags, WEnum::Value(flags) if flags.contains(wl_output::Mode::Current)),
                width,
                height,
            },
            wl_output::Event::Scale { factor } => OutputEvent::Scale(factor),
            wl_output::Event::Done => OutputEvent::Done,
            _ => return,
        };
        state.background.handle_output_event(*id, event);
    }
}

impl Dispatch<ZwlrLayerSurfaceV1, OutputId> for WaylandState {
    fn event(
        state: &mut Self,
        _layer: &ZwlrLayerSurfaceV1,
        event: zwlr_layer_surface_v1::Event,
        id: &OutputId,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        let event = match event {
            zwlr_layer_surface_v1::Event::Configure {
                serial,
                width,
                height,
            } => LayerSurfaceEvent::Configure {
                serial,
                width,
                height,
            },
            zwlr_layer_surface_v1::Event::Closed => LayerSurfaceEvent::Closed,
            _ => return,
        };
        state.background.handle_layer_surface_event(*id, event);
    }
}

impl Dispatch<wl_buffer::WlBuffer, BufferKey> for WaylandState {
    fn event(
        state: &mut Self,
        _buffer: &wl_buffer::WlBuffer,
        event: wl_buffer::Event,
        key: &BufferKey,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        if let wl_buffer::Event::Release = event {
            state.background.protocol_mut().buffers.release(*key);
        }
    }
}

delegate_noop!(WaylandState: wl_compositor::WlCompositor);
delegate_noop!(WaylandState: wl_region::WlRegion);
delegate_noop!(WaylandState: wl_shm_pool::WlShmPool);
delegate_noop!(WaylandState: ZwlrLayerShellV1);
delegate_noop!(WaylandState: ignore wl_surface::WlSurface);

/// Connection, event queue and background state for one run
pub struct WaylandClient {
    conn: Connection,
    queue: EventQueue<WaylandState>,
    state: WaylandState,
}

impl WaylandClient {
    pub fn connect(settings: BackgroundSettings) -> Result<Self, BackgroundError> {
        let conn = Connection::connect_to_env().map_err(BackgroundError::Connect)?;
        let queue = conn.new_event_queue();
        let qh = queue.handle();
        let registry = conn.display().get_registry(&qh, ());

        let protocol = WaylandProtocol::new(registry, qh);
        Ok(Self {
            conn,
            queue,
            state: WaylandState {
                background: Background::new(protocol, settings),
            },
        })
    }

    /// Collects globals, creates surfaces and checks that the compositor can
    /// show our buffers.
    pub fn initialize(&mut self) -> Result<(), BackgroundError> {
        self.roundtrip()?;
        self.state.background.require_globals()?;

        let attached = self.state.background.attach_all();
        debug!("attached {} surface(s) after initial roundtrip", attached);

        self.roundtrip()?;
        self.state.background.require_xrgb8888()?;

        info!(
            "✅ Wayland globals ready, {} output(s)",
            self.state.background.outputs().len()
        );
        Ok(())
    }

    pub fn roundtrip(&mut self) -> Result<usize, BackgroundError> {
        self.queue
            .roundtrip(&mut self.state)
            .map_err(BackgroundError::Dispatch)
    }

    /// Destroys all protocol objects and pushes the requests out
    pub fn shutdown(&mut self) {
        self.state.background.shutdown();
        self.state.background.protocol_mut().buffers.clear();
        if let Err(err) = self.conn.flush() {
            debug!("flush during shutdown failed: {}", err);
        }
    }
}

impl EventSource for WaylandClient {
    fn flush(&mut self) -> Result<(), BackgroundError> {
        check_flush(self.conn.flush())
    }

    fn connection_fd(&self) -> RawFd {
        self.conn.backend().poll_fd().as_raw_fd()
    }

    fn dispatch(&mut self) -> Result<usize, BackgroundError> {
        if let Some(guard) = self.queue.prepare_read() {
            match guard.read() {
                Ok(_) => {}
                Err(WaylandError::Io(err)) if err.kind() == std::io::ErrorKind::WouldBlock => {}
                Err(err) => return Err(BackgroundError::Read(err)),
            }
        }
        self.queue
            .dispatch_pending(&mut self.state)
            .map_err(BackgroundError::Dispatch)
    }
}

/// A full socket buffer only defers the rest of the requests to a later
/// flush; a dead connection shows up as a hang-up on the next poll.
fn check_flush(result: Result<(), WaylandError>) -> Result<(), BackgroundError> {
    match result {
        Err(WaylandError::Io(err)) if err.kind() == std::io::ErrorKind::WouldBlock => {
            debug!("flush deferred: socket buffer full");
            Ok(())
        }
        other => other.map_err(BackgroundError::Flush),
    }
}

/// Runs the background client until a termination signal or a fatal error.
/// Whatever was set up is torn down before returning.
pub fn run(settings: BackgroundSettings) -> Result<Shutdown, BackgroundError> {
    let mut client = WaylandClient::connect(settings)?;

    let result = client.initialize().and_then(|()| {
        let signals = SignalFd::termination().map_err(BackgroundError::SignalSetup)?;
        event_loop::run(&mut client, &signals)
    });

    client.shutdown();
    result
}
