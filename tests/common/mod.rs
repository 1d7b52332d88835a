// Request-recording protocol used by the integration tests.
//
// Every handle is a plain id; every request is appended to `requests` so
// tests can assert on exactly what would have gone over the wire.

#![allow(dead_code)]

use axiom_bg::protocol::{
    LayerSurfaceEvent, OutputEvent, OutputId, PixelBuffer, Protocol, RegistryEvent, ShmEvent,
    FORMAT_XRGB8888,
};
use axiom_bg::{Background, BackgroundSettings, Rgba16};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    BindCompositor { name: u32, version: u32 },
    BindShm { name: u32, version: u32 },
    BindLayerShell { name: u32, version: u32 },
    BindOutput { id: OutputId, version: u32, handle: u32 },
    ReleaseOutput(u32),
    CreateSurface(u32),
    SetEmptyInputRegion(u32),
    SetFullOpaqueRegion(u32),
    GetLayerSurface { layer: u32, surface: u32, output: u32, id: OutputId, namespace: String },
    SetExclusiveZone { layer: u32, zone: i32 },
    AnchorAllEdges(u32),
    AckConfigure { layer: u32, serial: u32 },
    Commit(u32),
    DestroyLayerSurface(u32),
    DestroySurface(u32),
    DestroyLayerShell(u32),
    GetBuffer { owner: OutputId, width: u32, height: u32 },
    Attach { surface: u32, buffer: u32 },
    DamageBuffer { surface: u32, width: u32, height: u32 },
    ForgetBuffers(OutputId),
}

pub struct RecordingProtocol {
    pub requests: Vec<Request>,
    pub buffers_available: bool,
    /// Contents of the most recently handed out buffer
    pub pixels: Vec<u8>,
    next_id: u32,
}

impl Default for RecordingProtocol {
    fn default() -> Self {
        Self {
            requests: Vec::new(),
            buffers_available: true,
            pixels: Vec::new(),
            next_id: 100,
        }
    }
}

impl RecordingProtocol {
    fn id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    pub fn count(&self, pred: impl Fn(&Request) -> bool) -> usize {
        self.requests.iter().filter(|r| pred(r)).count()
    }

    pub fn take(&mut self) -> Vec<Request> {
        std::mem::take(&mut self.requests)
    }
}

impl Protocol for RecordingProtocol {
    type Compositor = u32;
    type Shm = u32;
    type LayerShell = u32;
    type Output = u32;
    type Surface = u32;
    type LayerSurface = u32;
    type Buffer = u32;

    fn bind_compositor(&mut self, name: u32, version: u32) -> u32 {
        self.requests.push(Request::BindCompositor { name, version });
        self.id()
    }

    fn bind_shm(&mut self, name: u32, version: u32) -> u32 {
        self.requests.push(Request::BindShm { name, version });
        self.id()
    }

    fn bind_layer_shell(&mut self, name: u32, version: u32) -> u32 {
        self.requests.push(Request::BindLayerShell { name, version });
        self.id()
    }

    fn bind_output(&mut self, id: OutputId, version: u32) -> u32 {
        let handle = self.id();
        self.requests.push(Request::BindOutput { id, version, handle });
        handle
    }

    fn release_output(&mut self, output: u32) {
        self.requests.push(Request::ReleaseOutput(output));
    }

    fn create_surface(&mut self, _compositor: &u32) -> u32 {
        let surface = self.id();
        self.requests.push(Request::CreateSurface(surface));
        surface
    }

    fn set_empty_input_region(&mut self, _compositor: &u32, surface: &u32) {
        self.requests.push(Request::SetEmptyInputRegion(*surface));
    }

    fn set_full_opaque_region(&mut self, _compositor: &u32, surface: &u32) {
        self.requests.push(Request::SetFullOpaqueRegion(*surface));
    }

    fn get_background_layer_surface(
        &mut self,
        _shell: &u32,
        surface: &u32,
        output: &u32,
        id: OutputId,
        namespace: &str,
    ) -> u32 {
        let layer = self.id();
        self.requests.push(Request::GetLayerSurface {
            layer,
            surface: *surface,
            output: *output,
            id,
            namespace: namespace.to_string(),
        });
        layer
    }

    fn set_exclusive_zone(&mut self, layer: &u32, zone: i32) {
        self.requests.push(Request::SetExclusiveZone { layer: *layer, zone });
    }

    fn anchor_all_edges(&mut self, layer: &u32) {
        self.requests.push(Request::AnchorAllEdges(*layer));
    }

    fn ack_configure(&mut self, layer: &u32, serial: u32) {
        self.requests.push(Request::AckConfigure { layer: *layer, serial });
    }

    fn commit(&mut self, surface: &u32) {
        self.requests.push(Request::Commit(*surface));
    }

    fn destroy_layer_surface(&mut self, layer: u32) {
        self.requests.push(Request::DestroyLayerSurface(layer));
    }

    fn destroy_surface(&mut self, surface: u32) {
        self.requests.push(Request::DestroySurface(surface));
    }

    fn destroy_layer_shell(&mut self, shell: u32) {
        self.requests.push(Request::DestroyLayerShell(shell));
    }

    fn get_buffer(
        &mut self,
        _shm: &u32,
        width: u32,
        height: u32,
        owner: OutputId,
    ) -> Option<PixelBuffer<'_, u32>> {
        self.requests.push(Request::GetBuffer { owner, width, height });
        if !self.buffers_available || width == 0 || height == 0 {
            return None;
        }
        let buffer = self.id();
        self.pixels = vec![0u8; (width * height * 4) as usize];
        Some(PixelBuffer {
            buffer,
            pixels: &mut self.pixels,
            width,
            height,
            stride: width * 4,
        })
    }

    fn attach(&mut self, surface: &u32, buffer: &u32) {
        self.requests.push(Request::Attach { surface: *surface, buffer: *buffer });
    }

    fn damage_buffer(&mut self, surface: &u32, width: u32, height: u32) {
        self.requests.push(Request::DamageBuffer { surface: *surface, width, height });
    }

    fn forget_buffers(&mut self, owner: OutputId) {
        self.requests.push(Request::ForgetBuffers(owner));
    }
}

pub const COMPOSITOR_NAME: u32 = 1;
pub const SHM_NAME: u32 = 2;
pub const LAYER_SHELL_NAME: u32 = 3;

pub fn global(name: u32, interface: &str, version: u32) -> RegistryEvent {
    RegistryEvent::Global {
        name,
        interface: interface.to_string(),
        version,
    }
}

pub fn background(color: Rgba16) -> Background<RecordingProtocol> {
    Background::new(
        RecordingProtocol::default(),
        BackgroundSettings {
            color,
            namespace: "wallpaper".to_string(),
        },
    )
}

/// Announces compositor, shm (with XRGB8888) and layer shell
pub fn announce_singletons(bg: &mut Background<RecordingProtocol>) {
    bg.handle_registry_event(global(COMPOSITOR_NAME, "wl_compositor", 6));
    bg.handle_registry_event(global(SHM_NAME, "wl_shm", 1));
    bg.handle_shm_event(ShmEvent::Format(0));
    bg.handle_shm_event(ShmEvent::Format(FORMAT_XRGB8888));
    bg.handle_registry_event(global(LAYER_SHELL_NAME, "zwlr_layer_shell_v1", 4));
}

/// Announces an output and its metadata, ending with `done`
pub fn announce_output(
    bg: &mut Background<RecordingProtocol>,
    name: u32,
    width: i32,
    height: i32,
) -> OutputId {
    let id = OutputId(name);
    bg.handle_registry_event(global(name, "wl_output", 4));
    bg.handle_output_event(
        id,
        OutputEvent::Geometry {
            make: Some("Dell".to_string()),
            model: Some("U2720Q".to_string()),
        },
    );
    bg.handle_output_event(
        id,
        OutputEvent::Mode {
            current: true,
            width,
            height,
        },
    );
    bg.handle_output_event(id, OutputEvent::Scale(1));
    bg.handle_output_event(id, OutputEvent::Done);
    id
}

pub fn configure(bg: &mut Background<RecordingProtocol>, id: OutputId, serial: u32, width: u32, height: u32) {
    bg.handle_layer_surface_event(
        id,
        LayerSurfaceEvent::Configure {
            serial,
            width,
            height,
        },
    );
}

/// Surface and layer handles of a surfaced output
pub fn binding_of(bg: &Background<RecordingProtocol>, id: OutputId) -> (u32, u32) {
    let binding = bg
        .outputs()
        .find(id)
        .and_then(|output| output.binding())
        .expect("output has a layer surface");
    (binding.surface, binding.layer)
}
