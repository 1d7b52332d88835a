//! Protocol vocabulary shared by the background state machine
//!
//! The state machine never talks to `wayland-client` directly. Compositor
//! events arrive as the closed enums below and outgoing requests go through
//! the [`Protocol`] trait, which the Wayland backend implements with real
//! proxies and the tests implement with a request recorder.

use std::fmt;

/// `wl_shm` format code for 32-bit xRGB, little-endian.
pub const FORMAT_XRGB8888: u32 = 1;

/// Compositor-assigned identity of an output (its registry global name).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutputId(pub u32);

impl fmt::Display for OutputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "output#{}", self.0)
    }
}

/// Globals the client cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interface {
    Compositor,
    Shm,
    Output,
    LayerShell,
}

impl Interface {
    pub const ALL: [Interface; 4] = [
        Interface::Compositor,
        Interface::Shm,
        Interface::Output,
        Interface::LayerShell,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|iface| iface.name() == name)
    }

    /// Wire name as advertised by `wl_registry.global`
    pub fn name(&self) -> &'static str {
        match self {
            Interface::Compositor => "wl_compositor",
            Interface::Shm => "wl_shm",
            Interface::Output => "wl_output",
            Interface::LayerShell => "zwlr_layer_shell_v1",
        }
    }

    /// Lowest version we can work with. Globals are bound at exactly this
    /// version.
    pub fn required_version(&self) -> u32 {
        match self {
            // damage_buffer
            Interface::Compositor => 4,
            Interface::Shm => 1,
            // release
            Interface::Output => 3,
            Interface::LayerShell => 2,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Interface::Compositor => "compositor",
            Interface::Shm => "shared memory buffers",
            Interface::Output => "output",
            Interface::LayerShell => "layer shell",
        }
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `wl_registry` events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    Global {
        name: u32,
        interface: String,
        version: u32,
    },
    GlobalRemove {
        name: u32,
    },
}

/// `wl_output` events, restricted to what a background needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputEvent {
    Geometry {
        make: Option<String>,
        model: Option<String>,
    },
    Mode {
        current: bool,
        width: i32,
        height: i32,
    },
    Scale(i32),
    Done,
}

/// `zwlr_layer_surface_v1` events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerSurfaceEvent {
    Configure { serial: u32, width: u32, height: u32 },
    Closed,
}

/// `wl_shm` events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShmEvent {
    Format(u32),
}

/// Writable pixels handed out by a buffer provider.
///
/// `pixels` holds `height` rows of `stride` bytes in XRGB8888 layout, each
/// starting with `width` pixels.
pub struct PixelBuffer<'a, B> {
    pub buffer: B,
    pub pixels: &'a mut [u8],
    pub width: u32,
    pub height: u32,
    pub stride: u32,
}

/// Requests the background client issues to the compositor.
///
/// Handles are associated types so the state machine stays independent of
/// the transport. Destructors take their handle by value; a destroyed object
/// can not be reached again.
pub trait Protocol {
    type Compositor;
    type Shm;
    type LayerShell;
    type Output;
    type Surface;
    type LayerSurface;
    type Buffer;

    fn bind_compositor(&mut self, name: u32, version: u32) -> Self::Compositor;
    fn bind_shm(&mut self, name: u32, version: u32) -> Self::Shm;
    fn bind_layer_shell(&mut self, name: u32, version: u32) -> Self::LayerShell;
    /// Bound outputs report their events tagged with `id`.
    fn bind_output(&mut self, id: OutputId, version: u32) -> Self::Output;
    fn release_output(&mut self, output: Self::Output);

    fn create_surface(&mut self, compositor: &Self::Compositor) -> Self::Surface;
    fn set_empty_input_region(&mut self, compositor: &Self::Compositor, surface: &Self::Surface);
    fn set_full_opaque_region(&mut self, compositor: &Self::Compositor, surface: &Self::Surface);
    /// Layer surfaces report their events tagged with `id`.
    fn get_background_layer_surface(
        &mut self,
        shell: &Self::LayerShell,
        surface: &Self::Surface,
        output: &Self::Output,
        id: OutputId,
        namespace: &str,
    ) -> Self::LayerSurface;
    fn set_exclusive_zone(&mut self, layer: &Self::LayerSurface, zone: i32);
    fn anchor_all_edges(&mut self, layer: &Self::LayerSurface);
    fn ack_configure(&mut self, layer: &Self::LayerSurface, serial: u32);
    fn commit(&mut self, surface: &Self::Surface);
    fn destroy_layer_surface(&mut self, layer: Self::LayerSurface);
    fn destroy_surface(&mut self, surface: Self::Surface);
    fn destroy_layer_shell(&mut self, shell: Self::LayerShell);

    /// Hands out a buffer of exactly `width` x `height` owned by `owner`, or
    /// `None` when none is available right now.
    fn get_buffer(
        &mut self,
        shm: &Self::Shm,
        width: u32,
        height: u32,
        owner: OutputId,
    ) -> Option<PixelBuffer<'_, Self::Buffer>>;
    fn attach(&mut self, surface: &Self::Surface, buffer: &Self::Buffer);
    fn damage_buffer(&mut self, surface: &Self::Surface, width: u32, height: u32);
    /// Drops every pooled buffer belonging to `owner`.
    fn forget_buffers(&mut self, owner: OutputId);
}
