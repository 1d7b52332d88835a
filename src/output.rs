//! Output registry
//!
//! Tracks every live `wl_output` together with its metadata and the
//! background surface placed on it. Entries are looked up by their
//! compositor-assigned identity only.

use log::{debug, info};

use crate::layer;
use crate::protocol::{OutputEvent, OutputId, Protocol};

/// Drawable surface and its layer-shell role, created and destroyed together
pub struct LayerBinding<P: Protocol> {
    pub surface: P::Surface,
    pub layer: P::LayerSurface,
}

/// Render target size assigned by a configure event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Where an output is in the surface lifecycle
pub enum SurfaceState<P: Protocol> {
    Unsurfaced,
    Surfaced(LayerBinding<P>),
    Configured {
        binding: LayerBinding<P>,
        size: Size,
        /// A buffer of `size` has been attached and committed
        presented: bool,
    },
    TornDown,
}

/// Lifecycle phase without the handles, for logging and assertions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfacePhase {
    Unsurfaced,
    Surfaced,
    Configured,
    TornDown,
}

impl<P: Protocol> SurfaceState<P> {
    pub fn phase(&self) -> SurfacePhase {
        match self {
            SurfaceState::Unsurfaced => SurfacePhase::Unsurfaced,
            SurfaceState::Surfaced(_) => SurfacePhase::Surfaced,
            SurfaceState::Configured { .. } => SurfacePhase::Configured,
            SurfaceState::TornDown => SurfacePhase::TornDown,
        }
    }

    pub fn binding(&self) -> Option<&LayerBinding<P>> {
        match self {
            SurfaceState::Surfaced(binding) | SurfaceState::Configured { binding, .. } => {
                Some(binding)
            }
            SurfaceState::Unsurfaced | SurfaceState::TornDown => None,
        }
    }
}

pub struct Output<P: Protocol> {
    id: OutputId,
    handle: Option<P::Output>,
    make: Option<String>,
    model: Option<String>,
    width: i32,
    height: i32,
    pub(crate) surface: SurfaceState<P>,
}

impl<P: Protocol> Output<P> {
    pub fn new(id: OutputId, handle: P::Output) -> Self {
        Self {
            id,
            handle: Some(handle),
            make: None,
            model: None,
            width: 0,
            height: 0,
            surface: SurfaceState::Unsurfaced,
        }
    }

    pub fn id(&self) -> OutputId {
        self.id
    }

    pub fn handle(&self) -> Option<&P::Output> {
        self.handle.as_ref()
    }

    pub fn make(&self) -> Option<&str> {
        self.make.as_deref()
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    /// Current mode size as announced by the compositor
    pub fn mode_size(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    pub fn phase(&self) -> SurfacePhase {
        self.surface.phase()
    }

    pub fn is_configured(&self) -> bool {
        self.phase() == SurfacePhase::Configured
    }

    /// Only meaningful once configured
    pub fn render_size(&self) -> Option<Size> {
        match &self.surface {
            SurfaceState::Configured { size, .. } => Some(*size),
            _ => None,
        }
    }

    pub fn binding(&self) -> Option<&LayerBinding<P>> {
        self.surface.binding()
    }

    /// `make model` for log lines
    pub fn label(&self) -> String {
        format!(
            "{} {}",
            self.make.as_deref().unwrap_or("(null)"),
            self.model.as_deref().unwrap_or("(null)")
        )
    }

    pub fn handle_event(&mut self, event: OutputEvent) {
        match event {
            OutputEvent::Geometry { make, model } => {
                self.make = make;
                self.model = model;
            }
            OutputEvent::Mode {
                current,
                width,
                height,
            } => {
                if current {
                    self.width = width;
                    self.height = height;
                }
            }
            OutputEvent::Scale(factor) => {
                debug!("{}: ignoring scale factor {}", self.id, factor);
            }
            OutputEvent::Done => {
                info!("output: {} ({}x{})", self.label(), self.width, self.height);
            }
        }
    }

    /// Surface state first, then the output object and its buffers.
    fn destroy(mut self, protocol: &mut P) {
        layer::teardown(protocol, &mut self);
        if let Some(handle) = self.handle.take() {
            protocol.release_output(handle);
        }
        protocol.forget_buffers(self.id);
    }
}

/// Insertion-ordered set of outputs keyed by identity
pub struct OutputRegistry<P: Protocol> {
    outputs: Vec<Output<P>>,
}

impl<P: Protocol> Default for OutputRegistry<P> {
    fn default() -> Self {
        Self {
            outputs: Vec::new(),
        }
    }
}

impl<P: Protocol> OutputRegistry<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a freshly bound output. An identity that is already live is
    /// refused and the handle is handed back untouched.
    pub fn add(&mut self, id: OutputId, handle: P::Output) -> Result<&mut Output<P>, P::Output> {
        if self.position(id).is_some() {
            return Err(handle);
        }
        self.outputs.push(Output::new(id, handle));
        let last = self.outputs.len() - 1;
        Ok(&mut self.outputs[last])
    }

    /// Tears down and drops the entry for `id`. Unknown identities are
    /// ignored; removal notifications may be redundant or arrive late.
    pub fn remove(&mut self, protocol: &mut P, id: OutputId) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };
        let output = self.outputs.remove(index);
        debug!("destroyed: {}", output.label());
        output.destroy(protocol);
        true
    }

    /// Destroys every output, in insertion order
    pub fn clear(&mut self, protocol: &mut P) {
        for output in self.outputs.drain(..) {
            output.destroy(protocol);
        }
    }

    pub fn find(&self, id: OutputId) -> Option<&Output<P>> {
        self.outputs.iter().find(|output| output.id == id)
    }

    pub fn find_mut(&mut self, id: OutputId) -> Option<&mut Output<P>> {
        self.outputs.iter_mut().find(|output| output.id == id)
    }

    pub fn ids(&self) -> Vec<OutputId> {
        self.outputs.iter().map(|output| output.id).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Output<P>> {
        self.outputs.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Output<P>> {
        self.outputs.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    fn position(&self, id: OutputId) -> Option<usize> {
        self.outputs.iter().position(|output| output.id == id)
    }
}
