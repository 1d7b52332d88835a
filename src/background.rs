//! Background context
//!
//! Owns the protocol implementation, the bound globals and the output
//! registry, and routes every compositor event to the component that handles
//! it. Nothing here blocks; the event loop feeds events in arrival order.

use log::{debug, info};

use crate::color::Rgba16;
use crate::error::BackgroundError;
use crate::globals::{Announcement, GlobalBindings};
use crate::layer::{self, ConfigureOutcome, LayerController, DEFAULT_NAMESPACE};
use crate::output::{OutputRegistry, Size};
use crate::protocol::{
    LayerSurfaceEvent, OutputEvent, OutputId, Protocol, RegistryEvent, ShmEvent, FORMAT_XRGB8888,
};
use crate::render::Renderer;

/// Settings fixed for the lifetime of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackgroundSettings {
    pub color: Rgba16,
    pub namespace: String,
}

impl Default for BackgroundSettings {
    fn default() -> Self {
        Self {
            color: Rgba16::BLACK,
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

pub struct Background<P: Protocol> {
    protocol: P,
    globals: GlobalBindings<P>,
    outputs: OutputRegistry<P>,
    layers: LayerController,
    renderer: Renderer,
}

impl<P: Protocol> Background<P> {
    pub fn new(protocol: P, settings: BackgroundSettings) -> Self {
        Self {
            protocol,
            globals: GlobalBindings::new(),
            outputs: OutputRegistry::new(),
            layers: LayerController::new(settings.namespace),
            renderer: Renderer::new(settings.color),
        }
    }

    pub fn protocol(&self) -> &P {
        &self.protocol
    }

    pub fn protocol_mut(&mut self) -> &mut P {
        &mut self.protocol
    }

    pub fn globals(&self) -> &GlobalBindings<P> {
        &self.globals
    }

    pub fn outputs(&self) -> &OutputRegistry<P> {
        &self.outputs
    }

    pub fn handle_registry_event(&mut self, event: RegistryEvent) {
        match event {
            RegistryEvent::Global {
                name,
                interface,
                version,
            } => self.announce_global(name, &interface, version),
            RegistryEvent::GlobalRemove { name } => {
                self.remove_output(OutputId(name));
            }
        }
    }

    pub fn handle_shm_event(&mut self, event: ShmEvent) {
        self.globals.handle_shm_event(event);
    }

    pub fn handle_output_event(&mut self, id: OutputId, event: OutputEvent) {
        match self.outputs.find_mut(id) {
            Some(output) => output.handle_event(event),
            None => debug!("{}: event for unknown output", id),
        }
    }

    pub fn handle_layer_surface_event(&mut self, id: OutputId, event: LayerSurfaceEvent) {
        match event {
            LayerSurfaceEvent::Configure {
                serial,
                width,
                height,
            } => {
                self.configure_output(id, serial, Size::new(width, height));
            }
            LayerSurfaceEvent::Closed => self.close_output(id),
        }
    }

    fn announce_global(&mut self, name: u32, interface: &str, version: u32) {
        let announcement = self
            .globals
            .announce(&mut self.protocol, name, interface, version);

        if let Announcement::Output(id, handle) = announcement {
            match self.outputs.add(id, handle) {
                Ok(output) => {
                    self.layers
                        .attach(&mut self.protocol, &self.globals, output);
                }
                Err(handle) => {
                    debug!("{}: already registered", id);
                    self.protocol.release_output(handle);
                }
            }
        }
    }

    /// Handles a removal notification. Unknown identities are a no-op.
    pub fn remove_output(&mut self, id: OutputId) -> bool {
        self.outputs.remove(&mut self.protocol, id)
    }

    pub fn configure_output(&mut self, id: OutputId, serial: u32, size: Size) -> ConfigureOutcome {
        let Some(output) = self.outputs.find_mut(id) else {
            debug!("{}: configure for unknown output", id);
            return ConfigureOutcome::Ignored;
        };
        self.layers.configure(
            &mut self.protocol,
            &self.globals,
            &self.renderer,
            output,
            serial,
            size,
        )
    }

    /// The compositor closed the layer surface. The subject is resolved by
    /// identity; it may already be gone after a removal notification.
    pub fn close_output(&mut self, id: OutputId) {
        match self.outputs.find_mut(id) {
            Some(output) => {
                if layer::teardown(&mut self.protocol, output) {
                    debug!("{}: layer surface closed", id);
                }
            }
            None => debug!("{}: closed after removal", id),
        }
    }

    /// Gives every known output a surface. Used once all globals are known.
    pub fn attach_all(&mut self) -> usize {
        let mut attached = 0;
        for output in self.outputs.iter_mut() {
            if self.layers.attach(&mut self.protocol, &self.globals, output) {
                attached += 1;
            }
        }
        attached
    }

    pub fn require_globals(&self) -> Result<(), BackgroundError> {
        self.globals.require_singletons()
    }

    pub fn require_xrgb8888(&self) -> Result<(), BackgroundError> {
        if self.globals.supports_format(FORMAT_XRGB8888) {
            Ok(())
        } else {
            Err(BackgroundError::MissingFormat("XRGB"))
        }
    }

    /// Destroys everything in reverse dependency order: outputs, then the
    /// globals they were created from.
    pub fn shutdown(&mut self) {
        let count = self.outputs.len();
        self.outputs.clear(&mut self.protocol);
        self.globals.destroy(&mut self.protocol);
        info!("🧹 Released {} output(s)", count);
    }
}
