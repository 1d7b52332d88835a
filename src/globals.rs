//! Global binding registry
//!
//! Resolves the singleton globals advertised through `wl_registry` and keeps
//! the set of pixel formats `wl_shm` reports.

use std::collections::BTreeSet;

use log::{debug, error};

use crate::error::BackgroundError;
use crate::protocol::{Interface, OutputId, Protocol, ShmEvent};

/// Result of a single `wl_registry.global` announcement
pub enum Announcement<O> {
    /// A singleton was bound (or already held)
    Singleton(Interface),
    /// A new output was bound; the caller owns the handle
    Output(OutputId, O),
    /// Unknown interface, insufficient version, or duplicate singleton
    Ignored,
}

pub struct GlobalBindings<P: Protocol> {
    compositor: Option<P::Compositor>,
    shm: Option<P::Shm>,
    layer_shell: Option<P::LayerShell>,
    formats: BTreeSet<u32>,
}

impl<P: Protocol> Default for GlobalBindings<P> {
    fn default() -> Self {
        Self {
            compositor: None,
            shm: None,
            layer_shell: None,
            formats: BTreeSet::new(),
        }
    }
}

/// Checks an advertised version against the minimum we need
pub fn verify_version(interface: &str, version: u32, wanted: u32) -> bool {
    if version >= wanted {
        return true;
    }

    error!(
        "{}: need interface version {}, but compositor only implements {}",
        interface, wanted, version
    );
    false
}

impl<P: Protocol> GlobalBindings<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle one global announcement, binding it when it is of interest.
    pub fn announce(
        &mut self,
        protocol: &mut P,
        name: u32,
        interface: &str,
        version: u32,
    ) -> Announcement<P::Output> {
        let Some(iface) = Interface::from_name(interface) else {
            return Announcement::Ignored;
        };

        let required = iface.required_version();
        if !verify_version(interface, version, required) {
            return Announcement::Ignored;
        }

        if self.is_bound(iface) {
            debug!("{}: ignoring duplicate global {}", interface, name);
            return Announcement::Ignored;
        }

        match iface {
            Interface::Compositor => {
                self.compositor = Some(protocol.bind_compositor(name, required));
            }
            Interface::Shm => {
                self.shm = Some(protocol.bind_shm(name, required));
            }
            Interface::LayerShell => {
                self.layer_shell = Some(protocol.bind_layer_shell(name, required));
            }
            Interface::Output => {
                let id = OutputId(name);
                return Announcement::Output(id, protocol.bind_output(id, required));
            }
        }

        debug!("bound {} v{} (global {})", interface, required, name);
        Announcement::Singleton(iface)
    }

    pub fn handle_shm_event(&mut self, event: ShmEvent) {
        match event {
            ShmEvent::Format(format) => {
                if self.formats.insert(format) {
                    debug!("shm: format 0x{:08x} available", format);
                }
            }
        }
    }

    /// Outputs are not singletons and are never reported as bound
    pub fn is_bound(&self, interface: Interface) -> bool {
        match interface {
            Interface::Compositor => self.compositor.is_some(),
            Interface::Shm => self.shm.is_some(),
            Interface::LayerShell => self.layer_shell.is_some(),
            Interface::Output => false,
        }
    }

    pub fn shm(&self) -> Option<&P::Shm> {
        self.shm.as_ref()
    }

    pub fn layer_shell(&self) -> Option<&P::LayerShell> {
        self.layer_shell.as_ref()
    }

    /// All three singletons needed to put a background on an output
    pub fn surface_factories(&self) -> Option<(&P::Compositor, &P::Shm, &P::LayerShell)> {
        Some((
            self.compositor.as_ref()?,
            self.shm.as_ref()?,
            self.layer_shell.as_ref()?,
        ))
    }

    pub fn supports_format(&self, format: u32) -> bool {
        self.formats.contains(&format)
    }

    pub fn formats(&self) -> impl Iterator<Item = u32> + '_ {
        self.formats.iter().copied()
    }

    /// Fails with the first missing singleton, in binding order.
    pub fn require_singletons(&self) -> Result<(), BackgroundError> {
        for iface in [Interface::Compositor, Interface::Shm, Interface::LayerShell] {
            if !self.is_bound(iface) {
                return Err(BackgroundError::MissingGlobal(iface));
            }
        }
        Ok(())
    }

    /// Destroys what has a destructor and drops the rest, layer shell first.
    pub fn destroy(&mut self, protocol: &mut P) {
        if let Some(shell) = self.layer_shell.take() {
            protocol.destroy_layer_shell(shell);
        }
        self.shm = None;
        self.compositor = None;
        self.formats.clear();
    }
}
