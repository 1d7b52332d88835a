//! Layer-surface controller
//!
//! Puts a background-layer surface on an output, answers its configure
//! events and tears it down again. Per output the surface moves through
//! `Unsurfaced -> Surfaced -> Configured` and ends in `TornDown`.

use log::debug;

use crate::globals::GlobalBindings;
use crate::output::{LayerBinding, Output, Size, SurfaceState};
use crate::protocol::Protocol;
use crate::render::Renderer;

/// Layer surface namespace used when none is configured
pub const DEFAULT_NAMESPACE: &str = "wallpaper";

/// What a configure event led to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigureOutcome {
    /// A fresh buffer was filled, attached and committed
    Rendered,
    /// Same size as the presented buffer; surface committed again
    Recommitted,
    /// Acked, but no buffer could be obtained for the new size
    NoBuffer,
    /// The output has no live layer surface
    Ignored,
}

pub struct LayerController {
    namespace: String,
}

impl Default for LayerController {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

impl LayerController {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    /// Creates the surface pair for `output`. Does nothing if the output
    /// already went through this, or a required global is still missing.
    pub fn attach<P: Protocol>(
        &self,
        protocol: &mut P,
        globals: &GlobalBindings<P>,
        output: &mut Output<P>,
    ) -> bool {
        if !matches!(output.surface, SurfaceState::Unsurfaced) {
            return false;
        }
        let Some((compositor, _, shell)) = globals.surface_factories() else {
            return false;
        };
        let Some(handle) = output.handle() else {
            return false;
        };

        let surface = protocol.create_surface(compositor);

        // Default input region is infinite; a background takes no input
        protocol.set_empty_input_region(compositor, &surface);
        protocol.set_full_opaque_region(compositor, &surface);

        let layer = protocol.get_background_layer_surface(
            shell,
            &surface,
            handle,
            output.id(),
            &self.namespace,
        );
        protocol.set_exclusive_zone(&layer, -1);
        protocol.anchor_all_edges(&layer);

        // Role request takes effect on commit; the compositor answers with configure
        protocol.commit(&surface);

        debug!("{}: background surface created", output.id());
        output.surface = SurfaceState::Surfaced(LayerBinding { surface, layer });
        true
    }

    /// Handles `zwlr_layer_surface_v1.configure`. The serial is acked no
    /// matter what happens afterwards.
    pub fn configure<P: Protocol>(
        &self,
        protocol: &mut P,
        globals: &GlobalBindings<P>,
        renderer: &Renderer,
        output: &mut Output<P>,
        serial: u32,
        size: Size,
    ) -> ConfigureOutcome {
        let (binding, previous) = match std::mem::replace(&mut output.surface, SurfaceState::TornDown)
        {
            SurfaceState::Surfaced(binding) => (binding, None),
            SurfaceState::Configured {
                binding,
                size: previous_size,
                presented,
            } => (binding, Some((previous_size, presented))),
            state => {
                output.surface = state;
                debug!("{}: configure without a layer surface", output.id());
                return ConfigureOutcome::Ignored;
            }
        };

        protocol.ack_configure(&binding.layer, serial);

        // Unchanged size: the attached buffer is still the right content
        if previous == Some((size, true)) {
            protocol.commit(&binding.surface);
            output.surface = SurfaceState::Configured {
                binding,
                size,
                presented: true,
            };
            return ConfigureOutcome::Recommitted;
        }

        output.surface = SurfaceState::Configured {
            binding,
            size,
            presented: false,
        };

        let presented = match globals.shm() {
            Some(shm) => renderer.render(protocol, shm, output),
            None => false,
        };
        if !presented {
            return ConfigureOutcome::NoBuffer;
        }

        if let SurfaceState::Configured { presented, .. } = &mut output.surface {
            *presented = true;
        }
        ConfigureOutcome::Rendered
    }
}

/// Destroys the layer surface and then the surface, leaving the output in
/// `TornDown`. Returns whether any protocol object was destroyed.
pub fn teardown<P: Protocol>(protocol: &mut P, output: &mut Output<P>) -> bool {
    match std::mem::replace(&mut output.surface, SurfaceState::TornDown) {
        SurfaceState::Surfaced(binding) | SurfaceState::Configured { binding, .. } => {
            protocol.destroy_layer_surface(binding.layer);
            protocol.destroy_surface(binding.surface);
            true
        }
        SurfaceState::Unsurfaced | SurfaceState::TornDown => false,
    }
}
