//! # axiom-bg - Solid Color Wayland Background
//!
//! Paints one solid color on the background layer of every output of a
//! layer-shell compositor and keeps it sized as outputs come, go and change.
//!
//! ## Architecture
//!
//! - `protocol`: event enums and the `Protocol` request trait
//! - `globals`: binds `wl_compositor`, `wl_shm`, `zwlr_layer_shell_v1`
//! - `output`: output registry and per-output surface state
//! - `layer`: layer-surface creation, configure handling, teardown
//! - `render`: fills and presents buffers
//! - `background`: context object routing events to the above
//! - `event_loop`: poll loop over the connection and a signalfd
//! - `wayland`: `wayland-client` backend and shared-memory buffers
//! - `config`: TOML configuration
//!
//! ## Usage
//!
//! ```rust,no_run
//! use axiom_bg::{AxiomBgConfig, wayland};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = AxiomBgConfig::default();
//!     wayland::run(config.settings(Some("#203040")))?;
//!     Ok(())
//! }
//! ```

pub mod background;
pub mod color;
pub mod config;
pub mod error;
pub mod event_loop;
pub mod globals;
pub mod layer;
pub mod output;
pub mod protocol;
pub mod render;
pub mod wayland;

// Re-export main types for easy access
pub use background::{Background, BackgroundSettings};
pub use color::{parse_color, parse_color_or_black, Rgba16};
pub use config::AxiomBgConfig;
pub use error::BackgroundError;
pub use protocol::{OutputId, Protocol};

/// Version information for axiom-bg
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
