//! Error types for the background client
//!
//! Every variant is fatal for the current run. Recoverable conditions
//! (interrupted system calls, stale identities, missing buffers) never
//! surface as errors.

use std::io;

use thiserror::Error;
use wayland_client::backend::WaylandError;
use wayland_client::{ConnectError, DispatchError};

use crate::protocol::Interface;

#[derive(Debug, Error)]
pub enum BackgroundError {
    #[error("failed to connect to wayland; no compositor running?")]
    Connect(#[source] ConnectError),

    #[error("no {} interface", .0.description())]
    MissingGlobal(Interface),

    #[error("shm: {0} image format not available")]
    MissingFormat(&'static str),

    #[error("failed to create signal FD")]
    SignalSetup(#[source] io::Error),

    #[error("failed to poll")]
    Poll(#[source] io::Error),

    #[error("failed to flush Wayland requests")]
    Flush(#[source] WaylandError),

    #[error("failed to read Wayland events")]
    Read(#[source] WaylandError),

    #[error("failed to dispatch Wayland events")]
    Dispatch(#[source] DispatchError),

    #[error("disconnected by compositor")]
    HangUp,

    #[error("failed to read from signal FD")]
    SignalRead(#[source] io::Error),

    #[error("signal FD delivered unexpected signal {0}")]
    UnexpectedSignal(u32),
}

impl BackgroundError {
    /// A compositor-initiated disconnect ends the run but is not a client bug.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, BackgroundError::HangUp)
    }
}
