//! Event loop
//!
//! Waits on exactly two descriptors: the compositor connection and a
//! signalfd armed for the termination signals. Signals are consumed
//! synchronously from the descriptor instead of in an async handler.

use std::io;
use std::mem::{self, MaybeUninit};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::ptr;

use libc::c_int;
use log::{debug, info};

use crate::error::BackgroundError;

/// Signals that end the run cleanly
pub const TERMINATION_SIGNALS: [c_int; 2] = [libc::SIGINT, libc::SIGQUIT];

/// The protocol side of the loop
pub trait EventSource {
    /// Sends buffered requests
    fn flush(&mut self) -> Result<(), BackgroundError>;

    /// Descriptor that becomes readable when events arrive
    fn connection_fd(&self) -> RawFd;

    /// Reads and dispatches whatever is queued; returns the event count
    fn dispatch(&mut self) -> Result<usize, BackgroundError>;
}

/// Why the loop stopped without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shutdown {
    pub signal: u32,
}

/// Blocks `signals` for the calling thread and delivers them through a
/// readable descriptor. The previous mask is restored on drop.
pub struct SignalFd {
    fd: OwnedFd,
    previous: libc::sigset_t,
}

impl SignalFd {
    pub fn new(signals: &[c_int]) -> io::Result<Self> {
        let mask = unsafe {
            let mut mask = MaybeUninit::<libc::sigset_t>::uninit();
            if libc::sigemptyset(mask.as_mut_ptr()) < 0 {
                return Err(io::Error::last_os_error());
            }
            for &signal in signals {
                if libc::sigaddset(mask.as_mut_ptr(), signal) < 0 {
                    return Err(io::Error::last_os_error());
                }
            }
            mask.assume_init()
        };

        let previous = unsafe {
            let mut previous = MaybeUninit::<libc::sigset_t>::uninit();
            let rc = libc::pthread_sigmask(libc::SIG_BLOCK, &mask, previous.as_mut_ptr());
            if rc != 0 {
                return Err(io::Error::from_raw_os_error(rc));
            }
            previous.assume_init()
        };

        let raw = unsafe { libc::signalfd(-1, &mask, libc::SFD_CLOEXEC) };
        if raw < 0 {
            let err = io::Error::last_os_error();
            unsafe {
                libc::pthread_sigmask(libc::SIG_SETMASK, &previous, ptr::null_mut());
            }
            return Err(err);
        }

        Ok(Self {
            fd: unsafe { OwnedFd::from_raw_fd(raw) },
            previous,
        })
    }

    /// SIGINT and SIGQUIT
    pub fn termination() -> io::Result<Self> {
        Self::new(&TERMINATION_SIGNALS)
    }

    /// Reads exactly one signal record and returns its signal number.
    /// An interrupted read comes back as `ErrorKind::Interrupted`.
    pub fn read_signal(&self) -> io::Result<u32> {
        let mut info: libc::signalfd_siginfo = unsafe { mem::zeroed() };
        let size = mem::size_of::<libc::signalfd_siginfo>();
        let count = unsafe {
            libc::read(
                self.fd.as_raw_fd(),
                &mut info as *mut libc::signalfd_siginfo as *mut libc::c_void,
                size,
            )
        };

        if count < 0 {
            return Err(io::Error::last_os_error());
        }
        if count as usize != size {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("short signal record: {} of {} bytes", count, size),
            ));
        }
        Ok(info.ssi_signo)
    }
}

impl AsRawFd for SignalFd {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

impl Drop for SignalFd {
    fn drop(&mut self) {
        unsafe {
            libc::pthread_sigmask(libc::SIG_SETMASK, &self.previous, ptr::null_mut());
        }
    }
}

fn is_termination_signal(signal: u32) -> bool {
    TERMINATION_SIGNALS
        .iter()
        .any(|&terminating| terminating as u32 == signal)
}

/// Runs until a termination signal arrives or the connection fails.
///
/// Each iteration flushes, then waits without timeout. Events and signals are
/// handled to completion before the next wait.
pub fn run<S: EventSource>(source: &mut S, signals: &SignalFd) -> Result<Shutdown, BackgroundError> {
    debug!("entering event loop");

    loop {
        source.flush()?;

        let mut fds = [
            libc::pollfd {
                fd: source.connection_fd(),
                events: libc::POLLIN,
                revents: 0,
            },
            libc::pollfd {
                fd: signals.as_raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            },
        ];

        let ret = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, -1) };
        if ret < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(BackgroundError::Poll(err));
        }

        let [connection, signal] = fds;

        if connection.revents & libc::POLLHUP != 0 {
            return Err(BackgroundError::HangUp);
        }

        if connection.revents & libc::POLLIN != 0 {
            let count = source.dispatch()?;
            debug!("dispatched {} event(s)", count);
        }

        if signal.revents & libc::POLLHUP != 0 {
            // The signalfd never hangs up unless setup went badly wrong
            std::process::abort();
        }

        if signal.revents & libc::POLLIN != 0 {
            let signo = match signals.read_signal() {
                Ok(signo) => signo,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(BackgroundError::SignalRead(err)),
            };

            if !is_termination_signal(signo) {
                return Err(BackgroundError::UnexpectedSignal(signo));
            }

            info!("goodbye");
            return Ok(Shutdown { signal: signo });
        }
    }
}
