use log::info;
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
/// Async-safe interruption handling
///
/// SIGINT, SIGTERM and SIGHUP only flip atomics. The supervisor polls the flag
/// alongside its deadline and the driver stops reading new records once it is set.
use std::ffi::c_int;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::config::types::{Result, VerifyError};

static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

static SIGNAL_RECEIVED: AtomicU32 = AtomicU32::new(0);

/// Installed interruption handlers
pub struct SignalHandler;

impl SignalHandler {
    /// Install handlers. Call before any worker threads are spawned.
    pub fn init() -> Result<Self> {
        let sig_action = SigAction::new(
            SigHandler::Handler(Self::signal_handler),
            SaFlags::SA_RESTART,
            SigSet::empty(),
        );

        for sig in [Signal::SIGINT, Signal::SIGTERM, Signal::SIGHUP] {
            // SAFETY: the handler only stores to atomics.
            unsafe { signal::sigaction(sig, &sig_action) }.map_err(|e| {
                VerifyError::Process(format!("Failed to install {} handler: {}", sig, e))
            })?;
        }

        info!("Signal handlers installed (SIGINT, SIGTERM, SIGHUP)");
        Ok(Self)
    }

    /// No allocations, no locks, no I/O
    extern "C" fn signal_handler(signal: c_int) {
        SIGNAL_RECEIVED.store(signal as u32, Ordering::SeqCst);
        SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
    }

    pub fn shutdown_requested(&self) -> bool {
        shutdown_requested()
    }

    /// Signal number that triggered shutdown (0 if none)
    pub fn get_signal(&self) -> u32 {
        SIGNAL_RECEIVED.load(Ordering::SeqCst)
    }
}

/// True once an interruption signal has arrived
pub fn shutdown_requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::SeqCst)
}
