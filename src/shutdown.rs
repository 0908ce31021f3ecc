//! Quit requests for the command-line run loop. `main` polls
//! [`should_quit`] between instruction batches, so the emulator stops on an
//! instruction boundary and can still log its registers and write a save state.

use std::sync::atomic::{AtomicBool, Ordering};

static QUIT: AtomicBool = AtomicBool::new(false);

pub fn should_quit() -> bool {
    QUIT.load(Ordering::SeqCst)
}

pub fn request_quit() {
    QUIT.store(true, Ordering::SeqCst);
}

#[cfg(unix)]
mod signals {
    use std::os::raw::c_int;

    pub const INTERRUPT: c_int = 2;
    pub const TERMINATE: c_int = 15;

    pub type Handler = extern "C" fn(c_int);

    extern "C" {
        pub fn signal(signum: c_int, handler: Handler) -> usize;
    }

    // Async-signal context: only the atomic store is allowed here.
    pub extern "C" fn on_signal(_signum: c_int) {
        super::request_quit();
    }
}

/// Routes Ctrl-C and SIGTERM to [`request_quit`].
#[cfg(unix)]
pub fn install() {
    for signum in [signals::INTERRUPT, signals::TERMINATE] {
        // SAFETY: `on_signal` only performs an atomic store.
        let previous = unsafe { signals::signal(signum, signals::on_signal) };
        if previous == usize::MAX {
            log::warn!("Could not install handler for signal {}", signum);
        }
    }
}

#[cfg(not(unix))]
pub fn install() {
    log::debug!("No quit signal handler on this platform; use --max-steps to bound a run");
}
