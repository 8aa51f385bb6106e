//! Signal-to-flag bridge.
//!
//! The handlers do nothing but set a shared atomic; the dispatcher observes
//! the flag between event batches and performs the orderly drain itself.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

static SHUTDOWN: OnceLock<Arc<AtomicBool>> = OnceLock::new();

extern "C" fn on_terminate(_signal: libc::c_int) {
    // Only the atomic store is async-signal-safe; nothing else happens here.
    if let Some(flag) = SHUTDOWN.get() {
        flag.store(true, Ordering::SeqCst);
    }
}

/// Installs the handlers: SIGPIPE is ignored, SIGTERM/SIGINT/SIGQUIT set
/// the shutdown flag. Call once, before starting the dispatcher.
pub fn install(flag: Arc<AtomicBool>) -> io::Result<()> {
    SHUTDOWN
        .set(flag)
        .map_err(|_| io::Error::other("signal handlers already installed"))?;

    set_handler(libc::SIGPIPE, libc::SIG_IGN)?;
    let handler = on_terminate as extern "C" fn(libc::c_int) as libc::sighandler_t;
    set_handler(libc::SIGTERM, handler)?;
    set_handler(libc::SIGINT, handler)?;
    set_handler(libc::SIGQUIT, handler)?;
    Ok(())
}

fn set_handler(signum: libc::c_int, handler: libc::sighandler_t) -> io::Result<()> {
    unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = handler;
        action.sa_flags = libc::SA_RESTART;
        libc::sigfillset(&mut action.sa_mask);
        if libc::sigaction(signum, &action, std::ptr::null_mut()) != 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}
