//! SIGINT/SIGTERM turn into a graceful shutdown
//!
//! The signal handler only sets a flag; a small watcher thread forwards it to
//! the server's [`ShutdownHandle`], so nothing async-signal-unsafe runs inside
//! the handler.

use crate::server::daemon::ShutdownHandle;
use std::io;

#[cfg(unix)]
mod imp {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;
    use tracing::info;

    static RECEIVED: AtomicBool = AtomicBool::new(false);

    extern "C" fn on_signal(_signal: libc::c_int) {
        RECEIVED.store(true, Ordering::SeqCst);
    }

    pub fn install(handle: ShutdownHandle) -> io::Result<()> {
        for signal in [libc::SIGINT, libc::SIGTERM] {
            // SAFETY: the handler only stores to an atomic
            let previous = unsafe {
                libc::signal(
                    signal,
                    on_signal as extern "C" fn(libc::c_int) as libc::sighandler_t,
                )
            };
            if previous == libc::SIG_ERR {
                return Err(io::Error::last_os_error());
            }
        }

        thread::Builder::new()
            .name("clinrec-signals".to_string())
            .spawn(move || {
                while !handle.is_triggered() {
                    if RECEIVED.load(Ordering::SeqCst) {
                        info!("termination signal received");
                        handle.trigger();
                        break;
                    }
                    thread::sleep(Duration::from_millis(50));
                }
            })?;
        Ok(())
    }
}

#[cfg(not(unix))]
mod imp {
    use super::*;

    pub fn install(_handle: ShutdownHandle) -> io::Result<()> {
        Ok(())
    }
}

/// Trigger `handle` on SIGINT or SIGTERM. A no-op on platforms without signals.
pub fn install(handle: ShutdownHandle) -> io::Result<()> {
    imp::install(handle)
}
