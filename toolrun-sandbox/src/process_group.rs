//! Process-group cleanup for child processes started by path execution.
//!
//! Children are spawned as leaders of their own process group, so a timeout
//! can take down the tool together with anything it forked.

use std::io;

#[cfg(unix)]
use nix::errno::Errno;
#[cfg(unix)]
use nix::sys::signal::{Signal, killpg};
#[cfg(unix)]
use nix::unistd::Pid;

/// Send SIGKILL to the process group led by `pgid`.
///
/// A group that has already exited is not an error.
#[cfg(unix)]
pub fn kill_process_group(pgid: u32) -> io::Result<()> {
    let raw = i32::try_from(pgid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "process group id out of range"))?;
    match killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(errno) => Err(io::Error::from(errno)),
    }
}

/// No-op on non-Unix platforms; `kill_on_drop` covers the direct child.
#[cfg(not(unix))]
pub fn kill_process_group(_pgid: u32) -> io::Result<()> {
    Ok(())
}
