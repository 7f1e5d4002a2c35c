//! Signal delivery to the worker process.

use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalDelivery {
    Delivered,
    /// The process no longer exists.
    NoSuchProcess,
}

/// Signalling seam used by the supervisor's stop path.
pub trait ProcessControl: Send + Sync {
    /// Asks the process to exit (SIGTERM).
    fn terminate(&self, pid: u32) -> io::Result<SignalDelivery>;

    /// Kills the process (SIGKILL).
    fn kill(&self, pid: u32) -> io::Result<SignalDelivery>;

    fn is_alive(&self, pid: u32) -> bool;
}

/// [`ProcessControl`] backed by the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProcessControl;

#[cfg(unix)]
fn send_signal(pid: u32, signal: libc::c_int) -> io::Result<SignalDelivery> {
    let pid = libc::pid_t::try_from(pid)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
    if pid <= 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "refusing to signal a process group",
        ));
    }

    let result = unsafe { libc::kill(pid, signal) };
    if result == 0 {
        return Ok(SignalDelivery::Delivered);
    }

    let err = io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        Ok(SignalDelivery::NoSuchProcess)
    } else {
        Err(err)
    }
}

#[cfg(unix)]
impl ProcessControl for SystemProcessControl {
    fn terminate(&self, pid: u32) -> io::Result<SignalDelivery> {
        send_signal(pid, libc::SIGTERM)
    }

    fn kill(&self, pid: u32) -> io::Result<SignalDelivery> {
        send_signal(pid, libc::SIGKILL)
    }

    fn is_alive(&self, pid: u32) -> bool {
        match send_signal(pid, 0) {
            Ok(SignalDelivery::Delivered) => true,
            Ok(SignalDelivery::NoSuchProcess) => false,
            Err(e) => e.kind() == io::ErrorKind::PermissionDenied,
        }
    }
}

#[cfg(not(unix))]
impl ProcessControl for SystemProcessControl {
    fn terminate(&self, _pid: u32) -> io::Result<SignalDelivery> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "process signals are not supported on this platform",
        ))
    }

    fn kill(&self, pid: u32) -> io::Result<SignalDelivery> {
        self.terminate(pid)
    }

    fn is_alive(&self, _pid: u32) -> bool {
        false
    }
}
