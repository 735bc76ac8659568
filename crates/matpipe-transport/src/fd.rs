//! Raw descriptor helpers: pipes, non-blocking mode, readiness waits.

use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::time::Duration;

/// Create an anonymous pipe with both ends marked close-on-exec.
///
/// Returns `(read_end, write_end)`.
pub(crate) fn cloexec_pipe() -> io::Result<(OwnedFd, OwnedFd)> {
    let mut fds: [libc::c_int; 2] = [-1, -1];

    // SAFETY: `fds` is a valid, writable two-element array as pipe(2) requires.
    let rc = unsafe { libc::pipe(fds.as_mut_ptr()) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }

    // SAFETY: pipe(2) succeeded, so both descriptors are open and exclusively ours.
    let (read_end, write_end) =
        unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };

    set_cloexec(read_end.as_raw_fd())?;
    set_cloexec(write_end.as_raw_fd())?;
    Ok((read_end, write_end))
}

fn set_cloexec(fd: RawFd) -> io::Result<()> {
    // SAFETY: fcntl with F_GETFD/F_SETFD only inspects and updates descriptor flags.
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFD) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: same descriptor; only FD_CLOEXEC is added to the flags just read.
    let rc = unsafe { libc::fcntl(fd, libc::F_SETFD, flags | libc::FD_CLOEXEC) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Put a descriptor into non-blocking mode.
///
/// Reads then return whatever is available (or `WouldBlock`) instead of
/// waiting for the requested byte count.
pub fn set_nonblocking(fd: RawFd) -> io::Result<()> {
    // SAFETY: fcntl with F_GETFL/F_SETFL only inspects and updates status flags.
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: same descriptor; only O_NONBLOCK is added to the flags just read.
    let rc = unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Wait until `fd` has bytes to read, or until `timeout` elapses.
///
/// Returns `Ok(true)` when a read will not block. Hang-up and error
/// conditions count as readable so that the subsequent read observes EOF
/// or the error itself.
pub fn poll_readable(fd: RawFd, timeout: Duration) -> io::Result<bool> {
    let timeout_ms = poll_timeout_ms(timeout);
    let mut fds = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };

    loop {
        // SAFETY: `fds` points to exactly one initialized pollfd.
        let rc = unsafe { libc::poll(&mut fds, 1, timeout_ms) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return Err(err);
        }
        let ready = libc::POLLIN | libc::POLLHUP | libc::POLLERR;
        return Ok(rc > 0 && (fds.revents & ready) != 0);
    }
}

/// Milliseconds for poll(2), rounded up so a sub-millisecond bound still waits.
fn poll_timeout_ms(timeout: Duration) -> libc::c_int {
    let ms = timeout.as_nanos().div_ceil(1_000_000);
    ms.min(libc::c_int::MAX as u128) as libc::c_int
}
