//! Double-fork daemonization.
//!
//! The classic Unix recipe: fork to return control to the shell, start a
//! new session, fork again so the daemon can never reacquire a controlling
//! terminal, then detach from the filesystem and stdio.
//!
//! Must run before any thread is spawned; fork only carries the calling
//! thread into the child.

use std::io;

use anyhow::{Context, Result};

/// Detach the current process from the shell and terminal.
///
/// On return the caller is running in the background child; both
/// intermediate parents have already exited.
pub fn daemonize() -> Result<()> {
    fork_and_exit_parent().context("first fork failed")?;

    if unsafe { libc::setsid() } == -1 {
        return Err(io::Error::last_os_error()).context("setsid failed");
    }

    fork_and_exit_parent().context("second fork failed")?;

    // Don't keep a mounted filesystem busy through the working directory.
    if unsafe { libc::chdir(c"/".as_ptr()) } == -1 {
        return Err(io::Error::last_os_error()).context("chdir to / failed");
    }

    unsafe { libc::umask(0o022) };

    redirect_stdio().context("cannot redirect stdio to /dev/null")?;

    Ok(())
}

fn fork_and_exit_parent() -> io::Result<()> {
    match unsafe { libc::fork() } {
        -1 => Err(io::Error::last_os_error()),
        0 => Ok(()),
        // Parent side: terminate immediately, skipping atexit handlers.
        _ => unsafe { libc::_exit(0) },
    }
}

fn redirect_stdio() -> io::Result<()> {
    let null = unsafe { libc::open(c"/dev/null".as_ptr(), libc::O_RDWR) };
    if null == -1 {
        return Err(io::Error::last_os_error());
    }

    for fd in [libc::STDIN_FILENO, libc::STDOUT_FILENO, libc::STDERR_FILENO] {
        if unsafe { libc::dup2(null, fd) } == -1 {
            return Err(io::Error::last_os_error());
        }
    }

    if null > libc::STDERR_FILENO {
        unsafe { libc::close(null) };
    }

    Ok(())
}
