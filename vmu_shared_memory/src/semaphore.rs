//! POSIX named binary semaphore.
//!
//! Initial count 1, so it serves as a cross-process mutex. The creator
//! unlinks the name on drop; openers only close their handle.

use crate::error::{ShmError, ShmResult};
use nix::errno::Errno;
use std::ffi::CString;
use std::ptr::NonNull;
use tracing::{debug, warn};

/// Handle to a named semaphore.
pub struct NamedSemaphore {
    name: CString,
    sem: NonNull<libc::sem_t>,
    owner: bool,
}

// SAFETY: sem_t operations are thread-safe by POSIX.
unsafe impl Send for NamedSemaphore {}
unsafe impl Sync for NamedSemaphore {}

fn to_cstring(name: &str) -> ShmResult<CString> {
    if !name.starts_with('/') || name.len() < 2 || name[1..].contains('/') {
        return Err(ShmError::InvalidName {
            name: name.to_string(),
        });
    }
    CString::new(name).map_err(|_| ShmError::InvalidName {
        name: name.to_string(),
    })
}

impl NamedSemaphore {
    /// Create the semaphore with count 1, replacing any leftover.
    pub fn create(name: &str) -> ShmResult<Self> {
        let cname = to_cstring(name)?;
        // SAFETY: valid C string; ENOENT is the common case.
        if unsafe { libc::sem_unlink(cname.as_ptr()) } == 0 {
            warn!("Removed stale semaphore {name}");
        }

        // SAFETY: variadic mode and value arguments as required with O_CREAT.
        let sem = unsafe {
            libc::sem_open(
                cname.as_ptr(),
                libc::O_CREAT | libc::O_EXCL,
                0o600 as libc::c_uint,
                1 as libc::c_uint,
            )
        };
        let sem = Self::check(sem, name)?;
        debug!("Created semaphore {name}");
        Ok(Self {
            name: cname,
            sem,
            owner: true,
        })
    }

    /// Open a semaphore created by another process.
    pub fn open(name: &str) -> ShmResult<Self> {
        let cname = to_cstring(name)?;
        // SAFETY: valid C string, no O_CREAT so no variadic arguments.
        let sem = unsafe { libc::sem_open(cname.as_ptr(), 0) };
        let sem = Self::check(sem, name)?;
        Ok(Self {
            name: cname,
            sem,
            owner: false,
        })
    }

    fn check(sem: *mut libc::sem_t, name: &str) -> ShmResult<NonNull<libc::sem_t>> {
        if sem == libc::SEM_FAILED {
            return Err(match Errno::last() {
                Errno::ENOENT => ShmError::NotFound {
                    name: name.to_string(),
                },
                Errno::EEXIST => ShmError::AlreadyExists {
                    name: name.to_string(),
                },
                errno => ShmError::Nix { source: errno },
            });
        }
        NonNull::new(sem).ok_or_else(|| ShmError::NotFound {
            name: name.to_string(),
        })
    }

    /// Block until the semaphore is acquired. Interrupted waits are retried.
    pub fn acquire(&self) -> ShmResult<SemaphoreGuard<'_>> {
        loop {
            // SAFETY: `sem` is open for the lifetime of `self`.
            if unsafe { libc::sem_wait(self.sem.as_ptr()) } == 0 {
                return Ok(SemaphoreGuard { sem: self });
            }
            match Errno::last() {
                Errno::EINTR => continue,
                errno => return Err(errno.into()),
            }
        }
    }

    /// Acquire without blocking. `None` if held elsewhere.
    pub fn try_acquire(&self) -> ShmResult<Option<SemaphoreGuard<'_>>> {
        // SAFETY: as above.
        if unsafe { libc::sem_trywait(self.sem.as_ptr()) } == 0 {
            return Ok(Some(SemaphoreGuard { sem: self }));
        }
        match Errno::last() {
            Errno::EAGAIN | Errno::EINTR => Ok(None),
            errno => Err(errno.into()),
        }
    }

    fn release(&self) {
        // SAFETY: only called by a guard that acquired this semaphore.
        if unsafe { libc::sem_post(self.sem.as_ptr()) } != 0 {
            warn!("sem_post failed: {}", Errno::last());
        }
    }
}

impl Drop for NamedSemaphore {
    fn drop(&mut self) {
        // SAFETY: closing our own handle once.
        unsafe { libc::sem_close(self.sem.as_ptr()) };
        if self.owner {
            // SAFETY: valid C string.
            unsafe { libc::sem_unlink(self.name.as_ptr()) };
        }
    }
}

/// Held semaphore; released on drop.
pub struct SemaphoreGuard<'a> {
    sem: &'a NamedSemaphore,
}

impl Drop for SemaphoreGuard<'_> {
    fn drop(&mut self) {
        self.sem.release();
    }
}
