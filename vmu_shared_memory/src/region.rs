//! Typed shared memory region.
//!
//! A region is a cache-line aligned [`RegionHeader`] followed by one `T`.
//! The creating process owns the backing file and unlinks it on drop.
//! Access to the payload must be serialised by the caller; [`crate::SharedState`]
//! pairs the region with a named semaphore for that.

use crate::error::{ShmError, ShmResult};
use crate::platform::{
    attach_region_mmap, create_region_mmap, get_current_pid, is_process_alive, unlink_region,
};
use memmap2::MmapMut;
use static_assertions::const_assert_eq;
use std::ptr::{NonNull, addr_of_mut};
use std::sync::atomic::{AtomicU64, Ordering, fence};
use tracing::{debug, warn};

/// Region magic: `"VMU_SHM\0"`.
pub const VMU_SHM_MAGIC: [u8; 8] = *b"VMU_SHM\0";

/// Layout fingerprint of a payload type (size and alignment).
pub const fn struct_version_hash<T>() -> u32 {
    let size = core::mem::size_of::<T>() as u32;
    let align = core::mem::align_of::<T>() as u32;
    size.wrapping_mul(0x9E3779B9) ^ align.wrapping_mul(0x517CC1B7)
}

/// Region header (one cache line).
#[repr(C, align(64))]
pub struct RegionHeader {
    /// Must equal [`VMU_SHM_MAGIC`] once the region is initialised.
    pub magic: [u8; 8],
    /// `struct_version_hash::<T>()` of the payload.
    pub version_hash: u32,
    /// Creator process ID.
    pub owner_pid: u32,
    /// Incremented on every committed update.
    pub heartbeat: AtomicU64,
    _padding: [u8; 40],
}

const_assert_eq!(core::mem::size_of::<RegionHeader>(), 64);

#[repr(C)]
struct RegionLayout<T> {
    header: RegionHeader,
    payload: T,
}

/// A mapped region holding one `T`.
pub struct SharedRegion<T: Copy> {
    name: String,
    owner: bool,
    ptr: NonNull<RegionLayout<T>>,
    _mmap: MmapMut,
}

// SAFETY: the mapping lives as long as the region; payload access is
// serialised externally and the header fields used concurrently are atomic.
unsafe impl<T: Copy + Send> Send for SharedRegion<T> {}
unsafe impl<T: Copy + Send> Sync for SharedRegion<T> {}

impl<T: Copy> SharedRegion<T> {
    /// Total mapped size.
    pub const SIZE: usize = core::mem::size_of::<RegionLayout<T>>();

    /// Create the region and write `initial` into it.
    ///
    /// A leftover region whose owner is dead is removed first. A region
    /// whose owner is still alive yields `AlreadyExists`.
    pub fn create(name: &str, initial: T) -> ShmResult<Self> {
        Self::remove_stale(name)?;

        let mut mmap = create_region_mmap(name, Self::SIZE)?;
        let ptr = NonNull::new(mmap.as_mut_ptr() as *mut RegionLayout<T>).ok_or_else(|| {
            ShmError::LayoutMismatch {
                name: name.to_string(),
                reason: "null mapping",
            }
        })?;

        // SAFETY: the mapping is page aligned, at least SIZE bytes, and
        // not yet visible to other processes (magic is written last).
        unsafe {
            let layout = ptr.as_ptr();
            addr_of_mut!((*layout).payload).write(initial);
            addr_of_mut!((*layout).header.version_hash).write(struct_version_hash::<T>());
            addr_of_mut!((*layout).header.owner_pid).write(get_current_pid());
            (*layout).header.heartbeat.store(0, Ordering::Relaxed);
            fence(Ordering::Release);
            addr_of_mut!((*layout).header.magic).write(VMU_SHM_MAGIC);
        }

        debug!("Created region {name} ({} bytes)", Self::SIZE);
        Ok(Self {
            name: name.to_string(),
            owner: true,
            ptr,
            _mmap: mmap,
        })
    }

    /// Attach to a region created by another process.
    pub fn open(name: &str) -> ShmResult<Self> {
        let mut mmap = attach_region_mmap(name)?;
        if mmap.len() < Self::SIZE {
            return Err(ShmError::LayoutMismatch {
                name: name.to_string(),
                reason: "region too small",
            });
        }
        let ptr = NonNull::new(mmap.as_mut_ptr() as *mut RegionLayout<T>).ok_or_else(|| {
            ShmError::LayoutMismatch {
                name: name.to_string(),
                reason: "null mapping",
            }
        })?;

        let region = Self {
            name: name.to_string(),
            owner: false,
            ptr,
            _mmap: mmap,
        };
        region.validate()?;
        Ok(region)
    }

    fn remove_stale(name: &str) -> ShmResult<()> {
        let mmap = match attach_region_mmap(name) {
            Ok(mmap) => mmap,
            Err(ShmError::NotFound { .. }) => return Ok(()),
            Err(e) => return Err(e),
        };
        if mmap.len() >= core::mem::size_of::<RegionHeader>() {
            // SAFETY: at least one header worth of mapped bytes.
            let header = unsafe { &*(mmap.as_ptr() as *const RegionHeader) };
            let pid = header.owner_pid;
            if header.magic == VMU_SHM_MAGIC && pid != get_current_pid() && is_process_alive(pid)
            {
                return Err(ShmError::AlreadyExists {
                    name: name.to_string(),
                });
            }
        }
        drop(mmap);
        warn!("Removing stale region {name}");
        unlink_region(name)
    }

    fn validate(&self) -> ShmResult<()> {
        let header = self.header();
        fence(Ordering::Acquire);
        if header.magic != VMU_SHM_MAGIC {
            return Err(ShmError::LayoutMismatch {
                name: self.name.clone(),
                reason: "bad magic",
            });
        }
        if header.version_hash != struct_version_hash::<T>() {
            return Err(ShmError::LayoutMismatch {
                name: self.name.clone(),
                reason: "payload layout hash differs",
            });
        }
        Ok(())
    }

    /// Region name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this handle created (and will unlink) the region.
    pub fn is_owner(&self) -> bool {
        self.owner
    }

    /// Region header.
    pub fn header(&self) -> &RegionHeader {
        // SAFETY: the header is only mutated through atomics after creation.
        unsafe { &(*self.ptr.as_ptr()).header }
    }

    /// Record one committed update. Returns the new heartbeat.
    pub fn beat(&self) -> u64 {
        self.header().heartbeat.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Current heartbeat.
    pub fn heartbeat(&self) -> u64 {
        self.header().heartbeat.load(Ordering::Acquire)
    }

    /// Raw payload pointer.
    ///
    /// # Safety
    ///
    /// Dereferencing requires exclusive access across all processes mapping
    /// the region, e.g. by holding the region's semaphore.
    pub unsafe fn payload(&self) -> *mut T {
        // SAFETY: in-bounds projection of a live mapping.
        unsafe { addr_of_mut!((*self.ptr.as_ptr()).payload) }
    }
}

impl<T: Copy> Drop for SharedRegion<T> {
    fn drop(&mut self) {
        if self.owner {
            match unlink_region(&self.name) {
                Ok(()) => debug!("Unlinked region {}", self.name),
                Err(e) => warn!("Failed to unlink region {}: {e}", self.name),
            }
        }
    }
}
