//! Resident memory sampling.
//!
//! Reclamation only evicts when the process is over its memory ceiling, so
//! the cache needs a way to ask how much memory the process holds. The
//! probe is a trait so tests can drive eviction deterministically.

use std::sync::atomic::{AtomicU64, Ordering};

/// Source of the process's resident memory size.
pub trait MemoryProbe: Send + Sync {
    /// Resident set size in bytes, or `None` when it cannot be determined.
    ///
    /// `None` never triggers eviction.
    fn resident_bytes(&self) -> Option<u64>;
}

/// Reads the current process's resident set size from the OS.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessMemory;

impl ProcessMemory {
    pub fn new() -> Self {
        Self
    }
}

impl MemoryProbe for ProcessMemory {
    #[cfg(target_os = "linux")]
    fn resident_bytes(&self) -> Option<u64> {
        let statm = std::fs::read_to_string("/proc/self/statm").ok()?;
        let pages = parse_statm_resident(&statm)?;
        // SAFETY: sysconf has no preconditions.
        let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if page_size <= 0 {
            return None;
        }
        Some(pages * page_size as u64)
    }

    #[cfg(not(target_os = "linux"))]
    fn resident_bytes(&self) -> Option<u64> {
        None
    }
}

/// Second field of `/proc/<pid>/statm` (resident pages).
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_statm_resident(statm: &str) -> Option<u64> {
    statm.split_whitespace().nth(1)?.parse().ok()
}

/// Probe reporting a settable value.
#[derive(Debug)]
pub struct FixedMemory {
    bytes: AtomicU64,
    known: bool,
}

impl FixedMemory {
    pub fn new(bytes: u64) -> Self {
        Self {
            bytes: AtomicU64::new(bytes),
            known: true,
        }
    }

    /// A probe that never knows the answer.
    pub fn unknown() -> Self {
        Self {
            bytes: AtomicU64::new(0),
            known: false,
        }
    }

    pub fn set(&self, bytes: u64) {
        self.bytes.store(bytes, Ordering::Relaxed);
    }
}

impl MemoryProbe for FixedMemory {
    fn resident_bytes(&self) -> Option<u64> {
        self.known.then(|| self.bytes.load(Ordering::Relaxed))
    }
}
