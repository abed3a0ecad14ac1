//! Context-scoped tracked heap allocations.
//!
//! The boundary lets foreign callers request zeroed memory whose lifetime is
//! bound to the owning context: anything not freed explicitly is reclaimed
//! when the context tears down. The ledger records an advisory file/line per
//! allocation for leak and double-free diagnostics; those fields never affect
//! correctness.

use std::collections::HashMap;
use std::ptr::NonNull;

/// Advisory source location attached to an allocation.
#[derive(Debug, Clone, Default)]
pub struct AllocationSite {
    /// The file that requested the allocation, if reported.
    pub file: Option<String>,
    /// The line that requested the allocation, if reported.
    pub line: Option<i32>,
}

impl AllocationSite {
    /// Builds a site from optional caller-reported fields.
    ///
    /// Returns `None` when neither field is present, so empty sites cost
    /// nothing in the ledger.
    #[must_use]
    pub fn from_parts(file: Option<&str>, line: Option<i32>) -> Option<Self> {
        if file.is_none() && line.is_none() {
            return None;
        }
        Some(Self {
            file: file.map(str::to_owned),
            line,
        })
    }
}

#[derive(Debug)]
struct Allocation {
    /// Keeps the bytes alive and address-stable while the record is live.
    buf: Box<[u8]>,
    site: Option<AllocationSite>,
}

/// Ledger of live context-owned allocations, keyed by pointer address.
///
/// Backing storage is boxed, so addresses stay stable while records move
/// around inside the map.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    live: HashMap<usize, Allocation>,
}

impl MemoryLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates `bytes` zeroed bytes owned by the ledger.
    ///
    /// Returns `None` for a zero-byte request. The returned pointer stays
    /// valid until [`free`](Self::free) removes the record or the ledger is
    /// dropped.
    pub fn allocate(&mut self, bytes: usize, site: Option<AllocationSite>) -> Option<NonNull<u8>> {
        if bytes == 0 {
            return None;
        }
        let mut buf = vec![0u8; bytes].into_boxed_slice();
        let ptr = NonNull::new(buf.as_mut_ptr())?;
        self.live.insert(ptr.as_ptr() as usize, Allocation { buf, site });
        Some(ptr)
    }

    /// Frees the allocation at `addr` early.
    ///
    /// Returns false if the address is unknown to the ledger: either it was
    /// never allocated here, or it was already freed.
    pub fn free(&mut self, addr: usize) -> bool {
        self.live.remove(&addr).is_some()
    }

    /// Returns true if `addr` is a live ledger allocation.
    #[must_use]
    pub fn contains(&self, addr: usize) -> bool {
        self.live.contains_key(&addr)
    }

    /// Returns the number of live allocations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Returns true if no allocations are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Returns the total live bytes held by the ledger.
    #[must_use]
    pub fn live_bytes(&self) -> usize {
        self.live.values().map(|a| a.buf.len()).sum()
    }

    /// Releases every outstanding allocation.
    ///
    /// Called during context teardown. Records the caller never freed are
    /// reclaimed silently (that is the contract), with a debug event per
    /// record for leak hunting.
    pub fn release_all(&mut self) {
        for (addr, allocation) in self.live.drain() {
            match &allocation.site {
                Some(site) => tracing::debug!(
                    addr,
                    bytes = allocation.buf.len(),
                    file = site.file.as_deref().unwrap_or("<unknown>"),
                    line = site.line.unwrap_or(-1),
                    "reclaiming allocation at context teardown"
                ),
                None => tracing::debug!(
                    addr,
                    bytes = allocation.buf.len(),
                    "reclaiming allocation at context teardown"
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_allocate_returns_zeroed_stable_memory() {
        let mut ledger = MemoryLedger::new();
        let ptr = ledger.allocate(64, None).unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.live_bytes(), 64);
        assert!(ledger.contains(ptr.as_ptr() as usize));
    }

    #[test]
    fn test_zero_byte_allocation_fails() {
        let mut ledger = MemoryLedger::new();
        assert!(ledger.allocate(0, None).is_none());
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_free_unknown_pointer_fails() {
        let mut ledger = MemoryLedger::new();
        assert!(!ledger.free(0xdead));
    }

    #[test]
    fn test_double_free_fails_second_time() {
        let mut ledger = MemoryLedger::new();
        let addr = ledger.allocate(16, None).unwrap().as_ptr() as usize;
        assert!(ledger.free(addr));
        assert!(!ledger.free(addr));
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_release_all_drains_everything() {
        let mut ledger = MemoryLedger::new();
        let site = AllocationSite::from_parts(Some("src/demo.rs"), Some(7));
        let _ = ledger.allocate(8, site);
        let _ = ledger.allocate(24, None);
        assert_eq!(ledger.len(), 2);
        ledger.release_all();
        assert!(ledger.is_empty());
        assert_eq!(ledger.live_bytes(), 0);
    }

    #[test]
    fn test_allocation_site_from_parts() {
        assert!(AllocationSite::from_parts(None, None).is_none());
        let site = AllocationSite::from_parts(Some("a.c"), None).unwrap();
        assert_eq!(site.file.as_deref(), Some("a.c"));
        assert_eq!(site.line, None);
    }
}
