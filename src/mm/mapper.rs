//! Address Space Mapper
//!
//! High-level API over an environment's user page tables: insert, look up
//! and remove single-page mappings, and copy bytes across the user/kernel
//! boundary with permission checks.
//!
//! # Security Properties
//! - Nothing is ever mapped at or above `UTOP`
//! - Every access to user memory is checked page by page against the
//!   mapping's permission bits
//! - A failed insert leaves the address space unchanged

use alloc::collections::btree_map::{BTreeMap, Entry};
use alloc::sync::Arc;

use super::address::{VirtAddr, PAGE_SIZE, UTOP};
use super::frame::{FrameAllocator, PhysFrame, SharedFrame};
use super::paging::{MappingError, PagePerm, PageTable, PageTableEntry};

/// The user half of one environment's address space.
#[derive(Debug)]
pub struct AddressSpace {
    /// Frame backing the page directory.
    _root: PhysFrame,
    /// Leaf tables keyed by directory index.
    tables: BTreeMap<usize, PageTable>,
    frames: FrameAllocator,
}

/// Reject addresses a user mapping cannot live at.
fn check_page_addr(va: VirtAddr) -> Result<(), MappingError> {
    if !va.is_user() {
        return Err(MappingError::OutOfRange);
    }
    if !va.is_aligned() {
        return Err(MappingError::MisalignedAddress);
    }
    Ok(())
}

impl AddressSpace {
    /// Create an empty address space, allocating its directory frame.
    pub fn new(frames: &FrameAllocator) -> Result<Self, MappingError> {
        Ok(Self {
            _root: frames.alloc()?,
            tables: BTreeMap::new(),
            frames: frames.clone(),
        })
    }

    /// Map `frame` at `va` with `perm`, replacing any existing mapping.
    ///
    /// Fails with `OutOfMemory` if a leaf table is needed and cannot be
    /// allocated; the address space is untouched in that case.
    pub fn insert(
        &mut self,
        va: VirtAddr,
        frame: SharedFrame,
        perm: PagePerm,
    ) -> Result<(), MappingError> {
        check_page_addr(va)?;
        let (dir, leaf) = va.table_indices();

        let table = match self.tables.entry(dir) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => {
                e.insert(PageTable::new(self.frames.alloc()?))
            }
        };

        // The replaced entry (if any) drops here, releasing its reference.
        table.set(leaf, PageTableEntry::page(frame, perm));
        Ok(())
    }

    /// Look up the mapping at a page address.
    pub fn lookup(&self, va: VirtAddr) -> Option<&PageTableEntry> {
        if !va.is_user() {
            return None;
        }
        let (dir, leaf) = va.table_indices();
        self.tables.get(&dir)?.get(leaf)
    }

    /// Remove the mapping at `va`, returning it.
    ///
    /// Leaf tables are kept even when they become empty.
    pub fn remove(&mut self, va: VirtAddr) -> Option<PageTableEntry> {
        if !va.is_user() {
            return None;
        }
        let (dir, leaf) = va.table_indices();
        self.tables.get_mut(&dir)?.clear(leaf)
    }

    /// Number of live mappings to the frame mapped at `va`, across all
    /// address spaces.
    pub fn frame_refs(&self, va: VirtAddr) -> Option<usize> {
        self.lookup(va).map(|entry| Arc::strong_count(entry.frame()))
    }

    /// Total number of pages mapped in this address space.
    pub fn mapping_count(&self) -> usize {
        self.tables.values().map(PageTable::live_entries).sum()
    }

    /// Iterate over every mapping in address order.
    pub fn mappings(&self) -> impl Iterator<Item = (VirtAddr, &PageTableEntry)> {
        self.tables.iter().flat_map(|(&dir, table)| {
            table
                .iter_valid()
                .map(move |(leaf, entry)| (VirtAddr::from_table_indices(dir, leaf), entry))
        })
    }

    /// Check that `[va, va + len)` is mapped with at least `need` on every
    /// page it touches.
    pub fn check_range(&self, va: VirtAddr, len: usize, need: PagePerm) -> Result<(), MappingError> {
        self.walk(va, len, need, |_, _, _| ())
    }

    /// Copy `buf.len()` bytes of user memory starting at `va` into `buf`.
    pub fn copy_in(&self, va: VirtAddr, buf: &mut [u8], need: PagePerm) -> Result<(), MappingError> {
        self.check_range(va, buf.len(), need)?;
        let mut done = 0;
        self.walk(va, buf.len(), need, |frame, offset, chunk| {
            frame.read(offset, &mut buf[done..done + chunk]);
            done += chunk;
        })
    }

    /// Copy `bytes` into user memory starting at `va`.
    pub fn copy_out(&self, va: VirtAddr, bytes: &[u8], need: PagePerm) -> Result<(), MappingError> {
        self.check_range(va, bytes.len(), need)?;
        let mut done = 0;
        self.walk(va, bytes.len(), need, |frame, offset, chunk| {
            frame.write(offset, &bytes[done..done + chunk]);
            done += chunk;
        })
    }

    /// Visit each page-sized piece of `[va, va + len)`, stopping at the first
    /// page that is missing or lacks `need`.
    fn walk<F>(&self, va: VirtAddr, len: usize, need: PagePerm, mut visit: F) -> Result<(), MappingError>
    where
        F: FnMut(&SharedFrame, usize, usize),
    {
        if len == 0 {
            return Ok(());
        }
        let end = va.checked_add(len).ok_or(MappingError::OutOfRange)?;
        if end.as_usize() > UTOP {
            return Err(MappingError::OutOfRange);
        }

        let mut cursor = va;
        while cursor < end {
            let entry = self.lookup(cursor.align_down()).ok_or(MappingError::NotMapped)?;
            if !entry.perm().contains(need) {
                return Err(MappingError::AccessDenied);
            }
            let offset = cursor.page_offset();
            let chunk = (PAGE_SIZE - offset).min(end.as_usize() - cursor.as_usize());
            visit(entry.frame(), offset, chunk);
            cursor = VirtAddr::new(cursor.as_usize() + chunk);
        }
        Ok(())
    }
}
