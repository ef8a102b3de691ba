//! Page Table Management
//!
//! Two-level user page tables: a sparse directory of leaf tables, each leaf
//! covering [`TABLE_SPAN`](super::address::TABLE_SPAN) bytes with
//! [`ENTRIES_PER_TABLE`] entries.
//!
//! # Security Properties
//! - Permission bits are a closed set; unknown bits are rejected, never masked
//! - Every user mapping carries at least `PRESENT | USER`
//! - Leaf tables are backed by real frames, so table growth can fail with
//!   `OutOfMemory` exactly like page allocation

use alloc::vec::Vec;

use bitflags::bitflags;

use super::address::ENTRIES_PER_TABLE;
use super::frame::{PhysFrame, SharedFrame};

bitflags! {
    /// Permission bits of a user mapping.
    ///
    /// The set is closed: syscall-supplied values with any other bit set
    /// are rejected.
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Hash)]
    pub struct PagePerm: usize {
        /// Mapping is valid.
        const PRESENT = 0x001;
        /// Mapping may be written.
        const WRITABLE = 0x002;
        /// Mapping is accessible from user mode.
        const USER = 0x004;
        /// Reserved for software use by the environment.
        const AVAILABLE = 0x200;
    }
}

impl PagePerm {
    /// Bits every user-mode mapping must carry.
    pub const REQUIRED: Self = Self::PRESENT.union(Self::USER);

    /// Validate a permission word passed in by a syscall.
    ///
    /// Accepts exactly `PRESENT | USER` plus any subset of
    /// `WRITABLE | AVAILABLE`.
    pub fn from_syscall(raw: usize) -> Result<Self, MappingError> {
        let perm = Self::from_bits(raw).ok_or(MappingError::InvalidPermissions)?;
        if !perm.contains(Self::REQUIRED) {
            return Err(MappingError::InvalidPermissions);
        }
        Ok(perm)
    }

    /// True if user code may reach a page with these bits.
    #[inline]
    pub const fn is_user_accessible(self) -> bool {
        self.contains(Self::REQUIRED)
    }

    /// True if `self` does not ask for write access that `source` lacks.
    #[inline]
    pub const fn within_writability_of(self, source: Self) -> bool {
        !self.contains(Self::WRITABLE) || source.contains(Self::WRITABLE)
    }
}

/// A single leaf-table entry: a shared frame plus the permission bits this
/// address space holds on it.
#[derive(Clone, Debug)]
pub struct PageTableEntry {
    frame: SharedFrame,
    perm: PagePerm,
}

impl PageTableEntry {
    /// Create a page entry mapping a physical frame.
    #[inline]
    pub fn page(frame: SharedFrame, perm: PagePerm) -> Self {
        Self { frame, perm }
    }

    /// The mapped frame.
    #[inline]
    pub fn frame(&self) -> &SharedFrame {
        &self.frame
    }

    /// Get the flags from this entry.
    #[inline]
    pub fn perm(&self) -> PagePerm {
        self.perm
    }
}

/// A leaf page table.
///
/// The table owns the frame that backs it; dropping the table releases the
/// frame and every mapping in it.
#[derive(Debug)]
pub struct PageTable {
    _backing: PhysFrame,
    entries: Vec<Option<PageTableEntry>>,
    live: usize,
}

impl PageTable {
    /// Create a new empty page table on top of `backing`.
    pub fn new(backing: PhysFrame) -> Self {
        let mut entries = Vec::with_capacity(ENTRIES_PER_TABLE);
        entries.resize_with(ENTRIES_PER_TABLE, || None);
        Self {
            _backing: backing,
            entries,
            live: 0,
        }
    }

    /// Get a reference to an entry by index.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&PageTableEntry> {
        self.entries.get(index).and_then(Option::as_ref)
    }

    /// Install an entry, returning the one it replaced.
    pub fn set(&mut self, index: usize, entry: PageTableEntry) -> Option<PageTableEntry> {
        let old = self.entries[index].replace(entry);
        if old.is_none() {
            self.live += 1;
        }
        old
    }

    /// Clear an entry, returning what was there.
    pub fn clear(&mut self, index: usize) -> Option<PageTableEntry> {
        let old = self.entries.get_mut(index).and_then(Option::take);
        if old.is_some() {
            self.live -= 1;
        }
        old
    }

    /// Iterate over all valid entries with their indices.
    pub fn iter_valid(&self) -> impl Iterator<Item = (usize, &PageTableEntry)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().map(|e| (i, e)))
    }

    /// Number of valid entries.
    #[inline]
    pub fn live_entries(&self) -> usize {
        self.live
    }
}

/// Error type for page mapping operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingError {
    /// The virtual address is not mapped.
    NotMapped,
    /// No physical frames available for pages or page tables.
    OutOfMemory,
    /// The address is not properly aligned.
    MisalignedAddress,
    /// The address is at or above the user ceiling.
    OutOfRange,
    /// Permission bits outside the allowed set, or missing required bits.
    InvalidPermissions,
    /// Access needs rights the mapping does not grant.
    AccessDenied,
}

impl core::fmt::Display for MappingError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotMapped => write!(f, "virtual address not mapped"),
            Self::OutOfMemory => write!(f, "out of memory for pages or page tables"),
            Self::MisalignedAddress => write!(f, "address not properly aligned"),
            Self::OutOfRange => write!(f, "address above user ceiling"),
            Self::InvalidPermissions => write!(f, "invalid permission combination"),
            Self::AccessDenied => write!(f, "mapping does not grant the requested access"),
        }
    }
}
