//! Physical and Virtual Address Types
//!
//! Type-safe wrappers for memory addresses that prevent mixing
//! physical frame addresses with user virtual addresses.
//!
//! # Layout
//! ```text
//!  0 ........................ UTOP ................. usize::MAX
//!  |   user-mappable pages     |   reserved (sentinel)   |
//! ```
//! `UTOP` itself is never a valid page address, which is what lets syscalls
//! use it to mean "no page".

use core::fmt;

use static_assertions::const_assert;

/// Page size (4 KiB)
pub const PAGE_SIZE: usize = 4096;
/// Page size mask
pub const PAGE_MASK: usize = PAGE_SIZE - 1;
/// Bits to shift for page number
pub const PAGE_SHIFT: usize = 12;

/// Number of entries per leaf page table (512 for 4KB granule)
pub const ENTRIES_PER_TABLE: usize = 512;

/// Bits to shift for the directory index.
pub const TABLE_SHIFT: usize = PAGE_SHIFT + 9;

/// Bytes of address space covered by one leaf table (2 MiB).
pub const TABLE_SPAN: usize = 1 << TABLE_SHIFT;

/// User address-space ceiling.
///
/// Nothing at or above this address is ever mapped for user mode.
pub const UTOP: usize = 0xEEC0_0000;

const_assert!(ENTRIES_PER_TABLE * PAGE_SIZE == TABLE_SPAN);
const_assert!(UTOP % TABLE_SPAN == 0);

/// A physical memory address.
///
/// Physical addresses cannot be dereferenced directly; frame contents are
/// reached through the owning [`PhysFrame`](super::frame::PhysFrame).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct PhysAddr(usize);

impl PhysAddr {
    /// Create a new physical address.
    #[inline]
    pub const fn new(addr: usize) -> Self {
        Self(addr)
    }

    /// Get the raw address value.
    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0
    }

    /// Check if the address is page-aligned.
    #[inline]
    pub const fn is_aligned(self) -> bool {
        self.0 & PAGE_MASK == 0
    }
}

impl fmt::Debug for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhysAddr({:#010x})", self.0)
    }
}

impl fmt::Display for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// A user virtual address, exactly as supplied in a syscall argument.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct VirtAddr(usize);

impl VirtAddr {
    /// The ceiling, used as the "no page" sentinel.
    pub const UTOP: Self = Self(UTOP);

    /// Wrap a raw address.
    #[inline]
    pub const fn new(addr: usize) -> Self {
        Self(addr)
    }

    /// Get the raw address value.
    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0
    }

    /// Check if the address is page-aligned.
    #[inline]
    pub const fn is_aligned(self) -> bool {
        self.0 & PAGE_MASK == 0
    }

    /// Align the address down to the nearest page boundary.
    #[inline]
    pub const fn align_down(self) -> Self {
        Self(self.0 & !PAGE_MASK)
    }

    /// Get the page offset (lowest 12 bits).
    #[inline]
    pub const fn page_offset(self) -> usize {
        self.0 & PAGE_MASK
    }

    /// True if the address lies below the user ceiling.
    #[inline]
    pub const fn is_user(self) -> bool {
        self.0 < UTOP
    }

    /// True for a page-aligned address below the ceiling: the only kind of
    /// address a user mapping may live at.
    #[inline]
    pub const fn is_user_page(self) -> bool {
        self.is_user() && self.is_aligned()
    }

    /// Directory and leaf-table indices for this address.
    #[inline]
    pub const fn table_indices(self) -> (usize, usize) {
        let dir = self.0 >> TABLE_SHIFT;
        let leaf = (self.0 >> PAGE_SHIFT) & (ENTRIES_PER_TABLE - 1);
        (dir, leaf)
    }

    /// Rebuild a page address from its table indices.
    #[inline]
    pub const fn from_table_indices(dir: usize, leaf: usize) -> Self {
        Self((dir << TABLE_SHIFT) | (leaf << PAGE_SHIFT))
    }

    /// Add an offset, returning `None` on overflow.
    #[inline]
    pub const fn checked_add(self, offset: usize) -> Option<Self> {
        match self.0.checked_add(offset) {
            Some(addr) => Some(Self(addr)),
            None => None,
        }
    }
}

impl fmt::Debug for VirtAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VirtAddr({:#010x})", self.0)
    }
}

impl fmt::Display for VirtAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}
