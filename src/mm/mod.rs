//! Memory management module
//!
//! Provides:
//! - Address types and the user address-space layout
//! - Physical frame allocation with reference-counted sharing
//! - Per-environment user page tables
//!
//! # Security Principles
//! - All user addresses are bounds- and alignment-checked
//! - Memory initialization is guaranteed
//! - Unsafe code is minimal and audited

pub mod address;
pub mod frame;
pub mod mapper;
pub mod paging;

pub use address::{PhysAddr, VirtAddr, PAGE_SIZE, UTOP};
pub use frame::{FrameAllocator, PhysFrame, SharedFrame};
pub use mapper::AddressSpace;
pub use paging::{MappingError, PagePerm};
