//! Physical Frame Allocator
//!
//! Manages physical memory pages (frames) using a bitmap allocator.
//!
//! # Design
//! - Each bit in the bitmap represents one 4KB frame
//! - Bit = 0: frame is free
//! - Bit = 1: frame is allocated
//! - Storage of released frames is recycled, not returned to the heap
//!
//! # Ownership
//! A [`PhysFrame`] is an RAII guard: dropping it returns the frame to its
//! allocator. Frames mapped into user address spaces are held as
//! [`SharedFrame`] (`Arc<PhysFrame>`), so the strong count is the number of
//! live mappings and the frame is released when the last mapping goes away.
//!
//! # Security Properties
//! - All allocated frames are zeroed before returning
//! - Double-free is detected and causes a panic
//! - The allocator is protected by a spinlock

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;

use spin::Mutex;

use super::address::{PhysAddr, PAGE_SIZE, PAGE_SHIFT};
use super::paging::MappingError;
use crate::security::Zeroize;

/// Starting physical address for allocatable frames.
/// We skip the first 2MB to avoid kernel code/data.
const FRAME_START: usize = 0x4020_0000;

/// Backing storage of one frame.
type FrameStorage = Box<[u8]>;

/// Frame allocator state.
struct FrameAllocatorInner {
    /// Bitmap tracking allocated frames (1 = allocated, 0 = free).
    bitmap: Vec<u8>,
    /// Number of free frames remaining.
    free_count: usize,
    /// Total frames under management.
    total_frames: usize,
    /// Storage of released frames, handed out again before fresh memory.
    recycled: Vec<FrameStorage>,
}

impl FrameAllocatorInner {
    fn new(total_frames: usize) -> Self {
        Self {
            bitmap: vec![0; total_frames.div_ceil(8)],
            free_count: total_frames,
            total_frames,
            recycled: Vec::new(),
        }
    }

    /// Set a bit in the bitmap.
    #[inline]
    fn set_bit(&mut self, frame: usize, allocated: bool) {
        let byte_idx = frame / 8;
        let bit_idx = frame % 8;

        if allocated {
            self.bitmap[byte_idx] |= 1 << bit_idx;
        } else {
            self.bitmap[byte_idx] &= !(1 << bit_idx);
        }
    }

    /// Check if a frame is allocated.
    #[inline]
    fn is_allocated(&self, frame: usize) -> bool {
        if frame >= self.total_frames {
            return true; // Out of range = allocated
        }
        (self.bitmap[frame / 8] >> (frame % 8)) & 1 == 1
    }

    /// Allocate a single frame.
    fn alloc(&mut self) -> Option<(PhysAddr, FrameStorage)> {
        if self.free_count == 0 {
            return None;
        }

        // Found a byte with at least one free bit
        let byte_idx = self.bitmap.iter().position(|&byte| byte != 0xFF)?;
        let first = byte_idx * 8;
        let frame = (first..(first + 8).min(self.total_frames)).find(|&f| !self.is_allocated(f))?;

        self.set_bit(frame, true);
        self.free_count -= 1;

        let storage = self
            .recycled
            .pop()
            .unwrap_or_else(|| vec![0u8; PAGE_SIZE].into_boxed_slice());
        let addr = PhysAddr::new(FRAME_START + (frame << PAGE_SHIFT));
        Some((addr, storage))
    }

    /// Free a previously allocated frame.
    fn free(&mut self, addr: PhysAddr, storage: FrameStorage) {
        if !addr.is_aligned() || addr.as_usize() < FRAME_START {
            panic!("Attempted to free invalid frame address: {:?}", addr);
        }

        let frame = (addr.as_usize() - FRAME_START) >> PAGE_SHIFT;

        if frame >= self.total_frames {
            panic!("Attempted to free frame outside managed range: {:?}", addr);
        }

        if !self.is_allocated(frame) {
            panic!("Double free detected for frame: {:?}", addr);
        }

        self.set_bit(frame, false);
        self.free_count += 1;
        self.recycled.push(storage);
    }
}

/// Handle to a frame allocator.
///
/// Cloning the handle shares the same pool; frames keep a handle so they can
/// release themselves on drop.
#[derive(Clone)]
pub struct FrameAllocator {
    inner: Arc<Mutex<FrameAllocatorInner>>,
}

impl FrameAllocator {
    /// Create an allocator managing `total_frames` frames.
    pub fn new(total_frames: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(FrameAllocatorInner::new(total_frames))),
        }
    }

    /// Allocate a zeroed physical frame.
    pub fn alloc(&self) -> Result<PhysFrame, MappingError> {
        let (addr, mut storage) = self.inner.lock().alloc().ok_or(MappingError::OutOfMemory)?;
        storage.zeroize();
        Ok(PhysFrame {
            addr,
            data: Mutex::new(Some(storage)),
            allocator: self.clone(),
        })
    }

    /// Get the number of free frames remaining.
    pub fn free_frames(&self) -> usize {
        self.inner.lock().free_count
    }
}

impl fmt::Debug for FrameAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("FrameAllocator")
            .field("free", &inner.free_count)
            .field("total", &inner.total_frames)
            .finish()
    }
}

/// A RAII guard for a physical frame that automatically frees it on drop.
pub struct PhysFrame {
    addr: PhysAddr,
    /// Always `Some` until drop hands the storage back.
    data: Mutex<Option<FrameStorage>>,
    allocator: FrameAllocator,
}

/// A frame shared by every address space that maps it.
pub type SharedFrame = Arc<PhysFrame>;

impl PhysFrame {
    /// Get the physical address of this frame.
    #[inline]
    pub fn addr(&self) -> PhysAddr {
        self.addr
    }

    /// Copy bytes out of the frame starting at `offset`.
    ///
    /// # Panics
    /// Panics if the range does not fit in one page.
    pub fn read(&self, offset: usize, buf: &mut [u8]) {
        let data = self.data.lock();
        if let Some(storage) = data.as_ref() {
            buf.copy_from_slice(&storage[offset..offset + buf.len()]);
        }
    }

    /// Copy bytes into the frame starting at `offset`.
    ///
    /// # Panics
    /// Panics if the range does not fit in one page.
    pub fn write(&self, offset: usize, bytes: &[u8]) {
        let mut data = self.data.lock();
        if let Some(storage) = data.as_mut() {
            storage[offset..offset + bytes.len()].copy_from_slice(bytes);
        }
    }
}

impl fmt::Debug for PhysFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhysFrame({})", self.addr)
    }
}

impl Drop for PhysFrame {
    fn drop(&mut self) {
        if let Some(storage) = self.data.get_mut().take() {
            self.allocator.inner.lock().free(self.addr, storage);
        }
    }
}
