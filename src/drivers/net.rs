//! Network Interface
//!
//! Descriptor-ring model of an Ethernet controller. The kernel side
//! transmits and receives whole frames without ever blocking; the hardware
//! side (a test harness or a real interrupt handler) completes transmits and
//! delivers received frames.
//!
//! # Security Properties
//! - Frames longer than [`MAX_FRAME_LEN`] are rejected, never truncated
//! - A receive never copies more than the caller's buffer holds
//! - A full ring reports `Busy` instead of overwriting pending data

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use spin::Mutex;

/// Largest Ethernet frame accepted by the device.
pub const MAX_FRAME_LEN: usize = 1518;

/// Descriptors per ring.
pub const RING_SIZE: usize = 64;

/// Error type for device operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetError {
    /// The next descriptor is still owned by the hardware.
    Busy,
    /// Frame exceeds [`MAX_FRAME_LEN`].
    FrameTooLong,
}

impl fmt::Display for NetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy => write!(f, "descriptor ring busy"),
            Self::FrameTooLong => write!(f, "frame too long"),
        }
    }
}

/// A network device as seen by the syscall layer.
pub trait NetDevice: Send {
    /// Queue one frame for transmission.
    fn transmit(&mut self, frame: &[u8]) -> Result<(), NetError>;

    /// Take the next received frame into `buf`, returning the number of
    /// bytes copied. `Ok(0)` means nothing has arrived.
    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, NetError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TxSlot {
    Free,
    Pending(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum RxSlot {
    Empty,
    /// Hardware is writing into the descriptor.
    Filling,
    Ready(Vec<u8>),
    /// Hardware flagged the frame as bad.
    Errored,
}

struct Rings {
    tx: Vec<TxSlot>,
    tx_tail: usize,
    tx_head: usize,
    rx: Vec<RxSlot>,
    rx_tail: usize,
    rx_head: usize,
}

impl Rings {
    fn new() -> Self {
        Self {
            tx: alloc::vec![TxSlot::Free; RING_SIZE],
            tx_tail: 0,
            tx_head: 0,
            rx: alloc::vec![RxSlot::Empty; RING_SIZE],
            rx_tail: 0,
            rx_head: 0,
        }
    }
}

/// Reference ring-buffer network device.
///
/// Clones share the same rings, so one handle can be given to the kernel
/// while another plays the hardware.
#[derive(Clone)]
pub struct RingNic {
    rings: Arc<Mutex<Rings>>,
}

impl Default for RingNic {
    fn default() -> Self {
        Self::new()
    }
}

impl RingNic {
    pub fn new() -> Self {
        Self {
            rings: Arc::new(Mutex::new(Rings::new())),
        }
    }

    /// Hardware side: finish the oldest pending transmit and return its
    /// frame.
    pub fn complete_tx(&self) -> Option<Vec<u8>> {
        let mut rings = self.rings.lock();
        let head = rings.tx_head;
        match core::mem::replace(&mut rings.tx[head], TxSlot::Free) {
            TxSlot::Pending(frame) => {
                rings.tx_head = (head + 1) % RING_SIZE;
                Some(frame)
            }
            TxSlot::Free => None,
        }
    }

    /// Hardware side: place a received frame in the next descriptor,
    /// completing one claimed by [`begin_delivery`](Self::begin_delivery).
    ///
    /// Returns false if the ring is full or the frame is too long.
    pub fn deliver(&self, frame: &[u8]) -> bool {
        if frame.len() > MAX_FRAME_LEN {
            return false;
        }
        self.fill_next(RxSlot::Ready(frame.to_vec()))
    }

    /// Hardware side: claim the next descriptor without completing it.
    pub fn begin_delivery(&self) -> bool {
        self.fill_next(RxSlot::Filling)
    }

    /// Hardware side: report a bad frame in the next descriptor.
    pub fn deliver_error(&self) -> bool {
        self.fill_next(RxSlot::Errored)
    }

    fn fill_next(&self, slot: RxSlot) -> bool {
        let mut rings = self.rings.lock();
        let tail = rings.rx_tail;
        // A Filling descriptor at the tail is completed in place.
        if rings.rx[tail] == RxSlot::Filling {
            if slot == RxSlot::Filling {
                return false;
            }
            rings.rx[tail] = slot;
            rings.rx_tail = (tail + 1) % RING_SIZE;
            return true;
        }
        if rings.rx[tail] != RxSlot::Empty {
            return false;
        }
        let advance = slot != RxSlot::Filling;
        rings.rx[tail] = slot;
        if advance {
            rings.rx_tail = (tail + 1) % RING_SIZE;
        }
        true
    }
}

impl NetDevice for RingNic {
    fn transmit(&mut self, frame: &[u8]) -> Result<(), NetError> {
        if frame.len() > MAX_FRAME_LEN {
            return Err(NetError::FrameTooLong);
        }
        let mut rings = self.rings.lock();
        let tail = rings.tx_tail;
        if rings.tx[tail] != TxSlot::Free {
            return Err(NetError::Busy);
        }
        rings.tx[tail] = TxSlot::Pending(frame.to_vec());
        rings.tx_tail = (tail + 1) % RING_SIZE;
        Ok(())
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, NetError> {
        let mut rings = self.rings.lock();
        let head = rings.rx_head;
        match &rings.rx[head] {
            RxSlot::Empty => return Ok(0),
            RxSlot::Filling => return Err(NetError::Busy),
            _ => {}
        }
        let copied = match core::mem::replace(&mut rings.rx[head], RxSlot::Empty) {
            RxSlot::Ready(frame) => {
                let n = frame.len().min(buf.len());
                buf[..n].copy_from_slice(&frame[..n]);
                n
            }
            _ => 0,
        };
        rings.rx_head = (head + 1) % RING_SIZE;
        Ok(copied)
    }
}
