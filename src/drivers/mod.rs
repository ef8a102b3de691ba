//! Device interfaces used by the syscall layer
//!
//! The kernel core talks to the console, the clock and the network card
//! only through these traits. Each comes with a small reference model so the
//! core can run without hardware.
//!
//! All drivers follow these principles:
//! - Input validation on all public interfaces
//! - No panics on invalid input (return errors)

pub mod clock;
pub mod console;
pub mod net;

pub use clock::{Clock, ManualClock};
pub use console::{BufferConsole, Console};
pub use net::{NetDevice, NetError, RingNic, MAX_FRAME_LEN};
