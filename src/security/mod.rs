//! Security Primitives Module
//!
//! Memory scrubbing for physical frames:
//! - Frames are zeroed before they are handed to an environment
//!
//! # Security Properties
//! - No data written by one environment survives into another's fresh page
//! - Memory is cleared using volatile writes to prevent optimization

pub mod zeroize;

pub use zeroize::Zeroize;
