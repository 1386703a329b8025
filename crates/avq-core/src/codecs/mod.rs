//! Coding modules
//!
//! - [`avq`]: the RE8 algebraic vector quantiser and its bitstream packing
//! - [`swb`]: the layered super-wideband coder built on top of it

pub mod avq;
pub mod swb;
