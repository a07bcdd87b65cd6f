//! icmpcopy-core — wire format, protocol constants, and configuration.
//! All other icmpcopy crates depend on this one.

pub mod config;
pub mod wire;

pub use wire::{Packet, WireError};
