//! Timer core
//!
//! This module contains the multiplexing logic layered on top of the
//! platform's compare/counter peripheral: the virtual 64-bit clock, the
//! short-term and long-term pending lists, and the compare-match handler.

pub mod logging;
pub mod timer;
