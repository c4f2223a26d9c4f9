//! Test fixtures
//!
//! Mock peers, deterministic chains and loopback sockets shared by the unit tests.

pub mod test_utils;

pub use test_utils::*;
