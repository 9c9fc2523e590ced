//! webgate CLI library.
//!
//! Scenario replay used by the `webgate` binary and its tests.

pub mod scenario;
