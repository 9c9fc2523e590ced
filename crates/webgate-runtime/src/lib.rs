//! webgate runtime.
//!
//! Suspends an engine operation while the host decides, and resumes it
//! exactly once with the host's answer or a restrictive default.

pub mod component;
pub mod event;
pub mod guard;
pub mod handler;
pub mod registry;
pub mod token;

pub use component::{KeyboardSession, Lifecycle, WebComponent, spawn_expiry_sweeper};
pub use guard::{GuardConfig, ResolutionGuard};
pub use registry::{Callback, DispatchRegistry, Listener};
pub use token::{DefaultReason, Resolution, SettleSource, Settled, TokenError, TokenId};
