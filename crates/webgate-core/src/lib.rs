//! `webgate` Core Library
//!
//! Shared vocabulary for the web component handshake:
//! - Request categories and the event names they are raised under
//! - Read-only request context handed to host callbacks
//! - Per-category terminal decisions and their restrictive defaults
//! - Configuration resolution and hierarchy
//! - Common error types

pub mod category;
pub mod config;
pub mod context;
pub mod decision;
pub mod error;
pub mod tracing_init;

pub use category::{Category, EventName};
pub use config::{Config, DefaultPolicy, GrantPolicy};
pub use decision::{Decision, Outcome};
pub use error::{Error, Result};
