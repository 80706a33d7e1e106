//! Platform adapters
//!
//! Only the browser is a real host. Native builds drive the core against the
//! in-memory engine in `sim::headless` instead.

#[cfg(target_arch = "wasm32")]
pub mod web;
