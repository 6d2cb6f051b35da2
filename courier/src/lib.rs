//! Courier — an outbound campaign delivery engine.
//!
//! Wires the store, rate limiter, provider chain, dispatcher, scheduler,
//! and bulk job processor into one [`engine::Engine`], exposed over the
//! control socket to external triggers.

pub mod config;
pub mod control_handler;
pub mod engine;
