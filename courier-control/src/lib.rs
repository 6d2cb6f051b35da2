//! Control plane for a running Courier engine.
//!
//! External triggers — admission reservation, campaign dispatch, scheduler
//! ticks, bulk job processing — arrive over a Unix domain socket carrying a
//! versioned, newline-delimited JSON protocol. The engine is invoked, not
//! self-scheduling: this is the invocation surface.

pub mod client;
pub mod error;
pub mod protocol;
pub mod server;

pub use client::ControlClient;
pub use error::{ControlError, Result};
pub use protocol::{Command, EngineStatus, Request, Response, ResponseData, ResponsePayload};
pub use server::{CommandHandler, ControlServer};

/// Default path of the control socket.
pub const DEFAULT_CONTROL_SOCKET: &str = "/tmp/courier/control.sock";
